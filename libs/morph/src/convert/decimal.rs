use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

fn parse_decimal(text: &str, src: &Value) -> Result<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| ConvertError::unsupported_because(src, Kind::Decimal, e))
}

fn from_real(v: f64, rendered: String, src: &Value) -> Result<Decimal> {
    if !v.is_finite() {
        return Err(ConvertError::unsupported_because(
            src,
            Kind::Decimal,
            "not a finite number",
        ));
    }
    parse_decimal(&rendered, src)
}

/// Decimal coercion. Values the decimal cannot hold are reported as
/// unsupported rather than overflowing.
pub fn to_decimal(src: &Value) -> Result<Decimal> {
    match src {
        Value::Nil => Ok(Decimal::ZERO),
        Value::Decimal(d) => Ok(*d),
        Value::Bool(v) => Ok(if *v { Decimal::ONE } else { Decimal::ZERO }),
        Value::I8(v) => Ok(Decimal::from(*v)),
        Value::I16(v) => Ok(Decimal::from(*v)),
        Value::I32(v) => Ok(Decimal::from(*v)),
        Value::I64(v) => Ok(Decimal::from(*v)),
        Value::Isize(v) => Ok(Decimal::from(*v)),
        Value::U8(v) => Ok(Decimal::from(*v)),
        Value::U16(v) => Ok(Decimal::from(*v)),
        Value::U32(v) => Ok(Decimal::from(*v)),
        Value::U64(v) => Ok(Decimal::from(*v)),
        Value::Usize(v) => Ok(Decimal::from(*v)),
        // Render through the shortest text form so 0.1 stays 0.1.
        Value::F32(v) => from_real(f64::from(*v), v.to_string(), src),
        Value::F64(v) => from_real(*v, v.to_string(), src),
        Value::C64(v) => from_real(f64::from(v.re), v.re.to_string(), src),
        Value::C128(v) => from_real(v.re, v.re.to_string(), src),
        Value::Duration(d) => Decimal::from(d.num_seconds())
            .checked_mul(Decimal::from(1_000_000_000i64))
            .and_then(|secs| secs.checked_add(Decimal::from(d.subsec_nanos())))
            .ok_or_else(|| ConvertError::unsupported(src, Kind::Decimal)),
        Value::Time(t) => Ok(Decimal::from(t.timestamp())),
        Value::String(s) => parse_decimal(s, src),
        Value::Bytes(b) => parse_decimal(&String::from_utf8_lossy(b), src),
        _ => Err(ConvertError::unsupported(src, Kind::Decimal)),
    }
}
