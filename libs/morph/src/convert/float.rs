use rust_decimal::prelude::ToPrimitive;

use crate::convert::int::duration_nanos;
use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

/// Real-valued projection of `src` as `f64`.
pub(crate) fn real(src: &Value, to: Kind) -> Result<f64> {
    let v = match src {
        Value::Nil => 0.0,
        Value::Bool(v) => {
            if *v {
                1.0
            } else {
                0.0
            }
        }
        Value::I8(v) => f64::from(*v),
        Value::I16(v) => f64::from(*v),
        Value::I32(v) => f64::from(*v),
        Value::I64(v) => *v as f64,
        Value::Isize(v) => *v as f64,
        Value::U8(v) => f64::from(*v),
        Value::U16(v) => f64::from(*v),
        Value::U32(v) => f64::from(*v),
        Value::U64(v) => *v as f64,
        Value::Usize(v) => *v as f64,
        Value::F32(v) => f64::from(*v),
        Value::F64(v) => *v,
        Value::C64(v) => f64::from(v.re),
        Value::C128(v) => v.re,
        Value::Duration(d) => duration_nanos(d) as f64,
        Value::Time(t) => t.timestamp() as f64,
        Value::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| ConvertError::unsupported(src, to))?,
        Value::String(s) => parse_real(s, src, to)?,
        Value::Bytes(b) => parse_real(&String::from_utf8_lossy(b), src, to)?,
        _ => return Err(ConvertError::unsupported(src, to)),
    };
    Ok(v)
}

fn parse_real(text: &str, src: &Value, to: Kind) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|e| ConvertError::unsupported_because(src, to, e))
}

/// Narrow to `f32`; NaN and infinities pass, finite out-of-range values overflow.
pub(crate) fn narrow(v: f64, src: &Value, to: Kind) -> Result<f32> {
    if v.is_finite() && v.abs() > f64::from(f32::MAX) {
        return Err(ConvertError::overflow(src, to));
    }
    Ok(v as f32)
}

pub fn to_float64(src: &Value) -> Result<f64> {
    real(src, Kind::Float64)
}

pub fn to_float32(src: &Value) -> Result<f32> {
    match src {
        Value::F32(v) => Ok(*v),
        Value::C64(v) => Ok(v.re),
        _ => narrow(real(src, Kind::Float32)?, src, Kind::Float32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_identity_and_widening() {
        assert_eq!(to_float64(&Value::F64(2.5)).unwrap(), 2.5);
        assert_eq!(to_float64(&Value::F32(0.5)).unwrap(), 0.5);
        assert_eq!(to_float32(&Value::F32(0.1)).unwrap(), 0.1f32);
        assert_eq!(to_float64(&Value::I64(-3)).unwrap(), -3.0);
        assert_eq!(to_float64(&Value::Bool(true)).unwrap(), 1.0);
    }

    #[test]
    fn test_float32_range() {
        assert_eq!(to_float32(&Value::F64(1e39)).unwrap_err().code(), ErrorCode::NumberOverflow);
        assert!(to_float32(&Value::F64(f64::NAN)).unwrap().is_nan());
        assert_eq!(to_float32(&Value::F64(f64::NEG_INFINITY)).unwrap(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_text() {
        assert_eq!(to_float64(&Value::from("1e3")).unwrap(), 1000.0);
        assert_eq!(to_float32(&Value::Bytes(b"-0.25".to_vec())).unwrap(), -0.25);
        assert_eq!(to_float64(&Value::from("x1")).unwrap_err().code(), ErrorCode::TypeNotSupported);
    }

    #[test]
    fn test_nil_is_zero() {
        assert_eq!(to_float32(&Value::Nil).unwrap(), 0.0);
    }
}
