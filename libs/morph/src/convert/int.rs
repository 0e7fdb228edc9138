use chrono::TimeDelta;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

/// 2^127, the first magnitude outside `i128`.
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Exact nanosecond count of a duration.
pub(crate) fn duration_nanos(d: &TimeDelta) -> i128 {
    i128::from(d.num_seconds()) * 1_000_000_000 + i128::from(d.subsec_nanos())
}

/// Convert `src` to an integer of type `T`, range-checked through `i128`.
pub(crate) fn integral<T>(src: &Value, to: Kind) -> Result<T>
where
    T: TryFrom<i128> + Default,
{
    let wide = match src {
        Value::Nil => return Ok(T::default()),
        Value::Bool(v) => i128::from(*v),
        Value::I8(v) => i128::from(*v),
        Value::I16(v) => i128::from(*v),
        Value::I32(v) => i128::from(*v),
        Value::I64(v) => i128::from(*v),
        Value::Isize(v) => *v as i128,
        Value::U8(v) => i128::from(*v),
        Value::U16(v) => i128::from(*v),
        Value::U32(v) => i128::from(*v),
        Value::U64(v) => i128::from(*v),
        Value::Usize(v) => *v as i128,
        Value::F32(v) => float_to_wide(f64::from(*v), src, to)?,
        Value::F64(v) => float_to_wide(*v, src, to)?,
        // Complex sources contribute their real part only.
        Value::C64(v) => float_to_wide(f64::from(v.re), src, to)?,
        Value::C128(v) => float_to_wide(v.re, src, to)?,
        Value::Duration(d) => duration_nanos(d),
        Value::Time(t) => i128::from(t.timestamp()),
        Value::Decimal(d) => d
            .trunc()
            .to_i128()
            .ok_or_else(|| ConvertError::overflow(src, to))?,
        Value::String(s) => parse_wide(s, src, to)?,
        Value::Bytes(b) => parse_wide(&String::from_utf8_lossy(b), src, to)?,
        _ => return Err(ConvertError::unsupported(src, to)),
    };
    T::try_from(wide).map_err(|_| ConvertError::overflow(src, to))
}

/// Truncate toward zero; NaN, infinities and huge magnitudes overflow.
fn float_to_wide(v: f64, src: &Value, to: Kind) -> Result<i128> {
    if !v.is_finite() {
        return Err(ConvertError::overflow(src, to));
    }
    let truncated = v.trunc();
    if truncated >= I128_BOUND || truncated < -I128_BOUND {
        return Err(ConvertError::overflow(src, to));
    }
    Ok(truncated as i128)
}

fn parse_wide(text: &str, src: &Value, to: Kind) -> Result<i128> {
    if let Ok(v) = text.parse::<i128>() {
        return Ok(v);
    }
    match text.parse::<f64>() {
        Ok(v) => float_to_wide(v, src, to),
        Err(e) => Err(ConvertError::unsupported_because(src, to, e)),
    }
}

pub fn to_int(src: &Value) -> Result<isize> {
    integral(src, Kind::Int)
}

pub fn to_int8(src: &Value) -> Result<i8> {
    integral(src, Kind::Int8)
}

pub fn to_int16(src: &Value) -> Result<i16> {
    integral(src, Kind::Int16)
}

pub fn to_int32(src: &Value) -> Result<i32> {
    integral(src, Kind::Int32)
}

pub fn to_int64(src: &Value) -> Result<i64> {
    integral(src, Kind::Int64)
}

pub fn to_uint(src: &Value) -> Result<usize> {
    integral(src, Kind::Uint)
}

pub fn to_uint8(src: &Value) -> Result<u8> {
    integral(src, Kind::Uint8)
}

pub fn to_uint16(src: &Value) -> Result<u16> {
    integral(src, Kind::Uint16)
}

pub fn to_uint32(src: &Value) -> Result<u32> {
    integral(src, Kind::Uint32)
}

pub fn to_uint64(src: &Value) -> Result<u64> {
    integral(src, Kind::Uint64)
}
