use chrono::TimeDelta;
use num_complex::{Complex32, Complex64};

use crate::container::to_bytes;
use crate::convert::int::duration_nanos;
use crate::convert::time::TIME_FORMAT_ISO_STZ;
use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

// ═══════════════════════════════════════════════════════════════
//  Text formats
// ═══════════════════════════════════════════════════════════════

fn special_float(is_nan: bool, is_infinite: bool, negative: bool) -> Option<&'static str> {
    match (is_nan, is_infinite, negative) {
        (true, _, _) => Some("NaN"),
        (false, true, false) => Some("+Inf"),
        (false, true, true) => Some("-Inf"),
        _ => None,
    }
}

/// Shortest plain decimal, `NaN`, `+Inf` or `-Inf`.
pub(crate) fn format_float64(v: f64) -> String {
    match special_float(v.is_nan(), v.is_infinite(), v.is_sign_negative()) {
        Some(text) => text.to_string(),
        None => v.to_string(),
    }
}

pub(crate) fn format_float32(v: f32) -> String {
    match special_float(v.is_nan(), v.is_infinite(), v.is_sign_negative()) {
        Some(text) => text.to_string(),
        None => v.to_string(),
    }
}

fn join_complex(re: String, im: String) -> String {
    if im.starts_with('-') || im.starts_with('+') {
        format!("({re}{im}i)")
    } else {
        format!("({re}+{im}i)")
    }
}

pub(crate) fn format_complex64(v: Complex64) -> String {
    join_complex(format_float64(v.re), format_float64(v.im))
}

pub(crate) fn format_complex32(v: Complex32) -> String {
    join_complex(format_float32(v.re), format_float32(v.im))
}

/// `value / scale` with the fraction trimmed of trailing zeros.
fn scaled(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Short unit form: `1h2m3.5s`, `1.5ms`, `250ns`, `0s`.
pub(crate) fn format_duration(d: &TimeDelta) -> String {
    const SECOND: u128 = 1_000_000_000;

    let nanos = duration_nanos(d);
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();

    if abs < SECOND {
        let (scale, unit) = if abs < 1_000 {
            (1, "ns")
        } else if abs < 1_000_000 {
            (1_000, "µs")
        } else {
            (1_000_000, "ms")
        };
        return format!("{sign}{}{unit}", scaled(abs, scale));
    }

    let total_secs = abs / SECOND;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = scaled((total_secs % 60) * SECOND + abs % SECOND, SECOND);

    let mut out = String::from(sign);
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds);
    out.push('s');
    out
}

// ═══════════════════════════════════════════════════════════════
//  Coercions
// ═══════════════════════════════════════════════════════════════

pub fn to_string(src: &Value) -> Result<String> {
    let text = match src {
        Value::Nil => String::new(),
        Value::String(v) => v.clone(),
        Value::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        Value::List(_) => String::from_utf8_lossy(&to_bytes(src)?).into_owned(),
        Value::Bool(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::Isize(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::Usize(v) => v.to_string(),
        Value::F32(v) => format_float32(*v),
        Value::F64(v) => format_float64(*v),
        Value::C64(v) => format_complex32(*v),
        Value::C128(v) => format_complex64(*v),
        Value::Duration(d) => format_duration(d),
        Value::Time(t) => t.format(TIME_FORMAT_ISO_STZ).to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Record(record) => {
            if let Some(textual) = record.as_textual() {
                textual.text()
            } else if let Some(to_text) = record.as_to_text() {
                to_text.to_text()
            } else {
                return Err(ConvertError::unsupported(src, Kind::String));
            }
        }
        _ => return Err(ConvertError::unsupported(src, Kind::String)),
    };
    Ok(text)
}

fn truthy_text(text: &str) -> bool {
    !(text.is_empty() || text.eq_ignore_ascii_case("false"))
}

pub fn to_bool(src: &Value) -> Result<bool> {
    let truth = match src {
        Value::Nil => false,
        Value::Bool(v) => *v,
        Value::I8(v) => *v != 0,
        Value::I16(v) => *v != 0,
        Value::I32(v) => *v != 0,
        Value::I64(v) => *v != 0,
        Value::Isize(v) => *v != 0,
        Value::U8(v) => *v != 0,
        Value::U16(v) => *v != 0,
        Value::U32(v) => *v != 0,
        Value::U64(v) => *v != 0,
        Value::Usize(v) => *v != 0,
        Value::F32(v) => *v != 0.0,
        Value::F64(v) => *v != 0.0,
        Value::C64(v) => v.re != 0.0 || v.im != 0.0,
        Value::C128(v) => v.re != 0.0 || v.im != 0.0,
        Value::Duration(d) => !d.is_zero(),
        Value::Decimal(d) => !d.is_zero(),
        Value::String(s) => truthy_text(s),
        Value::Bytes(b) => truthy_text(&String::from_utf8_lossy(b)),
        _ => return Err(ConvertError::unsupported(src, Kind::Bool)),
    };
    Ok(truth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_bool_text_rule() {
        assert!(!to_bool(&Value::from("false")).unwrap());
        assert!(!to_bool(&Value::from("FaLsE")).unwrap());
        assert!(!to_bool(&Value::from("")).unwrap());
        assert!(to_bool(&Value::from("5")).unwrap());
        assert!(to_bool(&Value::from("no")).unwrap());
        assert!(!to_bool(&Value::Bytes(b"False".to_vec())).unwrap());
    }

    #[test]
    fn test_bool_numeric() {
        assert!(to_bool(&Value::I32(-1)).unwrap());
        assert!(!to_bool(&Value::U64(0)).unwrap());
        assert!(to_bool(&Value::C128(Complex64::new(0.0, 1.0))).unwrap());
        assert!(!to_bool(&Value::Nil).unwrap());
        assert_eq!(
            to_bool(&Value::List(vec![])).unwrap_err().code(),
            ErrorCode::TypeNotSupported
        );
    }

    #[test]
    fn test_float_text() {
        assert_eq!(to_string(&Value::F64(0.1)).unwrap(), "0.1");
        assert_eq!(to_string(&Value::F32(0.1)).unwrap(), "0.1");
        assert_eq!(to_string(&Value::F64(3.0)).unwrap(), "3");
        assert_eq!(to_string(&Value::F64(f64::NAN)).unwrap(), "NaN");
        assert_eq!(to_string(&Value::F64(f64::NEG_INFINITY)).unwrap(), "-Inf");
    }

    #[test]
    fn test_complex_text() {
        assert_eq!(to_string(&Value::C128(Complex64::new(1.0, 2.0))).unwrap(), "(1+2i)");
        assert_eq!(to_string(&Value::C64(Complex32::new(1.5, -0.5))).unwrap(), "(1.5-0.5i)");
        assert_eq!(
            to_string(&Value::C128(Complex64::new(0.0, f64::INFINITY))).unwrap(),
            "(0+Infi)"
        );
    }

    #[test]
    fn test_duration_text() {
        assert_eq!(format_duration(&TimeDelta::zero()), "0s");
        assert_eq!(format_duration(&TimeDelta::nanoseconds(250)), "250ns");
        assert_eq!(format_duration(&TimeDelta::microseconds(1500)), "1.5ms");
        assert_eq!(format_duration(&TimeDelta::microseconds(2)), "2µs");
        assert_eq!(format_duration(&TimeDelta::milliseconds(3723_500)), "1h2m3.5s");
        assert_eq!(format_duration(&TimeDelta::seconds(90)), "1m30s");
        assert_eq!(format_duration(&TimeDelta::hours(1)), "1h0m0s");
        assert_eq!(format_duration(&TimeDelta::seconds(-5)), "-5s");
    }

    #[test]
    fn test_list_renders_as_bytes() {
        let list = Value::List(vec![Value::U8(b'h'), Value::I32(105)]);
        assert_eq!(to_string(&list).unwrap(), "hi");
    }

    #[test]
    fn test_unsupported() {
        let err = to_string(&Value::Dict(Default::default())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeNotSupported);
        assert_eq!(err.details()[2], ("dst_type", "string".to_string()));
    }
}
