use num_complex::{Complex32, Complex64};

use crate::convert::float::{narrow, real};
use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

/// Parse `re`, `imi`, `re+imi` or `re-imi`, optionally in parentheses.
pub(crate) fn parse_complex(text: &str) -> Option<Complex64> {
    let mut body = text;
    if let Some(inner) = body.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        body = inner;
    }

    let Some(without_unit) = body.strip_suffix('i') else {
        return body.parse::<f64>().ok().map(|re| Complex64::new(re, 0.0));
    };

    // The sign splitting real and imaginary parts is the last one not part of an exponent.
    let bytes = without_unit.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));

    match split {
        Some(i) => {
            let re = without_unit[..i].parse::<f64>().ok()?;
            let im = parse_imaginary(&without_unit[i..])?;
            Some(Complex64::new(re, im))
        }
        None => Some(Complex64::new(0.0, parse_imaginary(without_unit)?)),
    }
}

fn parse_imaginary(text: &str) -> Option<f64> {
    match text {
        "" | "+" => Some(1.0),
        "-" => Some(-1.0),
        _ => text.parse::<f64>().ok(),
    }
}

fn parse_text(text: &str, src: &Value, to: Kind) -> Result<Complex64> {
    parse_complex(text)
        .ok_or_else(|| ConvertError::unsupported_because(src, to, "invalid complex syntax"))
}

pub fn to_complex128(src: &Value) -> Result<Complex64> {
    match src {
        Value::C128(v) => Ok(*v),
        Value::C64(v) => Ok(Complex64::new(f64::from(v.re), f64::from(v.im))),
        Value::String(s) => parse_text(s, src, Kind::Complex128),
        Value::Bytes(b) => parse_text(&String::from_utf8_lossy(b), src, Kind::Complex128),
        _ => Ok(Complex64::new(real(src, Kind::Complex128)?, 0.0)),
    }
}

pub fn to_complex64(src: &Value) -> Result<Complex32> {
    let narrow_lossy = |v: Complex64| Complex32::new(v.re as f32, v.im as f32);
    match src {
        Value::C64(v) => Ok(*v),
        // complex-to-complex narrowing may lose precision, never fails
        Value::C128(v) => Ok(narrow_lossy(*v)),
        Value::String(s) => parse_text(s, src, Kind::Complex64).map(narrow_lossy),
        Value::Bytes(b) => {
            parse_text(&String::from_utf8_lossy(b), src, Kind::Complex64).map(narrow_lossy)
        }
        Value::F32(v) => Ok(Complex32::new(*v, 0.0)),
        _ => {
            let re = narrow(real(src, Kind::Complex64)?, src, Kind::Complex64)?;
            Ok(Complex32::new(re, 0.0))
        }
    }
}
