use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};

use crate::convert::float::to_float64;
use crate::convert::int::{integral, to_int32, to_int64};
use crate::error::{ConvertError, Result};
use crate::value::{Kind, Value};

pub const TIME_FORMAT_ISO_STZ: &str = "%Y-%m-%d %H:%M:%S %:z";
pub const TIME_FORMAT_ISO: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT_ISO_DATE: &str = "%Y-%m-%d";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// How a layout's zone information is obtained.
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// Trailing zone abbreviation such as `MST` or `UTC`.
    Abbreviated(&'static str),
    /// Numeric offset parsed by the format itself.
    Zoned(&'static str),
    Rfc3339,
    /// No zone; interpreted as UTC.
    Naive(&'static str),
    DateOnly(&'static str),
}

/// Accepted calendar text layouts, tried in order; the first match wins.
const LAYOUTS: &[Layout] = &[
    // RFC 822
    Layout::Abbreviated("%d %b %y %H:%M"),
    // RFC 850
    Layout::Abbreviated("%A, %d-%b-%y %H:%M:%S"),
    // RFC 1123
    Layout::Abbreviated("%a, %d %b %Y %H:%M:%S"),
    // RFC 822 with numeric zone
    Layout::Zoned("%d %b %y %H:%M %z"),
    // RFC 3339, with or without fractional seconds
    Layout::Rfc3339,
    // RFC 1123 with numeric zone
    Layout::Zoned("%a, %d %b %Y %H:%M:%S %z"),
    Layout::Zoned(TIME_FORMAT_ISO_STZ),
    Layout::Naive(TIME_FORMAT_ISO),
    Layout::DateOnly(TIME_FORMAT_ISO_DATE),
];

/// The zero time: Unix epoch in UTC.
pub fn zero_time() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Offset of a well-known zone abbreviation; unknown ones count as UTC.
fn abbreviation_offset(abbrev: &str) -> FixedOffset {
    let hours = match abbrev.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        "CET" => 1,
        "CEST" => 2,
        "MSK" => 3,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(utc)
}

fn parse_with(layout: Layout, text: &str) -> Option<DateTime<FixedOffset>> {
    match layout {
        Layout::Abbreviated(format) => {
            let (head, abbrev) = text.rsplit_once(' ')?;
            if abbrev.is_empty() || !abbrev.chars().all(|c| c.is_ascii_alphabetic()) {
                return None;
            }
            let naive = NaiveDateTime::parse_from_str(head, format).ok()?;
            abbreviation_offset(abbrev).from_local_datetime(&naive).single()
        }
        Layout::Zoned(format) => DateTime::parse_from_str(text, format).ok(),
        Layout::Rfc3339 => DateTime::parse_from_rfc3339(text).ok(),
        Layout::Naive(format) => NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset()),
        Layout::DateOnly(format) => NaiveDate::parse_from_str(text, format)
            .ok()?
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().fixed_offset()),
    }
}

fn parse_text(text: &str, src: &Value) -> Result<DateTime<FixedOffset>> {
    LAYOUTS
        .iter()
        .find_map(|layout| parse_with(*layout, text))
        .ok_or_else(|| ConvertError::unsupported_because(src, Kind::Time, "unrecognised time format"))
}

/// Seconds and nanoseconds since the epoch; nanoseconds may be out of `[0, 1e9)`.
fn from_unix(secs: i64, nanos: i64, src: &Value) -> Result<DateTime<FixedOffset>> {
    let carry = nanos.div_euclid(NANOS_PER_SECOND);
    let nanos = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    secs.checked_add(carry)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, nanos))
        .map(|t| t.fixed_offset())
        .ok_or_else(|| ConvertError::overflow(src, Kind::Time))
}

fn parse_zone(text: &str) -> Option<FixedOffset> {
    if ["Z", "UTC", "GMT"].iter().any(|z| text.eq_ignore_ascii_case(z)) {
        return Some(utc());
    }
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Zone of the 8-element tuple form.
fn zone_offset(zone: &Value) -> Result<FixedOffset> {
    match zone {
        Value::Nil => Ok(utc()),
        Value::Time(t) => Ok(*t.offset()),
        Value::String(s) => parse_zone(s)
            .ok_or_else(|| ConvertError::unsupported_because(zone, "zone", "unrecognised zone")),
        _ => {
            let seconds = to_int32(zone)?;
            FixedOffset::east_opt(seconds).ok_or_else(|| ConvertError::overflow(zone, "zone"))
        }
    }
}

/// Civil date-time, normalised the way month/day overflow rolls forward.
fn from_civil(parts: &[Value], zone: FixedOffset, src: &Value) -> Result<DateTime<FixedOffset>> {
    let mut fields = [0i64; 7];
    for (field, part) in fields.iter_mut().zip(parts) {
        *field = to_int64(part)?;
    }
    let [year, month, day, hour, minute, second, nanos] = fields;

    let civil = || -> Option<DateTime<FixedOffset>> {
        let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
        let year = i32::try_from(months.div_euclid(12)).ok()?;
        let month = u32::try_from(months.rem_euclid(12) + 1).ok()?;
        let naive = NaiveDate::from_ymd_opt(year, month, 1)?
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(TimeDelta::try_days(day.checked_sub(1)?)?)?
            .checked_add_signed(TimeDelta::try_hours(hour)?)?
            .checked_add_signed(TimeDelta::try_minutes(minute)?)?
            .checked_add_signed(TimeDelta::try_seconds(second)?)?
            .checked_add_signed(TimeDelta::nanoseconds(nanos))?;
        zone.from_local_datetime(&naive).single()
    };
    civil().ok_or_else(|| ConvertError::overflow(src, Kind::Time))
}

fn from_single(src: &Value) -> Result<DateTime<FixedOffset>> {
    match src {
        Value::Nil => Ok(zero_time()),
        Value::Time(t) => Ok(*t),
        Value::List(items) => to_time_args(items),
        Value::String(s) => parse_text(s, src),
        Value::Bytes(b) => parse_text(&String::from_utf8_lossy(b), src),
        Value::F32(_) | Value::F64(_) => {
            let secs = to_int64(src)?;
            let fraction = to_float64(src)? - secs as f64;
            from_unix(secs, (fraction * NANOS_PER_SECOND as f64) as i64, src)
        }
        Value::I8(_)
        | Value::I16(_)
        | Value::I32(_)
        | Value::I64(_)
        | Value::Isize(_)
        | Value::U8(_)
        | Value::U16(_)
        | Value::U32(_)
        | Value::U64(_)
        | Value::Usize(_) => from_unix(to_int64(src)?, 0, src),
        _ => Err(ConvertError::unsupported(src, Kind::Time)),
    }
}

/// Time coercion of a single value.
pub fn to_time(src: &Value) -> Result<DateTime<FixedOffset>> {
    from_single(src)
}

/// Time from positional arguments.
///
/// * none: the zero time
/// * one: a time, calendar text, epoch seconds, or a list spread as arguments
/// * two: epoch seconds and nanoseconds
/// * seven or eight: year, month, day, hour, minute, second, nanosecond and an
///   optional zone (nil, a time donating its offset, seconds east of UTC, or
///   `Z`/`UTC`/`+HH:MM`/`+HHMM`)
pub fn to_time_args(args: &[Value]) -> Result<DateTime<FixedOffset>> {
    match args {
        [] => Ok(zero_time()),
        [single] => from_single(single),
        [secs, nanos] => from_unix(to_int64(secs)?, to_int64(nanos)?, secs),
        [parts @ .., zone] if parts.len() == 7 => {
            from_civil(parts, zone_offset(zone)?, &Value::List(args.to_vec()))
        }
        parts if parts.len() == 7 => from_civil(parts, utc(), &Value::List(args.to_vec())),
        _ => Err(ConvertError::unsupported_because(
            &Value::List(args.to_vec()),
            Kind::Time,
            format!("unsupported argument count {}", args.len()),
        )),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Durations
// ═══════════════════════════════════════════════════════════════

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return None,
    };
    Some(nanos)
}

/// Parse `1h30m`, `1.5s`, `-250ms`; a bare `0` is zero.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, mut rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if rest == "0" {
        return Some(TimeDelta::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        total += number * unit_nanos(&rest[..unit_end])?;
        rest = &rest[unit_end..];
    }

    if total > i64::MAX as f64 {
        return None;
    }
    let nanos = total as i64;
    Some(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Duration coercion. Numbers are nanosecond counts; text uses unit suffixes.
pub fn to_duration(src: &Value) -> Result<TimeDelta> {
    match src {
        Value::Duration(d) => Ok(*d),
        Value::String(s) => match parse_duration(s) {
            Some(d) => Ok(d),
            None => integral::<i64>(src, Kind::Duration).map(TimeDelta::nanoseconds),
        },
        Value::Bytes(b) => to_duration(&Value::String(String::from_utf8_lossy(b).into_owned())),
        Value::Time(_) => Err(ConvertError::unsupported(src, Kind::Duration)),
        _ => integral::<i64>(src, Kind::Duration).map(TimeDelta::nanoseconds),
    }
}
