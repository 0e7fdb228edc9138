//! Opt-in contracts a record may satisfy to customise conversion.
//!
//! A record advertises a capability by listing it in `#[record(...)]` and
//! implementing the matching trait. When several are present they are tried in
//! a fixed order: for sources `Valuer`, `FallibleValuer`, `DriverValuer`; for
//! text `Textual`, then `ToText`.

use chrono::{DateTime, FixedOffset};

use crate::Value;

/// Error reported by user capability code.
pub type CapabilityError = Box<dyn std::error::Error + Send + Sync>;

/// Destination-side hook: populate `self` from a raw value.
pub trait Scanner {
    fn scan(&mut self, src: &Value) -> Result<(), CapabilityError>;
}

/// Source-side hook producing an equivalent raw value.
pub trait Valuer {
    fn value(&self) -> Value;
}

/// Fallible variant of [`Valuer`].
pub trait FallibleValuer {
    fn try_value(&self) -> Result<Value, CapabilityError>;
}

/// Narrow value set understood by database drivers.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverValue {
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    String(String),
    Time(DateTime<FixedOffset>),
}

impl From<DriverValue> for Value {
    fn from(v: DriverValue) -> Self {
        match v {
            DriverValue::Null => Value::Nil,
            DriverValue::Int64(v) => Value::I64(v),
            DriverValue::Float64(v) => Value::F64(v),
            DriverValue::Bool(v) => Value::Bool(v),
            DriverValue::Bytes(v) => Value::Bytes(v),
            DriverValue::String(v) => Value::String(v),
            DriverValue::Time(v) => Value::Time(v),
        }
    }
}

/// Producer recognised for database-oriented wrapper types.
pub trait DriverValuer {
    fn driver_value(&self) -> Result<DriverValue, CapabilityError>;
}

/// Primary text rendering.
pub trait Textual {
    fn text(&self) -> String;
}

/// Fallback text rendering.
pub trait ToText {
    fn to_text(&self) -> String;
}

/// Self-describing deep copy.
pub trait DeepCopier {
    fn deep_copy(&self) -> Value;
}
