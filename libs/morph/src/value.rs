use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use num_complex::{Complex32, Complex64};
use rust_decimal::Decimal;

use crate::convert::text::{format_complex32, format_complex64, format_duration, format_float32, format_float64};
use crate::convert::time::TIME_FORMAT_ISO_STZ;
use crate::record::{self, Record};

/// String-keyed dictionary, the intermediate form between records.
pub type Dictionary = BTreeMap<String, Value>;

/// A value whose concrete type is only known at runtime.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    C64(Complex32),
    C128(Complex64),
    String(String),
    Bytes(Vec<u8>),
    Duration(TimeDelta),
    Time(DateTime<FixedOffset>),
    Decimal(Decimal),
    List(Vec<Value>),
    Dict(Dictionary),
    /// Map with arbitrary (non-string) keys, in insertion order.
    Map(Vec<(Value, Value)>),
    Record(Box<dyn Record>),
    Ptr(Pointer),
}

/// Variant tag of a [`Value`]; `Display` gives the type name used in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uint,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Bytes,
    Duration,
    Time,
    Decimal,
    List,
    Dict,
    Map,
    Record,
    Pointer,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Int => "int",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uint => "uint",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Duration => "duration",
            Kind::Time => "time",
            Kind::Decimal => "decimal",
            Kind::List => "list",
            Kind::Dict => "dict",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::I8(_) => Kind::Int8,
            Value::I16(_) => Kind::Int16,
            Value::I32(_) => Kind::Int32,
            Value::I64(_) => Kind::Int64,
            Value::Isize(_) => Kind::Int,
            Value::U8(_) => Kind::Uint8,
            Value::U16(_) => Kind::Uint16,
            Value::U32(_) => Kind::Uint32,
            Value::U64(_) => Kind::Uint64,
            Value::Usize(_) => Kind::Uint,
            Value::F32(_) => Kind::Float32,
            Value::F64(_) => Kind::Float64,
            Value::C64(_) => Kind::Complex64,
            Value::C128(_) => Kind::Complex128,
            Value::String(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
            Value::Duration(_) => Kind::Duration,
            Value::Time(_) => Kind::Time,
            Value::Decimal(_) => Kind::Decimal,
            Value::List(_) => Kind::List,
            Value::Dict(_) => Kind::Dict,
            Value::Map(_) => Kind::Map,
            Value::Record(_) => Kind::Record,
            Value::Ptr(_) => Kind::Pointer,
        }
    }

    /// Concrete type name: the record name for records, the kind otherwise.
    pub fn type_name(&self) -> String {
        match self {
            Value::Record(record) => record.record_name().to_string(),
            other => other.kind().to_string(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Wrap a value into a fresh shared pointer.
    pub fn ptr(value: Value) -> Value {
        Value::Ptr(Pointer::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&dyn Record> {
        match self {
            Value::Record(record) => Some(record.as_ref()),
            _ => None,
        }
    }

    /// Downcast a record value to its concrete type.
    pub fn downcast_record<T: Record>(&self) -> Option<&T> {
        self.as_record()?.as_any().downcast_ref::<T>()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared pointer
// ═══════════════════════════════════════════════════════════════

/// Shared, mutable reference to a value. The only way to build cycles.
#[derive(Clone)]
pub struct Pointer(Rc<RefCell<Value>>);

impl Pointer {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    /// Replace the pointee, returning the previous value.
    pub fn replace(&self, value: Value) -> Value {
        self.0.replace(value)
    }

    pub fn ptr_eq(&self, other: &Pointer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the pointee, stable while any clone is alive.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:#x})", self.addr())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Equality & display
// ═══════════════════════════════════════════════════════════════

impl PartialEq for Value {
    /// Structural equality. Pointers compare by identity first, then by pointee;
    /// two distinct cyclic graphs are not comparable this way.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::Isize(a), Value::Isize(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::Usize(a), Value::Usize(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::C64(a), Value::C64(b)) => a == b,
            (Value::C128(a), Value::C128(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b && a.offset() == b.offset(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => record::records_equal(a.as_ref(), b.as_ref()),
            (Value::Ptr(a), Value::Ptr(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("<nil>"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Isize(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::Usize(v) => write!(f, "{v}"),
            Value::F32(v) => f.write_str(&format_float32(*v)),
            Value::F64(v) => f.write_str(&format_float64(*v)),
            Value::C64(v) => f.write_str(&format_complex32(*v)),
            Value::C128(v) => f.write_str(&format_complex64(*v)),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            Value::Duration(v) => f.write_str(&format_duration(v)),
            Value::Time(v) => write!(f, "{}", v.format(TIME_FORMAT_ISO_STZ)),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Dict(entries) => {
                f.write_str("map[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
            Value::Map(pairs) => {
                f.write_str("map[")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
            Value::Record(record) => {
                write!(f, "{}{{", record.record_name())?;
                let mut first = true;
                for (index, def) in record.field_defs().iter().enumerate() {
                    let Some(value) = record.field_value(index) else { continue };
                    if !first {
                        f.write_str(" ")?;
                    }
                    first = false;
                    write!(f, "{}:{}", def.name, value)?;
                }
                f.write_str("}")
            }
            // Pointers print their address so cyclic graphs stay printable.
            Value::Ptr(p) => write!(f, "{:#x}", p.addr()),
        }
    }
}

// ---------------------------------------------------------------------------
// From impls: native types → Value
// ---------------------------------------------------------------------------

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    Complex32 => C64,
    Complex64 => C128,
    String => String,
    Vec<u8> => Bytes,
    TimeDelta => Duration,
    DateTime<FixedOffset> => Time,
    Decimal => Decimal,
    Vec<Value> => List,
    Dictionary => Dict,
    Pointer => Ptr,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Record> From<T> for Value {
    fn from(v: T) -> Self {
        Value::Record(Box::new(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::I64(1).kind().to_string(), "int64");
        assert_eq!(Value::Isize(1).type_name(), "int");
        assert_eq!(Value::C128(Complex64::new(1.0, 0.0)).type_name(), "complex128");
        assert_eq!(Value::Nil.type_name(), "nil");
    }

    #[test]
    fn test_pointer_identity() {
        let a = Pointer::new(Value::I32(1));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.addr(), b.addr());

        *b.borrow_mut() = Value::I32(2);
        assert_eq!(*a.borrow(), Value::I32(2));
    }

    #[test]
    fn test_equality_is_variant_strict() {
        assert_ne!(Value::I32(1), Value::I64(1));
        assert_eq!(Value::from("a"), Value::String("a".into()));
        assert_eq!(
            Value::List(vec![Value::I8(1), Value::Nil]),
            Value::List(vec![Value::I8(1), Value::Nil])
        );
        assert_eq!(Value::ptr(Value::U8(3)), Value::ptr(Value::U8(3)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::F64(1.5).to_string(), "1.5");
        assert_eq!(Value::F64(f64::INFINITY).to_string(), "+Inf");
        assert_eq!(Value::List(vec![Value::I8(1), Value::from("x")]).to_string(), "[1 x]");

        let mut dict = Dictionary::new();
        dict.insert("a".into(), Value::Bool(true));
        assert_eq!(Value::Dict(dict).to_string(), "map[a:true]");
    }

    #[test]
    fn test_cyclic_pointer_display_terminates() {
        let p = Pointer::new(Value::Nil);
        p.replace(Value::List(vec![Value::Ptr(p.clone())]));
        let rendered = Value::Ptr(p.clone()).to_string();
        assert!(rendered.starts_with("0x"));
        assert!(format!("{:?}", Value::Ptr(p.clone())).starts_with("Ptr(Pointer(0x"));
        // Break the cycle so the test does not leak.
        p.replace(Value::Nil);
    }
}
