use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, FixedOffset, TimeDelta};
use num_complex::{Complex32, Complex64};
use rust_decimal::Decimal;

use crate::capability::{DeepCopier, DriverValuer, FallibleValuer, Scanner, Textual, ToText, Valuer};
use crate::config::MapperConfig;
use crate::error::Result;
use crate::mapper::set_field_value_by_type;
use crate::value::{Dictionary, Value};

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Accessible to the engine (`pub` in the struct).
    pub exported: bool,
    /// `(namespace, raw tag)` pairs, e.g. `("json", "id,omitempty")`.
    pub tags: &'static [(&'static str, &'static str)],
}

impl FieldDef {
    /// Raw tag declared for `namespace`, if any.
    pub fn tag(&self, namespace: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(ns, _)| *ns == namespace)
            .map(|(_, raw)| *raw)
    }
}

/// Fixed-schema aggregate with named, optionally tagged fields.
///
/// Implemented by `#[derive(Record)]`; hand-written impls must keep
/// `field_defs`, `field_value` and `field_slot` index-aligned.
pub trait Record: Any + fmt::Debug {
    fn record_name(&self) -> &'static str;

    fn field_defs(&self) -> &'static [FieldDef];

    /// Current value of the field at `index`; `None` for inaccessible fields.
    fn field_value(&self, index: usize) -> Option<Value>;

    /// Settable slot of the field at `index`; `None` for inaccessible fields.
    fn field_slot(&mut self, index: usize) -> Option<Slot<'_>>;

    fn boxed_clone(&self) -> Box<dyn Record>;

    /// A default-initialised instance of the same type.
    fn new_empty(&self) -> Box<dyn Record>;

    /// Overwrite `self` with `src` if both have the same concrete type.
    fn assign_from(&mut self, src: &dyn Record) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_scanner(&mut self) -> Option<&mut dyn Scanner> {
        None
    }

    fn as_valuer(&self) -> Option<&dyn Valuer> {
        None
    }

    fn as_fallible_valuer(&self) -> Option<&dyn FallibleValuer> {
        None
    }

    fn as_driver_valuer(&self) -> Option<&dyn DriverValuer> {
        None
    }

    fn as_textual(&self) -> Option<&dyn Textual> {
        None
    }

    fn as_to_text(&self) -> Option<&dyn ToText> {
        None
    }

    fn as_deep_copier(&self) -> Option<&dyn DeepCopier> {
        None
    }
}

impl Clone for Box<dyn Record> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Same concrete type and equal accessible fields.
pub(crate) fn records_equal(a: &dyn Record, b: &dyn Record) -> bool {
    if a.as_any().type_id() != b.as_any().type_id() {
        return false;
    }
    (0..a.field_defs().len()).all(|index| a.field_value(index) == b.field_value(index))
}

// ═══════════════════════════════════════════════════════════════
//  Reflect & slots
// ═══════════════════════════════════════════════════════════════

/// Bridge between a native Rust type and the dynamic value model.
pub trait Reflect {
    fn to_value(&self) -> Value;

    fn slot(&mut self) -> Slot<'_>;

    #[doc(hidden)]
    fn vec_to_value(items: &[Self]) -> Value
    where
        Self: Sized,
    {
        Value::List(items.iter().map(Reflect::to_value).collect())
    }

    #[doc(hidden)]
    fn vec_slot(items: &mut Vec<Self>) -> Slot<'_>
    where
        Self: Sized + Default + 'static,
    {
        Slot::List(items)
    }
}

/// Settable destination, tagged by kind.
pub enum Slot<'a> {
    Bool(&'a mut bool),
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    Usize(&'a mut usize),
    F32(&'a mut f32),
    F64(&'a mut f64),
    C64(&'a mut Complex32),
    C128(&'a mut Complex64),
    String(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    Decimal(&'a mut Decimal),
    Time(&'a mut DateTime<FixedOffset>),
    Duration(&'a mut TimeDelta),
    /// Nullable indirection, allocated on first write.
    Pointer(&'a mut dyn PointerSlot),
    /// Unconstrained destination accepting any value.
    Dynamic(&'a mut Value),
    Record(&'a mut dyn Record),
    /// Entries are merged into the existing map; nil clears it.
    Map(&'a mut dyn MapSlot),
    /// Contents are replaced element by element.
    List(&'a mut dyn ListSlot),
}

impl Slot<'_> {
    /// Destination type name used in error payloads.
    pub fn type_name(&self) -> String {
        let name = match self {
            Slot::Bool(_) => "bool",
            Slot::I8(_) => "int8",
            Slot::I16(_) => "int16",
            Slot::I32(_) => "int32",
            Slot::I64(_) => "int64",
            Slot::Isize(_) => "int",
            Slot::U8(_) => "uint8",
            Slot::U16(_) => "uint16",
            Slot::U32(_) => "uint32",
            Slot::U64(_) => "uint64",
            Slot::Usize(_) => "uint",
            Slot::F32(_) => "float32",
            Slot::F64(_) => "float64",
            Slot::C64(_) => "complex64",
            Slot::C128(_) => "complex128",
            Slot::String(_) => "string",
            Slot::Bytes(_) => "bytes",
            Slot::Decimal(_) => "decimal",
            Slot::Time(_) => "time",
            Slot::Duration(_) => "duration",
            Slot::Pointer(_) => "pointer",
            Slot::Dynamic(_) => "dynamic",
            Slot::Record(record) => return record.record_name().to_string(),
            Slot::Map(_) => "map",
            Slot::List(_) => "list",
        };
        name.to_string()
    }
}

pub trait PointerSlot {
    fn is_null(&self) -> bool;

    fn set_null(&mut self);

    /// Slot of the pointee, allocating a default one when null.
    fn pointee(&mut self) -> Slot<'_>;
}

pub trait ListSlot {
    /// Replace the contents element by element.
    fn assign_elements(&mut self, config: &MapperConfig, items: &[Value]) -> Result<()>;

    /// Take `src` verbatim when the list already holds dynamic values.
    fn replace_exact(&mut self, _src: &Value) -> bool {
        false
    }
}

pub trait MapSlot {
    fn clear(&mut self);

    fn insert_entry(&mut self, config: &MapperConfig, key: &Value, value: &Value) -> Result<()>;

    /// Merge `src` verbatim when the map is a [`Dictionary`].
    fn merge_exact(&mut self, _src: &Value) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

macro_rules! scalar_reflect {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn slot(&mut self) -> Slot<'_> {
                    Slot::$variant(self)
                }
            }
        )*
    };
}

scalar_reflect!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    Complex32 => C64,
    Complex64 => C128,
    String => String,
    Decimal => Decimal,
    DateTime<FixedOffset> => Time,
    TimeDelta => Duration,
);

// `Vec<u8>` is a byte sequence, not a list of numbers.
impl Reflect for u8 {
    fn to_value(&self) -> Value {
        Value::U8(*self)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::U8(self)
    }

    fn vec_to_value(items: &[Self]) -> Value {
        Value::Bytes(items.to_vec())
    }

    fn vec_slot(items: &mut Vec<Self>) -> Slot<'_> {
        Slot::Bytes(items)
    }
}

impl Reflect for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Dynamic(self)
    }
}

impl Reflect for Box<dyn Record> {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Record(self.as_mut())
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn slot(&mut self) -> Slot<'_> {
        (**self).slot()
    }
}

// ---------------------------------------------------------------------------
// Nullable pointer
// ---------------------------------------------------------------------------

impl<T: Reflect + Default + 'static> Reflect for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Nil,
        }
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Pointer(self)
    }
}

impl<T: Reflect + Default + 'static> PointerSlot for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn set_null(&mut self) {
        *self = None;
    }

    fn pointee(&mut self) -> Slot<'_> {
        self.get_or_insert_with(T::default).slot()
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

impl<T: Reflect + Default + 'static> Reflect for Vec<T> {
    fn to_value(&self) -> Value {
        T::vec_to_value(self)
    }

    fn slot(&mut self) -> Slot<'_> {
        T::vec_slot(self)
    }
}

impl<T: Reflect + Default + 'static> ListSlot for Vec<T> {
    fn assign_elements(&mut self, config: &MapperConfig, items: &[Value]) -> Result<()> {
        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            let mut element = T::default();
            set_field_value_by_type(config, element.slot(), item)?;
            fresh.push(element);
        }
        *self = fresh;
        Ok(())
    }

    fn replace_exact(&mut self, src: &Value) -> bool {
        match ((self as &mut dyn Any).downcast_mut::<Vec<Value>>(), src) {
            (Some(dst), Value::List(items)) => {
                dst.clone_from(items);
                true
            }
            _ => false,
        }
    }
}

impl<T: Reflect + Default + 'static, const N: usize> Reflect for [T; N] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Reflect::to_value).collect())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::List(self)
    }
}

impl<T: Reflect + Default + 'static, const N: usize> ListSlot for [T; N] {
    /// Fills at most `N` leading elements; the rest keep their value.
    fn assign_elements(&mut self, config: &MapperConfig, items: &[Value]) -> Result<()> {
        for (element, item) in self.iter_mut().zip(items) {
            let mut fresh = T::default();
            set_field_value_by_type(config, fresh.slot(), item)?;
            *element = fresh;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// String keys collapse into a dictionary; anything else stays a pair list.
fn map_to_value<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: Reflect + 'a,
    V: Reflect + 'a,
{
    let pairs: Vec<(Value, Value)> = entries.map(|(k, v)| (k.to_value(), v.to_value())).collect();
    if pairs.iter().all(|(k, _)| matches!(k, Value::String(_))) {
        let dict = pairs
            .into_iter()
            .filter_map(|(k, v)| match k {
                Value::String(k) => Some((k, v)),
                _ => None,
            })
            .collect();
        Value::Dict(dict)
    } else {
        Value::Map(pairs)
    }
}

fn build_entry<K, V>(config: &MapperConfig, key: &Value, value: &Value) -> Result<(K, V)>
where
    K: Reflect + Default,
    V: Reflect + Default,
{
    let mut k = K::default();
    set_field_value_by_type(config, k.slot(), key)?;
    let mut v = V::default();
    set_field_value_by_type(config, v.slot(), value)?;
    Ok((k, v))
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Default + Ord + 'static,
    V: Reflect + Default + 'static,
{
    fn to_value(&self) -> Value {
        map_to_value(self.iter())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Map(self)
    }
}

impl<K, V> MapSlot for BTreeMap<K, V>
where
    K: Reflect + Default + Ord + 'static,
    V: Reflect + Default + 'static,
{
    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    fn insert_entry(&mut self, config: &MapperConfig, key: &Value, value: &Value) -> Result<()> {
        let (k, v) = build_entry::<K, V>(config, key, value)?;
        self.insert(k, v);
        Ok(())
    }

    fn merge_exact(&mut self, src: &Value) -> bool {
        match ((self as &mut dyn Any).downcast_mut::<Dictionary>(), src) {
            (Some(dst), Value::Dict(entries)) => {
                dst.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
                true
            }
            _ => false,
        }
    }
}

impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Default + Eq + Hash + 'static,
    V: Reflect + Default + 'static,
{
    fn to_value(&self) -> Value {
        map_to_value(self.iter())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Map(self)
    }
}

impl<K, V> MapSlot for HashMap<K, V>
where
    K: Reflect + Default + Eq + Hash + 'static,
    V: Reflect + Default + 'static,
{
    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn insert_entry(&mut self, config: &MapperConfig, key: &Value, value: &Value) -> Result<()> {
        let (k, v) = build_entry::<K, V>(config, key, value)?;
        self.insert(k, v);
        Ok(())
    }
}
