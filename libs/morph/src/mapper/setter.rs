use tracing::{debug, warn};

use crate::capability::CapabilityError;
use crate::checks::{unpack_base_element, MAX_POINTER_CHAIN};
use crate::config::MapperConfig;
use crate::container::to_bytes;
use crate::convert::{
    to_bool, to_complex128, to_complex64, to_decimal, to_duration, to_float32, to_float64, to_int,
    to_int16, to_int32, to_int64, to_int8, to_string, to_time, to_uint, to_uint16, to_uint32,
    to_uint64, to_uint8,
};
use crate::error::{ConvertError, Result};
use crate::mapper::{fill_record, Arg};
use crate::record::{Record, Slot};
use crate::value::{Pointer, Value};

/// Assign `src` when its type is exactly the destination type.
pub(crate) fn assign_exact(dst: &mut Slot<'_>, src: &Value) -> bool {
    match (dst, src) {
        (Slot::Bool(d), Value::Bool(v)) => **d = *v,
        (Slot::I8(d), Value::I8(v)) => **d = *v,
        (Slot::I16(d), Value::I16(v)) => **d = *v,
        (Slot::I32(d), Value::I32(v)) => **d = *v,
        (Slot::I64(d), Value::I64(v)) => **d = *v,
        (Slot::Isize(d), Value::Isize(v)) => **d = *v,
        (Slot::U8(d), Value::U8(v)) => **d = *v,
        (Slot::U16(d), Value::U16(v)) => **d = *v,
        (Slot::U32(d), Value::U32(v)) => **d = *v,
        (Slot::U64(d), Value::U64(v)) => **d = *v,
        (Slot::Usize(d), Value::Usize(v)) => **d = *v,
        (Slot::F32(d), Value::F32(v)) => **d = *v,
        (Slot::F64(d), Value::F64(v)) => **d = *v,
        (Slot::C64(d), Value::C64(v)) => **d = *v,
        (Slot::C128(d), Value::C128(v)) => **d = *v,
        (Slot::String(d), Value::String(v)) => (**d).clone_from(v),
        (Slot::Bytes(d), Value::Bytes(v)) => (**d).clone_from(v),
        (Slot::Decimal(d), Value::Decimal(v)) => **d = *v,
        (Slot::Time(d), Value::Time(v)) => **d = *v,
        (Slot::Duration(d), Value::Duration(v)) => **d = *v,
        (Slot::Record(d), Value::Record(v)) => return d.assign_from(v.as_ref()),
        (Slot::List(d), _) => return d.replace_exact(src),
        (Slot::Map(d), _) => return d.merge_exact(src),
        _ => return false,
    }
    true
}

/// Convert `src` into the destination slot, dispatching on the slot kind.
///
/// Identical types are assigned directly. Pointers allocate their pointee on
/// first write and are reset by nil. Records try their scanner, then map a
/// record or dictionary source field by field. Maps merge the source entries
/// into their existing ones; lists are rebuilt element by element. Scalars go
/// through the matching coercion.
pub fn set_field_value_by_type(config: &MapperConfig, mut dst: Slot<'_>, src: &Value) -> Result<()> {
    if assign_exact(&mut dst, src) {
        return Ok(());
    }

    let resolved;
    let src = match src {
        Value::Ptr(_) if !matches!(dst, Slot::Dynamic(_)) => {
            resolved = unpack_base_element(src, false);
            &resolved
        }
        _ => src,
    };

    match dst {
        Slot::Pointer(pointer) => {
            if src.is_nil() {
                pointer.set_null();
                return Ok(());
            }
            return set_field_value_by_type(config, pointer.pointee(), src);
        }
        Slot::Dynamic(held) => return set_dynamic(config, held, src),
        Slot::Record(record) => return set_record(config, record, src),
        Slot::Map(map) => match src {
            Value::Nil => map.clear(),
            Value::Dict(entries) => {
                for (key, value) in entries {
                    map.insert_entry(config, &Value::String(key.clone()), value)?;
                }
            }
            Value::Map(pairs) => {
                for (key, value) in pairs {
                    map.insert_entry(config, key, value)?;
                }
            }
            _ => return Err(ConvertError::unsupported(src, "map")),
        },
        Slot::List(list) => match src {
            Value::Nil => list.assign_elements(config, &[])?,
            Value::List(items) => list.assign_elements(config, items)?,
            Value::Bytes(bytes) => {
                let items: Vec<Value> = bytes.iter().map(|b| Value::U8(*b)).collect();
                list.assign_elements(config, &items)?;
            }
            _ => return Err(ConvertError::unsupported(src, "list")),
        },
        Slot::Bool(d) => *d = to_bool(src)?,
        Slot::I8(d) => *d = to_int8(src)?,
        Slot::I16(d) => *d = to_int16(src)?,
        Slot::I32(d) => *d = to_int32(src)?,
        Slot::I64(d) => *d = to_int64(src)?,
        Slot::Isize(d) => *d = to_int(src)?,
        Slot::U8(d) => *d = to_uint8(src)?,
        Slot::U16(d) => *d = to_uint16(src)?,
        Slot::U32(d) => *d = to_uint32(src)?,
        Slot::U64(d) => *d = to_uint64(src)?,
        Slot::Usize(d) => *d = to_uint(src)?,
        Slot::F32(d) => *d = to_float32(src)?,
        Slot::F64(d) => *d = to_float64(src)?,
        Slot::C64(d) => *d = to_complex64(src)?,
        Slot::C128(d) => *d = to_complex128(src)?,
        Slot::String(d) => *d = to_string(src)?,
        Slot::Bytes(d) => *d = to_bytes(src)?,
        Slot::Decimal(d) => *d = to_decimal(src)?,
        Slot::Time(d) => *d = to_time(src)?,
        Slot::Duration(d) => *d = to_duration(src)?,
    }
    Ok(())
}

/// Slot of the value currently held by a dynamic destination.
fn held_slot(held: &mut Value) -> Option<Slot<'_>> {
    let slot = match held {
        Value::Bool(v) => Slot::Bool(v),
        Value::I8(v) => Slot::I8(v),
        Value::I16(v) => Slot::I16(v),
        Value::I32(v) => Slot::I32(v),
        Value::I64(v) => Slot::I64(v),
        Value::Isize(v) => Slot::Isize(v),
        Value::U8(v) => Slot::U8(v),
        Value::U16(v) => Slot::U16(v),
        Value::U32(v) => Slot::U32(v),
        Value::U64(v) => Slot::U64(v),
        Value::Usize(v) => Slot::Usize(v),
        Value::F32(v) => Slot::F32(v),
        Value::F64(v) => Slot::F64(v),
        Value::C64(v) => Slot::C64(v),
        Value::C128(v) => Slot::C128(v),
        Value::String(v) => Slot::String(v),
        Value::Bytes(v) => Slot::Bytes(v),
        Value::Duration(v) => Slot::Duration(v),
        Value::Time(v) => Slot::Time(v),
        Value::Decimal(v) => Slot::Decimal(v),
        Value::Record(record) => Slot::Record(record.as_mut()),
        Value::List(items) => Slot::List(items),
        Value::Dict(entries) => Slot::Map(entries),
        Value::Nil | Value::Map(_) | Value::Ptr(_) => return None,
    };
    Some(slot)
}

/// An empty dynamic destination takes the raw value; a non-empty one converts
/// into the kind it already holds.
fn set_dynamic(config: &MapperConfig, held: &mut Value, src: &Value) -> Result<()> {
    match held {
        Value::Nil => {
            *held = src.clone();
            return Ok(());
        }
        _ if src.is_nil() => {
            *held = Value::Nil;
            return Ok(());
        }
        Value::Ptr(pointer) => {
            if matches!(src, Value::Ptr(_)) {
                *held = src.clone();
                return Ok(());
            }
            let (target, mut pointee) = resolve_chain(pointer)?;
            set_dynamic(config, &mut pointee, src)?;
            target.replace(pointee);
            return Ok(());
        }
        _ => {}
    }

    match held_slot(held) {
        Some(slot) => set_field_value_by_type(config, slot, src),
        None => {
            *held = src.clone();
            Ok(())
        }
    }
}

/// Last pointer of a pointer chain and a copy of its pointee.
///
/// The pointee is copied out so no borrow is held while it is written.
fn resolve_chain(start: &Pointer) -> Result<(Pointer, Value)> {
    let mut target = start.clone();
    for _ in 0..MAX_POINTER_CHAIN {
        let pointee = target.borrow().clone();
        match pointee {
            Value::Ptr(next) => target = next,
            pointee => return Ok((target, pointee)),
        }
    }
    warn!(limit = MAX_POINTER_CHAIN, "pointer chain too long");
    Err(ConvertError::ArgumentInvalid {
        caller: "set_field_value_by_type",
        reason: format!("pointer chain longer than {MAX_POINTER_CHAIN} links"),
    })
}

/// Value-producing capabilities of a source record, in trial order.
#[derive(Debug, Clone, Copy)]
enum Producer {
    Valuer,
    FallibleValuer,
    DriverValuer,
}

impl Producer {
    const TRIAL_ORDER: [Producer; 3] = [Producer::Valuer, Producer::FallibleValuer, Producer::DriverValuer];

    fn as_str(self) -> &'static str {
        match self {
            Producer::Valuer => "valuer",
            Producer::FallibleValuer => "fallible_valuer",
            Producer::DriverValuer => "driver_valuer",
        }
    }

    /// Run the producer; `None` when `source` does not offer it.
    fn produce(self, source: &dyn Record) -> Option<Result<Value, CapabilityError>> {
        match self {
            Producer::Valuer => source.as_valuer().map(|valuer| Ok(valuer.value())),
            Producer::FallibleValuer => source.as_fallible_valuer().map(|valuer| valuer.try_value()),
            Producer::DriverValuer => source
                .as_driver_valuer()
                .map(|valuer| valuer.driver_value().map(Value::from)),
        }
    }
}

fn set_record(config: &MapperConfig, record: &mut dyn Record, src: &Value) -> Result<()> {
    let record_name = record.record_name();

    if src.is_nil() {
        let empty = record.new_empty();
        record.assign_from(empty.as_ref());
        return Ok(());
    }

    let mut last_failure: Option<String> = None;
    if let Some(scanner) = record.as_scanner() {
        if let Value::Record(source) = src {
            for producer in Producer::TRIAL_ORDER {
                let Some(produced) = producer.produce(source.as_ref()) else {
                    continue;
                };
                let capability = producer.as_str();
                match produced.and_then(|value| scanner.scan(&value)) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        debug!(record = record_name, capability, error = %e, "scanner rejected produced value");
                        last_failure = Some(e.to_string());
                    }
                }
            }
        }
        match scanner.scan(src) {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!(record = record_name, error = %e, "scanner rejected raw value");
                last_failure = Some(e.to_string());
            }
        }
    }

    match src {
        Value::Record(_) | Value::Dict(_) | Value::Map(_) => {
            let mut fresh = record.new_empty();
            fill_record(fresh.as_mut(), &[Arg::Config(config.clone()), Arg::Value(src.clone())])?;
            if record.assign_from(fresh.as_ref()) {
                Ok(())
            } else {
                Err(ConvertError::DstStructureInvalid {
                    caller: "set_field_value_by_type",
                    expected: "a record of the same type",
                })
            }
        }
        _ => Err(match last_failure {
            Some(reason) => ConvertError::ScanFailed { record: record_name.to_string(), reason },
            None => ConvertError::unsupported(src, record_name),
        }),
    }
}

/// Set the accessible field `name` of `record`.
pub fn set_field_by_name(
    record: &mut dyn Record,
    name: &str,
    value: &Value,
    config: &MapperConfig,
) -> Result<()> {
    let record_name = record.record_name();
    let index = record
        .field_defs()
        .iter()
        .position(|def| def.exported && def.name == name);
    match index.and_then(|index| record.field_slot(index)) {
        Some(slot) => set_field_value_by_type(config, slot, value),
        None => Err(ConvertError::InvalidField {
            record: record_name.to_string(),
            field: name.to_string(),
        }),
    }
}
