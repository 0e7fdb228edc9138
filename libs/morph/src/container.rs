use crate::checks::unpack_base_element;
use crate::convert::{to_int, to_string, to_uint8};
use crate::error::{ConvertError, Result};
use crate::mapper::{to_map, Arg};
use crate::value::{Dictionary, Value};

/// Generic list. Scalars become a one-element list.
pub fn to_slice_any(src: &Value) -> Result<Vec<Value>> {
    match unpack_base_element(src, false) {
        Value::Nil => Ok(Vec::new()),
        Value::List(items) => Ok(items),
        Value::Bytes(bytes) => Ok(bytes.into_iter().map(Value::U8).collect()),
        other @ (Value::Dict(_) | Value::Map(_) | Value::Record(_)) => {
            Err(ConvertError::unsupported(&other, "list"))
        }
        other => Ok(vec![other]),
    }
}

/// Byte sequence. Lists convert element-wise; numbers use their text form.
pub fn to_bytes(src: &Value) -> Result<Vec<u8>> {
    let src = &unpack_base_element(src, false);
    match src {
        Value::Nil => Ok(Vec::new()),
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::List(items) => items.iter().map(to_uint8).collect(),
        Value::Bool(_)
        | Value::I8(_)
        | Value::I16(_)
        | Value::I32(_)
        | Value::I64(_)
        | Value::Isize(_)
        | Value::U8(_)
        | Value::U16(_)
        | Value::U32(_)
        | Value::U64(_)
        | Value::Usize(_)
        | Value::F32(_)
        | Value::F64(_)
        | Value::C64(_)
        | Value::C128(_)
        | Value::Decimal(_)
        | Value::Duration(_)
        | Value::Time(_) => Ok(to_string(src)?.into_bytes()),
        _ => Err(ConvertError::unsupported(src, "bytes")),
    }
}

pub fn to_string_slice(src: &Value) -> Result<Vec<String>> {
    match unpack_base_element(src, false) {
        Value::Nil => Ok(Vec::new()),
        Value::List(items) => items.iter().map(to_string).collect(),
        Value::Bytes(bytes) => Ok(bytes.iter().map(u8::to_string).collect()),
        other @ (Value::Dict(_) | Value::Map(_) | Value::Record(_)) => {
            Err(ConvertError::unsupported(&other, "string list"))
        }
        other => Ok(vec![to_string(&other)?]),
    }
}

pub fn to_int_slice(src: &Value) -> Result<Vec<isize>> {
    match unpack_base_element(src, false) {
        Value::Nil => Ok(Vec::new()),
        Value::List(items) => items.iter().map(to_int).collect(),
        Value::Bytes(bytes) => Ok(bytes.iter().map(|b| isize::from(*b)).collect()),
        other @ (Value::Dict(_) | Value::Map(_) | Value::Record(_)) => {
            Err(ConvertError::unsupported(&other, "int list"))
        }
        other => Ok(vec![to_int(&other)?]),
    }
}

/// Generic dictionary. Keys are re-keyed through string coercion; records are
/// mapped with the default mapper configuration.
pub fn to_dictionary(src: &Value) -> Result<Dictionary> {
    match unpack_base_element(src, false) {
        Value::Nil => Ok(Dictionary::new()),
        Value::Dict(entries) => Ok(entries),
        Value::Map(pairs) => {
            let mut dict = Dictionary::new();
            for (key, value) in pairs {
                dict.insert(to_string(&key)?, value);
            }
            Ok(dict)
        }
        Value::Record(record) => {
            let mut dict = Dictionary::new();
            to_map(&mut dict, &[Arg::Record(record.as_ref())])?;
            Ok(dict)
        }
        other => Err(ConvertError::unsupported(&other, "dictionary")),
    }
}

/// List of dictionaries. Elements that are not dictionary-shaped are skipped.
pub fn to_dictionary_slice(src: &Value) -> Result<Vec<Dictionary>> {
    match unpack_base_element(src, false) {
        Value::Nil => Ok(Vec::new()),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                let item = unpack_base_element(item, false);
                if matches!(item, Value::Dict(_) | Value::Map(_) | Value::Record(_)) {
                    out.push(to_dictionary(&item)?);
                } else {
                    tracing::debug!(element_type = %item.type_name(), "skipping non-dictionary element");
                }
            }
            Ok(out)
        }
        other @ (Value::Dict(_) | Value::Map(_) | Value::Record(_)) => Ok(vec![to_dictionary(&other)?]),
        other => Err(ConvertError::unsupported(&other, "dictionary list")),
    }
}
