use crate::Value;

/// Longest pointer chain followed before giving up on a (cyclic) chain.
pub(crate) const MAX_POINTER_CHAIN: usize = 1000;

pub fn is_bool(value: &Value) -> bool {
    matches!(value, Value::Bool(_))
}

/// Integer or real float. Complex numbers are not counted.
pub fn is_number(value: &Value) -> bool {
    matches!(
        value,
        Value::I8(_)
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
    )
}

/// Nil, or a pointer whose pointee is nil.
pub fn is_nil(value: &Value) -> bool {
    match value {
        Value::Nil => true,
        Value::Ptr(p) => p.borrow().is_nil(),
        _ => false,
    }
}

/// Whether `value` equals the zero value of its kind.
///
/// A non-nil pointer is never zero; a record is zero when all its
/// accessible fields are.
pub fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Nil => true,
        Value::Bool(v) => !v,
        Value::I8(v) => *v == 0,
        Value::I16(v) => *v == 0,
        Value::I32(v) => *v == 0,
        Value::I64(v) => *v == 0,
        Value::Isize(v) => *v == 0,
        Value::U8(v) => *v == 0,
        Value::U16(v) => *v == 0,
        Value::U32(v) => *v == 0,
        Value::U64(v) => *v == 0,
        Value::Usize(v) => *v == 0,
        Value::F32(v) => *v == 0.0,
        Value::F64(v) => *v == 0.0,
        Value::C64(v) => v.re == 0.0 && v.im == 0.0,
        Value::C128(v) => v.re == 0.0 && v.im == 0.0,
        Value::String(v) => v.is_empty(),
        Value::Bytes(v) => v.is_empty(),
        Value::Duration(v) => v.is_zero(),
        Value::Time(v) => v.timestamp() == 0 && v.timestamp_subsec_nanos() == 0,
        Value::Decimal(v) => v.is_zero(),
        Value::List(items) => items.is_empty(),
        Value::Dict(entries) => entries.is_empty(),
        Value::Map(pairs) => pairs.is_empty(),
        Value::Record(record) => (0..record.field_defs().len())
            .filter_map(|index| record.field_value(index))
            .all(|field| is_zero_value(&field)),
        Value::Ptr(_) => false,
    }
}

/// Resolve `value` to its base element.
///
/// With `keep_pointers` the value is returned as-is; otherwise shared pointers
/// are followed to their pointee. A chain that never ends resolves to nil.
pub fn unpack_base_element(value: &Value, keep_pointers: bool) -> Value {
    if keep_pointers {
        return value.clone();
    }
    let mut current = value.clone();
    for _ in 0..MAX_POINTER_CHAIN {
        match current {
            Value::Ptr(p) => {
                let inner = p.borrow().clone();
                current = inner;
            }
            other => return other,
        }
    }
    tracing::warn!(limit = MAX_POINTER_CHAIN, "pointer chain too long, resolving to nil");
    Value::Nil
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Pointer;

    #[test]
    fn test_is_number() {
        assert!(is_number(&Value::U16(3)));
        assert!(is_number(&Value::F32(0.5)));
        assert!(!is_number(&Value::from("3")));
        assert!(!is_number(&Value::Bool(true)));
        assert!(is_bool(&Value::Bool(false)));
    }

    #[test]
    fn test_is_zero_value() {
        assert!(is_zero_value(&Value::I64(0)));
        assert!(is_zero_value(&Value::from("")));
        assert!(is_zero_value(&Value::List(vec![])));
        assert!(!is_zero_value(&Value::F64(0.1)));
        assert!(!is_zero_value(&Value::ptr(Value::Nil)));
    }

    #[test]
    fn test_is_nil() {
        assert!(is_nil(&Value::Nil));
        assert!(is_nil(&Value::ptr(Value::Nil)));
        assert!(!is_nil(&Value::ptr(Value::I8(0))));
    }

    #[test]
    fn test_unpack_follows_pointers() {
        let inner = Value::ptr(Value::ptr(Value::I32(4)));
        assert_eq!(unpack_base_element(&inner, false), Value::I32(4));
        assert!(matches!(unpack_base_element(&inner, true), Value::Ptr(_)));
    }

    #[test]
    fn test_unpack_pointer_cycle_terminates() {
        let a = Pointer::new(Value::Nil);
        let b = Pointer::new(Value::Ptr(a.clone()));
        a.replace(Value::Ptr(b.clone()));
        assert_eq!(unpack_base_element(&Value::Ptr(a.clone()), false), Value::Nil);
        a.replace(Value::Nil);
    }
}
