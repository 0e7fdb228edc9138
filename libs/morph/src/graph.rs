use std::collections::HashMap;

use tracing::{debug, warn};

use crate::checks::unpack_base_element;
use crate::config::MapperConfig;
use crate::container::to_dictionary;
use crate::error::{ConvertError, Result};
use crate::mapper::set_field_value_by_type;
use crate::record::Record;
use crate::value::{Dictionary, Pointer, Value};

/// Depth past which deep copy stops and yields nil.
pub const DEEP_COPY_MAX_DEPTH: usize = 1000;

/// Deepest container nesting deep merge walks.
pub const MERGE_MAX_DEPTH: usize = 128;

// ═══════════════════════════════════════════════════════════════
//  Deep copy
// ═══════════════════════════════════════════════════════════════

/// Recursively copy a value graph.
///
/// Shared pointers are freshly allocated once per original pointer, so cycles
/// and aliasing are reproduced in the copy. Records copy their accessible
/// fields only, or delegate to their `DeepCopier`.
pub fn deep_copy(src: &Value) -> Value {
    let mut copier = Copier::default();
    copier.copy(src, 0)
}

#[derive(Default)]
struct Copier {
    /// Original pointer address → its copy.
    visited: HashMap<usize, Pointer>,
    truncated: bool,
}

impl Copier {
    fn copy(&mut self, src: &Value, depth: usize) -> Value {
        if depth > DEEP_COPY_MAX_DEPTH {
            if !self.truncated {
                warn!(limit = DEEP_COPY_MAX_DEPTH, "deep copy depth limit reached, truncating");
                self.truncated = true;
            }
            return Value::Nil;
        }

        match src {
            Value::Ptr(pointer) => {
                if let Some(copied) = self.visited.get(&pointer.addr()) {
                    return Value::Ptr(copied.clone());
                }
                let fresh = Pointer::new(Value::Nil);
                self.visited.insert(pointer.addr(), fresh.clone());
                let pointee = pointer.borrow().clone();
                fresh.replace(self.copy(&pointee, depth + 1));
                Value::Ptr(fresh)
            }
            Value::Record(record) => match record.as_deep_copier() {
                Some(copier) => copier.deep_copy(),
                None => self.copy_record(record.as_ref(), depth),
            },
            Value::List(items) => Value::List(items.iter().map(|item| self.copy(item, depth + 1)).collect()),
            Value::Dict(entries) => Value::Dict(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), self.copy(value, depth + 1)))
                    .collect(),
            ),
            Value::Map(pairs) => Value::Map(
                pairs
                    .iter()
                    .map(|(key, value)| (self.copy(key, depth + 1), self.copy(value, depth + 1)))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    fn copy_record(&mut self, record: &dyn Record, depth: usize) -> Value {
        let config = MapperConfig::default();
        let mut fresh = record.new_empty();
        for (index, def) in record.field_defs().iter().enumerate() {
            if !def.exported {
                continue;
            }
            let Some(value) = record.field_value(index) else {
                continue;
            };
            let copied = self.copy(&value, depth + 1);
            let Some(slot) = fresh.field_slot(index) else {
                continue;
            };
            if let Err(error) = set_field_value_by_type(&config, slot, &copied) {
                debug!(record = record.record_name(), field = def.name, error = %error, "field not copied");
            }
        }
        Value::Record(fresh)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Deep merge
// ═══════════════════════════════════════════════════════════════

/// Which side wins on conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    First,
    #[default]
    Second,
}

/// Deep merge flags. The default is second-wins without overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    pub priority: Priority,
    /// Replace colliding entries wholesale instead of merging them.
    pub overwrite: bool,
}

impl MergeOptions {
    pub const FLAG_OVERWRITE_OFF: i64 = 0;
    pub const FLAG_PRIORITY_FIRST: i64 = 1;
    pub const FLAG_PRIORITY_SECOND: i64 = 2;
    pub const FLAG_OVERWRITE_ON: i64 = 10;

    pub fn new(priority: Priority, overwrite: bool) -> Self {
        Self { priority, overwrite }
    }

    /// Decode the additive integer encoding, e.g. `FLAG_PRIORITY_FIRST + FLAG_OVERWRITE_ON`.
    /// An unrecognised priority keeps the default.
    pub fn from_flags(flags: i64) -> Self {
        let mut options = Self::default();
        let mut priority = flags;
        if priority >= Self::FLAG_OVERWRITE_ON {
            priority -= Self::FLAG_OVERWRITE_ON;
            options.overwrite = true;
        }
        match priority {
            Self::FLAG_OVERWRITE_OFF | Self::FLAG_PRIORITY_SECOND => {}
            Self::FLAG_PRIORITY_FIRST => options.priority = Priority::First,
            other => debug!(flag = other, "ignoring unknown merge priority"),
        }
        options
    }
}

/// Merge two values.
///
/// Pointers are resolved first. Maps and records merge key-wise: a key present
/// on both sides is merged recursively, or with `overwrite` taken from the
/// priority side. Lists concatenate with the priority side last; with
/// `overwrite` only the priority side is kept. Other or mismatched inputs
/// resolve to the priority side.
pub fn deep_merge(first: &Value, second: &Value, options: MergeOptions) -> Result<Value> {
    merge(first, second, options, 0)
}

fn is_map_like(value: &Value) -> bool {
    matches!(value, Value::Dict(_) | Value::Map(_) | Value::Record(_))
}

fn is_list_like(value: &Value) -> bool {
    matches!(value, Value::List(_) | Value::Bytes(_))
}

fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        Value::Bytes(bytes) => bytes.iter().map(|b| Value::U8(*b)).collect(),
        _ => Vec::new(),
    }
}

fn merge(first: &Value, second: &Value, options: MergeOptions, depth: usize) -> Result<Value> {
    if depth > MERGE_MAX_DEPTH {
        warn!(limit = MERGE_MAX_DEPTH, "deep merge nesting limit reached");
        return Err(ConvertError::ArgumentInvalid {
            caller: "deep_merge",
            reason: format!("nesting deeper than {MERGE_MAX_DEPTH} levels"),
        });
    }

    let first = &unpack_base_element(first, false);
    let second = &unpack_base_element(second, false);

    if is_map_like(first) && is_map_like(second) {
        return merge_maps(first, second, options, depth);
    }

    if is_list_like(first) && is_list_like(second) {
        let (front, back) = match options.priority {
            Priority::First => (second, first),
            Priority::Second => (first, second),
        };
        if options.overwrite {
            return Ok(Value::List(list_items(back)));
        }
        let mut items = list_items(front);
        items.extend(list_items(back));
        return Ok(Value::List(items));
    }

    Ok(match options.priority {
        Priority::First => first.clone(),
        Priority::Second => second.clone(),
    })
}

fn merge_maps(first: &Value, second: &Value, options: MergeOptions, depth: usize) -> Result<Value> {
    let mut merged: Dictionary = to_dictionary(first)?;
    for (key, value) in to_dictionary(second)? {
        match merged.get(&key) {
            Some(existing) if !options.overwrite => {
                let combined = merge(existing, &value, options, depth + 1)?;
                merged.insert(key, combined);
            }
            Some(_) if options.priority == Priority::First => {}
            _ => {
                merged.insert(key, value);
            }
        }
    }
    Ok(Value::Dict(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().map(|v| Value::I64(*v)).collect())
    }

    fn dict(entries: &[(&str, Value)]) -> Value {
        Value::Dict(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_list_concatenation() {
        let first = MergeOptions::new(Priority::First, false);
        assert_eq!(deep_merge(&ints(&[1, 2]), &ints(&[3, 4]), first).unwrap(), ints(&[3, 4, 1, 2]));

        let second = MergeOptions::default();
        assert_eq!(deep_merge(&ints(&[1, 2]), &ints(&[3, 4]), second).unwrap(), ints(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_list_overwrite_keeps_priority_side() {
        let first = MergeOptions::new(Priority::First, true);
        assert_eq!(deep_merge(&ints(&[1, 2]), &ints(&[3, 4]), first).unwrap(), ints(&[1, 2]));

        let second = MergeOptions::new(Priority::Second, true);
        assert_eq!(deep_merge(&ints(&[1, 2]), &ints(&[3, 4]), second).unwrap(), ints(&[3, 4]));
    }

    #[test]
    fn test_map_merge_recurses() {
        let a = dict(&[("x", dict(&[("k", Value::I8(1))])), ("only_a", Value::Bool(true))]);
        let b = dict(&[("x", dict(&[("j", Value::I8(2))])), ("only_b", Value::Bool(false))]);
        let merged = deep_merge(&a, &b, MergeOptions::default()).unwrap();
        assert_eq!(
            merged,
            dict(&[
                ("x", dict(&[("j", Value::I8(2)), ("k", Value::I8(1))])),
                ("only_a", Value::Bool(true)),
                ("only_b", Value::Bool(false)),
            ])
        );
    }

    #[test]
    fn test_map_overwrite() {
        let a = dict(&[("x", Value::I8(1))]);
        let b = dict(&[("x", Value::I8(2))]);
        let second = MergeOptions::new(Priority::Second, true);
        assert_eq!(deep_merge(&a, &b, second).unwrap(), dict(&[("x", Value::I8(2))]));
        let first = MergeOptions::new(Priority::First, true);
        assert_eq!(deep_merge(&a, &b, first).unwrap(), dict(&[("x", Value::I8(1))]));
    }

    #[test]
    fn test_mismatched_kinds_take_priority_side() {
        let first = MergeOptions::new(Priority::First, false);
        assert_eq!(deep_merge(&Value::I8(1), &ints(&[2]), first).unwrap(), Value::I8(1));
        assert_eq!(deep_merge(&Value::I8(1), &ints(&[2]), MergeOptions::default()).unwrap(), ints(&[2]));
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(MergeOptions::from_flags(0), MergeOptions::default());
        assert_eq!(MergeOptions::from_flags(1), MergeOptions::new(Priority::First, false));
        assert_eq!(MergeOptions::from_flags(11), MergeOptions::new(Priority::First, true));
        assert_eq!(MergeOptions::from_flags(12), MergeOptions::new(Priority::Second, true));
        assert_eq!(MergeOptions::from_flags(10), MergeOptions::new(Priority::Second, true));
        assert_eq!(MergeOptions::from_flags(7), MergeOptions::default());
    }

    #[test]
    fn test_merge_depth_guard() {
        let mut a = Value::I8(0);
        let mut b = Value::I8(1);
        for _ in 0..(MERGE_MAX_DEPTH + 2) {
            a = dict(&[("n", a)]);
            b = dict(&[("n", b)]);
        }
        let err = deep_merge(&a, &b, MergeOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
    }

    #[test]
    fn test_copy_scalars_and_containers() {
        let value = dict(&[("list", ints(&[1, 2])), ("s", Value::from("x"))]);
        assert_eq!(deep_copy(&value), value);
    }

    #[test]
    fn test_copy_allocates_fresh_pointers() {
        let original = Pointer::new(Value::I32(1));
        let copied = deep_copy(&Value::Ptr(original.clone()));
        let Value::Ptr(copied) = copied else { panic!("expected pointer") };
        assert!(!copied.ptr_eq(&original));
        *copied.borrow_mut() = Value::I32(2);
        assert_eq!(*original.borrow(), Value::I32(1));
    }

    #[test]
    fn test_copy_preserves_aliasing() {
        let shared = Pointer::new(Value::from("s"));
        let list = Value::List(vec![Value::Ptr(shared.clone()), Value::Ptr(shared)]);
        let Value::List(items) = deep_copy(&list) else { panic!("expected list") };
        match (&items[0], &items[1]) {
            (Value::Ptr(a), Value::Ptr(b)) => assert!(a.ptr_eq(b)),
            _ => panic!("expected pointers"),
        }
    }

    #[test]
    fn test_copy_self_cycle_terminates() {
        let node = Pointer::new(Value::Nil);
        node.replace(Value::List(vec![Value::Ptr(node.clone())]));

        let Value::Ptr(copy) = deep_copy(&Value::Ptr(node.clone())) else { panic!("expected pointer") };
        let inner = copy.borrow().clone();
        match inner {
            Value::List(items) => match &items[0] {
                Value::Ptr(back) => assert!(back.ptr_eq(&copy)),
                _ => panic!("expected back pointer"),
            },
            _ => panic!("expected list"),
        }

        node.replace(Value::Nil);
        copy.replace(Value::Nil);
    }
}
