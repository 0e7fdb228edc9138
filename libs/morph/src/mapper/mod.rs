//! Reflective object mapper: records ⇄ dictionaries.

mod setter;

pub use setter::{set_field_by_name, set_field_value_by_type};

use tracing::{debug, warn};

use crate::capability::CapabilityError;
use crate::checks::{is_zero_value, unpack_base_element};
use crate::config::{MapperConfig, ResolutionMode};
use crate::convert::to_string;
use crate::error::{ConvertError, Result};
use crate::record::{FieldDef, Record, Reflect, Slot};
use crate::tag;
use crate::value::{Dictionary, Value};

/// Deepest record/dictionary nesting the mapper walks.
pub const MAX_NESTING: usize = 128;

/// Positional mapper argument, sniffed by variant.
#[derive(Debug, Clone)]
pub enum Arg<'a> {
    Config(MapperConfig),
    Record(&'a dyn Record),
    Value(Value),
}

impl From<MapperConfig> for Arg<'_> {
    fn from(config: MapperConfig) -> Self {
        Arg::Config(config)
    }
}

impl<'a> From<&'a dyn Record> for Arg<'a> {
    fn from(record: &'a dyn Record) -> Self {
        Arg::Record(record)
    }
}

impl From<Value> for Arg<'_> {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

/// The last configuration argument, or the default.
fn config_from(args: &[Arg<'_>]) -> MapperConfig {
    args.iter()
        .rev()
        .find_map(|arg| match arg {
            Arg::Config(config) => Some(config.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════
//  to_map
// ═══════════════════════════════════════════════════════════════

/// Merge every record or dictionary source into `dest`.
///
/// Within one call the first source to publish a key wins; the collected keys
/// then overwrite `dest`. Sources of any other shape are ignored. On error the
/// keys collected so far are still merged.
pub fn to_map(dest: &mut Dictionary, args: &[Arg<'_>]) -> Result<()> {
    let config = config_from(args);
    let mut walker = Walker { config: &config, depth: 0 };
    let mut collected = Dictionary::new();

    for arg in args {
        let outcome = match arg {
            Arg::Config(_) => Ok(()),
            Arg::Record(record) => walker.collect_record(&mut collected, *record),
            Arg::Value(value) => walker.collect_value(&mut collected, value),
        };
        if let Err(e) = outcome {
            dest.extend(collected);
            return Err(e);
        }
    }

    dest.extend(collected);
    Ok(())
}

struct Walker<'c> {
    config: &'c MapperConfig,
    depth: usize,
}

fn is_nested(value: &Value) -> bool {
    matches!(
        value,
        Value::List(_) | Value::Dict(_) | Value::Map(_) | Value::Record(_) | Value::Ptr(_)
    )
}

impl Walker<'_> {
    fn collect_value(&mut self, out: &mut Dictionary, value: &Value) -> Result<()> {
        match unpack_base_element(value, false) {
            Value::Record(record) => self.collect_record(out, record.as_ref()),
            Value::Dict(entries) => {
                for (key, value) in entries {
                    if !out.contains_key(&key) {
                        let parsed = self.parse_element(&value)?;
                        out.insert(key, parsed);
                    }
                }
                Ok(())
            }
            Value::Map(pairs) => {
                for (key, value) in pairs {
                    let key = to_string(&key)?;
                    if !out.contains_key(&key) {
                        let parsed = self.parse_element(&value)?;
                        out.insert(key, parsed);
                    }
                }
                Ok(())
            }
            other => {
                debug!(source_type = %other.type_name(), "ignoring source that is neither record nor dictionary");
                Ok(())
            }
        }
    }

    fn collect_record(&mut self, out: &mut Dictionary, record: &dyn Record) -> Result<()> {
        for (index, def) in record.field_defs().iter().enumerate() {
            if !def.exported {
                continue;
            }
            let Some(raw) = record.field_value(index) else {
                continue;
            };
            let value = unpack_base_element(&raw, self.config.keep_pointers);

            let specs = self.config.tag_specs(def);
            let omit_empty = self.config.omit_empty || specs.iter().any(|spec| spec.omit_empty);
            let omit_nested = specs.iter().any(|spec| spec.omit_nested);

            if omit_empty && is_zero_value(&value) {
                debug!(record = record.record_name(), field = def.name, "omitting empty field");
                continue;
            }

            for spec in &specs {
                if !out.contains_key(spec.key) {
                    let entry = self.field_entry(&value, omit_nested)?;
                    out.insert(spec.key.to_string(), entry);
                }
            }

            let emit_name = match self.config.mode {
                ResolutionMode::NamesOnly | ResolutionMode::NamesAndTags => true,
                ResolutionMode::NamesIfNoTag => specs.is_empty(),
                ResolutionMode::TagsOnly => false,
            };
            if emit_name && !out.contains_key(def.name) {
                let entry = self.field_entry(&value, omit_nested)?;
                out.insert(def.name.to_string(), entry);
            }
        }
        Ok(())
    }

    fn field_entry(&mut self, value: &Value, omit_nested: bool) -> Result<Value> {
        if !omit_nested && is_nested(value) {
            self.parse_element(value)
        } else {
            Ok(value.clone())
        }
    }

    fn parse_element(&mut self, element: &Value) -> Result<Value> {
        if self.depth >= MAX_NESTING {
            warn!(limit = MAX_NESTING, "mapper nesting limit reached");
            return Err(ConvertError::ArgumentInvalid {
                caller: "to_map",
                reason: format!("nesting deeper than {MAX_NESTING} levels"),
            });
        }
        self.depth += 1;
        let parsed = self.parse_element_inner(element);
        self.depth -= 1;
        parsed
    }

    fn parse_element_inner(&mut self, element: &Value) -> Result<Value> {
        match unpack_base_element(element, self.config.keep_pointers) {
            Value::Record(record) => {
                if self.config.evaluate_methods {
                    if let Some(produced) = evaluate(record.as_ref())? {
                        return Ok(produced);
                    }
                }
                let mut nested = Dictionary::new();
                self.collect_record(&mut nested, record.as_ref())?;
                if nested.is_empty() {
                    Ok(Value::Record(record))
                } else {
                    Ok(Value::Dict(nested))
                }
            }
            dict @ (Value::Dict(_) | Value::Map(_)) => {
                let mut nested = Dictionary::new();
                self.collect_value(&mut nested, &dict)?;
                Ok(Value::Dict(nested))
            }
            Value::List(items) => {
                if !items.iter().any(is_nested) {
                    return Ok(Value::List(items));
                }
                let mut parsed = Vec::with_capacity(items.len());
                for item in &items {
                    parsed.push(if is_nested(item) { self.parse_element(item)? } else { item.clone() });
                }
                Ok(Value::List(parsed))
            }
            other => Ok(other),
        }
    }
}

/// The value produced by the first producer capability the record offers.
fn evaluate(record: &dyn Record) -> Result<Option<Value>> {
    let failed = |e: CapabilityError| ConvertError::Evaluate {
        element_type: record.record_name().to_string(),
        reason: e.to_string(),
    };
    if let Some(valuer) = record.as_valuer() {
        return Ok(Some(valuer.value()));
    }
    if let Some(valuer) = record.as_fallible_valuer() {
        return valuer.try_value().map(Some).map_err(failed);
    }
    if let Some(valuer) = record.as_driver_valuer() {
        return valuer.driver_value().map(|v| Some(v.into())).map_err(failed);
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════
//  to_struct
// ═══════════════════════════════════════════════════════════════

/// Populate the record behind `dest` from the sources.
///
/// The sources are first mapped by names and tags; each accessible field then
/// takes the entry under its name, or else under its first matching tag.
pub fn to_struct(dest: &mut dyn Reflect, args: &[Arg<'_>]) -> Result<()> {
    let invalid = ConvertError::DstStructureInvalid { caller: "to_struct", expected: "a record" };
    match dest.slot() {
        Slot::Record(record) => fill_record(record, args),
        Slot::Dynamic(Value::Record(record)) => fill_record(record.as_mut(), args),
        Slot::Pointer(pointer) if !pointer.is_null() => match pointer.pointee() {
            Slot::Record(record) => fill_record(record, args),
            _ => Err(invalid),
        },
        _ => Err(invalid),
    }
}

fn lookup<'d>(data: &'d Dictionary, def: &FieldDef, config: &MapperConfig) -> Option<&'d Value> {
    if let Some(value) = data.get(def.name) {
        return Some(value);
    }
    config
        .tags
        .iter()
        .filter_map(|namespace| def.tag(namespace))
        .filter_map(tag::parse)
        .find_map(|spec| data.get(spec.key))
}

pub(crate) fn fill_record(record: &mut dyn Record, args: &[Arg<'_>]) -> Result<()> {
    let config = config_from(args);

    let mut map_args: Vec<Arg<'_>> = args
        .iter()
        .filter(|arg| !matches!(arg, Arg::Config(_)))
        .cloned()
        .collect();
    map_args.push(Arg::Config(config.clone().with_mode(ResolutionMode::NamesAndTags)));

    let mut data = Dictionary::new();
    to_map(&mut data, &map_args)?;
    if data.is_empty() {
        return Err(ConvertError::ArgumentInvalid {
            caller: "to_struct",
            reason: "empty map resulted from the arguments".to_string(),
        });
    }

    let record_name = record.record_name();
    for (index, def) in record.field_defs().iter().enumerate() {
        if !def.exported {
            continue;
        }
        let Some(value) = lookup(&data, def, &config) else {
            continue;
        };
        if value.is_nil() {
            continue;
        }
        let Some(slot) = record.field_slot(index) else {
            return Err(ConvertError::InvalidField {
                record: record_name.to_string(),
                field: def.name.to_string(),
            });
        };
        set_field_value_by_type(&config, slot, value)
            .map_err(|e| e.with_context(format_args!("{record_name}.{}", def.name)))?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  scan_to_element / scan_to_template
// ═══════════════════════════════════════════════════════════════

/// Convert `value` into `dest` through the field setter.
pub fn scan_to_element(dest: &mut dyn Reflect, value: &Value, config: Option<&MapperConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    set_field_value_by_type(&config, dest.slot(), value)
}

/// Copy entries selected by `key` from the mapped sources into `dest`.
///
/// A dictionary key copies every matching entry into a map destination; a
/// string key assigns the single entry if its type matches `dest` exactly.
pub fn scan_to_template(dest: &mut dyn Reflect, key: &Value, args: &[Arg<'_>]) -> Result<()> {
    let config = config_from(args);
    let mut params = Dictionary::new();
    to_map(&mut params, args)?;

    match key {
        Value::Dict(_) | Value::Map(_) => {
            let keys: Vec<String> = match key {
                Value::Dict(entries) => entries.keys().cloned().collect(),
                Value::Map(pairs) => pairs.iter().map(|(k, _)| to_string(k)).collect::<Result<_>>()?,
                _ => Vec::new(),
            };
            let Slot::Map(map) = dest.slot() else {
                return Err(ConvertError::DstStructureInvalid {
                    caller: "scan_to_template",
                    expected: "a map",
                });
            };
            for name in keys {
                if let Some(value) = params.get(&name) {
                    map.insert_entry(&config, &Value::String(name), value)?;
                }
            }
            Ok(())
        }
        Value::String(name) => {
            let Some(value) = params.get(name) else {
                return Ok(());
            };
            let mut slot = dest.slot();
            if let Slot::Dynamic(held) = &mut slot {
                **held = value.clone();
                return Ok(());
            }
            if setter::assign_exact(&mut slot, value) {
                return Ok(());
            }
            Err(ConvertError::ArgumentInvalid {
                caller: "scan_to_template",
                reason: format!(
                    "argument type {} does not match destination type {}",
                    value.type_name(),
                    slot.type_name()
                ),
            })
        }
        _ => Err(ConvertError::DstStructureInvalid {
            caller: "scan_to_template",
            expected: "a string or dictionary key",
        }),
    }
}
