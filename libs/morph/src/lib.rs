//! Runtime value conversion and object mapping.
//!
//! Dynamic data is carried as [`Value`]. The `convert` functions coerce it to
//! concrete scalars, `container` to lists and dictionaries, and `mapper` moves
//! it between dictionaries and `#[derive(Record)]` structs using tag-driven
//! field resolution. `graph` provides cycle-safe deep copy and deep merge.

extern crate self as morph;

pub mod capability;
pub mod checks;
pub mod config;
pub mod container;
pub mod convert;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod record;
pub mod tag;
pub mod value;

pub use morph_derive::Record;

pub use checks::{is_bool, is_nil, is_number, is_zero_value, unpack_base_element};
pub use config::{MapperConfig, ResolutionMode};
pub use container::{
    to_bytes, to_dictionary, to_dictionary_slice, to_int_slice, to_slice_any, to_string_slice,
};
pub use convert::*;
pub use error::{ConvertError, ErrorCode, Result};
pub use graph::{deep_copy, deep_merge, MergeOptions, Priority};
pub use mapper::{
    scan_to_element, scan_to_template, set_field_by_name, set_field_value_by_type, to_map,
    to_struct, Arg,
};
pub use record::{FieldDef, ListSlot, MapSlot, PointerSlot, Record, Reflect, Slot};
pub use value::{Dictionary, Kind, Pointer, Value};
