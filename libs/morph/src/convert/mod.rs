//! Scalar coercions: one operation per destination kind.
//!
//! Every recognised source maps explicitly to the destination. Nil yields the
//! zero value; narrowing is range-checked and reports `NumberOverflow`; text
//! that does not parse and unknown sources report `TypeNotSupported`.

mod complex;
mod decimal;
mod float;
mod int;
pub(crate) mod text;
pub(crate) mod time;

pub use complex::{to_complex128, to_complex64};
pub use decimal::to_decimal;
pub use float::{to_float32, to_float64};
pub use int::{
    to_int, to_int16, to_int32, to_int64, to_int8, to_uint, to_uint16, to_uint32, to_uint64,
    to_uint8,
};
pub use text::{to_bool, to_string};
pub use time::{
    to_duration, to_time, to_time_args, zero_time, TIME_FORMAT_ISO, TIME_FORMAT_ISO_DATE,
    TIME_FORMAT_ISO_STZ,
};
