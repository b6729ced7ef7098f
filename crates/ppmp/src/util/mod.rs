//! Utility modules for PPMP.

pub mod datetime;

pub use datetime::{
    add_millis, format_datetime, is_representable_offset, local_now, millis_between,
    parse_datetime, with_local_timezone,
};
