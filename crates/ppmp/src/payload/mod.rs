//! PPMP v2 payload types.
//!
//! Each payload kind is a top-level entity carrying a `content-spec` URN:
//! - [`measurement`]: measurement data and time series
//! - [`message`]: machine messages
//! - [`process`]: discrete process data with per-phase measurements
//!
//! The measurement and message types are re-exported here. The process
//! message has its own `Part`, `Limit` and `Measurement` variants and is
//! used through [`process`].

pub mod common;
pub mod measurement;
pub mod message;
pub mod process;

pub use common::{Device, DeviceSchema, RESULT_VALUES};
pub use measurement::{
    Limit, Limits, MEASUREMENT_SPEC, Measurement, MeasurementOptions, MeasurementPayload,
    MeasurementPayloadSchema, Part,
};
pub use message::{
    MESSAGE_SPEC, Message, MessageOptions, MessagePayload, MessagePayloadSchema,
};
pub use process::{PROCESS_SPEC, ProcessPayload, ProcessPayloadSchema};
