//! PPMP: data model and validation for the Production Performance
//! Management Protocol.
//!
//! This crate builds, parses, validates and serializes PPMP v2 payloads
//! (measurement, machine message and process message) on top of a small
//! reflection-free schema system.
//!
//! # Overview
//!
//! Every PPMP entity keeps its state in an ordered backing store that is
//! also its JSON form:
//! - **Properties** declare the fields of an entity type with their
//!   validation rules (type, nullability, length, enumeration)
//! - **Entities** are driven by a static [`Schema`]; loading, validating
//!   and serializing need no per-type code
//! - **Dimension containers** hold caller-named fields, such as the
//!   measurement points of `series` and `limits`
//!
//! # Quick Start
//!
//! ```rust
//! use ppmp::payload::{Device, MeasurementPayload};
//! use ppmp::{Entity, loads_as};
//!
//! let device = Device::with_id("Device-001").unwrap();
//! let json = device.measurement([("temperature", 45.6)]).unwrap();
//!
//! let payload: MeasurementPayload = loads_as(&json, true).unwrap();
//! assert_eq!(payload.device().unwrap().device_id(), Some("Device-001"));
//! assert!(payload.problems().is_empty());
//! ```
//!
//! # Modules
//!
//! - [`model`]: Schema core (Value, Property, Entity, Dimensions, Series)
//! - [`payload`]: PPMP v2 payload types
//! - [`codec`]: JSON text entry points
//! - [`registry`]: `content-spec` dispatch table
//! - [`validate`]: The `problems()` walk
//! - [`error`]: Error types
//!
//! # Validation
//!
//! Parsing never fails on schema violations. A payload decodes as long as
//! it is a JSON object with a registered `content-spec`; call
//! [`Entity::problems`] or parse with validation enabled to get the list of
//! violations.

pub mod codec;
pub mod error;
pub mod model;
pub mod payload;
pub mod registry;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{DumpOptions, LoadOptions, dumps, dumps_with, loads, loads_as, loads_with};
pub use error::{Error, ErrorKind, ValidationError};
pub use model::{
    DimensionKind, Dimensions, Entity, Fields, Kind, Load, Object, Property, Sample, Schema,
    Series, Value,
};
pub use validate::validate_entity;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key of the payload type discriminator.
pub const CONTENT_SPEC_KEY: &str = "content-spec";
