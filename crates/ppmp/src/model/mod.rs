//! Schema core for PPMP entities.
//!
//! This module contains the building blocks every PPMP type is made of:
//! - Values (the dynamic content of a backing store)
//! - Properties (typed, validated field descriptors)
//! - Entities (fixed-field objects driven by a static schema)
//! - Dimension containers (caller-named fields of one element type)
//! - Series (synchronized arrays with a time offset column)

pub mod dimensions;
pub mod entity;
pub mod property;
pub mod series;
pub mod value;

pub use dimensions::{DimensionElement, DimensionKind, Dimensions};
pub use entity::{Entity, Load, Object, Schema};
pub use property::{Item, Kind, Property, default_entity};
pub use series::{Sample, Samples, Series, SeriesKind, TIME_KEY, add_timed_sample, timed_samples};
pub use value::{Fields, Value};
