//! Payload registry: `content-spec` URN to payload loader.
//!
//! The registry is process-wide and comes pre-populated with the three PPMP
//! v2 payload types. Further payload schemas can be registered at startup;
//! after that the registry is only read, during [`loads`](crate::loads).

use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::Error;
use crate::model::{Entity, Fields, Load, Object, Schema};
use crate::payload::{MeasurementPayloadSchema, MessagePayloadSchema, ProcessPayloadSchema};

/// Rebuilds a top-level payload from its decoded JSON object.
pub type PayloadLoader = fn(Fields) -> Box<dyn Entity>;

lazy_static! {
    static ref REGISTRY: RwLock<FxHashMap<String, PayloadLoader>> = {
        let mut map: FxHashMap<String, PayloadLoader> = FxHashMap::default();
        insert_payload::<MeasurementPayloadSchema>(&mut map);
        insert_payload::<MessagePayloadSchema>(&mut map);
        insert_payload::<ProcessPayloadSchema>(&mut map);
        RwLock::new(map)
    };
}

fn load_payload<S: Schema>(fields: Fields) -> Box<dyn Entity> {
    Box::new(Object::<S>::load(fields))
}

fn insert_payload<S: Schema>(map: &mut FxHashMap<String, PayloadLoader>) {
    if let Some(spec) = S::CONTENT_SPEC {
        map.insert(spec.to_string(), load_payload::<S>);
    }
}

/// Registers `loader` for `content_spec`, replacing any previous loader.
///
/// Registration is meant to happen once at startup; concurrent
/// registration from several threads is serialized by the lock but the
/// winner is unspecified.
pub fn register(content_spec: impl Into<String>, loader: PayloadLoader) {
    let content_spec = content_spec.into();
    debug!(content_spec = %content_spec, "registering payload type");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(content_spec, loader);
}

/// Registers a payload schema under its `CONTENT_SPEC`.
pub fn register_payload<S: Schema>() -> Result<(), Error> {
    let spec = S::CONTENT_SPEC.ok_or(Error::UnknownPayloadType { content_spec: None })?;
    register(spec, load_payload::<S>);
    Ok(())
}

/// The loader registered for `content_spec`.
pub fn lookup(content_spec: &str) -> Option<PayloadLoader> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(content_spec)
        .copied()
}

/// All registered discriminators, sorted.
pub fn content_specs() -> Vec<String> {
    let mut specs: Vec<String> = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    specs.sort();
    specs
}
