//! JSON text encoding/decoding for PPMP payloads.
//!
//! [`loads`] decodes JSON text, dispatches on the top-level `content-spec`
//! through the [registry](crate::registry) and optionally validates the
//! result. [`dumps`] writes an entity's backing store as JSON text.

pub mod json;

use tracing::debug;

use crate::CONTENT_SPEC_KEY;
use crate::error::Error;
use crate::model::{Entity, Object, Schema, Value};
use crate::registry;
use crate::validate::validate_entity;

/// Options for decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Run `problems()` after loading and fail with
    /// [`Error::Validation`] if there are any.
    pub validate: bool,
}

impl LoadOptions {
    /// Creates default (non-validating) options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates validating options.
    pub fn validating() -> Self {
        Self { validate: true }
    }
}

/// Options for encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Indent the output.
    pub pretty: bool,
}

impl DumpOptions {
    /// Creates default (compact) options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Parses a PPMP payload from JSON text.
///
/// Parsing succeeds for any well-formed JSON object whose `content-spec`
/// is registered. Validation problems are only raised when `validate` is
/// set; otherwise call [`Entity::problems`] on the result.
pub fn loads(text: &str, validate: bool) -> Result<Box<dyn Entity>, Error> {
    loads_with(text, LoadOptions { validate })
}

/// Parses a PPMP payload from JSON text with the given options.
pub fn loads_with(text: &str, options: LoadOptions) -> Result<Box<dyn Entity>, Error> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    let Value::Map(fields) = Value::from(json) else {
        return Err(Error::NotAnObject);
    };

    let content_spec = fields
        .get(CONTENT_SPEC_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);
    let loader = content_spec
        .as_deref()
        .and_then(registry::lookup)
        .ok_or_else(|| Error::UnknownPayloadType {
            content_spec: content_spec.clone(),
        })?;

    debug!(content_spec = ?content_spec, keys = fields.len(), "loading payload");
    let entity = loader(fields);
    if options.validate {
        validate_entity(entity.as_ref())?;
    }
    Ok(entity)
}

/// Parses a payload that must be of schema `S`.
///
/// ```
/// use ppmp::codec::loads_as;
/// use ppmp::payload::MessagePayloadSchema;
///
/// let text = r#"{
///     "content-spec": "urn:spec://eclipse.org/unide/machine-message#v2",
///     "device": {"deviceID": "X"},
///     "messages": [{"ts": "2002-05-30T09:30:10.123+02:00", "code": "190ABT"}]
/// }"#;
/// let payload = loads_as::<MessagePayloadSchema>(text, true).unwrap();
/// assert_eq!(payload.messages().count(), 1);
/// ```
pub fn loads_as<S: Schema>(text: &str, validate: bool) -> Result<Object<S>, Error> {
    let entity = loads(text, validate)?;
    let found = entity.type_name();
    entity
        .into_any()
        .downcast::<Object<S>>()
        .map(|payload| *payload)
        .map_err(|_| Error::UnexpectedPayload {
            expected: S::NAME,
            found,
        })
}

/// Serializes an entity as compact JSON text.
pub fn dumps(entity: &dyn Entity) -> Result<String, Error> {
    dumps_with(entity, DumpOptions::default())
}

/// Serializes an entity as JSON text with the given options.
pub fn dumps_with(entity: &dyn Entity, options: DumpOptions) -> Result<String, Error> {
    let text = if options.pretty {
        serde_json::to_string_pretty(entity.fields())?
    } else {
        serde_json::to_string(entity.fields())?
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::payload::{MESSAGE_SPEC, MeasurementPayloadSchema, MessagePayload};

    #[test]
    fn test_not_an_object() {
        assert!(matches!(loads("[1, 2]", false), Err(Error::NotAnObject)));
        assert_eq!(loads("{", false).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_unknown_payload_type() {
        let err = loads(r#"{"content-spec": "urn:nope"}"#, false).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownPayloadType { content_spec: Some(ref spec) } if spec == "urn:nope"
        ));
        let err = loads(r#"{"device": {}}"#, false).unwrap_err();
        assert!(matches!(err, Error::UnknownPayloadType { content_spec: None }));
        let err = loads(r#"{"content-spec": 2}"#, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPayloadType);
    }

    #[test]
    fn test_validation_is_opt_in() {
        let text = format!(r#"{{"content-spec": "{MESSAGE_SPEC}", "bogus": 1}}"#);
        let payload = loads(&text, false).unwrap();
        assert_eq!(
            payload.problems(),
            [
                "MessagePayload.device is missing",
                "'bogus' is not a valid key for 'MessagePayload' objects",
            ]
        );
        let err = loads(&text, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.problems().len(), 2);
    }

    #[test]
    fn test_loads_as_checks_type() {
        let text = format!(r#"{{"content-spec": "{MESSAGE_SPEC}"}}"#);
        let err = loads_as::<MeasurementPayloadSchema>(&text, false).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedPayload {
                expected: "MeasurementPayload",
                found: "MessagePayload"
            }
        ));
    }

    #[test]
    fn test_dumps_pretty() {
        let payload = MessagePayload::new();
        let compact = dumps(&payload).unwrap();
        assert_eq!(compact, format!(r#"{{"content-spec":"{MESSAGE_SPEC}"}}"#));
        let pretty = dumps_with(&payload, DumpOptions::pretty()).unwrap();
        assert!(pretty.contains('\n'));
    }
}
