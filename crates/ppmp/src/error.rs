//! Error types for PPMP entity construction, parsing and validation.

use std::fmt;

use thiserror::Error;

/// Broad classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A property setter rejected a value.
    Assignment,
    /// An API was called in a way that violates its contract.
    Usage,
    /// The JSON text could not be decoded or encoded.
    Decode,
    /// The `content-spec` discriminator did not match a registered payload.
    UnknownPayloadType,
    /// Parsing with validation found problems.
    Validation,
}

impl ErrorKind {
    /// Returns a short stable name for the kind (e.g. "assignment").
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Assignment => "assignment",
            ErrorKind::Usage => "usage",
            ErrorKind::Decode => "decode",
            ErrorKind::UnknownPayloadType => "unknown-payload-type",
            ErrorKind::Validation => "validation",
        }
    }
}

/// The accumulated `problems()` of a payload that was parsed with
/// validation enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl ValidationError {
    pub fn new(problems: Vec<String>) -> Self {
        Self { problems }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problems.join("\n"))
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised by the PPMP schema core and codec.
#[derive(Debug, Error)]
pub enum Error {
    // === Assignment ===
    #[error("{}", .problems.join("\n"))]
    Rejected { problems: Vec<String> },

    #[error("'{name}' is not a property of '{entity}'")]
    UnknownProperty { entity: &'static str, name: String },

    // === Usage ===
    #[error("{entity}.{name} does not hold a value of the expected shape")]
    UnexpectedValue { entity: &'static str, name: String },

    #[error("dimensions not defined in this series: {}", .names.join(", "))]
    UndeclaredDimensions { names: Vec<String> },

    #[error("'{name}' is reserved in '{entity}' objects and cannot be a dimension")]
    ReservedDimension { entity: &'static str, name: String },

    #[error("time offset {offset} is negative")]
    NegativeOffset { offset: i64 },

    #[error("time offset {offset} is smaller than the previous offset {previous}")]
    OffsetOutOfOrder { offset: i64, previous: i64 },

    // === Decode ===
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PPMP payload must be a JSON object")]
    NotAnObject,

    // === Dispatch ===
    #[error("unknown payload type: {}", .content_spec.as_deref().unwrap_or("<missing content-spec>"))]
    UnknownPayloadType { content_spec: Option<String> },

    #[error("expected a '{expected}' payload, found '{found}'")]
    UnexpectedPayload {
        expected: &'static str,
        found: &'static str,
    },

    // === Validation ===
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Rejected { .. } | Error::UnknownProperty { .. } => ErrorKind::Assignment,
            Error::UnexpectedValue { .. }
            | Error::UndeclaredDimensions { .. }
            | Error::ReservedDimension { .. }
            | Error::NegativeOffset { .. }
            | Error::OffsetOutOfOrder { .. } => ErrorKind::Usage,
            Error::Json(_) | Error::NotAnObject => ErrorKind::Decode,
            Error::UnknownPayloadType { .. } | Error::UnexpectedPayload { .. } => {
                ErrorKind::UnknownPayloadType
            }
            Error::Validation(_) => ErrorKind::Validation,
        }
    }

    /// The validation problems carried by this error, if any.
    pub fn problems(&self) -> &[String] {
        match self {
            Error::Rejected { problems } => problems,
            Error::Validation(err) => &err.problems,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_joins_problems() {
        let err = Error::Rejected {
            problems: vec!["a may not be 'null'".to_string(), "b too long".to_string()],
        };
        assert_eq!(err.to_string(), "a may not be 'null'\nb too long");
        assert_eq!(err.kind(), ErrorKind::Assignment);
        assert_eq!(err.problems().len(), 2);
    }

    #[test]
    fn test_unknown_payload_type_display() {
        let err = Error::UnknownPayloadType { content_spec: None };
        assert_eq!(err.to_string(), "unknown payload type: <missing content-spec>");
        let err = Error::UnknownPayloadType {
            content_spec: Some("urn:x".to_string()),
        };
        assert_eq!(err.to_string(), "unknown payload type: urn:x");
        assert_eq!(err.kind().name(), "unknown-payload-type");
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: Error = ValidationError::new(vec!["x".into(), "y".into()]).into();
        assert_eq!(err.to_string(), "x\ny");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
