//! Validation of entity trees.
//!
//! Validation is separate from parsing: a payload decodes as long as the
//! JSON is well-formed and its `content-spec` is registered. Problems are
//! collected as human-readable strings, one per violation, by walking the
//! backing store of every entity and checking each value against the
//! declared [`Property`](crate::Property).
//!
//! Per entity the walk checks, in this order:
//! - the `content-spec` discriminator of payload types
//! - every declared property present in the store, recursively
//! - that required (not nullable) properties are present
//! - that every remaining key is acceptable to the entity (declared
//!   dimensions on dimension containers, nothing elsewhere)

use crate::CONTENT_SPEC_KEY;
use crate::error::ValidationError;
use crate::model::{Entity, Value};

/// Appends the problems of a single entity to `errors`. Nested entities
/// are checked by their properties.
pub fn check_entity<E: Entity + ?Sized>(entity: &E, errors: &mut Vec<String>) {
    let name = entity.type_name();
    let fields = entity.fields();
    let properties = entity.properties();
    let content_spec = entity.content_spec();

    if let Some(expected) = content_spec {
        if fields.get(CONTENT_SPEC_KEY).and_then(Value::as_str) != Some(expected) {
            errors.push(format!("'content-spec' for '{name}' wrong or missing"));
        }
    }

    for property in properties {
        match fields.get(property.name()) {
            Some(value) => property.check(name, value, errors),
            None if !property.is_nullable() => {
                errors.push(format!("{name}.{} is missing", property.name()));
            }
            None => {}
        }
    }

    for key in fields.keys() {
        let declared = properties.iter().any(|p| p.name() == key)
            || (content_spec.is_some() && key == CONTENT_SPEC_KEY);
        if !declared && !entity.is_excess_field_ok(key) {
            errors.push(format!("'{key}' is not a valid key for '{name}' objects"));
        }
    }
}

/// Validates an entity tree, returning all problems as one error.
pub fn validate_entity(entity: &dyn Entity) -> Result<(), ValidationError> {
    let problems = entity.problems();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(problems))
    }
}
