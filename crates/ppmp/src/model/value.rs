//! Values held in an entity's backing store.
//!
//! Every PPMP entity keeps its state in an ordered [`Fields`] map of
//! [`Value`]s. The same map is what gets serialized, so a value is either
//! a JSON scalar, a datetime, a container, or a nested entity.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use indexmap::IndexMap;

use crate::model::entity::{Entity, fmt_entity};
use crate::util::datetime::{format_datetime, with_local_timezone};

/// Ordered backing store of an entity: field name to value.
pub type Fields = IndexMap<String, Value>;

/// A dynamically typed value stored on an entity.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// JSON `null`. Only appears in loaded data or inside lists; setters
    /// remove the key instead of storing it.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Timezone-aware timestamp.
    Datetime(DateTime<FixedOffset>),
    List(Vec<Value>),
    /// Open map without a declared schema (e.g. `metaData`).
    Map(Fields),
    /// Nested entity with its own backing store.
    Entity(Box<dyn Entity>),
}

impl Value {
    /// Wraps an entity.
    pub fn entity<E: Entity>(entity: E) -> Value {
        Value::Entity(Box::new(entity))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer. Floats are not truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns any JSON number as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Datetime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&dyn Entity> {
        match self {
            Value::Entity(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn as_entity_mut(&mut self) -> Option<&mut dyn Entity> {
        match self {
            Value::Entity(e) => Some(e.as_mut()),
            _ => None,
        }
    }

    /// Returns the nested entity if it is of concrete type `T`.
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_entity().and_then(|e| e.downcast_ref::<T>())
    }

    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_entity_mut().and_then(|e| e.downcast_mut::<T>())
    }

    /// Length as used by max-length checks: characters for text, items for
    /// containers.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Rendering used in validation messages: text is quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Text(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // 422 and 422.0 are the same JSON number
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Datetime(a), Value::Datetime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => a.fields() == b.fields(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => f.write_str(s),
            Value::Datetime(dt) => f.write_str(&format_datetime(dt)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {}", value.repr())?;
                }
                f.write_str("}")
            }
            Value::Entity(e) => fmt_entity(e.type_name(), e.fields(), f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::Datetime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Datetime(dt.fixed_offset())
    }
}

impl From<DateTime<Local>> for Value {
    fn from(dt: DateTime<Local>) -> Self {
        Value::Datetime(dt.fixed_offset())
    }
}

/// Naive datetimes are interpreted in the local timezone.
impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::Datetime(with_local_timezone(dt))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::List(items.into_iter().map(Value::Float).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Value::List(items.into_iter().map(Value::Int).collect())
    }
}

impl From<Fields> for Value {
    fn from(map: Fields) -> Self {
        Value::Map(map)
    }
}

impl From<Box<dyn Entity>> for Value {
    fn from(entity: Box<dyn Entity>) -> Self {
        Value::Entity(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(Value::Int(422), Value::Float(422.0));
        assert_eq!(Value::Float(422.0), Value::Int(422));
        assert_ne!(Value::Int(422), Value::Float(422.5));
        assert_ne!(Value::Int(1), Value::Text("1".into()));
    }

    #[test]
    fn test_len_counts_characters() {
        assert_eq!(Value::from("äöü").len(), Some(3));
        assert_eq!(Value::from(vec![1.0, 2.0]).len(), Some(2));
        assert_eq!(Value::Int(5).len(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<f64>).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn test_datetimes_compare_as_instants() {
        let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let a = plus2.with_ymd_and_hms(2002, 5, 30, 9, 30, 10).unwrap();
        let b = Utc.with_ymd_and_hms(2002, 5, 30, 7, 30, 10).unwrap();
        assert_eq!(Value::from(a), Value::from(b));
    }

    #[test]
    fn test_display() {
        let mut map = Fields::new();
        map.insert("k".into(), Value::from("v"));
        let list = Value::List(vec![Value::Int(1), Value::Null, Value::from("a")]);
        assert_eq!(list.to_string(), "[1, null, \"a\"]");
        assert_eq!(Value::Map(map).to_string(), "{\"k\": \"v\"}");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
    }
}
