//! Mapping between backing stores and JSON.
//!
//! Serialization walks the backing store directly: datetimes become
//! ISO 8601 strings and nested entities are written as their own stores.
//! Decoding produces plain values only; rebuilding entities is left to
//! each property's load transform.

use serde::ser::{Serialize, Serializer};

use crate::model::{DimensionKind, Dimensions, Entity, Object, Schema, Value};
use crate::util::datetime::format_datetime;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Datetime(dt) => serializer.serialize_str(&format_datetime(dt)),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Entity(entity) => serializer.collect_map(entity.fields()),
        }
    }
}

impl Serialize for dyn Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields())
    }
}

impl<T: Schema> Serialize for Object<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields())
    }
}

impl<K: DimensionKind> Serialize for Dimensions<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields())
    }
}

/// JSON numbers that fit an `i64` stay integers; all others are floats.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;
    use crate::util::datetime::parse_datetime;

    #[test]
    fn test_numbers_keep_their_kind() {
        let value = Value::from(serde_json::json!([1, 1.5, -7, 18446744073709551615u64]));
        assert!(matches!(
            value.as_list().unwrap(),
            [Value::Int(1), Value::Float(_), Value::Int(-7), Value::Float(_)]
        ));
    }

    #[test]
    fn test_object_order_preserved() {
        let json: serde_json::Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let value = Value::from(json);
        let keys: Vec<_> = value.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_datetime_serialized_as_iso() {
        let mut map = Fields::new();
        map.insert(
            "ts".into(),
            Value::Datetime(parse_datetime("2002-05-30T09:30:10.123+02:00").unwrap()),
        );
        map.insert("v".into(), Value::Float(45.6));
        assert_eq!(
            serde_json::to_string(&Value::Map(map)).unwrap(),
            r#"{"ts":"2002-05-30T09:30:10.123+02:00","v":45.6}"#
        );
    }
}
