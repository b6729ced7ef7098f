//! Property descriptors.
//!
//! A [`Property`] describes one named field of an entity type: which values
//! it accepts, how values are normalized when assigned ([`Property::convert`])
//! and how they are rebuilt from decoded JSON ([`Property::load`]). Entity
//! types declare their properties as a `const` slice; the generic entity
//! code iterates that slice instead of relying on per-field code.

use std::fmt;

use tracing::trace;

use crate::error::Error;
use crate::model::entity::{Entity, Load};
use crate::model::value::{Fields, Value};
use crate::util::datetime::parse_datetime;

/// Element type of a list property.
#[derive(Clone, Copy)]
pub enum Item {
    /// Any value.
    Any,
    /// JSON integers, e.g. the `$_time` column.
    Integer,
    /// Entities of one concrete type.
    Entity {
        name: &'static str,
        accepts: fn(&dyn Entity) -> bool,
    },
}

/// The set of values a property accepts.
#[derive(Clone, Copy)]
pub enum Kind {
    /// No type restriction.
    Any,
    Text,
    /// Any JSON number.
    Number,
    Datetime,
    /// A number or an array of numbers.
    NumberOrList,
    /// A map from strings to strings.
    StringMap,
    /// A map from strings to numbers.
    RealNumberMap,
    List(Item),
    /// An entity of one concrete type.
    Entity {
        name: &'static str,
        accepts: fn(&dyn Entity) -> bool,
    },
}

impl Kind {
    /// Returns true if `value` (known to be non-null) has an acceptable type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Kind::Any => true,
            Kind::Text => matches!(value, Value::Text(_)),
            Kind::Number => is_finite_number(value),
            Kind::Datetime => matches!(value, Value::Datetime(_)),
            Kind::NumberOrList => match value {
                Value::List(items) => items.iter().all(is_finite_number),
                other => is_finite_number(other),
            },
            Kind::StringMap => value
                .as_map()
                .is_some_and(|map| map.values().all(|v| matches!(v, Value::Text(_)))),
            Kind::RealNumberMap => value
                .as_map()
                .is_some_and(|map| map.values().all(is_finite_number)),
            Kind::List(item) => value
                .as_list()
                .is_some_and(|items| items.iter().all(|v| item.accepts(v))),
            Kind::Entity { accepts, .. } => value.as_entity().is_some_and(accepts),
        }
    }
}

impl Item {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Item::Any => true,
            Item::Integer => matches!(value, Value::Int(_)),
            Item::Entity { accepts, .. } => value.as_entity().is_some_and(accepts),
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Any => f.write_str("Any"),
            Kind::Text => f.write_str("Text"),
            Kind::Number => f.write_str("Number"),
            Kind::Datetime => f.write_str("Datetime"),
            Kind::NumberOrList => f.write_str("NumberOrList"),
            Kind::StringMap => f.write_str("StringMap"),
            Kind::RealNumberMap => f.write_str("RealNumberMap"),
            Kind::List(Item::Any) => f.write_str("List"),
            Kind::List(Item::Integer) => f.write_str("List<Integer>"),
            Kind::List(Item::Entity { name, .. }) => write!(f, "List<{name}>"),
            Kind::Entity { name, .. } => f.write_str(name),
        }
    }
}

/// Describes one named field of an entity type.
#[derive(Clone, Copy)]
pub struct Property {
    name: &'static str,
    kind: Kind,
    one_of: Option<&'static [&'static str]>,
    max_len: Option<usize>,
    nullable: bool,
    default: Option<fn() -> Value>,
    convert: Option<fn(Value) -> Value>,
    load: Option<fn(Value) -> Value>,
}

impl Property {
    /// Creates a nullable property without conversions.
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            one_of: None,
            max_len: None,
            nullable: true,
            default: None,
            convert: None,
            load: None,
        }
    }

    /// An untyped property.
    pub const fn any(name: &'static str) -> Self {
        Self::new(name, Kind::Any)
    }

    /// A string property.
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, Kind::Text)
    }

    /// A floating point property. Integers and numeric strings are
    /// converted on assignment.
    pub const fn float(name: &'static str) -> Self {
        Self::new(name, Kind::Number).with_convert(to_float)
    }

    /// A number or an array of numbers.
    pub const fn number_or_list(name: &'static str) -> Self {
        Self::new(name, Kind::NumberOrList)
    }

    /// A timezone-aware datetime, serialized as ISO 8601.
    pub const fn datetime(name: &'static str) -> Self {
        Self::new(name, Kind::Datetime)
            .with_convert(to_datetime)
            .with_load(load_datetime)
    }

    /// A string to string map, created empty on first access.
    pub const fn string_map(name: &'static str) -> Self {
        Self::new(name, Kind::StringMap).with_default(empty_map)
    }

    /// A string to number map. Integers are converted to floats on
    /// assignment.
    pub const fn real_number_map(name: &'static str) -> Self {
        Self::new(name, Kind::RealNumberMap).with_convert(to_real_number_map)
    }

    /// A nested entity of type `T`.
    pub const fn object<T: Entity + Load>(name: &'static str, type_name: &'static str) -> Self {
        Self::new(
            name,
            Kind::Entity {
                name: type_name,
                accepts: is_a::<T>,
            },
        )
        .with_load(load_entity::<T>)
    }

    /// A list of entities of type `T`, created empty on first access.
    pub const fn list_of<T: Entity + Load>(name: &'static str, type_name: &'static str) -> Self {
        Self::new(
            name,
            Kind::List(Item::Entity {
                name: type_name,
                accepts: is_a::<T>,
            }),
        )
        .with_load(load_entity_list::<T>)
        .with_default(empty_list)
    }

    /// A list of integers, created empty on first access.
    pub const fn integers(name: &'static str) -> Self {
        Self::new(name, Kind::List(Item::Integer)).with_default(empty_list)
    }

    /// Limits the length of text (in characters) or containers.
    pub const fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    /// Restricts values to a closed set of strings.
    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.one_of = Some(allowed);
        self
    }

    /// Marks the property as not nullable.
    pub const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn with_default(mut self, default: fn() -> Value) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn with_convert(mut self, convert: fn(Value) -> Value) -> Self {
        self.convert = Some(convert);
        self
    }

    pub const fn with_load(mut self, load: fn(Value) -> Value) -> Self {
        self.load = Some(load);
        self
    }

    /// The field name, also the JSON key.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn kind(&self) -> Kind {
        self.kind
    }

    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub const fn allowed(&self) -> Option<&'static [&'static str]> {
        self.one_of
    }

    pub const fn max_length(&self) -> Option<usize> {
        self.max_len
    }

    /// Builds the default value, if the property has one.
    pub fn default_value(&self) -> Option<Value> {
        self.default.map(|default| default())
    }

    /// Normalizes a value before it is validated and stored.
    pub fn convert(&self, value: Value) -> Value {
        match self.convert {
            Some(convert) => convert(value),
            None => value,
        }
    }

    /// Rebuilds a value from its decoded JSON form.
    pub fn load(&self, value: Value) -> Value {
        match self.load {
            Some(load) => load(value),
            None => value,
        }
    }

    /// Validates `value` as the content of this property on an `owner`
    /// entity and returns the problems found.
    pub fn validate(&self, owner: &str, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        self.check(owner, value, &mut errors);
        errors
    }

    /// Appends the problems of `value` to `errors`.
    ///
    /// Checks run in order (null, type, length, enumeration, nested) and
    /// the first applicable check ends the pipeline.
    pub fn check(&self, owner: &str, value: &Value, errors: &mut Vec<String>) {
        let field = format!("{owner}.{}", self.name);

        if value.is_null() {
            if !self.nullable {
                errors.push(format!("{field} may not be 'null'"));
            }
            return;
        }

        if !self.kind.accepts(value) {
            errors.push(format!(
                "{} is not an appropriate value for {field} (wrong type)",
                value.repr()
            ));
            return;
        }

        if let Some(max) = self.max_len {
            if value.len().is_some_and(|len| len > max) {
                errors.push(format!("{field} may not be longer than {max}"));
            }
            return;
        }

        if let Some(allowed) = self.one_of {
            if !value.as_str().is_some_and(|s| allowed.contains(&s)) {
                errors.push(format!("{} must be one of {}", value.repr(), allowed.join(", ")));
            }
            return;
        }

        match value {
            Value::Entity(entity) => entity.problems_into(errors),
            Value::List(items) => {
                for item in items {
                    if let Value::Entity(entity) = item {
                        entity.problems_into(errors);
                    }
                }
            }
            _ => {}
        }
    }

    /// Assigns `value` to this property in `fields`.
    ///
    /// A non-null value is converted, then validated; on any problem the
    /// assignment is rejected and `fields` is left unchanged. A null value
    /// removes the key, unless the property is not nullable.
    pub fn assign(&self, owner: &str, fields: &mut Fields, value: Value) -> Result<(), Error> {
        if value.is_null() {
            let problems = self.validate(owner, &value);
            if !problems.is_empty() {
                return Err(Error::Rejected { problems });
            }
            fields.shift_remove(self.name);
            return Ok(());
        }

        let value = self.convert(value);
        let problems = self.validate(owner, &value);
        if !problems.is_empty() {
            return Err(Error::Rejected { problems });
        }
        fields.insert(self.name.to_string(), value);
        Ok(())
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("one_of", &self.one_of)
            .field("max_len", &self.max_len)
            .field("nullable", &self.nullable)
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Default factory for entity-valued properties, e.g.
/// `Property::object::<Series>("series", "Series").with_default(default_entity::<Series>)`.
pub fn default_entity<T: Entity + Default>() -> Value {
    Value::entity(T::default())
}

fn is_a<T: Entity>(entity: &dyn Entity) -> bool {
    entity.as_any().is::<T>()
}

fn empty_map() -> Value {
    Value::Map(Fields::new())
}

fn empty_list() -> Value {
    Value::List(Vec::new())
}

// JSON has no NaN or infinity.
fn is_finite_number(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::Float(x) => x.is_finite(),
        _ => false,
    }
}

fn to_float(value: Value) -> Value {
    match value {
        Value::Int(i) => Value::Float(i as f64),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => Value::Float(x),
            _ => Value::Text(s),
        },
        other => other,
    }
}

fn to_datetime(value: Value) -> Value {
    match value {
        Value::Text(s) => match parse_datetime(&s) {
            Some(dt) => Value::Datetime(dt),
            None => Value::Text(s),
        },
        other => other,
    }
}

fn to_real_number_map(value: Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(key, v)| match v {
                    Value::Int(i) => (key, Value::Float(i as f64)),
                    other => (key, other),
                })
                .collect(),
        ),
        other => other,
    }
}

fn load_datetime(value: Value) -> Value {
    match value {
        Value::Text(s) => match parse_datetime(&s) {
            Some(dt) => Value::Datetime(dt),
            None => {
                trace!("keeping unparseable datetime {:?} as text", s);
                Value::Text(s)
            }
        },
        other => other,
    }
}

fn load_entity<T: Entity + Load>(value: Value) -> Value {
    match value {
        Value::Map(fields) => Value::entity(T::load(fields)),
        other => other,
    }
}

fn load_entity_list<T: Entity + Load>(value: Value) -> Value {
    match value {
        Value::List(items) => Value::List(items.into_iter().map(load_entity::<T>).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CODE: Property = Property::text("code").max_len(5).required();
    const RESULT: Property = Property::text("result").one_of(&["OK", "NOK", "UNKNOWN"]);
    const VALUE: Property = Property::float("value");
    const TS: Property = Property::datetime("ts");

    #[test]
    fn test_null_checks() {
        assert_eq!(CODE.validate("Part", &Value::Null), vec!["Part.code may not be 'null'"]);
        assert!(RESULT.validate("Part", &Value::Null).is_empty());
    }

    #[test]
    fn test_wrong_type() {
        let errors = CODE.validate("Part", &Value::Int(0));
        assert_eq!(errors, vec!["0 is not an appropriate value for Part.code (wrong type)"]);
    }

    #[test]
    fn test_too_long() {
        let errors = CODE.validate("Part", &Value::from("abcdef"));
        assert_eq!(errors, vec!["Part.code may not be longer than 5"]);
        assert!(CODE.validate("Part", &Value::from("abcde")).is_empty());
    }

    #[test]
    fn test_one_of() {
        let errors = RESULT.validate("Part", &Value::from("X"));
        assert_eq!(errors, vec!["\"X\" must be one of OK, NOK, UNKNOWN"]);
        assert!(RESULT.validate("Part", &Value::from("NOK")).is_empty());
    }

    #[test]
    fn test_length_check_ends_pipeline() {
        const BOTH: Property = Property::text("x").max_len(3).one_of(&["A"]);
        // too long: only the length problem is reported
        assert_eq!(BOTH.validate("T", &Value::from("ABCD")).len(), 1);
        // within length: the enumeration is not consulted
        assert!(BOTH.validate("T", &Value::from("B")).is_empty());
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(VALUE.convert(Value::Int(12)), Value::Float(12.0));
        assert_eq!(VALUE.convert(Value::from("1.23")), Value::Float(1.23));
        assert_eq!(VALUE.convert(Value::from("foo")), Value::from("foo"));
        assert_eq!(VALUE.validate("T", &VALUE.convert(Value::from("foo"))).len(), 1);
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        assert_eq!(VALUE.convert(Value::from("nan")), Value::from("nan"));
        assert_eq!(VALUE.convert(Value::from("1e400")), Value::from("1e400"));
        assert_eq!(
            VALUE.validate("Limit", &VALUE.convert(Value::from("1e400"))),
            vec!["\"1e400\" is not an appropriate value for Limit.value (wrong type)"]
        );
        assert_eq!(
            VALUE.validate("Limit", &Value::Float(f64::INFINITY)),
            vec!["inf is not an appropriate value for Limit.value (wrong type)"]
        );

        let mut fields = Fields::new();
        assert!(VALUE.assign("Limit", &mut fields, Value::Float(f64::NAN)).is_err());
        assert!(VALUE.assign("Limit", &mut fields, Value::from("-inf")).is_err());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_datetime_conversion_and_load() {
        let converted = TS.convert(Value::from("2002-05-30T09:30:10.123+02:00"));
        assert!(matches!(converted, Value::Datetime(_)));
        assert_eq!(TS.load(Value::from("xx")), Value::from("xx"));
        assert_eq!(TS.validate("T", &Value::from("xx")).len(), 1);
    }

    #[test]
    fn test_assign_rejects_and_keeps_store() {
        let mut fields = Fields::new();
        CODE.assign("Part", &mut fields, Value::from("ab")).unwrap();
        let err = CODE.assign("Part", &mut fields, Value::from("abcdefgh")).unwrap_err();
        assert_eq!(err.problems(), ["Part.code may not be longer than 5"]);
        assert_eq!(fields.get("code"), Some(&Value::from("ab")));

        assert!(CODE.assign("Part", &mut fields, Value::Null).is_err());
        assert!(fields.contains_key("code"));
    }

    #[test]
    fn test_assign_null_removes_key() {
        let mut fields = Fields::new();
        RESULT.assign("Part", &mut fields, Value::from("OK")).unwrap();
        RESULT.assign("Part", &mut fields, Value::Null).unwrap();
        assert!(!fields.contains_key("result"));
    }

    #[test]
    fn test_string_map_kind() {
        let prop = Property::string_map("metaData");
        let mut map = Fields::new();
        map.insert("k".into(), Value::from("v"));
        assert!(prop.validate("T", &Value::Map(map.clone())).is_empty());
        map.insert("n".into(), Value::Int(1));
        assert_eq!(prop.validate("T", &Value::Map(map)).len(), 1);
        assert_eq!(prop.default_value(), Some(Value::Map(Fields::new())));
    }

    #[test]
    fn test_number_or_list() {
        let prop = Property::number_or_list("upperError");
        assert!(prop.validate("T", &Value::Int(4)).is_empty());
        assert!(prop.validate("T", &Value::from(vec![1.0, 2.0])).is_empty());
        assert_eq!(prop.validate("T", &Value::from("4")).len(), 1);
    }

    #[test]
    fn test_integers_kind() {
        let prop = Property::integers("$_time");
        assert!(prop.validate("Series", &Value::from(vec![0i64, 12])).is_empty());
        assert_eq!(prop.validate("Series", &Value::from(vec![0.5])).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_length_bound_is_exact(text in "[a-z0-9 ]{0,12}") {
            let errors = CODE.validate("Part", &Value::from(text.as_str()));
            prop_assert_eq!(errors.is_empty(), text.chars().count() <= 5);
            prop_assert!(errors.len() <= 1);
        }

        #[test]
        fn prop_enumeration_is_closed(text in "[A-Z]{0,8}") {
            let errors = RESULT.validate("Part", &Value::from(text.as_str()));
            let allowed = ["OK", "NOK", "UNKNOWN"].contains(&text.as_str());
            prop_assert_eq!(errors.is_empty(), allowed);
        }

        #[test]
        fn prop_rejected_assignment_keeps_store(first in "[a-z]{1,5}", second in "[a-z]{6,10}") {
            let mut fields = Fields::new();
            CODE.assign("Part", &mut fields, Value::from(first.as_str())).unwrap();
            prop_assert!(CODE.assign("Part", &mut fields, Value::from(second.as_str())).is_err());
            prop_assert_eq!(fields.get("code"), Some(&Value::from(first.as_str())));
        }
    }
}
