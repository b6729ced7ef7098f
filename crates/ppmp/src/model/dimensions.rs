//! Dimension containers.
//!
//! A dimension container is an entity whose keys are chosen by the caller:
//! PPMP's `limits`, `shutoffValues` and `series` objects map measurement
//! point names ("temperature", "pressure", ...) to a value of one element
//! type. The container tracks which names have been declared; declared
//! names are legitimate extra keys, anything else fails validation.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use rustc_hash::FxHashSet;

use crate::error::Error;
use crate::model::entity::{Entity, Load, Object, Schema, fmt_entity};
use crate::model::property::Property;
use crate::model::value::{Fields, Value};
use crate::validate::check_entity;

/// The value type held under each dimension name.
pub trait DimensionElement: Sized + 'static {
    /// A fresh, empty element for a newly declared dimension.
    fn fresh() -> Value;

    /// Rebuilds an element from its decoded JSON form.
    fn adopt(raw: Value) -> Value;

    fn from_value(value: &Value) -> Option<&Self>;

    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;

    /// Validates the element stored under dimension `name` of `owner`.
    fn check(owner: &str, name: &str, value: &Value, errors: &mut Vec<String>);
}

fn wrong_type(owner: &str, name: &str, value: &Value) -> String {
    format!(
        "{} is not an appropriate value for {owner}.{name} (wrong type)",
        value.repr()
    )
}

impl<S: Schema> DimensionElement for Object<S> {
    fn fresh() -> Value {
        Value::entity(Object::<S>::new())
    }

    fn adopt(raw: Value) -> Value {
        match raw {
            Value::Map(fields) => Value::entity(Object::<S>::load(fields)),
            other => other,
        }
    }

    fn from_value(value: &Value) -> Option<&Self> {
        value.downcast_ref::<Self>()
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        value.downcast_mut::<Self>()
    }

    fn check(owner: &str, name: &str, value: &Value, errors: &mut Vec<String>) {
        match value.as_entity() {
            Some(entity) if entity.is::<Self>() => entity.problems_into(errors),
            _ => errors.push(wrong_type(owner, name, value)),
        }
    }
}

/// Plain arrays, as used by series columns.
impl DimensionElement for Vec<Value> {
    fn fresh() -> Value {
        Value::List(Vec::new())
    }

    fn adopt(raw: Value) -> Value {
        raw
    }

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        value.as_list_mut()
    }

    fn check(owner: &str, name: &str, value: &Value, errors: &mut Vec<String>) {
        if !matches!(value, Value::List(_)) {
            errors.push(wrong_type(owner, name, value));
        }
    }
}

/// Static description of a dimension container type.
pub trait DimensionKind: 'static + Send + Sync {
    const NAME: &'static str;

    /// Reserved keys with a fixed meaning, e.g. the `$_time` column.
    const STRUCTURE: &'static [Property] = &[];

    type Element: DimensionElement;

    /// Populates the structural keys of a new container.
    fn init(_fields: &mut Fields) {}

    /// Cross-key checks run after the per-dimension checks.
    fn check_structure(_fields: &Fields, _dimensions: &[&str], _errors: &mut Vec<String>) {}
}

/// An entity keyed by caller-chosen dimension names.
pub struct Dimensions<K: DimensionKind> {
    data: Fields,
    dimensions: FxHashSet<String>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: DimensionKind> Dimensions<K> {
    pub fn new() -> Self {
        let mut data = Fields::new();
        K::init(&mut data);
        Self {
            data,
            dimensions: FxHashSet::default(),
            _kind: PhantomData,
        }
    }

    /// Creates a container with the given dimensions declared, in order.
    pub fn with_dimensions<I>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut this = Self::new();
        for name in names {
            this.add_dimension(name)?;
        }
        Ok(this)
    }

    /// Declares `name` and stores a fresh element under it. Declaring an
    /// existing name replaces its value.
    ///
    /// Structural keys such as `$_time` cannot be declared.
    pub fn add_dimension(&mut self, name: impl Into<String>) -> Result<&mut Value, Error> {
        let name = Self::unreserved(name.into())?;
        Ok(self.insert_dimension(name, K::Element::fresh()))
    }

    /// Declares `name` and adopts `raw` (decoded JSON) as its element.
    pub fn load_dimension(
        &mut self,
        name: impl Into<String>,
        raw: Value,
    ) -> Result<&mut Value, Error> {
        let name = Self::unreserved(name.into())?;
        Ok(self.insert_dimension(name, K::Element::adopt(raw)))
    }

    fn unreserved(name: String) -> Result<String, Error> {
        if K::STRUCTURE.iter().any(|p| p.name() == name) {
            return Err(Error::ReservedDimension {
                entity: K::NAME,
                name,
            });
        }
        Ok(name)
    }

    fn insert_dimension(&mut self, name: String, value: Value) -> &mut Value {
        self.dimensions.insert(name.clone());
        let (index, _) = self.data.insert_full(name, value);
        &mut self.data[index]
    }

    /// The element of a declared dimension.
    pub fn get(&self, name: &str) -> Option<&K::Element> {
        self.value(name).and_then(K::Element::from_value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut K::Element> {
        if !self.dimensions.contains(name) {
            return None;
        }
        self.data.get_mut(name).and_then(K::Element::from_value_mut)
    }

    /// The raw value of a declared dimension.
    pub fn value(&self, name: &str) -> Option<&Value> {
        if !self.dimensions.contains(name) {
            return None;
        }
        self.data.get(name)
    }

    /// Stores `value` under `name`, declaring the dimension if needed.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Value, Error> {
        self.load_dimension(name, value.into())
    }

    /// Fetches the element of `name`, declaring the dimension if needed.
    pub fn dimension_mut(&mut self, name: &str) -> Result<&mut K::Element, Error> {
        if !self.dimensions.contains(name) {
            self.add_dimension(name)?;
        }
        self.get_mut(name).ok_or_else(|| Error::UnexpectedValue {
            entity: K::NAME,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dimensions.contains(name)
    }

    /// Declared dimension names in backing-store order.
    pub fn dimensions(&self) -> impl Iterator<Item = &str> + '_ {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|key| self.dimensions.contains(*key))
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn into_fields(self) -> Fields {
        self.data
    }
}

impl<K: DimensionKind> Load for Dimensions<K> {
    /// Structural keys are loaded through their properties; every other key
    /// becomes a declared dimension.
    fn load(fields: Fields) -> Self {
        let mut this = Self {
            data: Fields::with_capacity(fields.len()),
            dimensions: FxHashSet::default(),
            _kind: PhantomData,
        };
        for (key, raw) in fields {
            match K::STRUCTURE.iter().find(|p| p.name() == key) {
                Some(property) => {
                    this.data.insert(key, property.load(raw));
                }
                None => {
                    this.insert_dimension(key, K::Element::adopt(raw));
                }
            }
        }
        this
    }
}

impl<K: DimensionKind> Entity for Dimensions<K> {
    fn type_name(&self) -> &'static str {
        K::NAME
    }

    fn properties(&self) -> &'static [Property] {
        K::STRUCTURE
    }

    fn fields(&self) -> &Fields {
        &self.data
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.data
    }

    fn is_excess_field_ok(&self, name: &str) -> bool {
        self.dimensions.contains(name)
    }

    fn problems_into(&self, errors: &mut Vec<String>) {
        check_entity(self, errors);
        let names: Vec<&str> = self.dimensions().collect();
        for name in &names {
            if let Some(value) = self.data.get(*name) {
                K::Element::check(K::NAME, name, value, errors);
            }
        }
        K::check_structure(&self.data, &names, errors);
    }

    fn clone_box(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<K: DimensionKind> Default for Dimensions<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: DimensionKind> Clone for Dimensions<K> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            dimensions: self.dimensions.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: DimensionKind> PartialEq for Dimensions<K> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<K: DimensionKind> fmt::Debug for Dimensions<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(K::NAME).field(&self.data).finish()
    }
}

impl<K: DimensionKind> fmt::Display for Dimensions<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entity(K::NAME, &self.data, f)
    }
}

impl<K: DimensionKind> From<Dimensions<K>> for Value {
    fn from(dimensions: Dimensions<K>) -> Self {
        Value::entity(dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GaugeSchema;

    impl Schema for GaugeSchema {
        const NAME: &'static str = "Gauge";
        const PROPERTIES: &'static [Property] =
            &[Property::float("min"), Property::float("max")];
    }

    type Gauge = Object<GaugeSchema>;

    struct GaugesKind;

    impl DimensionKind for GaugesKind {
        const NAME: &'static str = "Gauges";
        type Element = Gauge;
    }

    type Gauges = Dimensions<GaugesKind>;

    #[test]
    fn test_declared_dimensions_are_valid_keys() {
        let mut gauges = Gauges::with_dimensions(["temperature", "pressure"]).unwrap();
        gauges.get_mut("temperature").unwrap().set("max", 59).unwrap();
        assert!(gauges.problems().is_empty());
        assert_eq!(gauges.dimensions().collect::<Vec<_>>(), ["temperature", "pressure"]);
        assert_eq!(gauges.get("temperature").unwrap().get_f64("max"), Some(59.0));
    }

    #[test]
    fn test_undeclared_key_is_reported() {
        let mut gauges = Gauges::with_dimensions(["temperature"]).unwrap();
        gauges.fields_mut().insert("rogue".into(), Value::Int(1));
        assert_eq!(gauges.problems(), ["'rogue' is not a valid key for 'Gauges' objects"]);
        assert!(gauges.get("rogue").is_none());
    }

    #[test]
    fn test_set_declares_implicitly() {
        let mut gauges = Gauges::new();
        let mut raw = Fields::new();
        raw.insert("min".into(), Value::Float(1.0));
        gauges.set("humidity", raw).unwrap();
        assert!(gauges.contains("humidity"));
        assert_eq!(gauges.get("humidity").unwrap().get_f64("min"), Some(1.0));
    }

    #[test]
    fn test_add_dimension_twice_replaces_value() {
        let mut gauges = Gauges::with_dimensions(["t"]).unwrap();
        gauges.dimension_mut("t").unwrap().set("min", 3.0).unwrap();
        gauges.add_dimension("t").unwrap();
        assert_eq!(gauges.dimensions().count(), 1);
        assert!(gauges.get("t").unwrap().get("min").is_none());
    }

    #[test]
    fn test_load_adopts_every_key() {
        let mut inner = Fields::new();
        inner.insert("max".into(), Value::from("hot"));
        let mut raw = Fields::new();
        raw.insert("temperature".into(), Value::Map(inner));
        raw.insert("broken".into(), Value::Int(3));

        let gauges = Gauges::load(raw);
        assert!(gauges.contains("broken"));
        assert_eq!(
            gauges.problems(),
            [
                "\"hot\" is not an appropriate value for Gauge.max (wrong type)",
                "3 is not an appropriate value for Gauges.broken (wrong type)",
            ]
        );
    }
}
