//! Entities: the Entity trait and the generic fixed-field entity.
//!
//! An entity is an ordered backing store ([`Fields`]) plus static metadata
//! (type name, optional discriminator, declared properties). Concrete PPMP
//! types are declared by implementing [`Schema`] on a marker type and
//! aliasing [`Object<S>`]; no per-type load, validate or serialize code is
//! needed.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::mem;

use chrono::{DateTime, FixedOffset};

use crate::CONTENT_SPEC_KEY;
use crate::error::Error;
use crate::model::property::{Item, Kind, Property};
use crate::model::value::{Fields, Value};
use crate::validate::check_entity;

/// Behaviour shared by every PPMP entity, fixed-field or dimension-bearing.
///
/// The trait is object safe: nested entities are stored as
/// `Box<dyn Entity>` inside [`Value::Entity`] and recovered with
/// [`downcast_ref`](dyn Entity::downcast_ref).
pub trait Entity: Any + fmt::Debug + Send + Sync {
    /// Type name used in validation messages and `Display`.
    fn type_name(&self) -> &'static str;

    /// The required `content-spec` value of payload types.
    fn content_spec(&self) -> Option<&'static str> {
        None
    }

    /// The declared properties of this type.
    fn properties(&self) -> &'static [Property];

    fn fields(&self) -> &Fields;

    /// Direct access to the backing store. Writes bypass property
    /// validation but are still serialized as-is.
    fn fields_mut(&mut self) -> &mut Fields;

    /// Whether an undeclared key is acceptable on this entity.
    fn is_excess_field_ok(&self, _name: &str) -> bool {
        false
    }

    /// Appends the validation problems of this entity (and of everything
    /// nested in it) to `errors`.
    fn problems_into(&self, errors: &mut Vec<String>) {
        check_entity(self, errors);
    }

    /// Returns the validation problems of this entity; empty means valid.
    fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.problems_into(&mut errors);
        errors
    }

    fn clone_box(&self) -> Box<dyn Entity>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Entity {
    /// Returns true if the entity is of concrete type `T`.
    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Entity>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Entity {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl fmt::Display for dyn Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entity(self.type_name(), self.fields(), f)
    }
}

/// Renders `Name(key=value, ...)` in backing-store order.
pub(crate) fn fmt_entity(name: &str, fields: &Fields, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}={}", value.repr())?;
    }
    f.write_str(")")
}

/// Rebuilds an entity from a decoded JSON object, without running property
/// conversions or validation.
pub trait Load: Sized {
    fn load(fields: Fields) -> Self;
}

/// Static description of a fixed-field entity type.
///
/// ```
/// use ppmp::{Object, Property, Schema};
///
/// struct SensorSchema;
///
/// impl Schema for SensorSchema {
///     const NAME: &'static str = "Sensor";
///     const PROPERTIES: &'static [Property] = &[
///         Property::text("id").max_len(8).required(),
///         Property::float("gain"),
///     ];
/// }
///
/// type Sensor = Object<SensorSchema>;
///
/// let mut sensor = Sensor::new();
/// sensor.set("id", "s-1").unwrap();
/// assert!(sensor.set("id", "much-too-long").is_err());
/// assert_eq!(sensor.get_str("id"), Some("s-1"));
/// ```
pub trait Schema: 'static + Send + Sync {
    const NAME: &'static str;

    /// Discriminator injected on construction; set for payload types only.
    const CONTENT_SPEC: Option<&'static str> = None;

    const PROPERTIES: &'static [Property];

    fn property(name: &str) -> Option<&'static Property> {
        Self::PROPERTIES.iter().find(|p| p.name() == name)
    }
}

/// A fixed-field entity whose properties are declared by `S`.
pub struct Object<S: Schema> {
    data: Fields,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> Object<S> {
    /// Creates an empty entity. Payload types get their `content-spec`.
    pub fn new() -> Self {
        let mut data = Fields::new();
        if let Some(spec) = S::CONTENT_SPEC {
            data.insert(CONTENT_SPEC_KEY.to_string(), Value::from(spec));
        }
        Self {
            data,
            _schema: PhantomData,
        }
    }

    /// Creates an entity by assigning each pair through its property, in
    /// order. Fails at the first rejected value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut object = Self::new();
        for (name, value) in pairs {
            object.set(name.as_ref(), value)?;
        }
        Ok(object)
    }

    fn property(name: &str) -> Result<&'static Property, Error> {
        S::property(name).ok_or_else(|| Error::UnknownProperty {
            entity: S::NAME,
            name: name.to_string(),
        })
    }

    /// The stored value of `name`; absent if never set or set to null.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_datetime(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        self.get(name).and_then(Value::as_datetime)
    }

    /// The nested entity stored under `name`, if it is a `T`.
    pub fn get_entity<T: Entity>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutable access to `name`, materializing the property default on
    /// first access. The default is stored, so later reads see the same
    /// value. Returns `None` for undeclared names or when there is neither
    /// a stored value nor a default.
    pub fn entry(&mut self, name: &str) -> Option<&mut Value> {
        if !self.data.contains_key(name) {
            let default = S::property(name)?.default_value()?;
            self.data.insert(name.to_string(), default);
        }
        self.data.get_mut(name)
    }

    /// Mutable access to the nested `T` under `name`, creating it (from the
    /// property default, or `T::default()`) when unset.
    pub fn entity_mut<T: Entity + Default>(&mut self, name: &str) -> Result<&mut T, Error> {
        let property = Self::property(name)?;
        if self.data.get(name).is_none_or(Value::is_null) {
            let value = property
                .default_value()
                .unwrap_or_else(|| Value::entity(T::default()));
            self.data.insert(name.to_string(), value);
        }
        self.data
            .get_mut(name)
            .and_then(|v| v.downcast_mut::<T>())
            .ok_or_else(|| Error::UnexpectedValue {
                entity: S::NAME,
                name: name.to_string(),
            })
    }

    /// Iterates the `T` entities of the list under `name`. Elements of
    /// another shape are skipped.
    pub fn iter_entities<T: Entity>(&self, name: &str) -> impl Iterator<Item = &T> {
        self.get(name)
            .and_then(Value::as_list)
            .into_iter()
            .flatten()
            .filter_map(|v| v.downcast_ref::<T>())
    }

    /// Appends an entity to the list under `name`.
    pub fn push_entity<T: Entity>(&mut self, name: &str, item: T) -> Result<(), Error> {
        let property = Self::property(name)?;
        if let Kind::List(Item::Entity { accepts, .. }) = property.kind() {
            if !accepts(&item) {
                return Err(Error::Rejected {
                    problems: vec![format!(
                        "{} is not an appropriate value for {}.{name} (wrong type)",
                        item.type_name(),
                        S::NAME
                    )],
                });
            }
        }
        self.entry(name)
            .and_then(Value::as_list_mut)
            .ok_or_else(|| Error::UnexpectedValue {
                entity: S::NAME,
                name: name.to_string(),
            })?
            .push(Value::entity(item));
        Ok(())
    }

    /// Assigns `value` through the property `name`. Null removes the key.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        Self::property(name)?.assign(S::NAME, &mut self.data, value.into())
    }

    /// Same as setting `name` to null.
    pub fn unset(&mut self, name: &str) -> Result<(), Error> {
        self.set(name, Value::Null)
    }

    /// Adds a `metaData` entry.
    pub fn insert_meta(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), Error> {
        Self::property(META_DATA)?;
        self.entry(META_DATA)
            .and_then(Value::as_map_mut)
            .ok_or_else(|| Error::UnexpectedValue {
                entity: S::NAME,
                name: META_DATA.to_string(),
            })?
            .insert(key.into(), Value::Text(value.into()));
        Ok(())
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.get(META_DATA)
            .and_then(Value::as_map)
            .and_then(|map| map.get(key))
            .and_then(Value::as_str)
    }

    pub fn into_fields(self) -> Fields {
        self.data
    }
}

const META_DATA: &str = "metaData";

impl<S: Schema> Load for Object<S> {
    /// Adopts `fields` as the backing store and applies each declared
    /// property's load transform to the keys present.
    fn load(mut fields: Fields) -> Self {
        for property in S::PROPERTIES {
            if let Some(value) = fields.get_mut(property.name()) {
                let raw = mem::take(value);
                *value = property.load(raw);
            }
        }
        Self {
            data: fields,
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> Entity for Object<S> {
    fn type_name(&self) -> &'static str {
        S::NAME
    }

    fn content_spec(&self) -> Option<&'static str> {
        S::CONTENT_SPEC
    }

    fn properties(&self) -> &'static [Property] {
        S::PROPERTIES
    }

    fn fields(&self) -> &Fields {
        &self.data
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.data
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

impl<S: Schema> Default for Object<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> Clone for Object<S> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> PartialEq for Object<S> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<S: Schema> fmt::Debug for Object<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(S::NAME).field(&self.data).finish()
    }
}

impl<S: Schema> fmt::Display for Object<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entity(S::NAME, &self.data, f)
    }
}

impl<S: Schema> From<Object<S>> for Value {
    fn from(object: Object<S>) -> Self {
        Value::entity(object)
    }
}

impl<S: Schema> From<Vec<Object<S>>> for Value {
    fn from(objects: Vec<Object<S>>) -> Self {
        Value::List(objects.into_iter().map(Value::entity).collect())
    }
}
