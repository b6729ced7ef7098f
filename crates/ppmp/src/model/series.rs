//! Time series: synchronized arrays with a `$_time` offset column.
//!
//! A series holds one array per declared dimension plus the reserved
//! `$_time` column of millisecond offsets relative to the owning
//! measurement's `ts`. All arrays advance together; a dimension missing
//! from a sample receives `null` at that index.

use chrono::{DateTime, FixedOffset};

use crate::error::Error;
use crate::model::dimensions::{DimensionKind, Dimensions};
use crate::model::entity::{Entity, Object, Schema};
use crate::model::property::Property;
use crate::model::value::{Fields, Value};
use crate::util::datetime::{add_millis, is_representable_offset, millis_between};

/// Key of the offset column.
pub const TIME_KEY: &str = "$_time";

/// Dimension kind of [`Series`]: plain arrays plus the `$_time` column.
pub struct SeriesKind;

impl DimensionKind for SeriesKind {
    const NAME: &'static str = "Series";
    const STRUCTURE: &'static [Property] = &[Property::integers(TIME_KEY).required()];

    type Element = Vec<Value>;

    fn init(fields: &mut Fields) {
        fields.insert(TIME_KEY.to_string(), Value::List(Vec::new()));
    }

    fn check_structure(fields: &Fields, dimensions: &[&str], errors: &mut Vec<String>) {
        let Some(time) = fields.get(TIME_KEY).and_then(Value::as_list) else {
            return;
        };

        let mut previous: Option<i64> = None;
        for offset in time.iter().filter_map(Value::as_i64) {
            if offset < 0 {
                errors.push(format!("Series.{TIME_KEY} offset {offset} is negative"));
            } else if !is_representable_offset(offset) {
                errors.push(format!("Series.{TIME_KEY} offset {offset} is out of range"));
            } else if let Some(prev) = previous.filter(|prev| offset < *prev) {
                errors.push(format!(
                    "Series.{TIME_KEY} offset {offset} is smaller than the previous offset {prev}"
                ));
            }
            previous = Some(offset);
        }

        for name in dimensions {
            if let Some(column) = fields.get(*name).and_then(Value::as_list) {
                if column.len() != time.len() {
                    errors.push(format!(
                        "Series.{name} has {} values but {TIME_KEY} has {}",
                        column.len(),
                        time.len()
                    ));
                }
            }
        }
    }
}

/// The `series` object of a measurement.
pub type Series = Dimensions<SeriesKind>;

impl Dimensions<SeriesKind> {
    /// Appends one sample at `offset` milliseconds.
    ///
    /// Every declared dimension receives the matching value from `values`,
    /// or null if absent. Fails without touching any column if `values`
    /// names an undeclared dimension, if `offset` is negative or smaller
    /// than the last recorded offset, or if a column is not an array.
    pub fn add_sample<I, K, V>(&mut self, offset: i64, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut values: Fields = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();

        let undeclared: Vec<String> = values
            .keys()
            .filter(|name| !self.contains(name.as_str()))
            .cloned()
            .collect();
        if !undeclared.is_empty() {
            return Err(Error::UndeclaredDimensions { names: undeclared });
        }

        if offset < 0 {
            return Err(Error::NegativeOffset { offset });
        }
        if let Some(previous) = self.offsets().last() {
            if offset < previous {
                return Err(Error::OffsetOutOfOrder { offset, previous });
            }
        }

        let names: Vec<String> = self.dimensions().map(str::to_string).collect();
        let fields = self.fields_mut();
        let time_is_list = fields
            .entry(TIME_KEY.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
            .as_list()
            .is_some();
        if !time_is_list {
            return Err(unexpected(TIME_KEY));
        }
        if let Some(name) = names
            .iter()
            .find(|name| fields.get(name.as_str()).and_then(Value::as_list).is_none())
        {
            return Err(unexpected(name));
        }

        for name in &names {
            let value = values.shift_remove(name).unwrap_or(Value::Null);
            if let Some(column) = fields.get_mut(name.as_str()).and_then(Value::as_list_mut) {
                column.push(value);
            }
        }
        if let Some(time) = fields.get_mut(TIME_KEY).and_then(Value::as_list_mut) {
            time.push(Value::Int(offset));
        }
        Ok(())
    }

    /// The recorded offsets. Non-integer entries in loaded data are skipped.
    pub fn offsets(&self) -> impl Iterator<Item = i64> + '_ {
        self.fields()
            .get(TIME_KEY)
            .and_then(Value::as_list)
            .into_iter()
            .flatten()
            .filter_map(Value::as_i64)
    }

    /// Number of recorded samples.
    pub fn sample_count(&self) -> usize {
        self.fields()
            .get(TIME_KEY)
            .and_then(Value::as_list)
            .map_or(0, <[Value]>::len)
    }

    /// The samples with absolute timestamps, computed from `reference`.
    pub fn samples(&self, reference: Option<DateTime<FixedOffset>>) -> Samples<'_> {
        Samples {
            series: Some(self),
            reference,
            index: 0,
        }
    }
}

fn unexpected(name: &str) -> Error {
    Error::UnexpectedValue {
        entity: SeriesKind::NAME,
        name: name.to_string(),
    }
}

/// One row of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Absolute timestamp: reference plus offset.
    pub ts: DateTime<FixedOffset>,
    /// Dimension name to value, in declaration order.
    pub values: Fields,
}

impl Sample {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Lazy iterator over the rows of a series. Call `samples()` again for a
/// fresh pass.
///
/// Rows whose offset is not an integer, or whose timestamp would fall
/// outside the representable range, are skipped.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    series: Option<&'a Series>,
    reference: Option<DateTime<FixedOffset>>,
    index: usize,
}

impl Samples<'_> {
    fn empty() -> Self {
        Self {
            series: None,
            reference: None,
            index: 0,
        }
    }
}

impl Iterator for Samples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let series = self.series?;
        let reference = self.reference?;
        let time = series.fields().get(TIME_KEY).and_then(Value::as_list)?;
        loop {
            let index = self.index;
            let offset = time.get(index)?;
            self.index += 1;
            let Some(ts) = offset.as_i64().and_then(|offset| add_millis(&reference, offset)) else {
                continue;
            };
            let values = series
                .dimensions()
                .map(|name| {
                    let value = series
                        .get(name)
                        .and_then(|column| column.get(index))
                        .cloned()
                        .unwrap_or_default();
                    (name.to_string(), value)
                })
                .collect();
            return Some(Sample { ts, values });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (self.series, self.reference) {
            (Some(series), Some(_)) => (0, Some(series.sample_count().saturating_sub(self.index))),
            _ => (0, Some(0)),
        }
    }
}

/// Records a sample taken at `ts` on an entity with `ts` and `series`
/// properties. The first sample fixes the entity's `ts` and gets offset 0;
/// later samples are offset from that reference, not from each other.
pub fn add_timed_sample<S, I, K, V>(
    entity: &mut Object<S>,
    ts: DateTime<FixedOffset>,
    values: I,
) -> Result<(), Error>
where
    S: Schema,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let first = entity
        .get_entity::<Series>("series")
        .is_none_or(|series| series.sample_count() == 0);
    let reference = match entity.get_datetime("ts") {
        Some(reference) if !first => reference,
        _ => ts,
    };
    let offset = millis_between(&reference, &ts);
    entity.entity_mut::<Series>("series")?.add_sample(offset, values)?;
    if first {
        entity.set("ts", ts)?;
    }
    Ok(())
}

/// The samples of an entity with `ts` and `series` properties.
pub fn timed_samples<S: Schema>(entity: &Object<S>) -> Samples<'_> {
    match entity.get_entity::<Series>("series") {
        Some(series) => series.samples(entity.get_datetime("ts")),
        None => Samples::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::Load;
    use crate::util::datetime::parse_datetime;
    use proptest::prelude::*;

    fn no_values() -> Vec<(String, Value)> {
        Vec::new()
    }

    #[test]
    fn test_new_series_has_time_column() {
        let series = Series::new();
        assert_eq!(series.fields().get(TIME_KEY), Some(&Value::List(vec![])));
        assert!(series.problems().is_empty());
    }

    #[test]
    fn test_add_sample_fills_missing_with_null() {
        let mut series = Series::with_dimensions(["temperature", "pressure"]).unwrap();
        series.add_sample(0, [("temperature", 45.6)]).unwrap();
        series.add_sample(22, [("pressure", 1.2)]).unwrap();

        assert_eq!(series.offsets().collect::<Vec<_>>(), [0, 22]);
        assert_eq!(
            series.get("temperature").unwrap(),
            &vec![Value::Float(45.6), Value::Null]
        );
        assert_eq!(series.get("pressure").unwrap(), &vec![Value::Null, Value::Float(1.2)]);
        assert!(series.problems().is_empty());
    }

    #[test]
    fn test_add_sample_undeclared_dimension() {
        let mut series = Series::with_dimensions(["temperature"]).unwrap();
        let err = series.add_sample(0, [("humidity", 1.0)]).unwrap_err();
        assert!(matches!(err, Error::UndeclaredDimensions { ref names } if names == &["humidity"]));
        assert_eq!(series.sample_count(), 0);
        assert!(series.get("temperature").unwrap().is_empty());
    }

    #[test]
    fn test_add_sample_offset_order() {
        let mut series = Series::with_dimensions(["t"]).unwrap();
        assert!(matches!(
            series.add_sample(-1, no_values()),
            Err(Error::NegativeOffset { offset: -1 })
        ));
        series.add_sample(10, no_values()).unwrap();
        series.add_sample(10, no_values()).unwrap();
        assert!(matches!(
            series.add_sample(5, no_values()),
            Err(Error::OffsetOutOfOrder { offset: 5, previous: 10 })
        ));
        assert_eq!(series.sample_count(), 2);
    }

    #[test]
    fn test_time_column_cannot_be_a_dimension() {
        let mut series = Series::with_dimensions(["t"]).unwrap();
        series.add_sample(0, [("t", 1)]).unwrap();
        let before = series.clone();

        let err = series.add_dimension(TIME_KEY).unwrap_err();
        assert!(matches!(err, Error::ReservedDimension { entity: "Series", ref name } if name == TIME_KEY));
        assert!(series.set(TIME_KEY, vec![5i64]).is_err());
        assert!(Series::with_dimensions(["t", TIME_KEY]).is_err());
        assert_eq!(series, before);

        series.add_sample(10, [("t", 2)]).unwrap();
        assert_eq!(series.offsets().collect::<Vec<_>>(), [0, 10]);
        assert!(series.problems().is_empty());
    }

    #[test]
    fn test_loaded_series_structure_problems() {
        let mut raw = Fields::new();
        raw.insert(TIME_KEY.into(), Value::from(vec![0i64, 20, 10]));
        raw.insert("temperature".into(), Value::from(vec![1.0, 2.0]));
        let series = Series::load(raw);
        assert_eq!(
            series.problems(),
            [
                "Series.$_time offset 10 is smaller than the previous offset 20",
                "Series.temperature has 2 values but $_time has 3",
            ]
        );
    }

    #[test]
    fn test_out_of_range_offset() {
        let mut raw = Fields::new();
        raw.insert(TIME_KEY.into(), Value::from(vec![0i64, i64::MAX]));
        raw.insert("t".into(), Value::from(vec![1.0, 2.0]));
        let series = Series::load(raw);
        assert_eq!(
            series.problems(),
            [format!("Series.$_time offset {} is out of range", i64::MAX)]
        );

        let reference = parse_datetime("2002-05-30T09:30:10.123+02:00").unwrap();
        let samples: Vec<_> = series.samples(Some(reference)).collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].ts, reference);
        assert_eq!(samples[0].get("t"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_samples_are_absolute() {
        let reference = parse_datetime("2002-05-30T09:30:10.123+02:00").unwrap();
        let mut series = Series::with_dimensions(["temperature"]).unwrap();
        series.add_sample(0, [("temperature", 1.0)]).unwrap();
        series.add_sample(23, [("temperature", 2.0)]).unwrap();

        let samples: Vec<_> = series.samples(Some(reference)).collect();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].ts, parse_datetime("2002-05-30T09:30:10.146+02:00").unwrap());
        assert_eq!(samples[1].get("temperature"), Some(&Value::Float(2.0)));
        assert_eq!(series.samples(None).count(), 0);
    }

    proptest! {
        #[test]
        fn prop_columns_stay_aligned(
            steps in proptest::collection::vec((0i64..1000, any::<bool>(), any::<bool>()), 0..40)
        ) {
            let mut series = Series::with_dimensions(["a", "b"]).unwrap();
            let mut offset = 0;
            for (delta, has_a, has_b) in steps {
                offset += delta;
                let mut values = Vec::new();
                if has_a {
                    values.push(("a", Value::Int(delta)));
                }
                if has_b {
                    values.push(("b", Value::Bool(has_a)));
                }
                series.add_sample(offset, values).unwrap();
                let len = series.sample_count();
                prop_assert_eq!(series.get("a").unwrap().len(), len);
                prop_assert_eq!(series.get("b").unwrap().len(), len);
            }
            prop_assert!(series.problems().is_empty());
        }
    }
}
