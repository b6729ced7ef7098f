//! The measurement message: simple measurement data and time series.

use chrono::{DateTime, FixedOffset};

use crate::codec::dumps;
use crate::error::Error;
use crate::model::{
    DimensionKind, Dimensions, Object, Property, Samples, Schema, Series, Value,
    add_timed_sample, default_entity, timed_samples,
};
use crate::payload::common::{Device, DeviceSchema, code, meta_data, result};
use crate::util::datetime::local_now;

pub const MEASUREMENT_SPEC: &str = "urn:spec://eclipse.org/unide/measurement-message#v2";

pub struct LimitSchema;

impl Schema for LimitSchema {
    const NAME: &'static str = "Limit";
    const PROPERTIES: &'static [Property] = &[
        Property::float("upperError"),
        Property::float("lowerError"),
        Property::float("upperWarning"),
        Property::float("lowerWarning"),
    ];
}

/// Error and warning thresholds of one measurement point. No ordering is
/// enforced between the thresholds.
pub type Limit = Object<LimitSchema>;

pub struct LimitsKind;

impl DimensionKind for LimitsKind {
    const NAME: &'static str = "Limits";
    type Element = Limit;
}

/// The `limits` object: measurement point name to [`Limit`].
pub type Limits = Dimensions<LimitsKind>;

pub struct PartSchema;

impl Schema for PartSchema {
    const NAME: &'static str = "Part";
    const PROPERTIES: &'static [Property] = &[
        Property::text("partTypeID"),
        Property::text("partID").max_len(256),
        result(),
        code(),
        meta_data(),
    ];
}

/// The part a payload relates to.
pub type Part = Object<PartSchema>;

pub struct MeasurementSchema;

impl Schema for MeasurementSchema {
    const NAME: &'static str = "Measurement";
    const PROPERTIES: &'static [Property] = &[
        Property::datetime("ts").required(),
        result(),
        code(),
        Property::object::<Series>("series", "Series").with_default(default_entity::<Series>),
        Property::object::<Limits>("limits", "Limits").with_default(default_entity::<Limits>),
    ];
}

/// A block of sensor readings sharing one reference timestamp.
pub type Measurement = Object<MeasurementSchema>;

impl Object<MeasurementSchema> {
    /// Creates a measurement at `ts` (now if `None`) with the given series
    /// dimensions declared.
    pub fn with_dimensions<I>(ts: Option<DateTime<FixedOffset>>, dimensions: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut measurement = Self::new();
        measurement.set("ts", ts.unwrap_or_else(local_now))?;
        measurement.set("series", Series::with_dimensions(dimensions)?)?;
        Ok(measurement)
    }

    pub fn ts(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("ts")
    }

    pub fn series(&self) -> Option<&Series> {
        self.get_entity("series")
    }

    /// The series, created empty on first access.
    pub fn series_mut(&mut self) -> Result<&mut Series, Error> {
        self.entity_mut("series")
    }

    pub fn limits(&self) -> Option<&Limits> {
        self.get_entity("limits")
    }

    /// The limits, created empty on first access.
    pub fn limits_mut(&mut self) -> Result<&mut Limits, Error> {
        self.entity_mut("limits")
    }

    /// Records a sample taken at `ts`. The first sample sets the
    /// measurement's `ts`; later ones are stored as offsets from it.
    pub fn add_sample<I, K, V>(&mut self, ts: DateTime<FixedOffset>, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        add_timed_sample(self, ts, values)
    }

    /// The recorded samples with absolute timestamps.
    pub fn samples(&self) -> Samples<'_> {
        timed_samples(self)
    }
}

pub struct MeasurementPayloadSchema;

impl Schema for MeasurementPayloadSchema {
    const NAME: &'static str = "MeasurementPayload";
    const CONTENT_SPEC: Option<&'static str> = Some(MEASUREMENT_SPEC);
    const PROPERTIES: &'static [Property] = &[
        Property::object::<Device>("device", "Device").required(),
        Property::object::<Part>("part", "Part"),
        Property::list_of::<Measurement>("measurements", "Measurement"),
    ];
}

/// Top-level measurement message.
pub type MeasurementPayload = Object<MeasurementPayloadSchema>;

impl Object<MeasurementPayloadSchema> {
    pub fn for_device(device: Device) -> Result<Self, Error> {
        let mut payload = Self::new();
        payload.set("device", device)?;
        Ok(payload)
    }

    pub fn device(&self) -> Option<&Device> {
        self.get_entity("device")
    }

    pub fn part(&self) -> Option<&Part> {
        self.get_entity("part")
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.iter_entities::<Measurement>("measurements")
    }

    pub fn push_measurement(&mut self, measurement: Measurement) -> Result<(), Error> {
        self.push_entity("measurements", measurement)
    }
}

/// Optional fields of a measurement built by [`Device::measurement_with`].
#[derive(Debug, Clone, Default)]
pub struct MeasurementOptions {
    /// Sample time; now if unset.
    pub ts: Option<DateTime<FixedOffset>>,
    pub part: Option<Part>,
    pub result: Option<String>,
    pub code: Option<String>,
}

impl Object<DeviceSchema> {
    /// Builds and serializes a measurement payload with a single sample
    /// taken now. Each value names a dimension.
    ///
    /// ```
    /// use ppmp::payload::Device;
    ///
    /// let device = Device::with_id("Device-001").unwrap();
    /// let json = device.measurement([("temperature", 45.6)]).unwrap();
    /// assert!(json.contains(r#""temperature":[45.6]"#));
    /// ```
    pub fn measurement<I, K, V>(&self, values: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.measurement_with(MeasurementOptions::default(), values)
    }

    /// Like [`measurement`](Self::measurement) with explicit options.
    pub fn measurement_with<I, K, V>(&self, options: MeasurementOptions, values: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let ts = options.ts.unwrap_or_else(local_now);
        let values: Vec<(String, Value)> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();

        let mut payload = MeasurementPayload::for_device(self.clone())?;
        if let Some(part) = options.part {
            payload.set("part", part)?;
        }

        let mut measurement = Measurement::new();
        measurement.set("ts", ts)?;
        measurement.set("result", options.result)?;
        measurement.set("code", options.code)?;
        measurement.set(
            "series",
            Series::with_dimensions(values.iter().map(|(name, _)| name.clone()))?,
        )?;
        measurement.add_sample(ts, values)?;

        payload.push_measurement(measurement)?;
        dumps(&payload)
    }
}
