//! The process message: data of discrete processes, with process, part and
//! per-phase measurement information.

use chrono::{DateTime, FixedOffset};

use crate::error::Error;
use crate::model::{
    DimensionKind, Dimensions, Object, Property, Samples, Schema, Series, Value,
    add_timed_sample, default_entity, timed_samples,
};
use crate::payload::common::{Device, code, meta_data, result};
use crate::util::datetime::local_now;

pub const PROCESS_SPEC: &str = "urn:spec://eclipse.org/unide/process-message#v2";

/// Values of `Part.type`.
pub const PART_TYPES: &[&str] = &["SINGLE", "BATCH"];

pub struct PartSchema;

impl Schema for PartSchema {
    const NAME: &'static str = "Part";
    const PROPERTIES: &'static [Property] = &[
        Property::text("partTypeID"),
        Property::text("type").one_of(PART_TYPES),
        Property::text("partID").max_len(256).required(),
        result(),
        code(),
        meta_data(),
    ];
}

/// The part (or batch of parts) being processed.
pub type Part = Object<PartSchema>;

impl Object<PartSchema> {
    pub fn with_id(part_id: impl Into<String>) -> Result<Self, Error> {
        let mut part = Self::new();
        part.set("partID", part_id.into())?;
        Ok(part)
    }

    pub fn part_id(&self) -> Option<&str> {
        self.get_str("partID")
    }

    /// SINGLE or BATCH.
    pub fn part_type(&self) -> Option<&str> {
        self.get_str("type")
    }
}

pub struct ProgramSchema;

impl Schema for ProgramSchema {
    const NAME: &'static str = "Program";
    const PROPERTIES: &'static [Property] = &[
        Property::text("id").max_len(36).required(),
        Property::text("name").max_len(256).required(),
        Property::datetime("lastChangedDate"),
    ];
}

/// The program that ran the process.
pub type Program = Object<ProgramSchema>;

impl Object<ProgramSchema> {
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Result<Self, Error> {
        let mut program = Self::new();
        program.set("id", id.into())?;
        program.set("name", name.into())?;
        Ok(program)
    }
}

pub struct ShutoffValueSchema;

impl Schema for ShutoffValueSchema {
    const NAME: &'static str = "ShutoffValue";
    const PROPERTIES: &'static [Property] = &[
        Property::float("value"),
        Property::datetime("ts"),
        Property::float("upperError"),
        Property::float("lowerError"),
        Property::float("upperWarning"),
        Property::float("lowerWarning"),
    ];
}

/// The value of a measurement point that stopped the process, with its
/// limits.
pub type ShutoffValue = Object<ShutoffValueSchema>;

pub struct ShutoffValuesKind;

impl DimensionKind for ShutoffValuesKind {
    const NAME: &'static str = "ShutoffValues";
    type Element = ShutoffValue;
}

pub type ShutoffValues = Dimensions<ShutoffValuesKind>;

pub struct ProcessSchema;

impl Schema for ProcessSchema {
    const NAME: &'static str = "Process";
    const PROPERTIES: &'static [Property] = &[
        Property::datetime("ts").required(),
        Property::text("externalProcessId").max_len(36),
        result(),
        Property::text("shutoffPhase"),
        meta_data(),
        Property::object::<Program>("program", "Program"),
        Property::object::<ShutoffValues>("shutoffValues", "ShutoffValues")
            .with_default(default_entity::<ShutoffValues>),
    ];
}

/// Information about one run of the process.
pub type Process = Object<ProcessSchema>;

impl Object<ProcessSchema> {
    /// Creates a process started at `ts`, now if `None`.
    pub fn started(ts: Option<DateTime<FixedOffset>>) -> Result<Self, Error> {
        let mut process = Self::new();
        process.set("ts", ts.unwrap_or_else(local_now))?;
        Ok(process)
    }

    pub fn ts(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("ts")
    }

    pub fn program(&self) -> Option<&Program> {
        self.get_entity("program")
    }

    pub fn shutoff_values(&self) -> Option<&ShutoffValues> {
        self.get_entity("shutoffValues")
    }

    pub fn shutoff_values_mut(&mut self) -> Result<&mut ShutoffValues, Error> {
        self.entity_mut("shutoffValues")
    }
}

pub struct SpecialValueSchema;

impl Schema for SpecialValueSchema {
    const NAME: &'static str = "SpecialValue";
    const PROPERTIES: &'static [Property] = &[
        Property::float("time"),
        Property::text("name"),
        Property::real_number_map("value").required(),
    ];
}

/// A notable value during a process phase, optionally at a time offset.
pub type SpecialValue = Object<SpecialValueSchema>;

impl Object<SpecialValueSchema> {
    /// Creates a special value from measurement point name to number.
    pub fn with_values<I, K, V>(values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect::<crate::model::Fields>();
        let mut special = Self::new();
        special.set("value", map)?;
        Ok(special)
    }
}

pub struct LimitSchema;

impl Schema for LimitSchema {
    const NAME: &'static str = "Limit";
    const PROPERTIES: &'static [Property] = &[
        Property::number_or_list("upperError"),
        Property::number_or_list("lowerError"),
        Property::number_or_list("upperWarning"),
        Property::number_or_list("lowerWarning"),
        Property::number_or_list("target"),
    ];
}

/// Thresholds of a process measurement point; each is a number or, for
/// time-varying limits, an array aligned with the series.
pub type Limit = Object<LimitSchema>;

pub struct LimitsKind;

impl DimensionKind for LimitsKind {
    const NAME: &'static str = "Limits";
    type Element = Limit;
}

pub type Limits = Dimensions<LimitsKind>;

pub struct MeasurementSchema;

impl Schema for MeasurementSchema {
    const NAME: &'static str = "Measurement";
    const PROPERTIES: &'static [Property] = &[
        Property::datetime("ts").required(),
        Property::text("phase").max_len(256),
        Property::text("name").max_len(256),
        result(),
        code(),
        Property::list_of::<SpecialValue>("specialValues", "SpecialValue"),
        Property::object::<Series>("series", "Series").with_default(default_entity::<Series>),
        Property::object::<Limits>("limits", "Limits").with_default(default_entity::<Limits>),
    ];
}

/// Measurements of one process phase.
pub type Measurement = Object<MeasurementSchema>;

impl Object<MeasurementSchema> {
    /// Creates a phase measurement at `ts` (now if `None`) with the given
    /// series dimensions declared.
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

    pub fn phase(&self) -> Option<&str> {
        self.get_str("phase")
    }

    pub fn series(&self) -> Option<&Series> {
        self.get_entity("series")
    }

    pub fn series_mut(&mut self) -> Result<&mut Series, Error> {
        self.entity_mut("series")
    }

    pub fn limits(&self) -> Option<&Limits> {
        self.get_entity("limits")
    }

    pub fn limits_mut(&mut self) -> Result<&mut Limits, Error> {
        self.entity_mut("limits")
    }

    pub fn special_values(&self) -> impl Iterator<Item = &SpecialValue> {
        self.iter_entities::<SpecialValue>("specialValues")
    }

    pub fn push_special_value(&mut self, value: SpecialValue) -> Result<(), Error> {
        self.push_entity("specialValues", value)
    }

    /// Records a sample taken at `ts`, offset from the phase's `ts`.
    pub fn add_sample<I, K, V>(&mut self, ts: DateTime<FixedOffset>, values: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        add_timed_sample(self, ts, values)
    }

    pub fn samples(&self) -> Samples<'_> {
        timed_samples(self)
    }
}

pub struct ProcessPayloadSchema;

impl Schema for ProcessPayloadSchema {
    const NAME: &'static str = "ProcessPayload";
    const CONTENT_SPEC: Option<&'static str> = Some(PROCESS_SPEC);
    const PROPERTIES: &'static [Property] = &[
        Property::object::<Device>("device", "Device").required(),
        Property::object::<Part>("part", "Part"),
        Property::object::<Process>("process", "Process").required(),
        Property::list_of::<Measurement>("measurements", "Measurement"),
    ];
}

/// Top-level process message.
pub type ProcessPayload = Object<ProcessPayloadSchema>;

impl Object<ProcessPayloadSchema> {
    pub fn for_process(device: Device, process: Process) -> Result<Self, Error> {
        let mut payload = Self::new();
        payload.set("device", device)?;
        payload.set("process", process)?;
        Ok(payload)
    }

    pub fn device(&self) -> Option<&Device> {
        self.get_entity("device")
    }

    pub fn part(&self) -> Option<&Part> {
        self.get_entity("part")
    }

    pub fn process(&self) -> Option<&Process> {
        self.get_entity("process")
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.iter_entities::<Measurement>("measurements")
    }

    pub fn push_measurement(&mut self, measurement: Measurement) -> Result<(), Error> {
        self.push_entity("measurements", measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use crate::payload::measurement;
    use crate::util::datetime::parse_datetime;

    fn ts() -> DateTime<FixedOffset> {
        parse_datetime("2002-05-30T09:30:10.123+02:00").unwrap()
    }

    #[test]
    fn test_part_type_and_required_id() {
        let mut part = Part::new();
        assert_eq!(part.problems(), ["Part.partID is missing"]);
        part.set("partID", "P-1").unwrap();
        part.set("type", "BATCH").unwrap();
        assert_eq!(part.part_type(), Some("BATCH"));
        assert!(part.set("type", "PALLET").is_err());
        assert!(part.problems().is_empty());
    }

    #[test]
    fn test_program_lengths() {
        assert!(Program::named("x".repeat(37), "n").is_err());
        let program = Program::named("prog-1", "Drill").unwrap();
        assert!(program.problems().is_empty());
    }

    #[test]
    fn test_special_value_coerces_integers() {
        let special = SpecialValue::with_values([("force", 12)]).unwrap();
        let map = special.get("value").unwrap().as_map().unwrap();
        assert_eq!(map.get("force"), Some(&Value::Float(12.0)));
        assert!(matches!(map.get("force"), Some(Value::Float(_))));
        assert!(SpecialValue::with_values([("force", "strong")]).is_err());
    }

    #[test]
    fn test_limits_accept_numbers_or_arrays() {
        let mut limits = Limits::with_dimensions(["force"]).unwrap();
        let limit = limits.get_mut("force").unwrap();
        limit.set("upperError", vec![1.0, 2.0, 3.0]).unwrap();
        limit.set("target", 2).unwrap();
        assert!(limit.set("lowerError", "low").is_err());
        assert!(limits.problems().is_empty());
    }

    #[test]
    fn test_process_and_shutoff_values() {
        let mut process = Process::started(Some(ts())).unwrap();
        process.set("program", Program::named("p", "Drill").unwrap()).unwrap();
        process
            .shutoff_values_mut()
            .unwrap()
            .dimension_mut("force")
            .unwrap()
            .set("value", 24.7)
            .unwrap();
        assert_eq!(process.program().unwrap().get_str("name"), Some("Drill"));
        assert!(process.problems().is_empty());
    }

    #[test]
    fn test_payload_rejects_foreign_part() {
        let device = Device::with_id("d").unwrap();
        let mut payload = ProcessPayload::for_process(device, Process::started(None).unwrap()).unwrap();
        let foreign = measurement::Part::new();
        let err = payload.set("part", foreign).unwrap_err();
        assert_eq!(err.problems(), ["Part() is not an appropriate value for ProcessPayload.part (wrong type)"]);
    }

    #[test]
    fn test_phase_measurement_samples() {
        let mut phase = Measurement::with_dimensions(Some(ts()), ["force"]).unwrap();
        phase.set("phase", "drilling").unwrap();
        phase.add_sample(ts(), [("force", 1.5)]).unwrap();
        phase
            .push_special_value(SpecialValue::with_values([("max", 3.0)]).unwrap())
            .unwrap();
        assert_eq!(phase.samples().count(), 1);
        assert_eq!(phase.special_values().count(), 1);
        assert!(phase.problems().is_empty());
    }
}
