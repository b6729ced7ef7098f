//! Entities and properties shared by all PPMP payloads.

use crate::error::Error;
use crate::model::{Object, Property, Schema};

/// Values of the `result` fields.
pub const RESULT_VALUES: &[&str] = &["OK", "NOK", "UNKNOWN"];

/// Quality of the produced part: OK, NOK or UNKNOWN.
pub const fn result() -> Property {
    Property::text("result").one_of(RESULT_VALUES)
}

/// Addendum to a result, typically a PLC code.
pub const fn code() -> Property {
    Property::text("code").max_len(36)
}

/// Open string to string map.
pub const fn meta_data() -> Property {
    Property::string_map("metaData")
}

pub struct DeviceSchema;

impl Schema for DeviceSchema {
    const NAME: &'static str = "Device";
    const PROPERTIES: &'static [Property] = &[
        Property::text("deviceID").max_len(36).required(),
        Property::text("operationalStatus"),
        meta_data(),
    ];
}

/// The device that sends a payload. `deviceID` should be stable and
/// unique, e.g. a UUID.
pub type Device = Object<DeviceSchema>;

impl Object<DeviceSchema> {
    /// Creates a device. Fails if `device_id` is longer than 36 characters.
    pub fn with_id(device_id: impl Into<String>) -> Result<Self, Error> {
        let mut device = Self::new();
        device.set("deviceID", device_id.into())?;
        Ok(device)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.get_str("deviceID")
    }

    pub fn operational_status(&self) -> Option<&str> {
        self.get_str("operationalStatus")
    }

    pub fn set_operational_status(&mut self, status: Option<&str>) -> Result<(), Error> {
        self.set("operationalStatus", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, Value};

    #[test]
    fn test_device_id_required() {
        let device = Device::new();
        assert_eq!(device.problems(), ["Device.deviceID is missing"]);

        let mut device = Device::with_id("0910298309812398").unwrap();
        assert_eq!(device.device_id(), Some("0910298309812398"));
        let err = device.set("deviceID", Value::Null).unwrap_err();
        assert_eq!(err.problems(), ["Device.deviceID may not be 'null'"]);
        assert_eq!(device.device_id(), Some("0910298309812398"));
    }

    #[test]
    fn test_device_id_length() {
        let err = Device::with_id("x".repeat(37)).unwrap_err();
        assert_eq!(err.problems(), ["Device.deviceID may not be longer than 36"]);
    }

    #[test]
    fn test_meta_data() {
        let mut device = Device::with_id("d").unwrap();
        device.insert_meta("firmware", "1.2").unwrap();
        device.set_operational_status(Some("running")).unwrap();
        assert_eq!(device.meta("firmware"), Some("1.2"));
        assert_eq!(device.operational_status(), Some("running"));
        assert!(device.problems().is_empty());
    }
}
