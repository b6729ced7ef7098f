//! The machine message: interpretations of measurement data or status
//! sent by a device or an integrator.

use chrono::{DateTime, FixedOffset};

use crate::codec::dumps;
use crate::error::Error;
use crate::model::{Object, Property, Schema};
use crate::payload::common::{Device, DeviceSchema, code, meta_data};
use crate::util::datetime::local_now;

pub const MESSAGE_SPEC: &str = "urn:spec://eclipse.org/unide/machine-message#v2";

/// Values of `Message.type`.
pub const MESSAGE_TYPES: &[&str] = &["DEVICE", "TECHNICAL_INFO"];

/// Values of `Message.severity`.
pub const SEVERITIES: &[&str] = &["HIGH", "MEDIUM", "LOW", "UNKNOWN"];

pub struct MessageSchema;

impl Schema for MessageSchema {
    const NAME: &'static str = "Message";
    const PROPERTIES: &'static [Property] = &[
        Property::datetime("ts"),
        Property::text("origin"),
        Property::text("type").one_of(MESSAGE_TYPES),
        Property::text("severity").one_of(SEVERITIES),
        code().required(),
        Property::text("title").max_len(1000),
        Property::text("description").max_len(2000),
        Property::text("hint").max_len(2000),
        meta_data(),
    ];
}

/// A machine message identified by its `code`.
pub type Message = Object<MessageSchema>;

impl Object<MessageSchema> {
    pub fn with_code(code: impl Into<String>) -> Result<Self, Error> {
        let mut message = Self::new();
        message.set("code", code.into())?;
        Ok(message)
    }

    pub fn code(&self) -> Option<&str> {
        self.get_str("code")
    }

    pub fn ts(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("ts")
    }

    pub fn severity(&self) -> Option<&str> {
        self.get_str("severity")
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }
}

pub struct MessagePayloadSchema;

impl Schema for MessagePayloadSchema {
    const NAME: &'static str = "MessagePayload";
    const CONTENT_SPEC: Option<&'static str> = Some(MESSAGE_SPEC);
    const PROPERTIES: &'static [Property] = &[
        Property::object::<Device>("device", "Device").required(),
        Property::list_of::<Message>("messages", "Message"),
    ];
}

/// Top-level machine message.
pub type MessagePayload = Object<MessagePayloadSchema>;

impl Object<MessagePayloadSchema> {
    pub fn for_device(device: Device) -> Result<Self, Error> {
        let mut payload = Self::new();
        payload.set("device", device)?;
        Ok(payload)
    }

    pub fn device(&self) -> Option<&Device> {
        self.get_entity("device")
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.iter_entities::<Message>("messages")
    }

    pub fn push_message(&mut self, message: Message) -> Result<(), Error> {
        self.push_entity("messages", message)
    }
}

/// Optional fields of a message built by [`Device::message_with`].
#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    /// Message time; now if unset.
    pub ts: Option<DateTime<FixedOffset>>,
    pub origin: Option<String>,
    pub message_type: Option<String>,
    pub severity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hint: Option<String>,
    /// `metaData` entries.
    pub meta: Vec<(String, String)>,
}

impl Object<DeviceSchema> {
    /// Builds and serializes a message payload with one message stamped
    /// now.
    pub fn message(&self, code: &str) -> Result<String, Error> {
        self.message_with(code, MessageOptions::default())
    }

    /// Like [`message`](Self::message) with explicit options.
    pub fn message_with(&self, code: &str, options: MessageOptions) -> Result<String, Error> {
        let mut message = Message::new();
        message.set("ts", options.ts.unwrap_or_else(local_now))?;
        message.set("code", code)?;
        message.set("origin", options.origin)?;
        message.set("type", options.message_type)?;
        message.set("severity", options.severity)?;
        message.set("title", options.title)?;
        message.set("description", options.description)?;
        message.set("hint", options.hint)?;
        for (key, value) in options.meta {
            message.insert_meta(key, value)?;
        }

        let mut payload = MessagePayload::for_device(self.clone())?;
        payload.push_message(message)?;
        dumps(&payload)
    }
}
