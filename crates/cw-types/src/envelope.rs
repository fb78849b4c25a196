use serde::{Deserialize, Serialize};

use crate::enums::{EventCategory, EventType};

/// Value of the `type` field on every streamed envelope.
pub const CHAT_MESSAGE: &str = "chat_message";

/// `{name, value}` pair describing an event kind on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeInfo {
    pub name: String,
    pub value: String,
}

impl From<EventType> for EventTypeInfo {
    fn from(t: EventType) -> Self {
        Self {
            name: t.name().to_string(),
            value: t.value().to_string(),
        }
    }
}

/// Client-bound representation of one structural event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub event_category: EventCategory,
    pub event_type: EventTypeInfo,
    pub message: String,
    pub details: serde_json::Value,
}

impl Envelope {
    pub fn new(
        event_category: EventCategory,
        event_type: impl Into<EventTypeInfo>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            kind: CHAT_MESSAGE.to_string(),
            event_category,
            event_type: event_type.into(),
            message: message.into(),
            details,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
