use serde::Deserialize;

use crate::enums::{EventCategory, EventType};
use crate::error::{ChatWeaveError, Result};
use crate::extra::ExtraFields;

/// Emitter scope of an agent event, with the identifiers that scope carries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum EventScope {
    Session,
    Round { round_id: String },
    Post { post_id: String, round_id: String },
}

impl EventScope {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Session => EventCategory::Session,
            Self::Round { .. } => EventCategory::Round,
            Self::Post { .. } => EventCategory::Post,
        }
    }
}

/// One structural event as recorded in an agent script.
///
/// ```json
/// {"scope":"post","post_id":"p1","round_id":"r1",
///  "type":"post_message_update","message":"Hi","extra":{"is_end":false}}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentEvent {
    #[serde(flatten)]
    pub scope: EventScope,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extra: ExtraFields,
}

impl AgentEvent {
    pub fn new(
        scope: EventScope,
        event_type: impl Into<EventType>,
        message: impl Into<String>,
        extra: ExtraFields,
    ) -> Self {
        Self {
            scope,
            event_type: event_type.into(),
            message: message.into(),
            extra,
        }
    }

    /// Check that the event kind belongs to the scope it was emitted from.
    pub fn validate(&self) -> Result<()> {
        let kind = self.event_type.category();
        let scope = self.scope.category();
        if kind != scope {
            return Err(ChatWeaveError::Protocol(format!(
                "event type {} is not a {scope} event",
                self.event_type.name()
            )));
        }
        Ok(())
    }

    /// Parse one JSON line of an agent script.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let event: Self = serde_json::from_str(line)?;
        event.validate()?;
        Ok(event)
    }
}
