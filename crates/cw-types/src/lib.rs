pub mod envelope;
pub mod enums;
pub mod error;
pub mod event;
pub mod extra;

// Re-exports for convenience
pub use envelope::{Envelope, EventTypeInfo, CHAT_MESSAGE};
pub use enums::{
    AttachmentType, EventCategory, EventType, PostEventType, RoundEventType, SessionEventType,
};
pub use error::{ChatWeaveError, Result};
pub use event::{AgentEvent, EventScope};
pub use extra::{ExtraFields, ExtraValue};
