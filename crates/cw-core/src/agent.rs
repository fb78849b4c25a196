//! Seam between the (blocking, external) agent runtime and this crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cw_types::{
    AgentEvent, EventScope, EventType, ExtraFields, PostEventType, Result, RoundEventType,
    SessionEventType,
};
use tracing::warn;

/// Callbacks the agent runtime invokes, synchronously on its own thread,
/// for every structural event it produces.
pub trait EventSink: Send {
    fn on_session_event(&mut self, event_type: SessionEventType, message: &str, extra: &ExtraFields);

    fn on_round_event(
        &mut self,
        round_id: &str,
        event_type: RoundEventType,
        message: &str,
        extra: &ExtraFields,
    );

    fn on_post_event(
        &mut self,
        post_id: &str,
        round_id: &str,
        event_type: PostEventType,
        message: &str,
        extra: &ExtraFields,
    );
}

/// A conversational agent driven by blocking calls.
///
/// `send_message` runs to completion on the caller's thread, reporting
/// progress through `sink`. Implementations should poll `stop` and bail out
/// with [`cw_types::ChatWeaveError::Cancelled`] once it is raised.
pub trait AgentRuntime: Send + Sync + 'static {
    fn send_message(
        &self,
        text: &str,
        sink: &mut dyn EventSink,
        stop: &StopSignal,
    ) -> Result<serde_json::Value>;
}

/// Cooperative cancellation flag shared between a session and its worker.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Route a recorded event to the matching sink callback.
///
/// Events whose kind does not match their scope are skipped with a warning.
pub fn dispatch(event: &AgentEvent, sink: &mut dyn EventSink) {
    match (&event.scope, event.event_type) {
        (EventScope::Session, EventType::Session(t)) => {
            sink.on_session_event(t, &event.message, &event.extra)
        }
        (EventScope::Round { round_id }, EventType::Round(t)) => {
            sink.on_round_event(round_id, t, &event.message, &event.extra)
        }
        (EventScope::Post { post_id, round_id }, EventType::Post(t)) => {
            sink.on_post_event(post_id, round_id, t, &event.message, &event.extra)
        }
        (scope, event_type) => warn!(
            scope = %scope.category(),
            event = event_type.name(),
            "Skipping event with mismatched scope"
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Sink that records `category:type:message` lines.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub lines: Vec<String>,
    }

    impl EventSink for RecordingSink {
        fn on_session_event(&mut self, t: SessionEventType, message: &str, _: &ExtraFields) {
            self.lines.push(format!("session:{}:{message}", t.as_str()));
        }

        fn on_round_event(&mut self, round_id: &str, t: RoundEventType, message: &str, _: &ExtraFields) {
            self.lines.push(format!("round[{round_id}]:{}:{message}", t.as_str()));
        }

        fn on_post_event(
            &mut self,
            post_id: &str,
            round_id: &str,
            t: PostEventType,
            message: &str,
            _: &ExtraFields,
        ) {
            self.lines
                .push(format!("post[{post_id}/{round_id}]:{}:{message}", t.as_str()));
        }
    }

    #[test]
    fn stop_signal_is_shared() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        assert!(!clone.is_raised());
        stop.raise();
        assert!(clone.is_raised());
    }

    #[test]
    fn dispatch_routes_by_scope() {
        let mut sink = RecordingSink::default();
        let events = [
            AgentEvent::new(EventScope::Session, SessionEventType::SessionStart, "", ExtraFields::new()),
            AgentEvent::new(
                EventScope::Round { round_id: "r1".into() },
                RoundEventType::RoundStart,
                "go",
                ExtraFields::new(),
            ),
            AgentEvent::new(
                EventScope::Post { post_id: "p1".into(), round_id: "r1".into() },
                PostEventType::PostStart,
                "",
                ExtraFields::new(),
            ),
        ];
        for event in &events {
            dispatch(event, &mut sink);
        }
        assert_eq!(
            sink.lines,
            vec![
                "session:session_start:",
                "round[r1]:round_start:go",
                "post[p1/r1]:post_start:",
            ]
        );
    }

    #[test]
    fn dispatch_skips_mismatched_scope() {
        let mut sink = RecordingSink::default();
        let event = AgentEvent::new(
            EventScope::Session,
            PostEventType::PostStart,
            "",
            ExtraFields::new(),
        );
        dispatch(&event, &mut sink);
        assert!(sink.lines.is_empty());
    }
}
