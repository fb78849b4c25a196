use cw_types::{
    Envelope, EventCategory, EventType, ExtraFields, PostEventType, RoundEventType,
    SessionEventType,
};
use tracing::{debug, trace, warn};

use crate::agent::{EventSink, StopSignal};
use crate::aggregator::PostAggregator;
use crate::delivery::DeliverySender;
use crate::envelope::build_envelope;

/// Producer-side event sink for one session.
///
/// Turns agent callbacks into serialized envelopes and pushes them onto the
/// session's delivery queue. Lives on the worker thread for the duration of
/// one agent call.
pub struct SessionEventHandler {
    session_id: String,
    outbox: DeliverySender<String>,
    stop: StopSignal,
    aggregator: PostAggregator,
    current_round: Option<String>,
    enqueued: usize,
}

impl SessionEventHandler {
    pub fn new(session_id: &str, outbox: DeliverySender<String>, stop: StopSignal) -> Self {
        Self {
            session_id: session_id.to_string(),
            outbox,
            stop,
            aggregator: PostAggregator::new(),
            current_round: None,
            enqueued: 0,
        }
    }

    /// Number of envelopes successfully queued so far.
    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    /// Round most recently reported by the agent.
    pub fn current_round(&self) -> Option<&str> {
        self.current_round.as_deref()
    }

    fn enqueue(&mut self, envelope: Envelope) {
        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to serialize envelope");
                return;
            }
        };
        if self.outbox.send(json).is_err() {
            // The consumer is gone; tell the agent to wind down.
            debug!(session_id = %self.session_id, "Delivery queue closed, dropping envelope");
            self.stop.raise();
            return;
        }
        self.enqueued += 1;
    }
}

impl EventSink for SessionEventHandler {
    fn on_session_event(&mut self, event_type: SessionEventType, message: &str, extra: &ExtraFields) {
        trace!(session_id = %self.session_id, event = event_type.as_str(), "Session event");
        self.enqueue(build_envelope(
            EventCategory::Session,
            EventType::Session(event_type),
            message,
            extra,
        ));
    }

    fn on_round_event(
        &mut self,
        round_id: &str,
        event_type: RoundEventType,
        message: &str,
        extra: &ExtraFields,
    ) {
        trace!(session_id = %self.session_id, round_id, event = event_type.as_str(), "Round event");
        self.current_round = Some(round_id.to_string());
        self.enqueue(build_envelope(
            EventCategory::Round,
            EventType::Round(event_type),
            message,
            extra,
        ));
    }

    fn on_post_event(
        &mut self,
        post_id: &str,
        round_id: &str,
        event_type: PostEventType,
        message: &str,
        extra: &ExtraFields,
    ) {
        trace!(
            session_id = %self.session_id,
            post_id,
            round_id,
            event = event_type.as_str(),
            "Post event"
        );
        for envelope in self.aggregator.handle(event_type, message, extra) {
            self.enqueue(envelope);
        }
    }
}
