//! Per-post aggregation of streamed attachment and message fragments.
//!
//! The aggregator is owned by the producer worker of one session, so it is
//! plain mutable state with no locking.

use cw_types::{AttachmentType, Envelope, EventCategory, EventType, ExtraFields, PostEventType};
use tracing::{debug, trace, warn};

use crate::envelope::build_envelope;
use crate::fence::render_message;
use crate::render::{render_post, Attachment, PostSnapshot};

/// Accumulates the post currently being produced and decides which
/// rendered snapshots to emit.
#[derive(Debug, Default)]
pub struct PostAggregator {
    post: PostSnapshot,
    open: bool,
}

impl PostAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &PostSnapshot {
        &self.post
    }

    /// True between `post_start` and `post_end`.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn reset(&mut self) {
        self.post = PostSnapshot::default();
    }

    /// Apply one post event and return the envelopes to deliver, in order.
    pub fn handle(
        &mut self,
        event_type: PostEventType,
        message: &str,
        extra: &ExtraFields,
    ) -> Vec<Envelope> {
        if !self.open && event_type != PostEventType::PostStart {
            debug!(event = event_type.as_str(), "Post event without an open post");
        }

        match event_type {
            PostEventType::PostStart => {
                self.reset();
                self.open = true;
            }
            PostEventType::PostEnd => return self.finish(message, extra),
            PostEventType::PostAttachmentUpdate => self.update_attachment(message, extra),
            PostEventType::PostSendToUpdate => match extra.get_str("role") {
                Some(role) => self.post.send_to = role.to_string(),
                None => warn!("post_send_to_update without a role"),
            },
            PostEventType::PostMessageUpdate => {
                let is_end = extra.get_bool("is_end").unwrap_or(false);
                self.append_message(message);
                if is_end {
                    self.post.message_is_end = true;
                }
            }
            PostEventType::PostStatusUpdate => self.post.status = message.to_string(),
            PostEventType::PostError => {
                warn!(error = %message, "Agent reported a post error");
            }
        }

        self.emit(event_type, extra)
    }

    /// Emission policy: stream a snapshot until the message has ended and
    /// been sent. The first time the message ends, follow the snapshot with
    /// a synthetic `post_message_update` carrying the final message markup.
    fn emit(&mut self, event_type: PostEventType, extra: &ExtraFields) -> Vec<Envelope> {
        let mut out = Vec::new();
        if self.post.message_is_end && self.post.message_sent {
            trace!(event = event_type.as_str(), "Message already delivered, holding snapshot");
            return out;
        }

        out.push(build_envelope(
            EventCategory::Post,
            EventType::Post(event_type),
            render_post(&self.post, false),
            extra,
        ));

        if self.post.message_is_end {
            self.post.message_sent = true;
            out.push(build_envelope(
                EventCategory::Post,
                EventType::Post(PostEventType::PostMessageUpdate),
                render_message(&self.post.message, true),
                &ExtraFields::new().with("is_end", true),
            ));
        }
        out
    }

    fn finish(&mut self, message: &str, extra: &ExtraFields) -> Vec<Envelope> {
        self.append_message(message);
        let envelope = build_envelope(
            EventCategory::Post,
            EventType::Post(PostEventType::PostEnd),
            render_post(&self.post, true),
            extra,
        );
        self.reset();
        self.open = false;
        vec![envelope]
    }

    fn append_message(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if self.post.message_is_end {
            warn!(len = fragment.len(), "Dropping message fragment after message end");
            return;
        }
        self.post.message.push_str(fragment);
    }

    fn update_attachment(&mut self, fragment: &str, extra: &ExtraFields) {
        let id = extra.get_str("id").unwrap_or_else(|| {
            warn!("post_attachment_update without an id");
            ""
        });
        let kind = extra
            .get_str("type")
            .map(AttachmentType::from)
            .unwrap_or_else(|| AttachmentType::Other("unknown".to_string()));
        let is_end = extra.get_bool("is_end").unwrap_or(false);

        match self.post.attachments.last_mut() {
            Some(last) if last.id == id => {
                last.content.push_str(fragment);
                last.is_end = is_end;
            }
            _ => self.post.attachments.push(Attachment {
                id: id.to_string(),
                kind,
                content: fragment.to_string(),
                is_end,
            }),
        }
    }
}
