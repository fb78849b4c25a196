//! Session registry and the per-turn producer worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cw_types::{ChatWeaveError, Result};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::agent::{AgentRuntime, StopSignal};
use crate::delivery::{delivery_queue, DeliveryReceiver, DeliverySender};
use crate::handler::SessionEventHandler;

/// Frame sent when a message arrives while a turn is still running.
pub const BUSY_ERROR: &str = "Agent is busy";

/// State for one authenticated client session.
#[derive(Debug)]
pub struct ChatSession {
    pub id: String,
    pub datasource_id: String,
    pub created_at: DateTime<Utc>,
    auth_token: String,
    outbox: DeliverySender<String>,
    stop: StopSignal,
    busy: AtomicBool,
}

impl ChatSession {
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn outbox(&self) -> DeliverySender<String> {
        self.outbox.clone()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Whether an agent turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Signal the in-flight agent call (if any) to stop.
    pub fn end(&self) {
        self.stop.raise();
    }

    /// Queue a non-envelope frame, e.g. the final reply or an error.
    pub fn push_frame(&self, frame: &serde_json::Value) -> Result<()> {
        self.outbox.send(serde_json::to_string(frame)?)
    }
}

/// Clears the busy flag when a turn finishes, even by panic.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Session id -> session state, owned by the transport layer.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a session and hand back its delivery receiver.
    ///
    /// A replaced session is ended, so its worker winds down.
    pub async fn create(
        &self,
        session_id: &str,
        datasource_id: &str,
        auth_token: &str,
    ) -> (Arc<ChatSession>, DeliveryReceiver<String>) {
        let (outbox, inbox) = delivery_queue();
        let session = Arc::new(ChatSession {
            id: session_id.to_string(),
            datasource_id: datasource_id.to_string(),
            created_at: Utc::now(),
            auth_token: auth_token.to_string(),
            outbox,
            stop: StopSignal::new(),
            busy: AtomicBool::new(false),
        });

        let previous = self
            .sessions
            .write()
            .await
            .insert(session_id.to_string(), session.clone());
        if let Some(previous) = previous {
            warn!(session_id, "Replacing existing session");
            previous.end();
        }
        info!(session_id, datasource_id, "Session created");
        (session, inbox)
    }

    pub async fn lookup(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Remove a session and stop its worker. Undelivered envelopes are
    /// discarded with the receiver.
    pub async fn remove(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        let removed = self.sessions.write().await.remove(session_id);
        if let Some(session) = &removed {
            session.end();
            info!(session_id, "Session removed");
        }
        removed
    }

    /// Remove only if the registered session is `session` itself, so a
    /// closing connection cannot evict its replacement.
    pub async fn remove_if_same(&self, session: &Arc<ChatSession>) -> bool {
        let mut sessions = self.sessions.write().await;
        let same = sessions
            .get(&session.id)
            .is_some_and(|current| Arc::ptr_eq(current, session));
        if same {
            sessions.remove(&session.id);
            info!(session_id = %session.id, "Session removed");
        }
        session.end();
        same
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Run one agent call for `session` on a blocking worker.
///
/// Events stream onto the session queue while the call runs; the final
/// reply (`{"message": ..}`) or failure (`{"error": ..}`) is queued last,
/// so the client sees it after every envelope of the turn.
pub async fn run_agent_turn(
    session: Arc<ChatSession>,
    agent: Arc<dyn AgentRuntime>,
    text: String,
) -> Result<serde_json::Value> {
    if session.busy.swap(true, Ordering::SeqCst) {
        debug!(session_id = %session.id, "Rejecting message while busy");
        if session.push_frame(&json!({ "error": BUSY_ERROR })).is_err() {
            debug!(session_id = %session.id, "Session closed before the busy error was queued");
        }
        return Err(ChatWeaveError::Session(BUSY_ERROR.to_string()));
    }
    let _guard = BusyGuard(&session.busy);

    let worker_session = session.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut handler = SessionEventHandler::new(
            &worker_session.id,
            worker_session.outbox(),
            worker_session.stop.clone(),
        );
        let result = agent.send_message(&text, &mut handler, &worker_session.stop);
        debug!(
            session_id = %worker_session.id,
            envelopes = handler.enqueued(),
            "Agent call returned"
        );
        result
    })
    .await
    .map_err(|e| ChatWeaveError::Agent(format!("agent worker failed: {e}")))
    .and_then(|r| r);

    let frame = match &result {
        Ok(reply) => json!({ "message": reply }),
        Err(ChatWeaveError::Cancelled) => {
            info!(session_id = %session.id, "Agent call cancelled");
            json!({ "error": ChatWeaveError::Cancelled.to_string() })
        }
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Agent call failed");
            json!({ "error": e.to_string() })
        }
    };
    if session.push_frame(&frame).is_err() {
        debug!(session_id = %session.id, "Session closed before the reply was queued");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EventSink;
    use crate::scripted::ScriptedAgent;
    use cw_types::{ExtraFields, PostEventType};
    use std::time::Duration;

    struct FailingAgent;

    impl AgentRuntime for FailingAgent {
        fn send_message(
            &self,
            _text: &str,
            _sink: &mut dyn EventSink,
            _stop: &StopSignal,
        ) -> Result<serde_json::Value> {
            Err(ChatWeaveError::Agent("model unavailable".to_string()))
        }
    }

    /// Starts a post, streams part of its message, then fails.
    struct HalfwayAgent;

    impl AgentRuntime for HalfwayAgent {
        fn send_message(
            &self,
            _text: &str,
            sink: &mut dyn EventSink,
            _stop: &StopSignal,
        ) -> Result<serde_json::Value> {
            let none = ExtraFields::new();
            let open = ExtraFields::new().with("is_end", false);
            sink.on_post_event("p1", "r1", PostEventType::PostStart, "", &none);
            sink.on_post_event("p1", "r1", PostEventType::PostMessageUpdate, "partial", &open);
            Err(ChatWeaveError::Agent("crash".to_string()))
        }
    }

    #[tokio::test]
    async fn registry_lifecycle() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let (session, _rx) = registry.create("abc-1", "7", "tok").await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(session.datasource_id, "7");
        assert_eq!(session.auth_token(), "tok");

        let found = registry.lookup("abc-1").await.unwrap();
        assert!(Arc::ptr_eq(&found, &session));

        let removed = registry.remove("abc-1").await.unwrap();
        assert!(removed.stop_signal().is_raised());
        assert!(registry.lookup("abc-1").await.is_none());
        assert!(registry.remove("abc-1").await.is_none());
    }

    #[tokio::test]
    async fn create_replaces_and_ends_previous() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = registry.create("s", "1", "t").await;
        let (second, _rx2) = registry.create("s", "1", "t").await;
        assert!(first.stop_signal().is_raised());
        assert!(!second.stop_signal().is_raised());
        assert_eq!(registry.len().await, 1);

        // The old connection closing must not evict the new session.
        assert!(!registry.remove_if_same(&first).await);
        assert!(registry.lookup("s").await.is_some());
        assert!(registry.remove_if_same(&second).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn turn_queues_envelopes_then_reply() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.create("s", "1", "t").await;
        let agent: Arc<dyn AgentRuntime> = Arc::new(ScriptedAgent::demo(Duration::ZERO));

        let reply = run_agent_turn(session.clone(), agent, "hi".to_string())
            .await
            .unwrap();
        assert_eq!(reply["post_count"], 3);
        assert!(!session.is_busy());

        let mut frames = Vec::new();
        while let Some(frame) = rx.try_recv() {
            frames.push(serde_json::from_str::<serde_json::Value>(&frame).unwrap());
        }
        assert!(frames.len() > 3);
        assert!(frames[..frames.len() - 1]
            .iter()
            .all(|f| f["type"] == "chat_message"));
        let last = frames.last().unwrap();
        assert_eq!(last["message"]["user_query"], "hi");
    }

    #[tokio::test]
    async fn partial_output_precedes_error_frame() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.create("s", "1", "t").await;
        let agent: Arc<dyn AgentRuntime> = Arc::new(HalfwayAgent);

        let err = run_agent_turn(session.clone(), agent, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatWeaveError::Agent(_)));

        let mut frames = Vec::new();
        while let Some(frame) = rx.try_recv() {
            frames.push(serde_json::from_str::<serde_json::Value>(&frame).unwrap());
        }
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["event_type"]["name"], "post_start");
        assert_eq!(frames[1]["event_type"]["name"], "post_message_update");
        assert!(frames[1]["message"].as_str().unwrap().contains("partial"));
        assert_eq!(frames[2], serde_json::json!({ "error": "Agent error: crash" }));
    }

    #[tokio::test]
    async fn failing_agent_is_surfaced() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.create("s", "1", "t").await;
        let agent: Arc<dyn AgentRuntime> = Arc::new(FailingAgent);

        let err = run_agent_turn(session.clone(), agent, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatWeaveError::Agent(_)));
        assert!(!session.is_busy());

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["error"], "Agent error: model unavailable");
    }

    #[tokio::test]
    async fn busy_session_rejects_second_turn() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.create("s", "1", "t").await;
        session.busy.store(true, Ordering::SeqCst);
        let agent: Arc<dyn AgentRuntime> = Arc::new(FailingAgent);

        let err = run_agent_turn(session.clone(), agent, "hi".to_string())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(BUSY_ERROR));
        // The running turn still owns the flag.
        assert!(session.is_busy());
        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["error"], BUSY_ERROR);
    }

    #[tokio::test]
    async fn busy_rejection_survives_closed_queue() {
        let registry = SessionRegistry::new();
        let (session, rx) = registry.create("s", "1", "t").await;
        drop(rx);
        session.busy.store(true, Ordering::SeqCst);
        let agent: Arc<dyn AgentRuntime> = Arc::new(FailingAgent);

        let err = run_agent_turn(session.clone(), agent, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatWeaveError::Session(_)));
        assert!(session.is_busy());
    }

    #[tokio::test]
    async fn ended_session_cancels_turn() {
        let registry = SessionRegistry::new();
        let (session, _rx) = registry.create("s", "1", "t").await;
        session.end();
        let agent: Arc<dyn AgentRuntime> = Arc::new(ScriptedAgent::demo(Duration::ZERO));
        let err = run_agent_turn(session, agent, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatWeaveError::Cancelled));
    }
}
