//! Script-driven agent used for demos, replay and tests.
//!
//! A script is JSON Lines, one [`AgentEvent`] per line. Blank lines and
//! lines starting with `#` are ignored. `{input}` in any message is replaced
//! by the user's text.

use std::path::Path;
use std::time::Duration;

use cw_config::Config;
use cw_types::{
    AgentEvent, AttachmentType, ChatWeaveError, EventScope, EventType, ExtraFields,
    PostEventType, Result, RoundEventType,
};
use serde_json::json;
use tracing::{debug, info};

use crate::agent::{dispatch, AgentRuntime, EventSink, StopSignal};

/// Placeholder replaced by the user message.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Parse a JSONL script.
pub fn parse_script(source: &str) -> Result<Vec<AgentEvent>> {
    let mut events = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = AgentEvent::from_json_line(line)
            .map_err(|e| ChatWeaveError::Protocol(format!("script line {}: {e}", idx + 1)))?;
        events.push(event);
    }
    Ok(events)
}

/// Read and parse a JSONL script file.
pub fn load_script(path: &Path) -> Result<Vec<AgentEvent>> {
    let source = std::fs::read_to_string(path)?;
    let events = parse_script(&source)?;
    debug!(path = %path.display(), events = events.len(), "Loaded agent script");
    Ok(events)
}

/// Agent runtime that plays back a fixed list of events.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    events: Vec<AgentEvent>,
    delay: Duration,
}

impl ScriptedAgent {
    pub fn new(events: Vec<AgentEvent>, delay: Duration) -> Self {
        Self { events, delay }
    }

    /// Agent playing the built-in planner/code-interpreter conversation.
    pub fn demo(delay: Duration) -> Self {
        Self::new(demo_script(), delay)
    }

    pub fn from_file(path: &Path, delay: Duration) -> Result<Self> {
        Ok(Self::new(load_script(path)?, delay))
    }

    /// Script from `agent_script` if configured, otherwise the demo.
    pub fn from_config(config: &Config) -> Result<Self> {
        let delay = Duration::from_millis(config.agent_delay_ms);
        match &config.agent_script {
            Some(path) => Self::from_file(path, delay),
            None => Ok(Self::demo(delay)),
        }
    }

    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }
}

impl AgentRuntime for ScriptedAgent {
    fn send_message(
        &self,
        text: &str,
        sink: &mut dyn EventSink,
        stop: &StopSignal,
    ) -> Result<serde_json::Value> {
        let mut post_count = 0;
        for event in &self.events {
            if stop.is_raised() {
                info!(post_count, "Scripted agent stopped");
                return Err(ChatWeaveError::Cancelled);
            }

            let mut event = event.clone();
            if event.message.contains(INPUT_PLACEHOLDER) {
                event.message = event.message.replace(INPUT_PLACEHOLDER, text);
            }
            dispatch(&event, sink);

            if event.event_type == EventType::Post(PostEventType::PostEnd) {
                post_count += 1;
            }
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }

        Ok(json!({
            "user_query": text,
            "state": "finished",
            "post_count": post_count,
        }))
    }
}

fn post(post_id: &str, event_type: PostEventType, message: &str, extra: ExtraFields) -> AgentEvent {
    AgentEvent::new(
        EventScope::Post {
            post_id: post_id.to_string(),
            round_id: "round-1".to_string(),
        },
        event_type,
        message,
        extra,
    )
}

fn atta(post_id: &str, id: &str, kind: AttachmentType, fragment: &str, is_end: bool) -> AgentEvent {
    post(
        post_id,
        PostEventType::PostAttachmentUpdate,
        fragment,
        ExtraFields::new()
            .with("id", id)
            .with("type", kind)
            .with("is_end", is_end),
    )
}

fn msg(post_id: &str, fragment: &str, is_end: bool) -> AgentEvent {
    post(
        post_id,
        PostEventType::PostMessageUpdate,
        fragment,
        ExtraFields::new().with("is_end", is_end),
    )
}

fn send_to(post_id: &str, role: &str) -> AgentEvent {
    post(
        post_id,
        PostEventType::PostSendToUpdate,
        "",
        ExtraFields::new().with("role", role),
    )
}

fn status(post_id: &str, text: &str) -> AgentEvent {
    post(post_id, PostEventType::PostStatusUpdate, text, ExtraFields::new())
}

fn round(event_type: RoundEventType, message: &str) -> AgentEvent {
    AgentEvent::new(
        EventScope::Round {
            round_id: "round-1".to_string(),
        },
        event_type,
        message,
        ExtraFields::new(),
    )
}

/// A planner hands the request to a code interpreter, then answers the user
/// with a fenced snippet that arrives split across fragments.
pub fn demo_script() -> Vec<AgentEvent> {
    let none = ExtraFields::new;
    vec![
        round(RoundEventType::RoundStart, INPUT_PLACEHOLDER),
        // Planner
        post("post-1", PostEventType::PostStart, "", none()),
        status("post-1", "Planning"),
        atta("post-1", "atta-1", AttachmentType::InitPlan, "1. Understand the request\n", false),
        atta("post-1", "atta-1", AttachmentType::InitPlan, "2. Run a snippet <interactive>", true),
        atta("post-1", "atta-2", AttachmentType::Plan, "1. Ask the CodeInterpreter to echo the input", true),
        send_to("post-1", "CodeInterpreter"),
        msg("post-1", "Please print the user request: ", false),
        msg("post-1", INPUT_PLACEHOLDER, true),
        post("post-1", PostEventType::PostEnd, "", none()),
        // CodeInterpreter
        post("post-2", PostEventType::PostStart, "", none()),
        status("post-2", "Generating code"),
        atta("post-2", "atta-3", AttachmentType::Thought, "I will print the ", false),
        atta("post-2", "atta-3", AttachmentType::Thought, "request verbatim.", true),
        atta("post-2", "atta-4", AttachmentType::Python, "text = \"\"\"{input}\"\"\"\n", false),
        atta("post-2", "atta-4", AttachmentType::Python, "print(text)", true),
        status("post-2", "Executing code"),
        atta("post-2", "atta-5", AttachmentType::ExecutionResult, "{input}", true),
        atta("post-2", "atta-6", AttachmentType::ArtifactPaths, "[]", true),
        send_to("post-2", "Planner"),
        msg("post-2", "The code printed the request.", true),
        post("post-2", PostEventType::PostEnd, "", none()),
        // Planner answers the user
        post("post-3", PostEventType::PostStart, "", none()),
        send_to("post-3", "User"),
        msg("post-3", "Here is what I ran:\n``", false),
        msg("post-3", "`python\nprint(", false),
        msg("post-3", "\"{input}\")\n", false),
        msg("post-3", "```\nAll done.", true),
        post("post-3", PostEventType::PostEnd, "", none()),
        round(RoundEventType::RoundEnd, ""),
    ]
}
