//! Client frame parsing and the fixed server replies.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

/// Close code sent when authentication fails.
pub const UNAUTHORIZED_CLOSE: u16 = 4001;
/// Close code sent when a frame exceeds the payload limit.
pub const TOO_BIG_CLOSE: u16 = 1009;

static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9-]+$").expect("valid session id pattern"));
static DATASOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid datasource id pattern"));

/// Whether the `/ws/chat/{session_id}/{datasource_id}` segments are well formed.
pub fn valid_route(session_id: &str, datasource_id: &str) -> bool {
    SESSION_ID.is_match(session_id) && DATASOURCE_ID.is_match(datasource_id)
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    session_id: Option<Value>,
    #[serde(default)]
    datasource_id: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Authenticate {
        token: String,
        session_id: Option<String>,
        datasource_id: Option<String>,
    },
    Chat {
        message: String,
    },
}

/// Ids may arrive as strings or bare numbers.
fn id_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode a text frame. `None` means the frame is not usable JSON.
///
/// Anything that is not an `authenticate` frame is a chat frame; a
/// non-string `message` is sent to the agent as its JSON text.
pub fn parse(text: &str) -> Option<ClientFrame> {
    let raw: RawFrame = serde_json::from_str(text).ok()?;
    if raw.kind.as_deref() == Some("authenticate") {
        return Some(ClientFrame::Authenticate {
            token: raw.token.unwrap_or_default(),
            session_id: id_text(raw.session_id),
            datasource_id: id_text(raw.datasource_id),
        });
    }
    let message = match raw.message? {
        Value::String(s) => s,
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(ClientFrame::Chat { message })
}

pub fn authenticated() -> String {
    json!({ "message": "Authenticated successfully" }).to_string()
}

pub fn unauthorized() -> String {
    json!({ "error": "Unauthorized" }).to_string()
}

pub fn invalid_message() -> String {
    json!({ "error": "Invalid message" }).to_string()
}
