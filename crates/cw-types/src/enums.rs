use serde::{Deserialize, Serialize};

/// Which emitter scope an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Session,
    Round,
    Post,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Session => "session",
            Self::Round => "round",
            Self::Post => "post",
        };
        write!(f, "{s}")
    }
}

/// Session-level event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    SessionStart,
    SessionEnd,
    SessionNewRound,
}

impl SessionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::SessionNewRound => "session_new_round",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session_start" => Some(Self::SessionStart),
            "session_end" => Some(Self::SessionEnd),
            "session_new_round" => Some(Self::SessionNewRound),
            _ => None,
        }
    }
}

/// Round-level event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEventType {
    RoundStart,
    RoundEnd,
    RoundError,
}

impl RoundEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundStart => "round_start",
            Self::RoundEnd => "round_end",
            Self::RoundError => "round_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "round_start" => Some(Self::RoundStart),
            "round_end" => Some(Self::RoundEnd),
            "round_error" => Some(Self::RoundError),
            _ => None,
        }
    }
}

/// Post-level event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostEventType {
    PostStart,
    PostEnd,
    PostError,
    PostStatusUpdate,
    PostSendToUpdate,
    PostMessageUpdate,
    PostAttachmentUpdate,
}

impl PostEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostStart => "post_start",
            Self::PostEnd => "post_end",
            Self::PostError => "post_error",
            Self::PostStatusUpdate => "post_status_update",
            Self::PostSendToUpdate => "post_send_to_update",
            Self::PostMessageUpdate => "post_message_update",
            Self::PostAttachmentUpdate => "post_attachment_update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post_start" => Some(Self::PostStart),
            "post_end" => Some(Self::PostEnd),
            "post_error" => Some(Self::PostError),
            "post_status_update" => Some(Self::PostStatusUpdate),
            "post_send_to_update" => Some(Self::PostSendToUpdate),
            "post_message_update" => Some(Self::PostMessageUpdate),
            "post_attachment_update" => Some(Self::PostAttachmentUpdate),
            _ => None,
        }
    }
}

/// Any structural event kind emitted by the agent runtime.
///
/// Serialized as its bare snake_case identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    Session(SessionEventType),
    Round(RoundEventType),
    Post(PostEventType),
}

impl EventType {
    /// Enum member name. Identical to the value for every kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Session(t) => t.as_str(),
            Self::Round(t) => t.as_str(),
            Self::Post(t) => t.as_str(),
        }
    }

    pub fn value(&self) -> &'static str {
        self.name()
    }

    pub fn category(&self) -> EventCategory {
        match self {
            Self::Session(_) => EventCategory::Session,
            Self::Round(_) => EventCategory::Round,
            Self::Post(_) => EventCategory::Post,
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(t) = PostEventType::parse(s) {
            return Ok(Self::Post(t));
        }
        if let Some(t) = RoundEventType::parse(s) {
            return Ok(Self::Round(t));
        }
        if let Some(t) = SessionEventType::parse(s) {
            return Ok(Self::Session(t));
        }
        Err(format!("unknown event type: {s}"))
    }
}

impl TryFrom<String> for EventType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        t.name().to_string()
    }
}

impl From<SessionEventType> for EventType {
    fn from(t: SessionEventType) -> Self {
        Self::Session(t)
    }
}

impl From<RoundEventType> for EventType {
    fn from(t: RoundEventType) -> Self {
        Self::Round(t)
    }
}

impl From<PostEventType> for EventType {
    fn from(t: PostEventType) -> Self {
        Self::Post(t)
    }
}

/// Kind of content carried by a post attachment.
///
/// Unknown kinds are kept verbatim in `Other` so a new agent-side kind
/// still renders as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttachmentType {
    InitPlan,
    Plan,
    CurrentPlanStep,
    PlanReasoning,
    Thought,
    Text,
    Python,
    Sample,
    CodeError,
    ExecutionStatus,
    ExecutionResult,
    ArtifactPaths,
    ReviseMessage,
    Function,
    Verification,
    ReplyType,
    ReplyContent,
    InvalidResponse,
    Board,
    Signal,
    Other(String),
}

impl AttachmentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitPlan => "init_plan",
            Self::Plan => "plan",
            Self::CurrentPlanStep => "current_plan_step",
            Self::PlanReasoning => "plan_reasoning",
            Self::Thought => "thought",
            Self::Text => "text",
            Self::Python => "python",
            Self::Sample => "sample",
            Self::CodeError => "code_error",
            Self::ExecutionStatus => "execution_status",
            Self::ExecutionResult => "execution_result",
            Self::ArtifactPaths => "artifact_paths",
            Self::ReviseMessage => "revise_message",
            Self::Function => "function",
            Self::Verification => "verification",
            Self::ReplyType => "reply_type",
            Self::ReplyContent => "reply_content",
            Self::InvalidResponse => "invalid_response",
            Self::Board => "board",
            Self::Signal => "signal",
            Self::Other(s) => s,
        }
    }

    /// Human label: "execution_result" -> "Execution Result".
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<&str> for AttachmentType {
    fn from(s: &str) -> Self {
        match s {
            "init_plan" => Self::InitPlan,
            "plan" => Self::Plan,
            "current_plan_step" => Self::CurrentPlanStep,
            "plan_reasoning" => Self::PlanReasoning,
            "thought" => Self::Thought,
            "text" => Self::Text,
            "python" => Self::Python,
            "sample" => Self::Sample,
            "code_error" => Self::CodeError,
            "execution_status" => Self::ExecutionStatus,
            "execution_result" => Self::ExecutionResult,
            "artifact_paths" => Self::ArtifactPaths,
            "revise_message" => Self::ReviseMessage,
            "function" => Self::Function,
            "verification" => Self::Verification,
            "reply_type" => Self::ReplyType,
            "reply_content" => Self::ReplyContent,
            "invalid_response" => Self::InvalidResponse,
            "board" => Self::Board,
            "signal" => Self::Signal,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for AttachmentType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<AttachmentType> for String {
    fn from(t: AttachmentType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
