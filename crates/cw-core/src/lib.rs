pub mod logging;
pub mod utils;

// Rendering
pub mod envelope;
pub mod fence;
pub mod markup;
pub mod render;

// Streaming pipeline
pub mod agent;
pub mod aggregator;
pub mod delivery;
pub mod handler;
pub mod scripted;
pub mod session;

pub use logging::init_logging;
pub use utils::GracefulShutdown;

pub use envelope::{build_envelope, normalize_details, normalize_event_type, normalize_value};
pub use fence::render_message;
pub use markup::{cursor, div, escape, escape_attr, span, Elem, LineBreaks};
pub use render::{render_attachment, render_post, Attachment, PostSnapshot, UNKNOWN_ROLE};

pub use agent::{dispatch, AgentRuntime, EventSink, StopSignal};
pub use aggregator::PostAggregator;
pub use delivery::{delivery_queue, DeliveryReceiver, DeliverySender};
pub use handler::SessionEventHandler;
pub use scripted::{demo_script, load_script, parse_script, ScriptedAgent};
pub use session::{run_agent_turn, ChatSession, SessionRegistry, BUSY_ERROR};
