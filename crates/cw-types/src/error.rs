use thiserror::Error;

/// Top-level error type for chatweave.
#[derive(Error, Debug)]
pub enum ChatWeaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Delivery queue closed")]
    QueueClosed,

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, ChatWeaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ChatWeaveError::Config("missing key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing key");
        assert_eq!(ChatWeaveError::QueueClosed.to_string(), "Delivery queue closed");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChatWeaveError = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ChatWeaveError = json_err.into();
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn result_alias_works() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        fn err_fn() -> Result<i32> {
            Err(ChatWeaveError::Agent("boom".to_string()))
        }
        assert_eq!(ok_fn().unwrap(), 42);
        assert!(err_fn().is_err());
    }
}
