use std::path::PathBuf;

use cw_types::{ChatWeaveError, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,

    // Web
    pub web_host: String,
    pub web_port: u16,
    /// Shared token clients must present. `None` accepts any non-empty token.
    pub auth_token: Option<String>,
    pub max_payload_bytes: usize,

    // Logging
    pub log_level: String,
    pub log_format: String,
    pub log_file: Option<PathBuf>,

    // Agent
    pub agent_script: Option<PathBuf>,
    pub agent_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: "chatweave".to_string(),
            web_host: "0.0.0.0".to_string(),
            web_port: 8000,
            auth_token: None,
            max_payload_bytes: 64 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            log_file: None,
            agent_script: None,
            agent_delay_ms: 40,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (with dotenvy).
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors, the file may not exist)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let config = Config {
            project_name: env_or("PROJECT_NAME", || defaults.project_name.clone()),

            web_host: env_or("WEB_HOST", || defaults.web_host.clone()),
            web_port: env_u16("WEB_PORT", defaults.web_port),
            auth_token: env_opt("AUTH_TOKEN"),
            max_payload_bytes: env_usize("MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),

            log_level: env_or("LOG_LEVEL", || defaults.log_level.clone()),
            log_format: env_or("LOG_FORMAT", || defaults.log_format.clone()),
            log_file: env_opt("LOG_FILE").map(PathBuf::from),

            agent_script: env_opt("AGENT_SCRIPT").map(PathBuf::from),
            agent_delay_ms: env_u64("AGENT_DELAY_MS", defaults.agent_delay_ms),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the server unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_bytes == 0 {
            return Err(ChatWeaveError::Config(
                "MAX_PAYLOAD_BYTES must be greater than zero".to_string(),
            ));
        }
        if let Some(script) = &self.agent_script {
            if !script.exists() {
                return Err(ChatWeaveError::Config(format!(
                    "Agent script not found: {}",
                    script.display()
                )));
            }
        }
        Ok(())
    }

    /// Address the gateway binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }

    pub fn is_structured_logging(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Check a client token against the configured one.
    pub fn accepts_token(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match &self.auth_token {
            Some(expected) => expected == token,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Env helpers
// ---------------------------------------------------------------------------

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    parse_or(key, default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    parse_or(key, default)
}

fn env_usize(key: &str, default: usize) -> usize {
    parse_or(key, default)
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config value");
            default
        }),
        Err(_) => default,
    }
}
