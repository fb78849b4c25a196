use std::path::{Path, PathBuf};

use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILE: &str = "chatweave.log";

/// Split a log path into the rolling directory and file prefix.
fn log_file_parts(log_path: &Path) -> (PathBuf, String) {
    let dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let filename = log_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    (dir, filename)
}

/// Initialize the tracing/logging system.
///
/// Sets up a console layer (ANSI text, or JSON when `structured`) and an
/// optional daily-rolling file layer. `RUST_LOG` overrides `log_level`.
pub fn init_logging(log_level: &str, log_file: Option<&Path>, structured: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_appender = log_file.map(|path| {
        let (dir, filename) = log_file_parts(path);
        rolling::daily(dir, filename)
    });

    if structured {
        // JSON structured logging to stderr
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let file_layer = file_appender.map(|appender| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(appender)
                .with_target(true)
                .with_ansi(false)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(file_layer)
            .init();
    } else {
        // Human-readable console logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(true);
        let file_layer = file_appender.map(|appender| {
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_target(true)
                .with_ansi(false)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(file_layer)
            .init();
    }
}
