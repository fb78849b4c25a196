use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cw_config::Config;
use cw_core::{
    delivery_queue, init_logging, load_script, AgentRuntime, ScriptedAgent, SessionEventHandler,
    StopSignal,
};
use cw_web::AppState;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chatweave", about = "ChatWeave - streaming agent gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket gateway
    Serve {
        /// Bind host (overrides WEB_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides WEB_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// JSONL agent script (overrides AGENT_SCRIPT)
        #[arg(long)]
        script: Option<PathBuf>,
    },
    /// Play a JSONL agent script and print each envelope as it is queued
    Replay {
        file: PathBuf,
        /// Text substituted for {input}
        #[arg(long, default_value = "")]
        input: String,
        /// Pretty-print envelopes
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;
    init_logging(
        &config.log_level,
        config.log_file.as_deref(),
        config.is_structured_logging(),
    );

    match cli.command {
        Commands::Serve { host, port, script } => {
            if let Some(host) = host {
                config.web_host = host;
            }
            if let Some(port) = port {
                config.web_port = port;
            }
            if script.is_some() {
                config.agent_script = script;
            }
            config.validate().context("Invalid configuration")?;
            serve(config).await?
        }
        Commands::Replay {
            file,
            input,
            pretty,
        } => replay(file, input, pretty).await?,
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(project = %config.project_name, "ChatWeave starting...");

    let agent = ScriptedAgent::from_config(&config).context("Failed to load agent script")?;
    info!(events = agent.events().len(), "Agent ready");

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    let state = Arc::new(AppState::new(config, Arc::new(agent)));
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move { shutdown.wait_for_signal().await });

    info!("ChatWeave is running. Press Ctrl+C to stop.");
    cw_web::serve(listener, state)
        .await
        .context("Gateway failed")?;
    info!("ChatWeave stopped.");
    Ok(())
}

async fn replay(file: PathBuf, input: String, pretty: bool) -> anyhow::Result<()> {
    let events = load_script(&file)
        .with_context(|| format!("Failed to load script {}", file.display()))?;
    let agent = ScriptedAgent::new(events, Duration::ZERO);
    let (outbox, inbox) = delivery_queue();

    let producer = tokio::task::spawn_blocking(move || {
        let stop = StopSignal::new();
        let mut handler = SessionEventHandler::new("replay", outbox, stop.clone());
        agent.send_message(&input, &mut handler, &stop)
    });

    let printed = inbox
        .forward(|line| async move {
            if pretty {
                let value: serde_json::Value = serde_json::from_str(&line)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{line}");
            }
            Ok(())
        })
        .await
        .context("Failed to print envelopes")?;

    match producer.await.context("Replay worker panicked")? {
        Ok(reply) => {
            info!(envelopes = printed, reply = %reply, "Replay finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Replay failed");
            Err(e.into())
        }
    }
}
