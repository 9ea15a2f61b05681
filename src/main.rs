//! relaybot — Slack Events API gateway with LLM-generated replies.
//!
//! Receives event deliveries on `POST /slack/events`, verifies the v0
//! request signature, enforces at-most-once handling across Slack's
//! at-least-once retries, and answers user messages with a completion
//! generated by an OpenAI-compatible backend.

mod auth;
mod channels;
mod config;
mod dedup;
mod error;
mod gateway;
mod orchestrator;
mod providers;
mod router;

use clap::Parser;

/// Slack Events API gateway with LLM-generated replies.
#[derive(Parser)]
#[command(name = "relaybot", version, about)]
struct Cli {
    /// Bind host (overrides the HOST environment variable)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides the PORT environment variable)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    gateway::run_gateway(&config).await
}
