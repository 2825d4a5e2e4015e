//! CLI for relayhub
//!
//! Subcommands:
//! - `server`: run the relay
//! - `emit`: send one event to a running relay
//! - `listen`: print every event the relay broadcasts

use anyhow::Context;
use clap::Parser;
use relayhub::config::load_config;
use relayhub::hub::{Hub, QUIZ_ELAPSED};
use relayhub::utils::logging;
use relayhub::{RelayClient, RelayServer};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "relayhub", version, about = "Real-time event relay over WebSockets")]
enum Command {
    /// Start the relay server
    Server {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
        /// Output logs as JSON
        #[arg(long)]
        log_json: bool,
    },
    /// Emit one event and exit
    Emit {
        #[arg(long, env = "RELAY_URL", default_value = "ws://127.0.0.1:3001")]
        url: String,
        #[arg(long, default_value = QUIZ_ELAPSED)]
        event: String,
        /// Event payload as JSON
        #[arg(long, default_value = "null")]
        data: String,
    },
    /// Print broadcast events as they arrive
    Listen {
        #[arg(long, env = "RELAY_URL", default_value = "ws://127.0.0.1:3001")]
        url: String,
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    match Command::parse() {
        Command::Server {
            host,
            port,
            log_json,
        } => run_server(host, port, log_json).await,
        Command::Emit { url, event, data } => {
            logging::init("info", false);
            run_emit(&url, &event, &data).await
        }
        Command::Listen { url, count } => {
            logging::init("info", false);
            run_listen(&url, count).await
        }
    }
}

async fn run_server(host: Option<String>, port: Option<u16>, log_json: bool) -> anyhow::Result<()> {
    let mut settings = load_config().context("failed to load configuration")?;
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    logging::init(&settings.logging.level, settings.logging.json || log_json);

    let hub = Hub::from_routes(&settings.relay.routes).into_shared();
    let server = RelayServer::bind(&settings, hub)
        .await
        .context("relay failed to start")?;

    server
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received. Exiting gracefully."),
                Err(e) => {
                    error!("Unable to listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    Ok(())
}

async fn run_emit(url: &str, event: &str, data: &str) -> anyhow::Result<()> {
    let data: serde_json::Value =
        serde_json::from_str(data).context("--data must be valid JSON")?;

    let mut client = RelayClient::connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    client.emit(event, data).await?;
    client.close().await?;

    info!(event, "Event sent");
    Ok(())
}

async fn run_listen(url: &str, count: Option<usize>) -> anyhow::Result<()> {
    let mut client = RelayClient::connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    info!("Listening on {url}");

    let mut seen = 0;
    while let Some(envelope) = client.next_event().await? {
        println!("{}", envelope.to_json()?);
        seen += 1;
        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    Ok(())
}
