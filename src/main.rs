use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use smarthome_bridge::platform::read_controls;
use smarthome_bridge::{
    BridgeContext, Config, DeviceManager, Directive, MemoryStateStore, StaticDetector, Transport,
};

/// Smart Home Bridge - Alexa v3 directives against a home-automation state graph
#[derive(Parser)]
#[command(name = "smarthome-bridge", version, about)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, env = "SMARTHOME_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with the detected controls
    #[arg(long, env = "SMARTHOME_CONTROLS")]
    controls: Option<PathBuf>,

    /// JSON file with initial backing state values (`{"id": value}`)
    #[arg(long, env = "SMARTHOME_STATES")]
    states: Option<PathBuf>,

    /// Print change reports to stdout
    #[arg(long)]
    echo_events: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the discovery response
    Discover,
    /// Answer directives read from stdin, one JSON document per line
    Serve,
}

/// Transport writing change reports to stdout
struct StdoutTransport {
    echo: bool,
}

#[async_trait]
impl Transport for StdoutTransport {
    async fn publish(&self, topic: &str, payload: Value) -> smarthome_bridge::Result<()> {
        if self.echo {
            println!("{}", json!({"topic": topic, "payload": payload}));
        } else {
            tracing::debug!(topic, "change report dropped");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries protocol messages
    let filter = match cli.verbose {
        0 => "info,smarthome_bridge=info",
        1 => "info,smarthome_bridge=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(?config, "loaded configuration");

    let controls = match &cli.controls {
        Some(path) => read_controls(path)?,
        None => Vec::new(),
    };
    let store = Arc::new(match &cli.states {
        Some(path) => MemoryStateStore::from_file(path)?,
        None => MemoryStateStore::new(),
    });

    let transport = Arc::new(StdoutTransport {
        echo: cli.echo_events,
    });
    let context = BridgeContext::new(store.clone(), transport, config);
    let manager = DeviceManager::new(context, Arc::new(StaticDetector::new(controls)));

    let endpoints = manager.collect().await?;
    tracing::info!(endpoints, "smarthome bridge ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Discover => {
            let discover = Directive::new("Alexa.Discovery", "Discover", None, json!({}));
            let response = manager.handle_directive(&discover).await;
            println!("{}", serde_json::to_string_pretty(&response.to_value())?);
            Ok(())
        }
        Command::Serve => serve(&manager, &store).await,
    }
}

/// Read stdin line by line
///
/// A line is either a directive or a simulated platform change
/// `{"state": {"id": "...", "value": ...}}`.
async fn serve(manager: &DeviceManager, store: &MemoryStateStore) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed input line");
                continue;
            }
        };

        if let Some(change) = value.get("state") {
            let Some(id) = change.get("id").and_then(Value::as_str) else {
                tracing::warn!("state change without id");
                continue;
            };
            let new_value = change.get("value").cloned();
            if let Some(v) = &new_value {
                store.insert(id, v.clone());
            }
            manager.on_state_change(id, new_value).await;
            continue;
        }

        match manager.handle_value(value).await {
            Ok(response) => println!("{}", response.to_value()),
            Err(e) => tracing::warn!(error = %e, "rejected input"),
        }
    }

    Ok(())
}
