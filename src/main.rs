//! Binary entrypoint: wires config, logging and metrics, then hands
//! control to the supervisor until the operator interrupts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use timeline_relay::config::{RelayConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use timeline_relay::session::{AutoGate, CredentialGate, PromptGate};
use timeline_relay::{metrics, Supervisor};

#[derive(Parser)]
#[command(name = "timeline-relay", about = "Relay timeline posts into a chat client")]
struct Cli {
    /// Path to the TOML config.
    #[arg(long, env = ENV_CONFIG_PATH, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Run a single cycle and exit.
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Force a headless browser regardless of config.
    #[arg(long, default_value_t = false)]
    headless: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("timeline_relay=info,relay=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// The blocking operator prompts and the devtools event pump are the only
/// things that leave this thread; relay state itself is single-threaded.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = RelayConfig::load_from(&cli.config)?;
    if cli.headless {
        cfg.browser.headless = true;
    }

    metrics::describe();
    metrics::init_exporter()?;

    let gate: Arc<dyn CredentialGate> = if cfg.browser.attended {
        Arc::new(PromptGate)
    } else {
        Arc::new(AutoGate)
    };

    let mut supervisor = Supervisor::new(cfg, gate, cli.once)?;
    let outcome = tokio::select! {
        res = supervisor.run() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; shutting down");
            Ok(())
        }
    };

    supervisor.shutdown().await;
    outcome
}
