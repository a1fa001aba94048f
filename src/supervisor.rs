// src/supervisor.rs
//! Outer loop: keep a live session, run cycles forever, back off on
//! failures. Only an operator interrupt ends the loop; everything else is
//! logged and retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::filter::FilterEngine;
use crate::ledger::Ledger;
use crate::orchestrator::{CycleReport, Orchestrator};
use crate::session::{BrowserSession, CredentialGate};
use crate::sink::chat::ChatWriter;
use crate::sink::SinkWriter;
use crate::source::profile::ProfileReader;
use crate::source::SourceReader;

/// A launched browser with both surfaces logged in.
struct ActiveSession {
    session: BrowserSession,
    reader: ProfileReader,
    writer: ChatWriter,
}

pub struct Supervisor {
    cfg: RelayConfig,
    gate: Arc<dyn CredentialGate>,
    orchestrator: Orchestrator,
    active: Option<ActiveSession>,
    run_once: bool,
}

impl Supervisor {
    pub fn new(cfg: RelayConfig, gate: Arc<dyn CredentialGate>, run_once: bool) -> Result<Self> {
        let filter = FilterEngine::from_config(&cfg.source).context("compiling keyword filters")?;
        let ledger = Ledger::load(&cfg.relay.ledger_path);
        info!(
            accounts = cfg.source.accounts.len(),
            known_ids = ledger.len(),
            ledger = %ledger.path().display(),
            chat = %cfg.sink.chat_name,
            "relay configured"
        );
        let orchestrator = Orchestrator::new(&cfg, filter, ledger);
        Ok(Self {
            cfg,
            gate,
            orchestrator,
            active: None,
            run_once,
        })
    }

    /// Probe the current session and rebuild it (launch plus both login
    /// handshakes) when missing or dead.
    async fn ensure_session(&mut self) -> Result<(), RelayError> {
        let healthy = match &self.active {
            Some(a) => a.session.is_alive().await,
            None => false,
        };
        if healthy {
            return Ok(());
        }
        if let Some(stale) = self.active.take() {
            warn!("browser session lost; rebuilding");
            counter!("relay_session_recoveries_total").increment(1);
            stale.session.shutdown().await;
        }

        let session = BrowserSession::launch(&self.cfg.browser).await?;
        let reader = ProfileReader::new(session.source_tab(), &self.cfg.source);
        let writer = ChatWriter::new(session.sink_tab(), &self.cfg.sink);

        let handshake = async {
            reader.login(self.gate.as_ref()).await?;
            writer.setup(self.gate.as_ref()).await
        }
        .await;
        if let Err(e) = handshake {
            session.shutdown().await;
            return Err(e);
        }

        self.active = Some(ActiveSession {
            session,
            reader,
            writer,
        });
        Ok(())
    }

    async fn cycle_once(&mut self) -> Result<CycleReport, RelayError> {
        self.ensure_session().await?;
        let Some(active) = self.active.as_ref() else {
            return Err(RelayError::Launch("session not established".into()));
        };
        Ok(self
            .orchestrator
            .run_cycle(&active.reader, &active.writer)
            .await)
    }

    /// Main loop. Returns only in `run_once` mode; otherwise runs until
    /// the caller drops the future on an interrupt.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.cycle_once().await {
                Ok(report) => {
                    counter!("relay_cycles_total").increment(1);
                    gauge!("relay_last_cycle_unix")
                        .set(chrono::Utc::now().timestamp().max(0) as f64);
                    info!(
                        target: "relay",
                        examined = report.examined,
                        delivered = report.delivered,
                        duplicates = report.duplicates,
                        filtered = report.filtered,
                        failed = report.failed,
                        session_lost = report.session_lost,
                        "cycle complete"
                    );
                    if self.run_once {
                        return Ok(());
                    }
                    debug!(
                        secs = self.cfg.relay.check_interval_secs,
                        "waiting until next cycle"
                    );
                    sleep(Duration::from_secs(self.cfg.relay.check_interval_secs)).await;
                }
                Err(e) => {
                    counter!("relay_cycle_errors_total").increment(1);
                    error!(error = %e, "cycle failed; backing off");
                    if self.run_once {
                        return Err(e.into());
                    }
                    sleep(Duration::from_secs(self.cfg.relay.error_cooldown_secs)).await;
                }
            }
        }
    }

    /// Guaranteed teardown for every exit path.
    pub async fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            active.session.shutdown().await;
        }
    }
}
