// src/orchestrator.rs
//! One monitoring cycle: poll every source in order, gate each post
//! through ledger and filter, deliver matches, flush the ledger exactly
//! once at the end. Session loss aborts the remaining sources; everything
//! delivered before that stays recorded.

use std::time::Duration;

use metrics::{counter, gauge};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::filter::FilterEngine;
use crate::ledger::Ledger;
use crate::sink::SinkWriter;
use crate::source::SourceReader;

/// What one cycle did, for logs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub examined: usize,
    pub delivered: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub failed: usize,
    pub source_errors: usize,
    /// The browser went away mid-cycle; the supervisor rebuilds before
    /// the next one.
    pub session_lost: bool,
}

pub struct Orchestrator {
    accounts: Vec<String>,
    filter: FilterEngine,
    ledger: Ledger,
    message_delay: Duration,
    source_delay: Duration,
}

impl Orchestrator {
    pub fn new(cfg: &RelayConfig, filter: FilterEngine, ledger: Ledger) -> Self {
        Self {
            accounts: cfg.source.accounts.clone(),
            filter,
            ledger,
            message_delay: Duration::from_secs(cfg.relay.message_delay_secs),
            source_delay: Duration::from_secs(cfg.relay.source_delay_secs),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub async fn run_cycle(
        &mut self,
        reader: &dyn SourceReader,
        writer: &dyn SinkWriter,
    ) -> CycleReport {
        crate::metrics::describe();
        let mut report = CycleReport::default();
        let accounts = self.accounts.clone();

        'sources: for origin in &accounts {
            let origin = origin.as_str();
            match reader.read_recent(origin).await {
                Ok(posts) => {
                    if posts.is_empty() {
                        debug!(origin, "nothing new");
                    }
                    for post in posts {
                        report.examined += 1;
                        counter!("relay_posts_examined_total").increment(1);

                        if self.ledger.contains(&post.id) {
                            report.duplicates += 1;
                            counter!("relay_duplicates_total").increment(1);
                            continue;
                        }
                        if !self.filter.matches(origin, &post.text) {
                            debug!(origin, id = %post.id, "filtered out");
                            report.filtered += 1;
                            counter!("relay_posts_filtered_total").increment(1);
                            continue;
                        }

                        let keyword = self.filter.first_match(&post.text).unwrap_or("accept-all");
                        info!(origin, id = %post.id, keyword, "new relevant post");

                        match writer.send(&post).await {
                            Ok(()) => {
                                self.ledger.add(post.id.clone());
                                report.delivered += 1;
                                counter!("relay_posts_delivered_total").increment(1);
                                sleep(self.message_delay).await;
                            }
                            Err(e) if e.is_session_fatal() => {
                                warn!(origin, id = %post.id, error = %e, "session lost during delivery; aborting cycle");
                                report.failed += 1;
                                counter!("relay_delivery_failures_total").increment(1);
                                report.session_lost = true;
                                break 'sources;
                            }
                            Err(e) => {
                                warn!(origin, id = %post.id, error = %e, "delivery failed; will retry next cycle");
                                report.failed += 1;
                                counter!("relay_delivery_failures_total").increment(1);
                            }
                        }
                    }
                    sleep(self.source_delay).await;
                }
                Err(e) if e.is_session_fatal() => {
                    warn!(origin, error = %e, "session lost during read; aborting cycle");
                    report.session_lost = true;
                    break 'sources;
                }
                Err(e) => {
                    warn!(origin, error = %e, "source read failed; moving on");
                    report.source_errors += 1;
                    counter!("relay_source_errors_total").increment(1);
                }
            }
        }

        // Flush runs even after an aborted cycle so earlier deliveries
        // stay deduplicated.
        if let Err(e) = self.ledger.flush() {
            warn!(error = ?e, "ledger flush failed; duplicates possible next run");
        }
        gauge!("relay_ledger_size").set(self.ledger.len() as f64);
        report
    }
}
