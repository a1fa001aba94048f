// src/metrics.rs
//! Relay counters/gauges through the `metrics` facade, plus an optional
//! Prometheus endpoint when `RELAY_METRICS_ADDR` is set. Without the
//! exporter the macros are no-ops, so call sites never need to care.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing::info;

pub const ENV_METRICS_ADDR: &str = "RELAY_METRICS_ADDR";

/// One-time metrics registration (so series show up with help texts).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_cycles_total", "Completed poll cycles.");
        describe_counter!("relay_cycle_errors_total", "Cycles that ended in an error.");
        describe_counter!("relay_posts_examined_total", "Posts pulled out of timelines.");
        describe_counter!("relay_posts_delivered_total", "Posts relayed to the sink.");
        describe_counter!(
            "relay_posts_filtered_total",
            "Posts dropped by the keyword gate."
        );
        describe_counter!("relay_duplicates_total", "Posts already in the ledger.");
        describe_counter!(
            "relay_reshares_skipped_total",
            "Timeline items skipped as reshares."
        );
        describe_counter!(
            "relay_delivery_failures_total",
            "Send attempts that failed and were left for retry."
        );
        describe_counter!(
            "relay_source_errors_total",
            "Profile reads that failed source-locally."
        );
        describe_counter!(
            "relay_session_recoveries_total",
            "Browser sessions rebuilt after a liveness failure."
        );
        describe_gauge!("relay_ledger_size", "Ids currently in the ledger.");
        describe_gauge!("relay_last_cycle_unix", "Unix time of the last finished cycle.");
    });
}

/// Spawn the Prometheus listener if an address is configured. Returns
/// whether an exporter is running.
pub fn init_exporter() -> Result<bool> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(false);
    };
    let addr: SocketAddr = raw
        .parse()
        .with_context(|| format!("{ENV_METRICS_ADDR}={raw} is not a socket address"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install recorder")?;
    info!(%addr, "prometheus exporter listening");
    Ok(true)
}
