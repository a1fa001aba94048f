// src/config.rs
//! Runtime configuration: one TOML file, env-var path override, per-field
//! defaults matching the deployed bot, light sanitization on load.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

fn default_check_interval() -> u64 {
    120
}
fn default_error_cooldown() -> u64 {
    60
}
fn default_message_delay() -> u64 {
    5
}
fn default_source_delay() -> u64 {
    5
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("processed_posts.json")
}
fn default_source_base_url() -> String {
    "https://x.com".to_string()
}
fn default_item_wait() -> u64 {
    10
}
fn default_sink_url() -> String {
    "https://web.whatsapp.com".to_string()
}
fn default_message_prefix() -> String {
    "*AUTOMATED*: ".to_string()
}
fn default_ready_timeout() -> u64 {
    30
}
fn default_preview_wait() -> u64 {
    5
}
fn default_user_data_dir() -> PathBuf {
    PathBuf::from("./chrome_profile")
}
fn default_attended() -> bool {
    true
}

/// Pacing and persistence knobs for the outer loop.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    /// Seconds between successful cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Longer sleep after a cycle-level failure.
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_secs: u64,
    /// Pause after each delivered message.
    #[serde(default = "default_message_delay")]
    pub message_delay_secs: u64,
    /// Pause between sources inside a cycle.
    #[serde(default = "default_source_delay")]
    pub source_delay_secs: u64,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            error_cooldown_secs: default_error_cooldown(),
            message_delay_secs: default_message_delay(),
            source_delay_secs: default_source_delay(),
            ledger_path: default_ledger_path(),
        }
    }
}

/// Which profiles to poll and what counts as relevant.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    /// Profile handles, polled in order.
    pub accounts: Vec<String>,
    /// Subset of `accounts` whose posts bypass keyword matching.
    #[serde(default)]
    pub accept_all: Vec<String>,
    /// Keywords; `#`-prefixed entries match as hashtags.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Bounded wait for the first post element on a profile page.
    #[serde(default = "default_item_wait")]
    pub item_wait_secs: u64,
}

/// Destination chat and composition pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkSection {
    #[serde(default = "default_sink_url")]
    pub url: String,
    /// Display name of the destination conversation, matched by substring.
    pub chat_name: String,
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,
    /// Upper bound on the post-login readiness poll.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    /// Time given to the client to render a link preview before send.
    #[serde(default = "default_preview_wait")]
    pub preview_wait_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSection {
    /// Persisted Chromium profile so logins survive restarts.
    #[serde(default = "default_user_data_dir")]
    pub user_data_dir: PathBuf,
    #[serde(default)]
    pub headless: bool,
    /// When false, credential gates resolve immediately instead of
    /// waiting for the operator (pre-authenticated profiles).
    #[serde(default = "default_attended")]
    pub attended: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            user_data_dir: default_user_data_dir(),
            headless: false,
            attended: default_attended(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub relay: RelaySection,
    pub source: SourceSection,
    pub sink: SinkSection,
    #[serde(default)]
    pub browser: BrowserSection,
}

impl RelayConfig {
    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallback:
    /// 1) $RELAY_CONFIG_PATH
    /// 2) config/relay.toml
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: RelayConfig = toml::from_str(s).context("invalid config TOML")?;

        cfg.source.accounts = clean_list(cfg.source.accounts);
        cfg.source.accept_all = clean_list(cfg.source.accept_all);
        cfg.source.keywords = clean_list(cfg.source.keywords);
        cfg.source.base_url = cfg.source.base_url.trim_end_matches('/').to_string();
        cfg.sink.chat_name = cfg.sink.chat_name.trim().to_string();

        if cfg.source.accounts.is_empty() {
            return Err(anyhow!("source.accounts must not be empty"));
        }
        if cfg.sink.chat_name.is_empty() {
            return Err(anyhow!("sink.chat_name must not be empty"));
        }
        let keyword_gated = cfg.source.accounts.iter().any(|a| {
            !cfg.source
                .accept_all
                .iter()
                .any(|x| x.eq_ignore_ascii_case(a))
        });
        if keyword_gated && cfg.source.keywords.is_empty() {
            tracing::warn!(
                "no keywords configured; keyword-gated accounts will never match"
            );
        }

        Ok(cfg)
    }
}

/// Trim, drop empties, dedup while keeping first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_ascii_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}
