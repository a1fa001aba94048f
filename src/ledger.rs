// src/ledger.rs
//! Delivered-post ledger: a flat JSON array of ids, rewritten once per
//! cycle. Loading never fails the process; a missing or damaged file just
//! means an empty set and a warning, at the cost of possibly re-relaying
//! recent posts.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    seen: BTreeSet<String>,
}

impl Ledger {
    /// Read the ledger file if present. Absent file is the normal first
    /// run; anything unreadable degrades to an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeSet::new(),
            Ok(raw) => match parse_ids(&raw) {
                Some(ids) => ids,
                None => {
                    warn!(
                        path = %path.display(),
                        "ledger file is not a JSON id array; starting fresh"
                    );
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger file yet");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unreadable; starting fresh");
                BTreeSet::new()
            }
        };
        debug!(path = %path.display(), known = seen.len(), "ledger loaded");
        Self { path, seen }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record a delivered id. Returns false if it was already known.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.seen.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole file. Called once per cycle, even after an
    /// aborted cycle, so ids delivered before the failure stay recorded.
    pub fn flush(&self) -> Result<()> {
        let body = serde_json::to_string(&self.seen).context("serializing ledger")?;
        fs::write(&self.path, body)
            .with_context(|| format!("writing ledger {}", self.path.display()))
    }
}

/// Parse a JSON array of ids, coercing legacy numeric entries to strings
/// so membership checks compare like with like.
fn parse_ids(raw: &str) -> Option<BTreeSet<String>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw).ok()?;
    let mut out = BTreeSet::new();
    for v in values {
        match v {
            serde_json::Value::String(s) => {
                out.insert(s);
            }
            serde_json::Value::Number(n) => {
                out.insert(n.to_string());
            }
            other => {
                debug!(?other, "skipping non-id ledger entry");
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_coerces_numbers_to_strings() {
        let ids = parse_ids(r#"["123", 456, "abc"]"#).unwrap();
        assert!(ids.contains("123"));
        assert!(ids.contains("456"));
        assert!(ids.contains("abc"));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn parse_skips_non_scalar_entries() {
        let ids = parse_ids(r#"["a", {"x": 1}, null, ["y"]]"#).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("a"));
    }

    #[test]
    fn parse_rejects_non_arrays() {
        assert!(parse_ids(r#"{"ids": []}"#).is_none());
        assert!(parse_ids("not json at all").is_none());
    }

    #[test]
    fn add_reports_novelty() {
        let mut ledger = Ledger::load("/nonexistent/never-written.json");
        assert!(ledger.add("1"));
        assert!(!ledger.add("1"));
        assert!(ledger.contains("1"));
        assert_eq!(ledger.len(), 1);
    }
}
