// src/source/mod.rs
//! Source side: the post model, reshare classification, id derivation and
//! the reader seam the orchestrator polls through.

use crate::error::RelayError;

pub mod profile;

/// Only this many of the newest items are examined per poll.
pub const RECENT_WINDOW: usize = 5;

/// Classic reshare prefix in raw post text.
pub const RESHARE_PREFIX: &str = "RT @";

/// Social-context phrases that mark an item as a reshare.
pub const RESHARE_MARKERS: [&str; 2] = ["retweeted", "reposted"];

/// One extracted post, ready for filtering and delivery.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Stable id: permalink status segment, or a digest of the text.
    pub id: String,
    pub text: String,
    /// Absolute URL used in the relayed message.
    pub link: String,
    /// Profile handle this post was read from.
    pub origin: String,
}

/// Raw DOM extraction result for one timeline item, before
/// classification.
#[derive(Debug, Clone, Default)]
pub struct RawCandidate {
    pub text: String,
    pub permalink: Option<String>,
    pub social_context: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceReader: Send + Sync {
    /// Navigate to the login page and wait for the operator to finish the
    /// handshake.
    async fn login(
        &self,
        gate: &dyn crate::session::CredentialGate,
    ) -> Result<(), RelayError>;

    /// Newest-first posts from one profile, reshares excluded, bounded by
    /// [`RECENT_WINDOW`]. An empty vector is a normal quiet poll.
    async fn read_recent(&self, origin: &str) -> Result<Vec<Post>, RelayError>;
}

/// Reshares are identified by the social-context annotation or the legacy
/// text prefix; they are never relayed.
pub fn is_reshare(candidate: &RawCandidate) -> bool {
    if let Some(ctx) = &candidate.social_context {
        let ctx = ctx.to_lowercase();
        if RESHARE_MARKERS.iter().any(|m| ctx.contains(m)) {
            return true;
        }
    }
    candidate.text.starts_with(RESHARE_PREFIX)
}

/// Status id embedded in a permalink, e.g.
/// `/David_Ornstein/status/17123...` or the absolute form of the same.
/// Query strings and trailing path segments are ignored.
pub fn id_from_permalink(link: &str) -> Option<String> {
    let rest = link.split_once("/status/")?.1;
    let id: &str = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Short stable digest for permalink-less posts. Survives restarts, so
/// the ledger keeps recognizing these items.
pub fn text_digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Turn a raw candidate into a `Post`, or `None` for reshares. Relative
/// permalinks are absolutized against `base_url`; a missing permalink
/// falls back to the profile page itself.
pub fn build_post(origin: &str, base_url: &str, candidate: RawCandidate) -> Option<Post> {
    if is_reshare(&candidate) {
        return None;
    }
    let id = candidate
        .permalink
        .as_deref()
        .and_then(id_from_permalink)
        .unwrap_or_else(|| text_digest(&candidate.text));
    let link = match &candidate.permalink {
        Some(p) if p.starts_with("http") => p.clone(),
        Some(p) => format!("{base_url}{p}"),
        None => format!("{base_url}/{origin}"),
    };
    Some(Post {
        id,
        text: candidate.text,
        link,
        origin: origin.to_string(),
    })
}
