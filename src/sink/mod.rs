// src/sink/mod.rs
//! Delivery side: the writer seam and message composition shared by its
//! implementations.

use crate::error::RelayError;
use crate::source::Post;

pub mod chat;

#[async_trait::async_trait]
pub trait SinkWriter: Send + Sync {
    /// Bring the client to a usable state: navigate, let the operator
    /// authenticate, wait for the UI to settle.
    async fn setup(
        &self,
        gate: &dyn crate::session::CredentialGate,
    ) -> Result<(), RelayError>;

    /// Deliver one post. An error here means the post was (as far as we
    /// can tell) not sent; the caller keeps it out of the ledger so the
    /// next cycle retries it.
    async fn send(&self, post: &Post) -> Result<(), RelayError>;
}

/// Canonical relayed form: `<prefix><sanitized text> | <link>`.
pub fn compose_line(prefix: &str, text: &str, link: &str) -> String {
    format!("{prefix}{text} | {link}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_carries_prefix_text_and_link() {
        let line = compose_line("*AUTOMATED*: ", "Arsenal win", "https://x.com/a/status/1");
        assert_eq!(line, "*AUTOMATED*: Arsenal win | https://x.com/a/status/1");
    }

    #[test]
    fn empty_prefix_is_allowed() {
        assert_eq!(compose_line("", "t", "l"), "t | l");
    }
}
