// src/error.rs
//! Error taxonomy for the relay.
//!
//! Classification is structural, never string matching on messages:
//! `is_session_fatal` is the one question the cycle loop asks, and it is
//! answered by the error kind itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The automation transport is gone (socket closed, browser crashed,
    /// no response from the devtools endpoint). Aborts the rest of the
    /// cycle; the supervisor rebuilds the session before the next one.
    #[error("browser session unreachable ({0})")]
    SessionDead(String),

    /// Chromium could not be started or the initial tabs could not be
    /// opened.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A devtools command failed for reasons local to one item or one
    /// source. The caller skips the item and moves on.
    #[error("{context}: {message}")]
    Automation {
        context: &'static str,
        message: String,
    },

    /// The destination conversation is not in the sink's visible list.
    /// The item stays unledgered and is retried next cycle.
    #[error("conversation {0:?} not found in chat list")]
    ChatNotFound(String),

    /// Neither the primary nor the alternate message composer could be
    /// focused.
    #[error("message composer unavailable: {0}")]
    ComposerUnavailable(String),

    /// The operator prompt could not complete (stdin closed, channel
    /// dropped).
    #[error("credential gate interrupted: {0}")]
    GateClosed(String),
}

impl RelayError {
    /// True for errors that invalidate the whole browser session, not
    /// just the current item or source.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, RelayError::SessionDead(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_dead_is_session_fatal() {
        assert!(RelayError::SessionDead("ws closed".into()).is_session_fatal());
        assert!(!RelayError::ChatNotFound("Arteta FC".into()).is_session_fatal());
        assert!(!RelayError::Automation {
            context: "reading post text",
            message: "stale node".into(),
        }
        .is_session_fatal());
    }

    #[test]
    fn messages_name_the_failing_part() {
        let err = RelayError::ChatNotFound("Arteta FC".into());
        assert!(err.to_string().contains("Arteta FC"));
        let err = RelayError::SessionDead("chrome went away".into());
        assert!(err.to_string().contains("unreachable"));
    }
}
