// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod sanitize;
pub mod session;
pub mod supervisor;

// Surfaces: source side reads timelines, sink side writes into the chat.
pub mod sink;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::config::RelayConfig;
pub use crate::error::RelayError;
pub use crate::filter::FilterEngine;
pub use crate::ledger::Ledger;
pub use crate::orchestrator::{CycleReport, Orchestrator};
pub use crate::session::{AutoGate, BrowserSession, CredentialGate, PromptGate};
pub use crate::sink::SinkWriter;
pub use crate::source::{Post, SourceReader};
pub use crate::supervisor::Supervisor;
