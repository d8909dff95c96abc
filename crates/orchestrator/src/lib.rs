//! The orchestrator
//!
//! Single entry point for inbound lead messages. Safe for concurrent entry
//! on distinct leads; two inbounds for the same lead are serialised in
//! arrival order by the session lock. An inbound is always processed to a
//! complete response plan, possibly degraded; only malformed input
//! propagates to the caller.

pub mod metrics;
pub mod orchestrator;

pub use orchestrator::{InboundOutcome, Orchestrator};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Inbound payload missing required fields; no session is created
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    #[error(transparent)]
    Compliance(#[from] leadflow_compliance::ComplianceError),

    #[error(transparent)]
    Session(#[from] leadflow_session::SessionError),
}
