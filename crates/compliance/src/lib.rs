//! TCPA-compliant SMS gate
//!
//! The single authority over outbound SMS. Every send passes through
//! [`ComplianceGate::validate_send`]; there is no back door. The gate owns
//! the per-phone compliance records, serialises operations per phone, and
//! appends every decision to an immutable audit journal.
//!
//! Restart survival: opt-outs are replayed from the journal at startup;
//! frequency counters are conservatively re-initialised to zero (briefly
//! over-permissive, never under-protective of opted-out numbers).

pub mod audit;
pub mod gate;
pub mod phone;
pub mod record;

pub use audit::{AuditEntry, AuditEvent, AuditLog, InMemoryAuditLog, JsonlAuditLog};
pub use gate::{ComplianceGate, ContentFlag, InboundAction, InboundResult, SendValidation};
pub use phone::normalize_phone;
pub use record::{ComplianceRecord, ComplianceStatus, DenyReason, OptOutReason};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    #[error("audit journal error: {0}")]
    Journal(String),
}

impl From<std::io::Error> for ComplianceError {
    fn from(err: std::io::Error) -> Self {
        ComplianceError::Journal(err.to_string())
    }
}

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        ComplianceError::Journal(err.to_string())
    }
}
