//! Collaborator traits
//!
//! The orchestrator and workflows never talk to the outside world directly;
//! they go through these traits. One implementation per deployment is
//! constructed at startup and passed in explicitly — no global singletons.
//! Every call is expected to be wrapped in a deadline by the implementation;
//! callers treat failures as soft (template fallback, no side effect).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::lead::{Channel, Classification, Tone};

/// Result of delivering a message through the CRM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error_kind: Option<String>,
}

impl SendOutcome {
    pub fn delivered(id: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_message_id: Some(id.into()),
            error_kind: None,
        }
    }

    pub fn failed(kind: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            error_kind: Some(kind.into()),
        }
    }
}

/// A CRM contact as returned by pipeline/inactivity queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub pipeline_stage: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Errors from CRM collaborator calls
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("deadline exceeded after {0:?}")]
    Deadline(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("collaborator rejected request: {0}")]
    Rejected(String),
}

/// The contact-and-messaging platform (delivers SMS/email, stores contacts)
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Deliver a message to the given destination over the given channel
    async fn send_message(
        &self,
        destination: &str,
        content: &str,
        channel: Channel,
    ) -> Result<SendOutcome, CollaboratorError>;

    /// Attach tags to a contact
    async fn add_tags(&self, contact_id: &str, tags: &[String]) -> Result<(), CollaboratorError>;

    /// Contacts sitting in a pipeline stage (prospecting source)
    async fn contacts_by_pipeline_stage(
        &self,
        location_id: &str,
        stage_id: &str,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError>;

    /// Contacts with no activity since the cutoff (prospecting source)
    async fn contacts_inactive_since(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError>;

    /// Write custom fields back to a contact (session snapshot mirroring)
    async fn update_contact(
        &self,
        contact_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), CollaboratorError>;
}

/// Structured input for the response drafter. The drafter is a text-assembly
/// tool; everything that shapes the reply arrives as explicit fields.
#[derive(Debug, Clone)]
pub struct DraftContext {
    pub system_prompt: String,
    pub history: Vec<Turn>,
    pub tone: Tone,
    pub classification: Classification,
    /// Stall-breaker line the reply must work in, when a stall was detected
    pub stall_breaker: Option<String>,
}

/// Drafted reply with token accounting
#[derive(Debug, Clone)]
pub struct DraftedResponse {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The LLM collaborator that turns a draft context into prose
#[async_trait]
pub trait ResponseDrafter: Send + Sync {
    async fn draft(&self, ctx: &DraftContext) -> Result<DraftedResponse, CollaboratorError>;
}

/// Comparative Market Analysis report from the property collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmaReport {
    pub address: String,
    pub estimated_value: f64,
    pub comparable_count: u32,
    pub summary: String,
}

/// External CMA generator
#[async_trait]
pub trait CmaGenerator: Send + Sync {
    async fn generate(&self, address: &str) -> Result<CmaReport, CollaboratorError>;
}

/// Opaque journey prediction consumed at the nurture day-30 decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JourneyPrediction {
    /// Probability the lead converts, 0.0-1.0
    pub conversion_probability: f64,
    /// Risk the lead drops off entirely, 0.0-1.0
    pub drop_off_risk: f64,
}

/// Opaque predictor over a lead's score history. ML-backed in production;
/// a score-trend heuristic by default.
pub trait JourneyPredictor: Send + Sync {
    fn predict(&self, frs_history: &[f64], pcs_history: &[f64]) -> JourneyPrediction;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_outcome_constructors() {
        let ok = SendOutcome::delivered("msg-1");
        assert!(ok.success);
        assert_eq!(ok.provider_message_id.as_deref(), Some("msg-1"));

        let bad = SendOutcome::failed("timeout");
        assert!(!bad.success);
        assert_eq!(bad.error_kind.as_deref(), Some("timeout"));
    }
}
