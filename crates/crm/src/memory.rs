//! In-memory collaborator doubles
//!
//! Used by tests and offline runs. The CRM double records every delivery so
//! assertions can inspect what would have gone out; the CMA double returns a
//! fixed report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use leadflow_core::lead::Channel;
use leadflow_core::traits::{
    CmaGenerator, CmaReport, CollaboratorError, Contact, CrmClient, SendOutcome,
};

/// One message the CRM double "delivered"
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub destination: String,
    pub content: String,
    pub channel: Channel,
    pub at: DateTime<Utc>,
}

/// Recording CRM double
#[derive(Default)]
pub struct InMemoryCrm {
    sends: Mutex<Vec<RecordedSend>>,
    tags: Mutex<Vec<(String, Vec<String>)>>,
    contacts: Mutex<Vec<Contact>>,
    /// When set, every send reports failure with this error kind
    fail_sends_with: Mutex<Option<String>>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Mutex::new(contacts),
            ..Self::default()
        }
    }

    pub fn fail_sends(&self, error_kind: impl Into<String>) {
        *self.fail_sends_with.lock() = Some(error_kind.into());
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }

    pub fn tags(&self) -> Vec<(String, Vec<String>)> {
        self.tags.lock().clone()
    }
}

#[async_trait]
impl CrmClient for InMemoryCrm {
    async fn send_message(
        &self,
        destination: &str,
        content: &str,
        channel: Channel,
    ) -> Result<SendOutcome, CollaboratorError> {
        if let Some(kind) = self.fail_sends_with.lock().clone() {
            return Ok(SendOutcome::failed(kind));
        }
        self.sends.lock().push(RecordedSend {
            destination: destination.to_string(),
            content: content.to_string(),
            channel,
            at: Utc::now(),
        });
        Ok(SendOutcome::delivered(Uuid::new_v4().to_string()))
    }

    async fn add_tags(&self, contact_id: &str, tags: &[String]) -> Result<(), CollaboratorError> {
        self.tags
            .lock()
            .push((contact_id.to_string(), tags.to_vec()));
        Ok(())
    }

    async fn contacts_by_pipeline_stage(
        &self,
        _location_id: &str,
        stage_id: &str,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError> {
        Ok(self
            .contacts
            .lock()
            .iter()
            .filter(|c| c.pipeline_stage.as_deref() == Some(stage_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn contacts_inactive_since(
        &self,
        _location_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError> {
        Ok(self
            .contacts
            .lock()
            .iter()
            .filter(|c| c.last_activity.map(|at| at < since).unwrap_or(false))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_contact(
        &self,
        _contact_id: &str,
        _fields: &serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// CMA double returning a fixed report
#[derive(Debug, Clone)]
pub struct StaticCmaGenerator {
    pub estimated_value: f64,
}

impl Default for StaticCmaGenerator {
    fn default() -> Self {
        Self {
            estimated_value: 425_000.0,
        }
    }
}

#[async_trait]
impl CmaGenerator for StaticCmaGenerator {
    async fn generate(&self, address: &str) -> Result<CmaReport, CollaboratorError> {
        Ok(CmaReport {
            address: address.to_string(),
            estimated_value: self.estimated_value,
            comparable_count: 4,
            summary: "comparable sales within the last 90 days".to_string(),
        })
    }
}
