//! HTTP CRM client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use leadflow_config::{CrmConfig, DeadlineConfig};
use leadflow_core::lead::Channel;
use leadflow_core::traits::{CollaboratorError, Contact, CrmClient, SendOutcome};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    destination: &'a str,
    content: &'a str,
    channel: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    success: bool,
    #[serde(default)]
    provider_message_id: Option<String>,
    #[serde(default)]
    error_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactsResponse {
    #[serde(default)]
    contacts: Vec<Contact>,
}

/// CRM client over a REST API, with the configured deadline on every call
pub struct HttpCrmClient {
    client: reqwest::Client,
    config: CrmConfig,
    deadline: Duration,
}

impl HttpCrmClient {
    pub fn new(config: CrmConfig, deadlines: &DeadlineConfig) -> Self {
        let deadline = Duration::from_secs(deadlines.crm_secs);
        let client = reqwest::Client::builder()
            .timeout(deadline)
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            deadline,
        }
    }

    /// Probe the endpoint once. Used at startup to decide exit code 2.
    pub async fn healthcheck(&self) -> Result<(), CollaboratorError> {
        self.client
            .get(format!("{}/health", self.config.base_url))
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(())
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn map_err(&self, e: reqwest::Error) -> CollaboratorError {
        if e.is_timeout() {
            CollaboratorError::Deadline(self.deadline)
        } else {
            CollaboratorError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn send_message(
        &self,
        destination: &str,
        content: &str,
        channel: Channel,
    ) -> Result<SendOutcome, CollaboratorError> {
        let request = SendMessageRequest {
            destination,
            content,
            channel: channel.as_str(),
        };
        let response = self
            .authed(
                self.client
                    .post(format!("{}/messages", self.config.base_url))
                    .json(&request),
            )
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| self.map_err(e))?;

        tracing::debug!(
            destination = %destination,
            channel = %channel,
            success = body.success,
            "CRM delivery attempted"
        );

        Ok(SendOutcome {
            success: body.success,
            provider_message_id: body.provider_message_id,
            error_kind: body.error_kind,
        })
    }

    async fn add_tags(&self, contact_id: &str, tags: &[String]) -> Result<(), CollaboratorError> {
        let response = self
            .authed(
                self.client
                    .post(format!(
                        "{}/contacts/{contact_id}/tags",
                        self.config.base_url
                    ))
                    .json(&serde_json::json!({ "tags": tags })),
            )
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn contacts_by_pipeline_stage(
        &self,
        location_id: &str,
        stage_id: &str,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/locations/{location_id}/contacts?stage={stage_id}&limit={limit}",
                self.config.base_url
            )))
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let body: ContactsResponse = response
            .json()
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(body.contacts)
    }

    async fn contacts_inactive_since(
        &self,
        location_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Contact>, CollaboratorError> {
        let response = self
            .authed(self.client.get(format!(
                "{}/locations/{location_id}/contacts?inactive_since={}&limit={limit}",
                self.config.base_url,
                since.to_rfc3339()
            )))
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let body: ContactsResponse = response
            .json()
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(body.contacts)
    }

    async fn update_contact(
        &self,
        contact_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        let response = self
            .authed(
                self.client
                    .put(format!("{}/contacts/{contact_id}", self.config.base_url))
                    .json(fields),
            )
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
