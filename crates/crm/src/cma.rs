//! CMA generator client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use leadflow_config::{CrmConfig, DeadlineConfig};
use leadflow_core::traits::{CmaGenerator, CmaReport, CollaboratorError};

#[derive(Debug, Deserialize)]
struct CmaResponse {
    address: String,
    estimated_value: f64,
    #[serde(default)]
    comparable_count: u32,
    #[serde(default)]
    summary: String,
}

/// CMA generator over the property collaborator's REST API. CMA runs are
/// slow, so this carries its own (longer) deadline.
pub struct HttpCmaGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    deadline: Duration,
}

impl HttpCmaGenerator {
    pub fn new(config: &CrmConfig, deadlines: &DeadlineConfig) -> Self {
        let deadline = Duration::from_secs(deadlines.cma_secs);
        let client = reqwest::Client::builder()
            .timeout(deadline)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            deadline,
        }
    }
}

#[async_trait]
impl CmaGenerator for HttpCmaGenerator {
    async fn generate(&self, address: &str) -> Result<CmaReport, CollaboratorError> {
        let mut builder = self
            .client
            .post(format!("{}/cma", self.base_url))
            .json(&serde_json::json!({ "address": address }));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Deadline(self.deadline)
            } else {
                CollaboratorError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }

        let body: CmaResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        Ok(CmaReport {
            address: body.address,
            estimated_value: body.estimated_value,
            comparable_count: body.comparable_count,
            summary: body.summary,
        })
    }
}
