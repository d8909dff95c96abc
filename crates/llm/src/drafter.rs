//! HTTP chat-completion drafter
//!
//! Talks to an Ollama-compatible `/api/chat` endpoint. Every call carries
//! the configured deadline; transient failures retry with doubling backoff
//! up to the configured budget, then surface as a collaborator error for the
//! caller's soft fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use leadflow_config::{DeadlineConfig, LlmConfig};
use leadflow_core::conversation::TurnRole;
use leadflow_core::traits::{CollaboratorError, DraftContext, DraftedResponse, ResponseDrafter};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Drafter over an Ollama-compatible chat endpoint
pub struct HttpResponseDrafter {
    client: reqwest::Client,
    config: LlmConfig,
    deadline: Duration,
}

impl HttpResponseDrafter {
    pub fn new(config: LlmConfig, deadlines: &DeadlineConfig) -> Self {
        let deadline = Duration::from_secs(deadlines.llm_secs);
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
            .get(format!("{}/api/tags", self.config.endpoint))
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn call_once(&self, ctx: &DraftContext) -> Result<DraftedResponse, CollaboratorError> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: &ctx.system_prompt,
        }];
        for turn in &ctx.history {
            messages.push(ChatMessage {
                role: match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                    TurnRole::System => "system",
                },
                content: &turn.content,
            });
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let mut builder = self
            .client
            .post(format!("{}/api/chat", self.config.endpoint))
            .json(&request);
        if let Some(key) = &self.config.api_key {
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

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        Ok(DraftedResponse {
            text: body.message.content.trim().to_string(),
            input_tokens: body.prompt_eval_count,
            output_tokens: body.eval_count,
        })
    }
}

#[async_trait]
impl ResponseDrafter for HttpResponseDrafter {
    async fn draft(&self, ctx: &DraftContext) -> Result<DraftedResponse, CollaboratorError> {
        let mut backoff = Duration::from_millis(100);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.call_once(ctx).await {
                Ok(response) if !response.text.is_empty() => return Ok(response),
                Ok(_) => {
                    last_error = Some(CollaboratorError::Rejected("empty draft".to_string()));
                }
                // A deadline already consumed the whole budget; don't retry
                Err(CollaboratorError::Deadline(d)) => {
                    return Err(CollaboratorError::Deadline(d));
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "draft attempt failed");
                    last_error = Some(e);
                }
            }
            if attempt < self.config.max_retries {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(last_error
            .unwrap_or_else(|| CollaboratorError::Transport("no attempts made".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::conversation::Turn;
    use leadflow_core::lead::{Classification, Tone};

    fn ctx() -> DraftContext {
        DraftContext {
            system_prompt: "You are a helpful assistant.".into(),
            history: vec![Turn::user("hello")],
            tone: Tone::Warm,
            classification: Classification::Warm,
            stall_breaker: None,
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            max_retries: 0,
            ..LlmConfig::default()
        };
        let drafter = HttpResponseDrafter::new(config, &DeadlineConfig::default());

        let err = drafter.draft(&ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Transport(_) | CollaboratorError::Deadline(_)
        ));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatRequest {
            model: "test-model",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            stream: false,
            options: ChatOptions {
                temperature: 0.7,
                num_predict: 128,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["options"]["num_predict"], 128);
    }
}
