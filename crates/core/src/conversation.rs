//! Conversation turns and inbound message envelopes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lead::{Channel, LeadKind};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Lead/customer message
    User,
    /// Bot/agent message
    Assistant,
    /// System message (instructions)
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "user" | "lead" | "customer" => Some(TurnRole::User),
            "assistant" | "agent" | "bot" => Some(TurnRole::Assistant),
            "system" => Some(TurnRole::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a lead conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Get word count
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }
}

/// Untyped history message as it arrives over the wire.
///
/// Seed history supplied with an inbound payload is validated into [`Turn`]s
/// before a session is touched; a message with no role or no content is
/// rejected as [`Error::MalformedHistory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawMessage {
    /// Validate a raw history into typed turns. Unknown role strings and
    /// absent fields both count as malformed.
    pub fn validate_history(raw: &[RawMessage]) -> Result<Vec<Turn>, Error> {
        raw.iter()
            .enumerate()
            .map(|(index, msg)| {
                let role = msg
                    .role
                    .as_deref()
                    .and_then(TurnRole::parse)
                    .ok_or(Error::MalformedHistory {
                        index,
                        missing: "role",
                    })?;
                let content = msg.content.clone().ok_or(Error::MalformedHistory {
                    index,
                    missing: "content",
                })?;
                Ok(Turn {
                    role,
                    content,
                    timestamp: msg.timestamp.unwrap_or_else(Utc::now),
                })
            })
            .collect()
    }
}

/// Inbound message envelope — the orchestrator's single entry point input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Lead identifier (CRM contact ID)
    pub lead_id: String,
    /// Display name, if known
    #[serde(default)]
    pub lead_name: Option<String>,
    /// Channel the message arrived on
    pub channel: Channel,
    /// Message text
    pub content: String,
    /// Phone number (required for SMS compliance handling)
    #[serde(default)]
    pub phone: Option<String>,
    /// Caller-supplied routing hint; overrides confidence-based selection
    #[serde(default)]
    pub lead_kind_hint: Option<LeadKind>,
    /// Prior conversation context (already validated) used to seed a new
    /// session. Ignored when the session already exists.
    #[serde(default)]
    pub seed_history: Vec<Turn>,
}

impl InboundMessage {
    pub fn new(lead_id: impl Into<String>, channel: Channel, content: impl Into<String>) -> Self {
        Self {
            lead_id: lead_id.into(),
            lead_name: None,
            channel,
            content: content.into(),
            phone: None,
            lead_kind_hint: None,
            seed_history: Vec::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.lead_name = Some(name.into());
        self
    }

    pub fn with_hint(mut self, hint: LeadKind) -> Self {
        self.lead_kind_hint = Some(hint);
        self
    }
}
