//! Lead classification, channels and conversational tone

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What side of a transaction the lead is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadKind {
    Buyer,
    Seller,
    #[default]
    Unknown,
}

impl LeadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadKind::Buyer => "buyer",
            LeadKind::Seller => "seller",
            LeadKind::Unknown => "unknown",
        }
    }
}

/// Lead temperature derived from the Financial Readiness Score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Cold,
    Lukewarm,
    Warm,
    Hot,
}

impl Classification {
    /// Bucket a 0-100 FRS total using the given thresholds (hot/warm/lukewarm)
    pub fn from_score(score: f64, hot: f64, warm: f64, lukewarm: f64) -> Self {
        if score >= hot {
            Classification::Hot
        } else if score >= warm {
            Classification::Warm
        } else if score >= lukewarm {
            Classification::Lukewarm
        } else {
            Classification::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Hot => "hot",
            Classification::Warm => "warm",
            Classification::Lukewarm => "lukewarm",
            Classification::Cold => "cold",
        }
    }

    pub fn at_least_warm(&self) -> bool {
        matches!(self, Classification::Hot | Classification::Warm)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery channel for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
    Chat,
    Voice,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
            Channel::Chat => "chat",
            Channel::Voice => "voice",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conversational tone a workflow responds with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Warm,
    Direct,
    Confrontational,
    TakeAway,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Warm => "warm",
            Tone::Direct => "direct",
            Tone::Confrontational => "confrontational",
            Tone::TakeAway => "take_away",
        }
    }

    /// Prompt guidance handed to the response drafter
    pub fn guidance(&self) -> &'static str {
        match self {
            Tone::Warm => "Be friendly and encouraging. Build rapport before asking for anything.",
            Tone::Direct => "Be concise and businesslike. Ask the next question plainly.",
            Tone::Confrontational => {
                "Challenge the hesitation head-on. Name the stall and ask a pointed question."
            }
            Tone::TakeAway => {
                "Step back. Signal that now may not be the right time and leave the door open."
            }
        }
    }
}

/// Coarse emotional state inferred from a lead's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    #[default]
    Neutral,
    Excited,
    Frustrated,
    Skeptical,
}

/// Recorded change of emotional state, kept in a bounded ring on the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalTransition {
    pub from: EmotionalState,
    pub to: EmotionalState,
    pub at: DateTime<Utc>,
}
