//! Orchestration events
//!
//! Events are append-only observations emitted as the orchestrator and
//! workflows make decisions. The bus is best-effort fire-and-forget: a
//! publish with no subscribers (or a lagging subscriber) never fails the
//! inbound that produced it. Per-lead ordering follows emission order because
//! handlers for one lead are serialised by the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Closed set of orchestration event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    InboundReceived,
    OutboundSent,
    BotSwitched,
    HandoffTriggered,
    SmsOptOut,
    SmsBlocked,
    ScoreUpdated,
    StallDetected,
    SessionEvicted,
    ExternalDegraded,
    QualificationProgress,
    NurtureTouchpoint,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::InboundReceived => "inbound-received",
            EventKind::OutboundSent => "outbound-sent",
            EventKind::BotSwitched => "bot-switched",
            EventKind::HandoffTriggered => "handoff-triggered",
            EventKind::SmsOptOut => "sms-opt-out",
            EventKind::SmsBlocked => "sms-blocked",
            EventKind::ScoreUpdated => "score-updated",
            EventKind::StallDetected => "stall-detected",
            EventKind::SessionEvicted => "session-evicted",
            EventKind::ExternalDegraded => "external-degraded",
            EventKind::QualificationProgress => "qualification-progress",
            EventKind::NurtureTouchpoint => "nurture-touchpoint",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single emitted event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    pub lead_id: String,
    pub at: DateTime<Utc>,
    /// Kind-specific detail
    pub payload: Value,
}

impl OrchestrationEvent {
    pub fn new(kind: EventKind, lead_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            lead_id: lead_id.into(),
            at: Utc::now(),
            payload,
        }
    }
}

/// Process-wide event bus backed by a broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OrchestrationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Best effort: an error (no subscribers) is logged at
    /// trace level and swallowed.
    pub fn publish(&self, event: OrchestrationEvent) {
        tracing::debug!(
            kind = %event.kind,
            lead_id = %event.lead_id,
            "orchestration event"
        );
        if self.tx.send(event).is_err() {
            tracing::trace!("event published with no subscribers");
        }
    }

    pub fn emit(&self, kind: EventKind, lead_id: &str, payload: Value) {
        self.publish(OrchestrationEvent::new(kind, lead_id, payload));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
