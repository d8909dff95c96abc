//! Outbound plans and side-effect actions
//!
//! Every workflow run produces an [`OutboundPlan`]: the reply text plus zero
//! or more side-effect actions. The orchestrator executes the actions,
//! recording a per-action status so a denied SMS is visible to the caller
//! rather than silently dropped.

use serde::{Deserialize, Serialize};

use crate::lead::{Channel, Tone};
use crate::workflow::WorkflowKind;

/// A side effect a workflow wants performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutboundAction {
    SendSms {
        phone: String,
        body: String,
    },
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
    ScheduleFollowUp {
        /// Days until the follow-up fires
        after_days: i64,
        channel: Channel,
    },
    TriggerHandoff {
        to: WorkflowKind,
        reason: String,
    },
    EscalateHuman {
        reason: String,
    },
    TagContact {
        tags: Vec<String>,
    },
    GenerateCma {
        address: String,
    },
}

impl OutboundAction {
    pub fn kind_str(&self) -> &'static str {
        match self {
            OutboundAction::SendSms { .. } => "send-sms",
            OutboundAction::SendEmail { .. } => "send-email",
            OutboundAction::ScheduleFollowUp { .. } => "schedule-followup",
            OutboundAction::TriggerHandoff { .. } => "trigger-handoff",
            OutboundAction::EscalateHuman { .. } => "escalate-human",
            OutboundAction::TagContact { .. } => "tag-contact",
            OutboundAction::GenerateCma { .. } => "generate-cma",
        }
    }

}

/// Execution status of a planned action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ActionStatus {
    /// Not yet executed
    Planned,
    /// Delivered to the collaborator
    Dispatched,
    /// Denied by the compliance gate
    Blocked { reason: String },
    /// Collaborator call failed (soft)
    Failed { error: String },
}

/// An action with its execution status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: OutboundAction,
    pub status: ActionStatus,
}

impl PlannedAction {
    pub fn planned(action: OutboundAction) -> Self {
        Self {
            action,
            status: ActionStatus::Planned,
        }
    }
}

/// The complete response plan a workflow hands back to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutboundPlan {
    /// Reply text for the lead (may be empty, e.g. after an opt-out)
    pub reply_text: String,
    /// Tone the reply was drafted with
    pub tone: Tone,
    /// Side effects with per-action status
    pub actions: Vec<PlannedAction>,
    /// True when a collaborator failed and a template fallback was used
    pub degraded: bool,
}

impl OutboundPlan {
    pub fn reply(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            reply_text: text.into(),
            tone,
            actions: Vec::new(),
            degraded: false,
        }
    }

    /// A plan with no reply and no side effects
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: OutboundAction) -> Self {
        self.actions.push(PlannedAction::planned(action));
        self
    }

    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// First handoff action in the plan, if any
    pub fn handoff(&self) -> Option<(&WorkflowKind, &str)> {
        self.actions.iter().find_map(|a| match &a.action {
            OutboundAction::TriggerHandoff { to, reason } => Some((to, reason.as_str())),
            _ => None,
        })
    }
}
