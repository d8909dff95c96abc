//! Buyer qualification workflow
//!
//! Five nodes: discovery, financial readiness, preferences, property match,
//! next action. Buyer temperature is `(frs + motivation) / 2`. A hot,
//! pre-approved buyer on a 30-day timeline jumps straight to the closing
//! terminal state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use leadflow_core::events::EventKind;
use leadflow_core::lead::{Channel, Tone};
use leadflow_core::plan::OutboundAction;
use leadflow_core::scoring::IntentProfile;
use leadflow_core::workflow::{BuyerNode, BuyerState, WorkflowState};
use leadflow_intent::StallDetection;
use leadflow_session::LeadSession;

use crate::engine::NodeOutcome;
use crate::stall_breakers::stall_breaker_for;
use crate::templates;

static BUDGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?(\d[\d,]*)\s*([kK])?|\b(\d{3,4})([kK])\b").unwrap());

/// Buyer temperature buckets over `(frs + motivation) / 2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyerTemperature {
    Hot,
    Warm,
    Cold,
}

impl BuyerTemperature {
    pub fn from_profile(profile: &IntentProfile) -> Self {
        let t = (profile.frs.total + profile.frs.motivation) / 2.0;
        if t >= 75.0 {
            BuyerTemperature::Hot
        } else if t >= 50.0 {
            BuyerTemperature::Warm
        } else {
            BuyerTemperature::Cold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerTemperature::Hot => "hot",
            BuyerTemperature::Warm => "warm",
            BuyerTemperature::Cold => "cold",
        }
    }
}

pub fn route(
    session: &mut LeadSession,
    profile: &IntentProfile,
    stall: &StallDetection,
) -> NodeOutcome {
    let mut state = match &session.workflow_state {
        WorkflowState::BuyerQualify(s) => s.clone(),
        _ => BuyerState::default(),
    };

    absorb_facts(&mut state, session, profile);
    let temperature = BuyerTemperature::from_profile(profile);

    let outcome = if state.node == BuyerNode::Closing {
        NodeOutcome {
            tone: Tone::Warm,
            guidance: "The buyer is in closing. Keep momentum on showings and paperwork."
                .to_string(),
            fallback_text: templates::buyer_prompt(BuyerNode::Closing).to_string(),
            ..NodeOutcome::default()
        }
    } else if stall.is_stall() {
        session.stall_count += 1;
        let breaker = stall_breaker_for(stall.kind).unwrap_or_default();
        NodeOutcome {
            tone: Tone::Confrontational,
            guidance: "The buyer is hesitating. Address it head-on, then return to the open \
                       question."
                .to_string(),
            fallback_text: breaker.to_string(),
            stall_breaker: Some(breaker.to_string()),
            events: vec![(
                EventKind::StallDetected,
                json!({"kind": stall.kind.as_str(), "matched": stall.matched}),
            )],
            ..NodeOutcome::default()
        }
    } else if temperature == BuyerTemperature::Hot
        && state.pre_approved
        && state.timeline_days.is_some_and(|d| d <= 30)
    {
        state.node = BuyerNode::Closing;
        NodeOutcome {
            tone: Tone::Warm,
            guidance: "Hot pre-approved buyer on a 30-day timeline. Move directly to showings \
                       and an offer plan."
                .to_string(),
            fallback_text: templates::buyer_prompt(BuyerNode::Closing).to_string(),
            actions: vec![
                OutboundAction::TagContact {
                    tags: vec!["hot-buyer".to_string()],
                },
                OutboundAction::ScheduleFollowUp {
                    after_days: 1,
                    channel: Channel::Voice,
                },
            ],
            events: vec![progress_event(&state, temperature, "closing")],
            ..NodeOutcome::default()
        }
    } else {
        let node = state.node;
        if let Some(next) = node.next() {
            state.node = next;
        }
        let prompt = templates::buyer_prompt(node);
        NodeOutcome {
            tone: if temperature == BuyerTemperature::Cold {
                Tone::Warm
            } else {
                Tone::Direct
            },
            guidance: format!("Work the {} step: \"{prompt}\"", node.as_str()),
            fallback_text: prompt.to_string(),
            events: vec![progress_event(&state, temperature, node.as_str())],
            ..NodeOutcome::default()
        }
    };

    session.workflow_state = WorkflowState::BuyerQualify(state);
    outcome
}

fn progress_event(
    state: &BuyerState,
    temperature: BuyerTemperature,
    step: &str,
) -> (EventKind, serde_json::Value) {
    (
        EventKind::QualificationProgress,
        json!({
            "workflow": "buyer-qualify",
            "step": step,
            "temperature": temperature.as_str(),
            "pre_approved": state.pre_approved,
        }),
    )
}

/// Pull durable facts out of the latest message and the profile
fn absorb_facts(state: &mut BuyerState, session: &LeadSession, profile: &IntentProfile) {
    if let Some(latest) = session.history.iter().rev().find(|t| t.is_user()) {
        let lower = latest.content.to_lowercase();
        if lower.contains("pre-approved") || lower.contains("preapproved") {
            state.pre_approved = true;
        }
        if state.budget.is_none() {
            state.budget = extract_budget(&latest.content);
        }
    }

    // A timeline sub-score of 100 means an explicit <=30-day horizon
    if profile.frs.timeline >= 100.0 {
        state.timeline_days = Some(30);
    } else if profile.frs.timeline >= 80.0 && state.timeline_days.is_none() {
        state.timeline_days = Some(90);
    }
}

fn extract_budget(text: &str) -> Option<f64> {
    let caps = BUDGET_RE.captures(text)?;
    if let Some(figure) = caps.get(1) {
        let value: f64 = figure.as_str().replace(',', "").parse().ok()?;
        let scale = if caps.get(2).is_some() { 1_000.0 } else { 1.0 };
        return Some(value * scale);
    }
    let bare = caps.get(3)?;
    let value: f64 = bare.as_str().parse().ok()?;
    Some(value * 1_000.0)
}
