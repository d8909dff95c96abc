//! Seller qualification workflow
//!
//! A fixed four-question script (motivation, timeline, condition, price)
//! with tone management. Stalls get one confrontational stall-breaker; a
//! second consecutive stall ends the conversation politely. A Hot lead with
//! all four questions answered is qualified and handed off.

use serde_json::json;

use leadflow_config::HandoffConfig;
use leadflow_core::events::EventKind;
use leadflow_core::lead::{Classification, Tone};
use leadflow_core::plan::OutboundAction;
use leadflow_core::scoring::IntentProfile;
use leadflow_core::workflow::{SellerOutcome, SellerState, WorkflowKind, WorkflowState};
use leadflow_intent::StallDetection;
use leadflow_session::LeadSession;

use crate::engine::NodeOutcome;
use crate::stall_breakers::stall_breaker_for;
use crate::templates;

/// Buyer confidence at which a qualified seller counts as a buyer lead too
const BUYER_INTENT_FLOOR: f64 = 0.25;

pub fn route(
    session: &mut LeadSession,
    profile: &IntentProfile,
    stall: &StallDetection,
    _handoff: &HandoffConfig,
) -> NodeOutcome {
    let mut state = match &session.workflow_state {
        WorkflowState::SellerQualify(s) => s.clone(),
        _ => SellerState::default(),
    };

    let outcome = if let Some(terminal) = state.terminal {
        closed_outcome(terminal, &state)
    } else if stall.is_stall() {
        handle_stall(session, &mut state, stall)
    } else {
        state.consecutive_stalls = 0;
        advance(&mut state, profile)
    };

    session.workflow_state = WorkflowState::SellerQualify(state);
    outcome
}

/// Terminal sessions answer briefly and take no further action
fn closed_outcome(terminal: SellerOutcome, state: &SellerState) -> NodeOutcome {
    let text = match terminal {
        SellerOutcome::Qualified => templates::seller_qualified(),
        SellerOutcome::Disengaged => templates::seller_disengage(),
    };
    NodeOutcome {
        tone: state.tone,
        fallback_text: text.to_string(),
        skip_draft: true,
        ..NodeOutcome::default()
    }
}

fn handle_stall(
    session: &mut LeadSession,
    state: &mut SellerState,
    stall: &StallDetection,
) -> NodeOutcome {
    session.stall_count += 1;

    if state.consecutive_stalls >= 1 {
        // Second stall in a row: disengage with a polite close
        state.terminal = Some(SellerOutcome::Disengaged);
        state.tone = Tone::TakeAway;
        return NodeOutcome {
            tone: Tone::TakeAway,
            fallback_text: templates::seller_disengage().to_string(),
            skip_draft: true,
            events: vec![(
                EventKind::StallDetected,
                json!({
                    "kind": stall.kind.as_str(),
                    "matched": stall.matched,
                    "consecutive": true,
                    "action": "disengage",
                }),
            )],
            ..NodeOutcome::default()
        };
    }

    state.consecutive_stalls += 1;
    state.stall_breaker_attempted = true;
    state.tone = Tone::Confrontational;

    let breaker = stall_breaker_for(stall.kind).unwrap_or_default();
    NodeOutcome {
        tone: Tone::Confrontational,
        guidance: "The lead is stalling. Challenge the hesitation directly, then restate the \
                   open question."
            .to_string(),
        fallback_text: breaker.to_string(),
        stall_breaker: Some(breaker.to_string()),
        events: vec![(
            EventKind::StallDetected,
            json!({
                "kind": stall.kind.as_str(),
                "matched": stall.matched,
                "consecutive": false,
                "action": "stall-breaker",
            }),
        )],
        ..NodeOutcome::default()
    }
}

fn advance(state: &mut SellerState, profile: &IntentProfile) -> NodeOutcome {
    // A pending question is answered by any substantive (non-stall) reply;
    // the first message answers motivation when it carries motivation signal.
    if state.waiting_for.take().is_some() {
        state.question_index += 1;
    } else if state.question_index == 0 && profile.frs.motivation > 0.0 {
        state.question_index = 1;
    }

    if profile.classification == Classification::Hot && state.all_answered() {
        state.terminal = Some(SellerOutcome::Qualified);
        state.tone = Tone::Warm;

        let buyer_intent = profile.buyer_confidence >= BUYER_INTENT_FLOOR;
        let reason = if buyer_intent {
            "buyer-intent-detected"
        } else {
            "seller-qualified"
        };

        let mut actions = vec![
            OutboundAction::TriggerHandoff {
                to: WorkflowKind::BuyerQualify,
                reason: reason.to_string(),
            },
            OutboundAction::TagContact {
                tags: vec!["qualified-seller".to_string()],
            },
        ];
        if !buyer_intent {
            // No replacement-home intent: a human works the listing side
            actions.push(OutboundAction::EscalateHuman {
                reason: "qualified seller, listing follow-up".to_string(),
            });
        }

        return NodeOutcome {
            tone: Tone::Warm,
            guidance: "The seller is fully qualified. Congratulate briefly and set up the next \
                       step with confidence."
                .to_string(),
            fallback_text: templates::seller_qualified().to_string(),
            actions,
            events: vec![(
                EventKind::QualificationProgress,
                json!({
                    "workflow": "seller-qualify",
                    "status": "qualified",
                    "frs": profile.frs.total,
                }),
            )],
            ..NodeOutcome::default()
        };
    }

    // Deep disengagement earns the take-away; otherwise keep it direct
    if profile.pcs.total < 20.0 {
        state.tone = Tone::TakeAway;
    } else if state.tone == Tone::TakeAway || state.tone == Tone::Confrontational {
        state.tone = Tone::Direct;
    }

    match state.current_question() {
        Some(question) => {
            state.waiting_for = Some(question);
            let prompt = templates::seller_question(question);
            let guidance = if state.tone == Tone::TakeAway {
                format!(
                    "Signal that walking away is fine, then ask once more: \"{prompt}\""
                )
            } else {
                format!("Ask the next qualification question: \"{prompt}\"")
            };
            NodeOutcome {
                tone: state.tone,
                guidance,
                fallback_text: prompt.to_string(),
                ..NodeOutcome::default()
            }
        }
        None => {
            // All answered but not Hot: keep the door open without pressure
            NodeOutcome {
                tone: state.tone,
                guidance: "All qualification questions are answered but the lead is not hot. \
                           Summarize and suggest a low-pressure next step."
                    .to_string(),
                fallback_text: templates::generic_fallback(state.tone).to_string(),
                ..NodeOutcome::default()
            }
        }
    }
}
