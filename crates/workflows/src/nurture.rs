//! Nurture sequence workflow
//!
//! A 3/7/14/30-day cadence of touchpoints. Each touch recomputes intent,
//! consults the behavioural profile, and picks channel and timing from the
//! cadence table. The day-7 touch attempts a voice call; day 30 generates a
//! CMA and terminates the sequence with one of three outcomes decided by the
//! journey predictor. A sustained score decline while the lead is still warm
//! short-circuits into immediate re-engagement.

use serde_json::json;

use leadflow_config::HandoffConfig;
use leadflow_core::events::EventKind;
use leadflow_core::lead::{Channel, Tone};
use leadflow_core::plan::OutboundAction;
use leadflow_core::scoring::{IntentProfile, RecommendedAction};
use leadflow_core::traits::{CmaGenerator, JourneyPredictor};
use leadflow_core::workflow::{NurtureOutcome, NurtureState, NurtureTouch, WorkflowState};
use leadflow_intent::monotonic_decline;
use leadflow_session::{LeadSession, ResponderKind};

use crate::engine::NodeOutcome;
use crate::gate::{evaluate_gate, HandoffTarget};
use crate::templates;

/// Day offsets for the four touches, keyed by responder speed
fn cadence(responder: ResponderKind) -> [i64; 4] {
    match responder {
        ResponderKind::Fast => [1, 3, 7, 14],
        ResponderKind::Moderate => [3, 7, 14, 30],
        ResponderKind::Slow => [5, 14, 21, 45],
    }
}

pub async fn route(
    session: &mut LeadSession,
    profile: &IntentProfile,
    cma: &dyn CmaGenerator,
    predictor: &dyn JourneyPredictor,
    handoff: &HandoffConfig,
    update: &leadflow_core::scoring::IncrementalUpdate,
) -> NodeOutcome {
    let mut state = match &session.workflow_state {
        WorkflowState::NurtureSequence(s) => s.clone(),
        _ => NurtureState::default(),
    };

    let behavior = session.behavior_profile();
    let snapshots = session.score_snapshots();

    // Early warning: three monotonically declining snapshots on a lead
    // that is still at least warm escalates to immediate re-engagement.
    if !state.re_engagement_triggered
        && monotonic_decline(&snapshots)
        && profile.classification.at_least_warm()
    {
        state.re_engagement_triggered = true;
        let outcome = NodeOutcome {
            tone: Tone::Warm,
            fallback_text: templates::nurture_re_engagement(session.lead_name.as_deref()),
            skip_draft: true,
            actions: vec![OutboundAction::ScheduleFollowUp {
                after_days: 1,
                channel: Channel::Voice,
            }],
            events: vec![(
                EventKind::NurtureTouchpoint,
                json!({
                    "touch": "re-engagement",
                    "reason": "score-decline-while-warm",
                    "channel": "voice",
                }),
            )],
            ..NodeOutcome::default()
        };
        session.workflow_state = WorkflowState::NurtureSequence(state);
        return outcome;
    }

    // Strong positive momentum accelerates the remaining cadence
    let responder = if update.recommended_action == RecommendedAction::AccelerateSequence {
        ResponderKind::Fast
    } else {
        behavior.responder
    };
    let days = cadence(responder);
    let touch = state.next_touch;
    let channel = match touch {
        NurtureTouch::Day7 => Channel::Voice,
        _ => behavior.preferred_channel,
    };

    let outcome = match touch {
        NurtureTouch::Day30 => {
            day_30(
                session, &mut state, profile, cma, predictor, handoff, channel,
            )
            .await
        }
        _ => {
            let (day, gap_to_next) = match touch {
                NurtureTouch::Day3 => (days[0], days[1] - days[0]),
                NurtureTouch::Day7 => (days[1], days[2] - days[1]),
                NurtureTouch::Day14 => (days[2], days[3] - days[2]),
                // Handled by the branch above
                NurtureTouch::Day30 => (days[3], 0),
            };

            state.touches_sent += 1;
            if let Some(next) = touch.next() {
                state.next_touch = next;
            }

            NodeOutcome {
                tone: Tone::Warm,
                fallback_text: templates::nurture_touch(touch, session.lead_name.as_deref()),
                skip_draft: true,
                actions: vec![OutboundAction::ScheduleFollowUp {
                    after_days: gap_to_next,
                    channel,
                }],
                events: vec![(
                    EventKind::NurtureTouchpoint,
                    json!({
                        "touch": touch.as_str(),
                        "day": day,
                        "channel": channel.as_str(),
                        "responder": format!("{responder:?}").to_lowercase(),
                    }),
                )],
                ..NodeOutcome::default()
            }
        }
    };

    session.workflow_state = WorkflowState::NurtureSequence(state);
    outcome
}

/// The day-30 decision point: CMA, then qualify / continue / disengage
async fn day_30(
    session: &LeadSession,
    state: &mut NurtureState,
    profile: &IntentProfile,
    cma: &dyn CmaGenerator,
    predictor: &dyn JourneyPredictor,
    handoff: &HandoffConfig,
    channel: Channel,
) -> NodeOutcome {
    state.touches_sent += 1;

    let mut events = Vec::new();
    let mut cma_line = String::new();
    match cma.generate(&session.lead_id).await {
        Ok(report) => {
            cma_line = format!(
                " Your updated market analysis puts comparable value around ${:.0} \
                 across {} recent sales.",
                report.estimated_value, report.comparable_count
            );
        }
        Err(e) => {
            tracing::warn!(lead_id = %session.lead_id, error = %e, "CMA generation failed, continuing without");
            events.push((
                EventKind::ExternalDegraded,
                json!({"collaborator": "cma", "error": e.to_string()}),
            ));
        }
    }

    let frs_hist: Vec<f64> = session.score_snapshots().iter().map(|s| s.frs_total).collect();
    let pcs_hist: Vec<f64> = session.score_snapshots().iter().map(|s| s.pcs_total).collect();
    let prediction = predictor.predict(&frs_hist, &pcs_hist);

    let outcome_kind = if prediction.conversion_probability >= 0.5 {
        NurtureOutcome::QualifyHandoff
    } else if prediction.conversion_probability < 0.2 && prediction.drop_off_risk >= 0.8 {
        NurtureOutcome::GracefulDisengage
    } else {
        NurtureOutcome::ContinueNurture
    };
    state.outcome = Some(outcome_kind);

    events.push((
        EventKind::NurtureTouchpoint,
        json!({
            "touch": NurtureTouch::Day30.as_str(),
            "outcome": outcome_kind.as_str(),
            "conversion_probability": prediction.conversion_probability,
            "drop_off_risk": prediction.drop_off_risk,
        }),
    ));

    match outcome_kind {
        NurtureOutcome::QualifyHandoff => {
            let target = evaluate_gate(profile, handoff).target;
            let action = match target {
                HandoffTarget::LeadBot => OutboundAction::EscalateHuman {
                    reason: "day-30 qualify with ambiguous intent".to_string(),
                },
                other => OutboundAction::TriggerHandoff {
                    to: other.workflow(),
                    reason: "nurture-sequence-qualified".to_string(),
                },
            };
            NodeOutcome {
                tone: Tone::Warm,
                fallback_text: format!(
                    "{}{}",
                    templates::nurture_touch(NurtureTouch::Day30, session.lead_name.as_deref()),
                    cma_line
                ),
                skip_draft: true,
                actions: vec![action],
                events,
                ..NodeOutcome::default()
            }
        }
        NurtureOutcome::GracefulDisengage => NodeOutcome {
            tone: Tone::TakeAway,
            fallback_text: templates::nurture_disengage(session.lead_name.as_deref()),
            skip_draft: true,
            events,
            ..NodeOutcome::default()
        },
        NurtureOutcome::ContinueNurture => {
            // Fresh cycle at a relaxed pace
            state.next_touch = NurtureTouch::Day3;
            NodeOutcome {
                tone: Tone::Warm,
                fallback_text: format!(
                    "{}{}",
                    templates::nurture_touch(NurtureTouch::Day30, session.lead_name.as_deref()),
                    cma_line
                ),
                skip_draft: true,
                actions: vec![OutboundAction::ScheduleFollowUp {
                    after_days: 30,
                    channel,
                }],
                events,
                ..NodeOutcome::default()
            }
        }
    }
}
