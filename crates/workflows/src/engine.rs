//! The workflow engine
//!
//! Runs the common node vocabulary around each bot's state machine:
//! *analyze-intent* (intent decoder), *detect-stall*, *route* (the
//! workflow-specific transition), *draft-response*. Routing mutates the
//! session's workflow state; drafting turns the routed [`NodeOutcome`] into
//! the final [`OutboundPlan`], falling back to the node's template when the
//! drafter collaborator fails.

use serde_json::{json, Value};
use std::sync::Arc;

use leadflow_config::HandoffConfig;
use leadflow_core::events::{EventBus, EventKind};
use leadflow_core::lead::Tone;
use leadflow_core::plan::{OutboundPlan, PlannedAction};
use leadflow_core::scoring::IncrementalUpdate;
use leadflow_core::traits::{CmaGenerator, DraftContext, JourneyPredictor, ResponseDrafter};
use leadflow_core::workflow::WorkflowKind;
use leadflow_intent::{IntentDecoder, StallDetector};
use leadflow_session::LeadSession;

use crate::{buyer, nurture, prospecting, seller};

/// How many trailing turns the drafter sees
const DRAFT_HISTORY_TURNS: usize = 8;

/// What a routed node hands back to the engine
#[derive(Debug, Clone, Default)]
pub struct NodeOutcome {
    pub tone: Tone,
    /// Stage guidance folded into the drafter's system prompt
    pub guidance: String,
    /// Deterministic text used when drafting is skipped or degraded
    pub fallback_text: String,
    pub stall_breaker: Option<String>,
    pub actions: Vec<leadflow_core::plan::OutboundAction>,
    pub events: Vec<(EventKind, Value)>,
    /// Ship the fallback verbatim without calling the drafter
    /// (template-driven touches, terminal closes)
    pub skip_draft: bool,
}

/// Engine over the four bot state machines
pub struct WorkflowEngine {
    decoder: IntentDecoder,
    stall_detector: StallDetector,
    drafter: Arc<dyn ResponseDrafter>,
    cma: Arc<dyn CmaGenerator>,
    predictor: Arc<dyn JourneyPredictor>,
    events: EventBus,
    handoff: HandoffConfig,
}

impl WorkflowEngine {
    pub fn new(
        decoder: IntentDecoder,
        drafter: Arc<dyn ResponseDrafter>,
        cma: Arc<dyn CmaGenerator>,
        predictor: Arc<dyn JourneyPredictor>,
        events: EventBus,
        handoff: HandoffConfig,
    ) -> Self {
        Self {
            decoder,
            stall_detector: StallDetector::new(),
            drafter,
            cma,
            predictor,
            events,
            handoff,
        }
    }

    pub fn decoder(&self) -> &IntentDecoder {
        &self.decoder
    }

    /// Run the session's current workflow against the latest inbound and
    /// produce the response plan. The session's workflow state is advanced
    /// in place; persisting it is the caller's job.
    pub async fn run(
        &self,
        session: &mut LeadSession,
        update: &IncrementalUpdate,
    ) -> OutboundPlan {
        // analyze-intent
        let profile = self.decoder.analyze(&session.lead_id, &session.history);
        session.last_profile = Some(profile.clone());

        // detect-stall: the latest message decides whether a stall is
        // happening *now* (consecutive-stall logic lives in the workflows)
        let stall = self.stall_detector.detect_latest(&session.history);

        // route
        let kind = session.workflow_state.kind();
        let outcome = match kind {
            WorkflowKind::SellerQualify => {
                seller::route(session, &profile, &stall, &self.handoff)
            }
            WorkflowKind::BuyerQualify => buyer::route(session, &profile, &stall),
            WorkflowKind::NurtureSequence => {
                nurture::route(
                    session,
                    &profile,
                    self.cma.as_ref(),
                    self.predictor.as_ref(),
                    &self.handoff,
                    update,
                )
                .await
            }
            WorkflowKind::OutboundProspecting => {
                prospecting::route(session, &profile, &self.handoff)
            }
        };

        for (event_kind, payload) in &outcome.events {
            self.events.emit(*event_kind, &session.lead_id, payload.clone());
        }

        // draft-response
        let (reply_text, degraded) = self.draft(kind, session, &profile, &outcome).await;

        OutboundPlan {
            reply_text,
            tone: outcome.tone,
            actions: outcome
                .actions
                .into_iter()
                .map(PlannedAction::planned)
                .collect(),
            degraded,
        }
    }

    async fn draft(
        &self,
        kind: WorkflowKind,
        session: &LeadSession,
        profile: &leadflow_core::scoring::IntentProfile,
        outcome: &NodeOutcome,
    ) -> (String, bool) {
        if outcome.skip_draft {
            return (outcome.fallback_text.clone(), false);
        }

        let start = session.history.len().saturating_sub(DRAFT_HISTORY_TURNS);
        let ctx = DraftContext {
            system_prompt: self.system_prompt(kind, profile, outcome),
            history: session.history[start..].to_vec(),
            tone: outcome.tone,
            classification: profile.classification,
            stall_breaker: outcome.stall_breaker.clone(),
        };

        match self.drafter.draft(&ctx).await {
            Ok(response) => {
                tracing::debug!(
                    lead_id = %session.lead_id,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "response drafted"
                );
                (response.text, false)
            }
            Err(e) => {
                tracing::warn!(lead_id = %session.lead_id, error = %e, "drafter failed, using template fallback");
                self.events.emit(
                    EventKind::ExternalDegraded,
                    &session.lead_id,
                    json!({"collaborator": "llm", "error": e.to_string()}),
                );
                (outcome.fallback_text.clone(), true)
            }
        }
    }

    fn system_prompt(
        &self,
        kind: WorkflowKind,
        profile: &leadflow_core::scoring::IntentProfile,
        outcome: &NodeOutcome,
    ) -> String {
        let mut prompt = format!(
            "You are a real estate engagement assistant running a {} conversation. \
             Lead temperature: {}. Tone: {}. {}",
            kind,
            profile.classification,
            outcome.tone.as_str(),
            outcome.tone.guidance(),
        );
        if !outcome.guidance.is_empty() {
            prompt.push(' ');
            prompt.push_str(&outcome.guidance);
        }
        if let Some(breaker) = &outcome.stall_breaker {
            prompt.push_str(" Work this line into the reply naturally: \"");
            prompt.push_str(breaker);
            prompt.push('"');
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadflow_core::conversation::Turn;
    use leadflow_core::plan::OutboundAction;
    use leadflow_core::traits::{CmaReport, CollaboratorError, DraftedResponse, JourneyPrediction};
    use leadflow_core::workflow::{SellerOutcome, WorkflowState};
    use leadflow_session::SessionSeed;

    pub(crate) struct FixedDrafter {
        pub fail: bool,
    }

    #[async_trait]
    impl ResponseDrafter for FixedDrafter {
        async fn draft(&self, ctx: &DraftContext) -> Result<DraftedResponse, CollaboratorError> {
            if self.fail {
                return Err(CollaboratorError::Deadline(std::time::Duration::from_secs(10)));
            }
            Ok(DraftedResponse {
                text: format!("drafted[{}]", ctx.tone.as_str()),
                input_tokens: 100,
                output_tokens: 20,
            })
        }
    }

    pub(crate) struct StubCma;

    #[async_trait]
    impl CmaGenerator for StubCma {
        async fn generate(&self, address: &str) -> Result<CmaReport, CollaboratorError> {
            Ok(CmaReport {
                address: address.to_string(),
                estimated_value: 450_000.0,
                comparable_count: 5,
                summary: "stable market".into(),
            })
        }
    }

    pub(crate) struct StubPredictor(pub f64, pub f64);

    impl JourneyPredictor for StubPredictor {
        fn predict(&self, _frs: &[f64], _pcs: &[f64]) -> JourneyPrediction {
            JourneyPrediction {
                conversion_probability: self.0,
                drop_off_risk: self.1,
            }
        }
    }

    pub(crate) fn engine_with(fail_drafter: bool) -> WorkflowEngine {
        WorkflowEngine::new(
            IntentDecoder::default(),
            Arc::new(FixedDrafter { fail: fail_drafter }),
            Arc::new(StubCma),
            Arc::new(StubPredictor(0.3, 0.3)),
            EventBus::new(64),
            HandoffConfig::default(),
        )
    }

    fn seller_session(messages: &[&str]) -> LeadSession {
        let mut session = LeadSession::new(
            "lead-1",
            SessionSeed {
                initial_bot: Some(WorkflowKind::SellerQualify),
                ..SessionSeed::default()
            },
        );
        for m in messages {
            session.append_turn(Turn::user(*m));
        }
        session
    }

    #[tokio::test]
    async fn test_engine_drafts_reply() {
        let engine = engine_with(false);
        let mut session = seller_session(&["I want to sell my house"]);
        let update = IncrementalUpdate::zero("I want to sell my house");

        let plan = engine.run(&mut session, &update).await;
        assert!(plan.reply_text.starts_with("drafted["));
        assert!(!plan.degraded);
        assert!(session.last_profile.is_some());
    }

    #[tokio::test]
    async fn test_drafter_failure_falls_back_to_template() {
        let engine = engine_with(true);
        let mut session = seller_session(&["I want to sell my house"]);
        let update = IncrementalUpdate::zero("I want to sell my house");

        let plan = engine.run(&mut session, &update).await;
        assert!(plan.degraded);
        assert!(!plan.reply_text.is_empty(), "fallback template must ship");
        // Workflow state still advanced despite the degraded draft
        assert!(matches!(
            session.workflow_state,
            WorkflowState::SellerQualify(_)
        ));
    }

    #[tokio::test]
    async fn test_hot_seller_reaches_qualified_with_handoff_action() {
        let engine = engine_with(false);
        let mut session = seller_session(&[]);
        let update = IncrementalUpdate::zero("");

        let turns = [
            "I need to sell my house fast, going through a divorce.",
            "We need to close in 60 days or less",
            "Yes I'm the sole decision maker",
            "The house is move-in ready",
        ];
        let mut last_plan = OutboundPlan::silent();
        for turn in turns {
            session.append_turn(Turn::user(turn));
            last_plan = engine.run(&mut session, &update).await;
        }

        match &session.workflow_state {
            WorkflowState::SellerQualify(state) => {
                assert_eq!(state.terminal, Some(SellerOutcome::Qualified));
                assert!(state.all_answered());
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(
            last_plan
                .actions
                .iter()
                .any(|a| matches!(a.action, OutboundAction::TriggerHandoff { .. })),
            "qualified seller plan must carry a handoff"
        );
    }

    #[tokio::test]
    async fn test_stall_then_second_stall_disengages() {
        let engine = engine_with(false);
        let mut session = seller_session(&["I want to sell my house"]);
        let update = IncrementalUpdate::zero("");
        engine.run(&mut session, &update).await;

        session.append_turn(Turn::user("I need to think about it"));
        let plan = engine.run(&mut session, &update).await;
        assert_eq!(plan.tone, Tone::Confrontational);
        match &session.workflow_state {
            WorkflowState::SellerQualify(state) => {
                assert!(state.stall_breaker_attempted);
                assert_eq!(state.consecutive_stalls, 1);
                assert!(state.terminal.is_none());
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(session.stall_count, 1);

        session.append_turn(Turn::user("still thinking"));
        engine.run(&mut session, &update).await;
        match &session.workflow_state {
            WorkflowState::SellerQualify(state) => {
                assert_eq!(state.terminal, Some(SellerOutcome::Disengaged));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }
}
