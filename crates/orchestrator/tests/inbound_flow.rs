//! End-to-end inbound handling against in-memory collaborators

use std::sync::Arc;

use leadflow_compliance::{ComplianceGate, InMemoryAuditLog};
use leadflow_config::Settings;
use leadflow_core::conversation::InboundMessage;
use leadflow_core::events::{EventBus, EventKind};
use leadflow_core::lead::{Channel, Classification, LeadKind, Tone};
use leadflow_core::plan::ActionStatus;
use leadflow_core::scoring::RecommendedAction;
use leadflow_core::workflow::{SellerOutcome, WorkflowKind, WorkflowState};
use leadflow_crm::{InMemoryCrm, StaticCmaGenerator};
use leadflow_intent::{DecoderConfig, IntentDecoder, RealtimeIntentUpdater};
use leadflow_llm::TemplateDrafter;
use leadflow_orchestrator::{Orchestrator, OrchestratorError};
use leadflow_session::SessionStore;
use leadflow_workflows::{TrendJourneyPredictor, WorkflowEngine};

const PHONE: &str = "+15125550100";

fn build() -> (Orchestrator, Arc<InMemoryCrm>) {
    let settings = Settings::default();
    let events = EventBus::new(256);
    let sessions = Arc::new(SessionStore::new(&settings.session, events.clone()));
    let gate = Arc::new(ComplianceGate::new(
        settings.compliance.clone(),
        Arc::new(InMemoryAuditLog::new()),
    ));
    let crm = Arc::new(InMemoryCrm::new());
    let cma = Arc::new(StaticCmaGenerator::default());

    let decoder = IntentDecoder::new(DecoderConfig {
        weights: settings.scoring.frs_weights,
        hot_threshold: settings.scoring.hot_threshold,
        warm_threshold: settings.scoring.warm_threshold,
        lukewarm_threshold: settings.scoring.lukewarm_threshold,
    });
    let engine = WorkflowEngine::new(
        decoder.clone(),
        Arc::new(TemplateDrafter),
        cma.clone(),
        Arc::new(TrendJourneyPredictor),
        events.clone(),
        settings.handoff.clone(),
    );
    let realtime = RealtimeIntentUpdater::new(decoder);

    let orchestrator = Orchestrator::new(
        settings,
        sessions,
        gate,
        engine,
        realtime,
        crm.clone(),
        cma,
        events,
    );
    (orchestrator, crm)
}

fn sms(lead_id: &str, content: &str) -> InboundMessage {
    InboundMessage::new(lead_id, Channel::Sms, content).with_phone(PHONE)
}

fn seller_sms(lead_id: &str, content: &str) -> InboundMessage {
    sms(lead_id, content).with_hint(LeadKind::Seller)
}

#[tokio::test]
async fn test_malformed_input_rejected_without_session() {
    let (orchestrator, _) = build();

    let result = orchestrator
        .handle_inbound(InboundMessage::new("  ", Channel::Chat, "hello"))
        .await;
    assert!(matches!(result, Err(OrchestratorError::MalformedInput(_))));
    assert!(orchestrator.sessions().is_empty());
}

#[tokio::test]
async fn test_hot_seller_qualifies_in_four_turns() {
    let (orchestrator, _) = build();
    let turns = [
        "I need to sell my house fast, going through a divorce.",
        "We need to close in 60 days or less",
        "Yes I'm the sole decision maker",
        "The house is move-in ready",
    ];

    let mut last = None;
    for turn in turns {
        last = Some(
            orchestrator
                .handle_inbound(seller_sms("seller-1", turn))
                .await
                .unwrap(),
        );
    }
    let outcome = last.unwrap();
    let snapshot = outcome.snapshot.unwrap();

    let profile = snapshot.last_profile.as_ref().unwrap();
    assert!(profile.frs.total >= 75.0, "frs {}", profile.frs.total);
    assert_eq!(profile.classification, Classification::Hot);

    // Handoff happened: bot switched, fresh buyer state
    assert_eq!(snapshot.current_bot, WorkflowKind::BuyerQualify);
    assert!(matches!(
        snapshot.workflow_state,
        WorkflowState::BuyerQualify(_)
    ));
    assert!(outcome
        .events
        .iter()
        .any(|e| e.kind == EventKind::HandoffTriggered));
}

#[tokio::test]
async fn test_stall_breaker_then_polite_disengage() {
    let (orchestrator, _) = build();
    orchestrator
        .handle_inbound(seller_sms("seller-2", "I'm thinking of selling my house"))
        .await
        .unwrap();

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-2", "I need to think about it"))
        .await
        .unwrap();
    assert_eq!(outcome.plan.tone, Tone::Confrontational);
    assert!(outcome
        .events
        .iter()
        .any(|e| e.kind == EventKind::StallDetected));
    assert_eq!(outcome.snapshot.as_ref().unwrap().stall_count, 1);

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-2", "still thinking"))
        .await
        .unwrap();
    match &outcome.snapshot.unwrap().workflow_state {
        WorkflowState::SellerQualify(state) => {
            assert_eq!(state.terminal, Some(SellerOutcome::Disengaged));
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn test_stop_short_circuits_before_workflow() {
    let (orchestrator, crm) = build();
    orchestrator
        .handle_inbound(seller_sms("seller-3", "thinking of selling"))
        .await
        .unwrap();
    let turns_before = orchestrator
        .sessions()
        .snapshot("seller-3")
        .await
        .unwrap()
        .history
        .len();

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-3", "STOP"))
        .await
        .unwrap();

    // No outbound of any kind, opt-out event emitted
    assert!(outcome.plan.reply_text.is_empty());
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::SmsOptOut));
    assert!(!outcome
        .events
        .iter()
        .any(|e| e.kind == EventKind::OutboundSent));

    // The workflow never saw the message: only the STOP turn was appended
    let snapshot = outcome.snapshot.unwrap();
    assert!(snapshot.sms_opted_out);
    assert_eq!(snapshot.history.len(), turns_before + 1);

    // Gate state reflects the opt-out
    let status = orchestrator.compliance_status(PHONE).await.unwrap();
    assert!(status.opted_out);

    // Next reply toward that phone is blocked
    let before_sends = crm.sends().len();
    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-3", "wait, tell me more"))
        .await
        .unwrap();
    let blocked = outcome
        .plan
        .actions
        .iter()
        .any(|a| matches!(&a.status, ActionStatus::Blocked { reason } if reason == "opted-out"));
    assert!(blocked, "reply SMS must be blocked after opt-out");
    assert_eq!(crm.sends().len(), before_sends);
}

#[tokio::test]
async fn test_repeated_stop_is_idempotent() {
    let (orchestrator, _) = build();
    orchestrator
        .handle_inbound(sms("lead-4", "STOP"))
        .await
        .unwrap();
    let first = orchestrator.compliance_status(PHONE).await.unwrap();

    orchestrator
        .handle_inbound(sms("lead-4", "STOP"))
        .await
        .unwrap();
    let second = orchestrator.compliance_status(PHONE).await.unwrap();

    assert_eq!(first.opted_out_at, second.opted_out_at);
    assert_eq!(first.opt_out_reason, second.opt_out_reason);
}

#[tokio::test]
async fn test_daily_frequency_cap_blocks_fourth_reply() {
    let (orchestrator, crm) = build();

    for i in 0..3 {
        let outcome = orchestrator
            .handle_inbound(seller_sms("seller-5", &format!("message number {i}")))
            .await
            .unwrap();
        assert!(
            outcome
                .plan
                .actions
                .iter()
                .any(|a| a.status == ActionStatus::Dispatched),
            "reply {i} should dispatch"
        );
    }
    assert_eq!(crm.sends().len(), 3);

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-5", "one more question"))
        .await
        .unwrap();
    let blocked = outcome
        .plan
        .actions
        .iter()
        .any(|a| matches!(&a.status, ActionStatus::Blocked { reason } if reason == "daily-limit"));
    assert!(blocked);
    assert_eq!(crm.sends().len(), 3, "no over-send past the cap");
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::SmsBlocked));
}

#[tokio::test]
async fn test_cold_browser_routes_to_nurture() {
    let (orchestrator, _) = build();

    let outcome = orchestrator
        .handle_inbound(InboundMessage::new(
            "lead-6",
            Channel::Chat,
            "Just browsing, not really looking.",
        ))
        .await
        .unwrap();

    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.current_bot, WorkflowKind::NurtureSequence);

    let profile = snapshot.last_profile.as_ref().unwrap();
    assert!(profile.frs.motivation <= 20.0);
    assert_eq!(profile.classification, Classification::Cold);
    assert_eq!(profile.next_best_action, RecommendedAction::SoftFollowup);
    assert!(outcome.plan.handoff().is_none());
}

#[tokio::test]
async fn test_empty_content_is_workflow_noop() {
    let (orchestrator, _) = build();
    orchestrator
        .handle_inbound(seller_sms("seller-7", "thinking about selling my place"))
        .await
        .unwrap();
    let before = orchestrator
        .sessions()
        .snapshot("seller-7")
        .await
        .unwrap();

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-7", "   "))
        .await
        .unwrap();

    assert!(outcome.plan.reply_text.is_empty());
    assert!(outcome.plan.actions.is_empty());
    let after = outcome.snapshot.unwrap();
    assert_eq!(
        serde_json::to_value(&before.workflow_state).unwrap(),
        serde_json::to_value(&after.workflow_state).unwrap(),
        "workflow position unchanged"
    );
    assert_eq!(after.history.len(), before.history.len());
}

#[tokio::test]
async fn test_events_for_one_lead_are_ordered() {
    let (orchestrator, _) = build();
    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-8", "I want to sell my house"))
        .await
        .unwrap();

    let kinds: Vec<EventKind> = outcome.events.iter().map(|e| e.kind).collect();
    let inbound_pos = kinds
        .iter()
        .position(|k| *k == EventKind::InboundReceived)
        .expect("inbound-received present");
    let score_pos = kinds
        .iter()
        .position(|k| *k == EventKind::ScoreUpdated)
        .expect("score-updated present");
    let outbound_pos = kinds
        .iter()
        .position(|k| *k == EventKind::OutboundSent)
        .expect("outbound-sent present");
    assert!(inbound_pos < score_pos);
    assert!(score_pos < outbound_pos);
}

#[tokio::test]
async fn test_concurrent_leads_do_not_interfere() {
    let (orchestrator, _) = build();
    let orchestrator = Arc::new(orchestrator);

    let mut handles = Vec::new();
    for i in 0..8 {
        let orch = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let lead = format!("concurrent-{i}");
            orch.handle_inbound(InboundMessage::new(
                lead.clone(),
                Channel::Chat,
                "looking to sell sometime soon",
            ))
            .await
            .unwrap();
            lead
        }));
    }

    for handle in handles {
        let lead = handle.await.unwrap();
        assert!(orchestrator.sessions().contains(&lead));
    }
    assert_eq!(orchestrator.sessions().len(), 8);
}

#[tokio::test]
async fn test_degraded_crm_still_produces_plan() {
    let (orchestrator, crm) = build();
    crm.fail_sends("provider-down");

    let outcome = orchestrator
        .handle_inbound(seller_sms("seller-9", "I want to sell"))
        .await
        .unwrap();

    // The plan exists, the SMS action failed visibly
    assert!(!outcome.plan.reply_text.is_empty());
    assert!(outcome
        .plan
        .actions
        .iter()
        .any(|a| matches!(a.status, ActionStatus::Failed { .. })));
}
