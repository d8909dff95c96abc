//! Inbound handling

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

use leadflow_compliance::{ComplianceError, ComplianceGate, ComplianceStatus};
use leadflow_config::Settings;
use leadflow_core::conversation::{InboundMessage, Turn};
use leadflow_core::events::{EventBus, EventKind, OrchestrationEvent};
use leadflow_core::lead::{Channel, Classification, LeadKind};
use leadflow_core::plan::{ActionStatus, OutboundAction, OutboundPlan, PlannedAction};
use leadflow_core::scoring::ScoreSnapshot;
use leadflow_core::traits::{CmaGenerator, CrmClient};
use leadflow_core::workflow::WorkflowKind;
use leadflow_intent::{detect_emotion, RealtimeIntentUpdater};
use leadflow_session::{LeadSession, SessionSeed, SessionSnapshot, SessionStore};
use leadflow_workflows::{ProspectSourcer, WorkflowEngine};

use crate::metrics;
use crate::OrchestratorError;

/// Realtime updates above this confidence count as interventions
const INTERVENTION_CONFIDENCE: f64 = 0.8;

/// Everything a caller gets back for one inbound
#[derive(Debug, Clone)]
pub struct InboundOutcome {
    pub plan: OutboundPlan,
    pub snapshot: Option<SessionSnapshot>,
    /// Events emitted while handling this inbound, in emission order
    pub events: Vec<OrchestrationEvent>,
}

/// The single inbound entry point
pub struct Orchestrator {
    settings: Settings,
    sessions: Arc<SessionStore>,
    gate: Arc<ComplianceGate>,
    engine: WorkflowEngine,
    realtime: RealtimeIntentUpdater,
    crm: Arc<dyn CrmClient>,
    cma: Arc<dyn CmaGenerator>,
    events: EventBus,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        sessions: Arc<SessionStore>,
        gate: Arc<ComplianceGate>,
        engine: WorkflowEngine,
        realtime: RealtimeIntentUpdater,
        crm: Arc<dyn CrmClient>,
        cma: Arc<dyn CmaGenerator>,
        events: EventBus,
    ) -> Self {
        Self {
            settings,
            sessions,
            gate,
            engine,
            realtime,
            crm,
            cma,
            events,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn gate(&self) -> &Arc<ComplianceGate> {
        &self.gate
    }

    /// Handle one inbound message end to end. Always returns a complete
    /// plan; only malformed input is an error to the caller.
    pub async fn handle_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<InboundOutcome, OrchestratorError> {
        let started = std::time::Instant::now();
        if msg.lead_id.trim().is_empty() {
            return Err(OrchestratorError::MalformedInput("leadID"));
        }

        let rx = self.events.subscribe();
        metrics::record_inbound(msg.channel.as_str());

        // STOP keywords short-circuit before any workflow sees the message
        if msg.channel == Channel::Sms {
            if let Some(phone) = msg.phone.clone() {
                let inbound = self.gate.process_inbound(&phone, &msg.content).await?;
                if inbound.opted_out() {
                    return self.finish_opt_out(&msg, inbound.phone, rx).await;
                }
                if !inbound.content_flags.is_empty() {
                    tracing::info!(
                        lead_id = %msg.lead_id,
                        flags = ?inbound.content_flags,
                        "inbound content flags"
                    );
                }
            } else {
                tracing::warn!(lead_id = %msg.lead_id, "SMS inbound without phone; compliance checks skipped");
            }
        }

        let seed = SessionSeed {
            lead_name: msg.lead_name.clone(),
            lead_kind: msg.lead_kind_hint.unwrap_or_default(),
            initial_history: msg.seed_history.clone(),
            initial_bot: None,
        };
        let session_arc = self.sessions.get_or_create(&msg.lead_id, seed);
        let mut guard = session_arc.lock().await;
        let session = &mut *guard;

        self.events.emit(
            EventKind::InboundReceived,
            &msg.lead_id,
            json!({"channel": msg.channel.as_str(), "chars": msg.content.chars().count()}),
        );

        // An empty inbound is a no-op on the workflow position
        if msg.content.trim().is_empty() {
            session.touch();
            let snapshot = session.snapshot();
            return Ok(InboundOutcome {
                plan: OutboundPlan::silent(),
                snapshot: Some(snapshot),
                events: drain_events(rx, &msg.lead_id),
            });
        }

        session.note_channel(msg.channel);
        if let Some(phone) = &msg.phone {
            session.phone = Some(phone.clone());
        }
        if session.lead_name.is_none() {
            session.lead_name = msg.lead_name.clone();
        }
        if let Some(hint) = msg.lead_kind_hint {
            session.lead_kind = hint;
        }
        session.append_turn(Turn::user(&msg.content));
        session.transition_emotion(detect_emotion(&msg.content));

        let update = self.apply_realtime_update(session, &msg);

        let selected = self.select_workflow(session, msg.lead_kind_hint);
        if selected != session.current_bot {
            let from = session.current_bot;
            session.switch_bot(selected);
            self.events.emit(
                EventKind::BotSwitched,
                &msg.lead_id,
                json!({"from": from.as_str(), "to": selected.as_str()}),
            );
        }

        let mut plan = self.engine.run(session, &update).await;

        self.add_reply_action(&mut plan, &msg, session);
        self.execute_actions(&mut plan, session, &msg).await;

        if !plan.reply_text.is_empty() {
            session.append_turn(Turn::assistant(plan.reply_text.clone()));
        }
        self.mirror_session(session).await;

        let snapshot = session.snapshot();
        drop(guard);

        metrics::record_handle_latency(started.elapsed().as_secs_f64());
        Ok(InboundOutcome {
            plan,
            snapshot: Some(snapshot),
            events: drain_events(rx, &msg.lead_id),
        })
    }

    /// Explicit opt-out request (admin or user-initiated, not STOP-driven)
    pub async fn process_opt_out(
        &self,
        phone: &str,
        reason: leadflow_compliance::OptOutReason,
    ) -> Result<(), OrchestratorError> {
        self.gate.process_opt_out(phone, reason).await?;
        metrics::record_opt_out();
        Ok(())
    }

    pub async fn compliance_status(
        &self,
        phone: &str,
    ) -> Result<ComplianceStatus, OrchestratorError> {
        Ok(self.gate.status(phone).await?)
    }

    /// Pull prospecting candidates and enrol each into the nurture cadence.
    pub async fn run_prospecting_pull(
        &self,
        sourcer: &ProspectSourcer,
    ) -> Result<usize, OrchestratorError> {
        let prospects = match sourcer
            .source(self.crm.as_ref(), &self.settings.crm.location_id)
            .await
        {
            Ok(prospects) => prospects,
            Err(e) => {
                tracing::warn!(error = %e, "prospect sourcing failed");
                metrics::record_degraded("crm");
                return Ok(0);
            }
        };

        let count = prospects.len();
        for prospect in prospects {
            let contact = prospect.contact;
            let seed = SessionSeed {
                lead_name: contact.name.clone(),
                lead_kind: LeadKind::Unknown,
                initial_history: Vec::new(),
                initial_bot: Some(WorkflowKind::OutboundProspecting),
            };
            let session = self.sessions.get_or_create(&contact.contact_id, seed);
            {
                let mut guard = session.lock().await;
                if guard.phone.is_none() {
                    guard.phone = contact.phone.clone();
                }
            }

            self.events.emit(
                EventKind::QualificationProgress,
                &contact.contact_id,
                json!({"workflow": "outbound-prospecting", "step": "enrolled"}),
            );

            // First nurture touch lands on the day-3 slot
            if let Err(e) = self
                .crm
                .update_contact(
                    &contact.contact_id,
                    &json!({"next_follow_up_days": 3, "enrolled_by": "outbound-prospecting"}),
                )
                .await
            {
                tracing::warn!(contact_id = %contact.contact_id, error = %e, "enrolment write failed");
            }
        }
        Ok(count)
    }

    async fn finish_opt_out(
        &self,
        msg: &InboundMessage,
        normalized_phone: String,
        rx: broadcast::Receiver<OrchestrationEvent>,
    ) -> Result<InboundOutcome, OrchestratorError> {
        metrics::record_opt_out();
        self.events.emit(
            EventKind::SmsOptOut,
            &msg.lead_id,
            json!({"phone": normalized_phone}),
        );

        // Record on the session when one exists; a bare STOP from an unknown
        // number does not create one.
        let snapshot = if self.sessions.contains(&msg.lead_id) {
            self.sessions
                .update(&msg.lead_id, |session| {
                    session.sms_opted_out = true;
                    session.append_turn(Turn::user(&msg.content));
                    session.snapshot()
                })
                .await
                .ok()
        } else {
            None
        };

        Ok(InboundOutcome {
            plan: OutboundPlan::silent(),
            snapshot,
            events: drain_events(rx, &msg.lead_id),
        })
    }

    fn apply_realtime_update(
        &self,
        session: &mut LeadSession,
        msg: &InboundMessage,
    ) -> leadflow_core::scoring::IncrementalUpdate {
        let current = if session.score_history.is_empty() && session.last_profile.is_none() {
            None
        } else {
            Some((session.frs_total, session.pcs_total))
        };

        let outcome = self
            .realtime
            .update(&msg.lead_id, &session.history, current, &msg.content);

        session.frs_total = outcome.frs_total;
        session.pcs_total = outcome.pcs_total;
        if let Some(profile) = &outcome.profile {
            session.last_profile = Some(profile.clone());
        }

        let scoring = &self.settings.scoring;
        let classification = Classification::from_score(
            outcome.frs_total,
            scoring.hot_threshold,
            scoring.warm_threshold,
            scoring.lukewarm_threshold,
        );
        session.push_snapshot(
            ScoreSnapshot {
                frs_total: outcome.frs_total,
                pcs_total: outcome.pcs_total,
                classification,
                at: Utc::now(),
            },
            self.sessions.score_history_cap(),
        );

        if outcome.update.confidence > INTERVENTION_CONFIDENCE {
            metrics::record_realtime_intervention();
        }

        self.events.emit(
            EventKind::ScoreUpdated,
            &msg.lead_id,
            json!({
                "frs_delta": outcome.update.frs_delta,
                "pcs_delta": outcome.update.pcs_delta,
                "frs_total": outcome.frs_total,
                "pcs_total": outcome.pcs_total,
                "confidence": outcome.update.confidence,
                "recommended_action": outcome.update.recommended_action.as_str(),
            }),
        );

        outcome.update
    }

    /// Workflow selection: explicit hint, then the session's current bot,
    /// then intent-confidence routing with a nurture fallback.
    fn select_workflow(&self, session: &LeadSession, hint: Option<LeadKind>) -> WorkflowKind {
        match hint {
            Some(LeadKind::Buyer) => return WorkflowKind::BuyerQualify,
            Some(LeadKind::Seller) => return WorkflowKind::SellerQualify,
            _ => {}
        }

        // Prospecting sessions run their own gate before any rerouting
        if session.current_bot == WorkflowKind::OutboundProspecting {
            return WorkflowKind::OutboundProspecting;
        }

        // An established conversation stays with its bot. The first scored
        // inbound has exactly one snapshot, even when the session was seeded
        // with prior context.
        if session.score_history.len() > 1 {
            return session.current_bot;
        }

        let confidence_min = self.settings.handoff.confidence_min;
        match &session.last_profile {
            Some(p) if p.buyer_confidence >= confidence_min
                && p.buyer_confidence > p.seller_confidence =>
            {
                WorkflowKind::BuyerQualify
            }
            Some(p) if p.seller_confidence >= confidence_min
                && p.seller_confidence > p.buyer_confidence =>
            {
                WorkflowKind::SellerQualify
            }
            _ => WorkflowKind::NurtureSequence,
        }
    }

    /// The reply text ships on the channel the inbound arrived on. SMS and
    /// email become explicit delivery actions (SMS goes through the gate);
    /// chat replies ride back in the HTTP response.
    fn add_reply_action(
        &self,
        plan: &mut OutboundPlan,
        msg: &InboundMessage,
        session: &LeadSession,
    ) {
        if plan.reply_text.is_empty() {
            return;
        }
        let action = match msg.channel {
            Channel::Sms => session.phone.as_ref().map(|phone| OutboundAction::SendSms {
                phone: phone.clone(),
                body: plan.reply_text.clone(),
            }),
            Channel::Email => Some(OutboundAction::SendEmail {
                to: msg.lead_id.clone(),
                subject: "Following up on your home search".to_string(),
                body: plan.reply_text.clone(),
            }),
            Channel::Chat | Channel::Voice => None,
        };
        if let Some(action) = action {
            plan.actions.insert(0, PlannedAction::planned(action));
        }
    }

    async fn execute_actions(
        &self,
        plan: &mut OutboundPlan,
        session: &mut LeadSession,
        msg: &InboundMessage,
    ) {
        for planned in plan.actions.iter_mut() {
            let status = match planned.action.clone() {
                OutboundAction::SendSms { phone, body } => {
                    self.dispatch_sms(&msg.lead_id, &phone, &body).await
                }
                OutboundAction::SendEmail { to, body, .. } => {
                    self.dispatch_plain(&msg.lead_id, &to, &body, Channel::Email).await
                }
                OutboundAction::ScheduleFollowUp {
                    after_days,
                    channel,
                } => {
                    let fields =
                        json!({"next_follow_up_days": after_days, "channel": channel.as_str()});
                    match self.crm.update_contact(&msg.lead_id, &fields).await {
                        Ok(()) => ActionStatus::Dispatched,
                        Err(e) => self.degraded(&msg.lead_id, "crm", e),
                    }
                }
                OutboundAction::TriggerHandoff { to, reason } => {
                    let from = session.current_bot;
                    session.switch_bot(to);
                    metrics::record_handoff(to.as_str());
                    self.events.emit(
                        EventKind::HandoffTriggered,
                        &msg.lead_id,
                        json!({"from": from.as_str(), "to": to.as_str(), "reason": reason}),
                    );
                    let tag = format!("bot:{to}");
                    if let Err(e) = self.crm.add_tags(&msg.lead_id, &[tag]).await {
                        tracing::warn!(lead_id = %msg.lead_id, error = %e, "handoff tag failed");
                    }
                    ActionStatus::Dispatched
                }
                OutboundAction::EscalateHuman { reason } => {
                    self.events.emit(
                        EventKind::HandoffTriggered,
                        &msg.lead_id,
                        json!({
                            "from": session.current_bot.as_str(),
                            "to": "human",
                            "reason": reason,
                        }),
                    );
                    metrics::record_handoff("human");
                    match self
                        .crm
                        .add_tags(&msg.lead_id, &["needs-human".to_string()])
                        .await
                    {
                        Ok(()) => ActionStatus::Dispatched,
                        Err(e) => self.degraded(&msg.lead_id, "crm", e),
                    }
                }
                OutboundAction::TagContact { tags } => {
                    match self.crm.add_tags(&msg.lead_id, &tags).await {
                        Ok(()) => ActionStatus::Dispatched,
                        Err(e) => self.degraded(&msg.lead_id, "crm", e),
                    }
                }
                OutboundAction::GenerateCma { address } => {
                    match self.cma.generate(&address).await {
                        Ok(report) => {
                            let fields = json!({
                                "cma_value": report.estimated_value,
                                "cma_comparables": report.comparable_count,
                            });
                            if let Err(e) = self.crm.update_contact(&msg.lead_id, &fields).await {
                                tracing::warn!(lead_id = %msg.lead_id, error = %e, "CMA write-back failed");
                            }
                            ActionStatus::Dispatched
                        }
                        Err(e) => self.degraded(&msg.lead_id, "cma", e),
                    }
                }
            };
            planned.status = status;
        }
    }

    async fn dispatch_sms(&self, lead_id: &str, phone: &str, body: &str) -> ActionStatus {
        let validation = match self.gate.validate_send(phone, body).await {
            Ok(validation) => validation,
            Err(ComplianceError::InvalidPhone(p)) => {
                tracing::warn!(lead_id = %lead_id, phone = %p, "unroutable phone number");
                return ActionStatus::Blocked {
                    reason: "invalid-phone".to_string(),
                };
            }
            Err(e) => {
                tracing::error!(lead_id = %lead_id, error = %e, "compliance validation failed");
                return ActionStatus::Blocked {
                    reason: "compliance-unavailable".to_string(),
                };
            }
        };

        if !validation.allowed {
            let reason = validation
                .reason
                .map(|r| r.as_str())
                .unwrap_or("denied");
            metrics::record_sms_blocked(reason);
            self.events.emit(
                EventKind::SmsBlocked,
                lead_id,
                json!({
                    "phone": phone,
                    "reason": reason,
                    "daily_count": validation.daily_count,
                    "monthly_count": validation.monthly_count,
                }),
            );
            return ActionStatus::Blocked {
                reason: reason.to_string(),
            };
        }

        match self.crm.send_message(phone, body, Channel::Sms).await {
            Ok(outcome) => {
                if let Err(e) = self.gate.record_send(phone, body, outcome.success).await {
                    tracing::error!(lead_id = %lead_id, error = %e, "failed to record send");
                }
                metrics::record_outbound("sms", outcome.success);
                self.events.emit(
                    EventKind::OutboundSent,
                    lead_id,
                    json!({
                        "channel": "sms",
                        "success": outcome.success,
                        "provider_message_id": outcome.provider_message_id,
                    }),
                );
                if outcome.success {
                    ActionStatus::Dispatched
                } else {
                    ActionStatus::Failed {
                        error: outcome.error_kind.unwrap_or_else(|| "send-failed".into()),
                    }
                }
            }
            Err(e) => {
                if let Err(record_err) = self.gate.record_send(phone, body, false).await {
                    tracing::error!(lead_id = %lead_id, error = %record_err, "failed to record send");
                }
                self.degraded(lead_id, "crm", e)
            }
        }
    }

    async fn dispatch_plain(
        &self,
        lead_id: &str,
        destination: &str,
        body: &str,
        channel: Channel,
    ) -> ActionStatus {
        match self.crm.send_message(destination, body, channel).await {
            Ok(outcome) => {
                metrics::record_outbound(channel.as_str(), outcome.success);
                self.events.emit(
                    EventKind::OutboundSent,
                    lead_id,
                    json!({"channel": channel.as_str(), "success": outcome.success}),
                );
                if outcome.success {
                    ActionStatus::Dispatched
                } else {
                    ActionStatus::Failed {
                        error: outcome.error_kind.unwrap_or_else(|| "send-failed".into()),
                    }
                }
            }
            Err(e) => self.degraded(lead_id, "crm", e),
        }
    }

    fn degraded(
        &self,
        lead_id: &str,
        collaborator: &'static str,
        error: leadflow_core::traits::CollaboratorError,
    ) -> ActionStatus {
        metrics::record_degraded(collaborator);
        self.events.emit(
            EventKind::ExternalDegraded,
            lead_id,
            json!({"collaborator": collaborator, "error": error.to_string()}),
        );
        ActionStatus::Failed {
            error: error.to_string(),
        }
    }

    /// Mirror durable session fields into the CRM's custom fields so a
    /// restart can rebuild context. Best effort.
    async fn mirror_session(&self, session: &LeadSession) {
        let fields = json!({
            "current_bot": session.current_bot.as_str(),
            "frs_total": session.frs_total,
            "pcs_total": session.pcs_total,
            "workflow_state": serde_json::to_value(&session.workflow_state).unwrap_or_default(),
        });
        if let Err(e) = self.crm.update_contact(&session.lead_id, &fields).await {
            tracing::debug!(lead_id = %session.lead_id, error = %e, "session mirror skipped");
        }
    }
}

fn drain_events(
    mut rx: broadcast::Receiver<OrchestrationEvent>,
    lead_id: &str,
) -> Vec<OrchestrationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.lead_id == lead_id {
            events.push(event);
        }
    }
    events
}
