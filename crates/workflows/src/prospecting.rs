//! Outbound prospecting workflow
//!
//! Sources candidate leads from the CRM (stale pipeline contacts, contacts
//! gone quiet), enrols them into the nurture cadence, and runs the
//! qualification gate on every inbound reply to decide between human
//! escalation, bot handoff, and continued nurturing.

use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashSet;

use leadflow_config::HandoffConfig;
use leadflow_core::events::EventKind;
use leadflow_core::lead::Tone;
use leadflow_core::plan::OutboundAction;
use leadflow_core::scoring::IntentProfile;
use leadflow_core::traits::{CollaboratorError, Contact, CrmClient};
use leadflow_core::workflow::{ProspectingState, WorkflowState};
use leadflow_session::LeadSession;

use crate::engine::NodeOutcome;
use crate::gate::{evaluate_gate, HandoffTarget};
use crate::templates;

/// Where a prospect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProspectSource {
    StalePipeline,
    InactiveContact,
}

#[derive(Debug, Clone)]
pub struct SourcedProspect {
    pub contact: Contact,
    pub source: ProspectSource,
}

/// Pulls prospecting candidates from the CRM
pub struct ProspectSourcer {
    stale_stage_id: String,
    inactive_days: i64,
    limit: usize,
}

impl ProspectSourcer {
    pub fn new(stale_stage_id: impl Into<String>, inactive_days: i64, limit: usize) -> Self {
        Self {
            stale_stage_id: stale_stage_id.into(),
            inactive_days,
            limit,
        }
    }

    /// Pull both candidate pools, dedupe by contact ID, cap at the limit.
    pub async fn source(
        &self,
        crm: &dyn CrmClient,
        location_id: &str,
    ) -> Result<Vec<SourcedProspect>, CollaboratorError> {
        let stale = crm
            .contacts_by_pipeline_stage(location_id, &self.stale_stage_id, self.limit)
            .await?;
        let since = Utc::now() - Duration::days(self.inactive_days);
        let inactive = crm
            .contacts_inactive_since(location_id, since, self.limit)
            .await?;

        let mut seen = HashSet::new();
        let mut prospects = Vec::new();

        for (pool, source) in [
            (stale, ProspectSource::StalePipeline),
            (inactive, ProspectSource::InactiveContact),
        ] {
            for contact in pool {
                if prospects.len() >= self.limit {
                    break;
                }
                if seen.insert(contact.contact_id.clone()) {
                    prospects.push(SourcedProspect { contact, source });
                }
            }
        }

        tracing::info!(
            count = prospects.len(),
            limit = self.limit,
            "prospects sourced"
        );
        Ok(prospects)
    }
}

/// Handle an inbound reply from an enrolled prospect.
pub fn route(
    session: &mut LeadSession,
    profile: &IntentProfile,
    handoff: &HandoffConfig,
) -> NodeOutcome {
    let mut state = match &session.workflow_state {
        WorkflowState::OutboundProspecting(s) => s.clone(),
        _ => ProspectingState::default(),
    };

    state.enrolled = true;
    state.replies_seen += 1;

    let decision = evaluate_gate(profile, handoff);
    state.gate_passed = Some(decision.passed);

    let outcome = if decision.passed {
        let action = match decision.target {
            HandoffTarget::LeadBot => OutboundAction::EscalateHuman {
                reason: "qualification gate passed with ambiguous intent".to_string(),
            },
            target => OutboundAction::TriggerHandoff {
                to: target.workflow(),
                reason: "qualification-gate-passed".to_string(),
            },
        };

        NodeOutcome {
            tone: Tone::Warm,
            guidance: "The prospect qualified. Confirm interest and set the next step."
                .to_string(),
            fallback_text: templates::generic_fallback(Tone::Warm).to_string(),
            actions: vec![action],
            events: vec![(
                EventKind::QualificationProgress,
                json!({
                    "workflow": "outbound-prospecting",
                    "gate": "passed",
                    "frs": decision.frs,
                    "confidence": decision.confidence,
                }),
            )],
            ..NodeOutcome::default()
        }
    } else {
        NodeOutcome {
            tone: Tone::Warm,
            guidance: "The prospect replied but has not qualified yet. Keep the conversation \
                       light and learn what changed."
                .to_string(),
            fallback_text: templates::prospecting_continue(session.lead_name.as_deref()),
            events: vec![(
                EventKind::QualificationProgress,
                json!({
                    "workflow": "outbound-prospecting",
                    "gate": "failed",
                    "reason": decision.disqualify_reason,
                }),
            )],
            ..NodeOutcome::default()
        }
    };

    session.workflow_state = WorkflowState::OutboundProspecting(state);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadflow_core::lead::Channel;
    use leadflow_core::scoring::FinancialReadiness;
    use leadflow_core::traits::SendOutcome;
    use leadflow_core::workflow::WorkflowKind;
    use leadflow_session::SessionSeed;

    struct StubCrm {
        stale: Vec<Contact>,
        inactive: Vec<Contact>,
    }

    fn contact(id: &str) -> Contact {
        Contact {
            contact_id: id.to_string(),
            name: None,
            phone: None,
            email: None,
            pipeline_stage: None,
            last_activity: None,
        }
    }

    #[async_trait]
    impl CrmClient for StubCrm {
        async fn send_message(
            &self,
            _destination: &str,
            _content: &str,
            _channel: Channel,
        ) -> Result<SendOutcome, CollaboratorError> {
            Ok(SendOutcome::delivered("m"))
        }

        async fn add_tags(
            &self,
            _contact_id: &str,
            _tags: &[String],
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }

        async fn contacts_by_pipeline_stage(
            &self,
            _location_id: &str,
            _stage_id: &str,
            _limit: usize,
        ) -> Result<Vec<Contact>, CollaboratorError> {
            Ok(self.stale.clone())
        }

        async fn contacts_inactive_since(
            &self,
            _location_id: &str,
            _since: chrono::DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<Contact>, CollaboratorError> {
            Ok(self.inactive.clone())
        }

        async fn update_contact(
            &self,
            _contact_id: &str,
            _fields: &serde_json::Value,
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    fn prospect_session() -> LeadSession {
        LeadSession::new(
            "prospect-1",
            SessionSeed {
                initial_bot: Some(WorkflowKind::OutboundProspecting),
                ..SessionSeed::default()
            },
        )
    }

    fn profile(frs: f64, seller_confidence: f64) -> IntentProfile {
        IntentProfile {
            lead_id: "prospect-1".into(),
            frs: FinancialReadiness {
                total: frs,
                ..FinancialReadiness::default()
            },
            seller_confidence,
            ..IntentProfile::default()
        }
    }

    #[tokio::test]
    async fn test_sourcing_dedupes_and_caps() {
        let crm = StubCrm {
            stale: vec![contact("a"), contact("b")],
            inactive: vec![contact("b"), contact("c"), contact("d")],
        };
        let sourcer = ProspectSourcer::new("stale-stage", 90, 3);

        let prospects = sourcer.source(&crm, "loc-1").await.unwrap();
        assert_eq!(prospects.len(), 3);
        let ids: Vec<&str> = prospects
            .iter()
            .map(|p| p.contact.contact_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"], "deduped in order, capped at 3");
    }

    #[test]
    fn test_gate_pass_hands_off() {
        let mut session = prospect_session();
        let outcome = route(
            &mut session,
            &profile(65.0, 0.8),
            &HandoffConfig::default(),
        );

        assert!(outcome.actions.iter().any(|a| matches!(
            a,
            OutboundAction::TriggerHandoff {
                to: WorkflowKind::SellerQualify,
                ..
            }
        )));
        match &session.workflow_state {
            WorkflowState::OutboundProspecting(s) => {
                assert_eq!(s.gate_passed, Some(true));
                assert_eq!(s.replies_seen, 1);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_gate_fail_continues() {
        let mut session = prospect_session();
        let outcome = route(
            &mut session,
            &profile(40.0, 0.2),
            &HandoffConfig::default(),
        );

        assert!(outcome.actions.is_empty());
        match &session.workflow_state {
            WorkflowState::OutboundProspecting(s) => {
                assert_eq!(s.gate_passed, Some(false));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_gate_boundary_inclusive() {
        let mut session = prospect_session();
        route(
            &mut session,
            &profile(60.0, 0.70),
            &HandoffConfig::default(),
        );
        match &session.workflow_state {
            WorkflowState::OutboundProspecting(s) => assert_eq!(s.gate_passed, Some(true)),
            other => panic!("unexpected state {other:?}"),
        }
    }
}
