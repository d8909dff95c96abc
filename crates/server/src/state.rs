//! Application state
//!
//! One instance of each component, constructed at startup and shared across
//! handlers. No global singletons: everything reaches its dependencies
//! through this struct.

use std::sync::Arc;

use leadflow_compliance::{AuditLog, ComplianceGate, InMemoryAuditLog, JsonlAuditLog};
use leadflow_config::Settings;
use leadflow_core::events::EventBus;
use leadflow_core::traits::{CmaGenerator, CrmClient, ResponseDrafter};
use leadflow_intent::{DecoderConfig, IntentDecoder, RealtimeIntentUpdater};
use leadflow_orchestrator::Orchestrator;
use leadflow_session::SessionStore;
use leadflow_workflows::{TrendJourneyPredictor, WorkflowEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
    pub events: EventBus,
}

impl AppState {
    /// Wire the full component graph from settings and collaborator
    /// implementations.
    pub async fn build(
        settings: Settings,
        crm: Arc<dyn CrmClient>,
        drafter: Arc<dyn ResponseDrafter>,
        cma: Arc<dyn CmaGenerator>,
    ) -> anyhow::Result<Self> {
        let events = EventBus::new(1024);
        let sessions = Arc::new(SessionStore::new(&settings.session, events.clone()));

        let audit: Arc<dyn AuditLog> = match &settings.compliance.journal_path {
            Some(path) => Arc::new(JsonlAuditLog::new(path)),
            None => Arc::new(InMemoryAuditLog::new()),
        };
        let gate = Arc::new(ComplianceGate::new(settings.compliance.clone(), audit));
        let restored = gate.restore_from_audit().await?;
        if restored > 0 {
            tracing::info!(restored, "opt-outs restored from journal");
        }

        let decoder = IntentDecoder::new(DecoderConfig {
            weights: settings.scoring.frs_weights,
            hot_threshold: settings.scoring.hot_threshold,
            warm_threshold: settings.scoring.warm_threshold,
            lukewarm_threshold: settings.scoring.lukewarm_threshold,
        });
        let engine = WorkflowEngine::new(
            decoder.clone(),
            drafter,
            cma.clone(),
            Arc::new(TrendJourneyPredictor),
            events.clone(),
            settings.handoff.clone(),
        );
        let realtime = RealtimeIntentUpdater::new(decoder);

        let orchestrator = Arc::new(Orchestrator::new(
            settings,
            sessions.clone(),
            gate,
            engine,
            realtime,
            crm,
            cma,
            events.clone(),
        ));

        Ok(Self {
            orchestrator,
            sessions,
            events,
        })
    }

    /// Start background work: the session sweeper plus a daily pass that
    /// evicts opt-outs past their retention floor (a much longer schedule
    /// than the lazy counter rollover).
    pub fn spawn_background_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let sweeper = self.sessions.spawn_sweeper();

        let gate = self.orchestrator.gate().clone();
        let purger = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let purged = gate.purge_expired_opt_outs(chrono::Utc::now());
                if purged > 0 {
                    tracing::info!(purged, "expired opt-outs evicted");
                }
            }
        });

        vec![sweeper, purger]
    }
}
