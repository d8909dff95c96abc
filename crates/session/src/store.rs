//! The session store
//!
//! DashMap of lead ID to a session behind a `tokio::sync::Mutex`. The store
//! hands out the lock; holding it for the whole inbound is what serialises
//! handlers per lead. Expiry is checked on every access and by the sweeper;
//! a session that cannot be try-locked is in use and by definition not idle.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use leadflow_config::SessionConfig;
use leadflow_core::events::{EventBus, EventKind};

use crate::session::{LeadSession, SessionSeed, SessionSnapshot};
use crate::SessionError;

pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<LeadSession>>>,
    ttl: chrono::Duration,
    sweep_interval: Duration,
    score_history_cap: usize,
    events: EventBus,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, events: EventBus) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::seconds(config.ttl_secs as i64),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            score_history_cap: config.score_history_cap,
            events,
        }
    }

    pub fn score_history_cap(&self) -> usize {
        self.score_history_cap
    }

    /// Get the session for a lead, creating it from the seed when absent.
    /// An expired session is evicted first, so the caller transparently gets
    /// a fresh one.
    pub fn get_or_create(&self, lead_id: &str, seed: SessionSeed) -> Arc<Mutex<LeadSession>> {
        self.evict_if_expired(lead_id);

        self.sessions
            .entry(lead_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(lead_id = %lead_id, "session created");
                Arc::new(Mutex::new(LeadSession::new(lead_id, seed)))
            })
            .clone()
    }

    /// Apply a mutator under the session lock.
    pub async fn update<F, R>(&self, lead_id: &str, mutate: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut LeadSession) -> R,
    {
        let session = self
            .sessions
            .get(lead_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| SessionError::NotFound(lead_id.to_string()))?;

        let mut guard = session.lock().await;
        Ok(mutate(&mut guard))
    }

    /// Immutable snapshot of a session, if present and not expired.
    pub async fn snapshot(&self, lead_id: &str) -> Option<SessionSnapshot> {
        self.evict_if_expired(lead_id);
        let session = self.sessions.get(lead_id).map(|entry| entry.clone())?;
        let guard = session.lock().await;
        Some(guard.snapshot())
    }

    pub fn contains(&self, lead_id: &str) -> bool {
        self.sessions.contains_key(lead_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove a session outright (no eviction event; administrative).
    pub fn remove(&self, lead_id: &str) -> bool {
        self.sessions.remove(lead_id).is_some()
    }

    fn evict_if_expired(&self, lead_id: &str) {
        let Some(entry) = self.sessions.get(lead_id) else {
            return;
        };
        let session = entry.clone();
        drop(entry);

        // A locked session is mid-handling, so it cannot be idle
        let expired = match session.try_lock() {
            Ok(guard) => guard.idle_for(Utc::now()) > self.ttl,
            Err(_) => false,
        };

        if expired {
            self.sessions.remove(lead_id);
            self.events.emit(
                EventKind::SessionEvicted,
                lead_id,
                json!({"reason": "ttl"}),
            );
            tracing::info!(lead_id = %lead_id, "session evicted (ttl)");
        }
    }

    /// Sweep all sessions, evicting the expired ones. Returns the count.
    pub fn evict_expired(&self) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let before = self.sessions.len();
        for id in ids {
            self.evict_if_expired(&id);
        }
        before - self.sessions.len()
    }

    /// Spawn the background sweeper on the configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let interval = store.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::info!(evicted, "session sweep complete");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::conversation::Turn;

    fn store_with_ttl(ttl_secs: u64) -> SessionStore {
        let config = SessionConfig {
            ttl_secs,
            sweep_interval_secs: 300,
            score_history_cap: 20,
        };
        SessionStore::new(&config, EventBus::new(16))
    }

    #[tokio::test]
    async fn test_get_or_create_idempotent() {
        let store = store_with_ttl(3600);
        let a = store.get_or_create("lead-1", SessionSeed::default());
        let b = store.get_or_create("lead-1", SessionSeed::default());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_mutates_under_lock() {
        let store = store_with_ttl(3600);
        store.get_or_create("lead-2", SessionSeed::default());

        let len = store
            .update("lead-2", |session| {
                session.append_turn(Turn::user("hello"));
                session.history.len()
            })
            .await
            .unwrap();
        assert_eq!(len, 1);

        let snapshot = store.snapshot("lead-2").await.unwrap();
        assert_eq!(snapshot.history.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_lead_errors() {
        let store = store_with_ttl(3600);
        let result = store.update("ghost", |_| ()).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expired_session_replaced_transparently() {
        let store = store_with_ttl(0);
        {
            let session = store.get_or_create("lead-3", SessionSeed::default());
            let mut guard = session.lock().await;
            guard.append_turn(Turn::user("first contact"));
            guard.last_activity = Utc::now() - chrono::Duration::seconds(10);
        }

        // TTL of zero: the next access sees an expired session
        let session = store.get_or_create("lead-3", SessionSeed::default());
        let guard = session.lock().await;
        assert!(guard.history.is_empty(), "fresh session after eviction");
    }

    #[tokio::test]
    async fn test_eviction_emits_event() {
        let bus = EventBus::new(16);
        let store = SessionStore::new(
            &SessionConfig {
                ttl_secs: 0,
                sweep_interval_secs: 300,
                score_history_cap: 20,
            },
            bus.clone(),
        );
        let mut rx = bus.subscribe();

        {
            let session = store.get_or_create("lead-4", SessionSeed::default());
            session.lock().await.last_activity = Utc::now() - chrono::Duration::seconds(10);
        }
        assert_eq!(store.evict_expired(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::SessionEvicted);
        assert_eq!(event.lead_id, "lead-4");
    }

    #[tokio::test]
    async fn test_locked_session_not_evicted() {
        let store = store_with_ttl(0);
        let session = store.get_or_create("lead-5", SessionSeed::default());
        let mut guard = session.lock().await;
        guard.last_activity = Utc::now() - chrono::Duration::seconds(10);

        // Still held: the sweep must skip it
        assert_eq!(store.evict_expired(), 0);
        drop(guard);
        assert_eq!(store.evict_expired(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_task_evicts() {
        let store = Arc::new(SessionStore::new(
            &SessionConfig {
                ttl_secs: 0,
                sweep_interval_secs: 1,
                score_history_cap: 20,
            },
            EventBus::new(16),
        ));
        {
            let session = store.get_or_create("lead-6", SessionSeed::default());
            session.lock().await.last_activity = Utc::now() - chrono::Duration::seconds(10);
        }

        let handle = store.spawn_sweeper();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.is_empty(), "sweeper should evict the stale session");
        handle.abort();
    }
}
