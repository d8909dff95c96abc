//! The per-lead session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use leadflow_core::conversation::{Turn, TurnRole};
use leadflow_core::lead::{Channel, EmotionalState, EmotionalTransition, LeadKind};
use leadflow_core::scoring::{IntentProfile, ScoreSnapshot};
use leadflow_core::workflow::{WorkflowKind, WorkflowState};

/// Bound on the emotional-transition ring
const EMOTION_RING_CAP: usize = 12;

/// Seed values for a session created on first contact
#[derive(Debug, Clone, Default)]
pub struct SessionSeed {
    pub lead_name: Option<String>,
    pub lead_kind: LeadKind,
    pub initial_history: Vec<Turn>,
    pub initial_bot: Option<WorkflowKind>,
}

/// How quickly this lead tends to reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderKind {
    /// Median reply within five minutes
    Fast,
    /// Median reply within twelve hours
    Moderate,
    Slow,
}

impl ResponderKind {
    pub fn from_median_secs(secs: Option<f64>) -> Self {
        match secs {
            Some(s) if s <= 300.0 => ResponderKind::Fast,
            Some(s) if s <= 43_200.0 => ResponderKind::Moderate,
            Some(_) => ResponderKind::Slow,
            None => ResponderKind::Moderate,
        }
    }
}

/// Behavioural profile derived from the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub median_response_secs: Option<f64>,
    pub preferred_channel: Channel,
    pub responder: ResponderKind,
    pub message_count: usize,
}

/// Per-lead conversation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSession {
    pub lead_id: String,
    pub lead_name: Option<String>,
    pub lead_kind: LeadKind,
    pub current_bot: WorkflowKind,
    /// Append-only; length is non-decreasing for the session's lifetime
    pub history: Vec<Turn>,
    pub workflow_state: WorkflowState,
    pub last_profile: Option<IntentProfile>,
    /// Running totals maintained by the real-time updater
    pub frs_total: f64,
    pub pcs_total: f64,
    /// Bounded ring of recent snapshots; oldest dropped at the cap
    pub score_history: VecDeque<ScoreSnapshot>,
    pub emotional_state: EmotionalState,
    pub emotional_transitions: VecDeque<EmotionalTransition>,
    pub stall_count: u32,
    /// Inbound messages per channel, for channel preference
    pub sms_inbound: u32,
    pub email_inbound: u32,
    pub chat_inbound: u32,
    /// Phone captured from the latest SMS inbound
    pub phone: Option<String>,
    /// Set when the compliance gate processed an opt-out for this lead
    pub sms_opted_out: bool,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LeadSession {
    pub fn new(lead_id: impl Into<String>, seed: SessionSeed) -> Self {
        let now = Utc::now();
        let current_bot = seed.initial_bot.unwrap_or_default();
        Self {
            lead_id: lead_id.into(),
            lead_name: seed.lead_name,
            lead_kind: seed.lead_kind,
            current_bot,
            history: seed.initial_history,
            workflow_state: WorkflowState::initial(current_bot),
            last_profile: None,
            frs_total: 0.0,
            pcs_total: 0.0,
            score_history: VecDeque::new(),
            emotional_state: EmotionalState::Neutral,
            emotional_transitions: VecDeque::new(),
            stall_count: 0,
            sms_inbound: 0,
            email_inbound: 0,
            chat_inbound: 0,
            phone: None,
            sms_opted_out: false,
            last_inbound_at: None,
            last_outbound_at: None,
            last_activity: now,
            created_at: now,
        }
    }

    /// Append a turn. The history is append-only; nothing removes from it.
    pub fn append_turn(&mut self, turn: Turn) {
        let now = turn.timestamp;
        match turn.role {
            TurnRole::User => self.last_inbound_at = Some(now),
            TurnRole::Assistant => self.last_outbound_at = Some(now),
            TurnRole::System => {}
        }
        self.history.push(turn);
        self.last_activity = Utc::now();
    }

    /// Record an inbound channel for preference tracking
    pub fn note_channel(&mut self, channel: Channel) {
        match channel {
            Channel::Sms => self.sms_inbound += 1,
            Channel::Email => self.email_inbound += 1,
            Channel::Chat | Channel::Voice => self.chat_inbound += 1,
        }
    }

    /// Push a score snapshot, dropping the oldest past the cap
    pub fn push_snapshot(&mut self, snapshot: ScoreSnapshot, cap: usize) {
        self.score_history.push_back(snapshot);
        while self.score_history.len() > cap {
            self.score_history.pop_front();
        }
    }

    /// Record an emotional transition when the state actually changes
    pub fn transition_emotion(&mut self, to: EmotionalState) {
        if to == self.emotional_state {
            return;
        }
        self.emotional_transitions.push_back(EmotionalTransition {
            from: self.emotional_state,
            to,
            at: Utc::now(),
        });
        while self.emotional_transitions.len() > EMOTION_RING_CAP {
            self.emotional_transitions.pop_front();
        }
        self.emotional_state = to;
    }

    /// Switch the responsible bot, resetting the new workflow to its initial
    /// node (handoffs reset, they never migrate mid-flow)
    pub fn switch_bot(&mut self, to: WorkflowKind) {
        self.current_bot = to;
        self.workflow_state = WorkflowState::initial(to);
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }

    pub fn score_snapshots(&self) -> Vec<ScoreSnapshot> {
        self.score_history.iter().cloned().collect()
    }

    /// Derive the behaviour profile from history and channel counts
    pub fn behavior_profile(&self) -> BehaviorProfile {
        let user_times: Vec<DateTime<Utc>> = self
            .history
            .iter()
            .filter(|t| t.is_user())
            .map(|t| t.timestamp)
            .collect();

        let mut gaps: Vec<f64> = user_times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds().max(0) as f64)
            .collect();
        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median_response_secs = if gaps.is_empty() {
            None
        } else if gaps.len() % 2 == 0 {
            Some((gaps[gaps.len() / 2 - 1] + gaps[gaps.len() / 2]) / 2.0)
        } else {
            Some(gaps[gaps.len() / 2])
        };

        let preferred_channel = [
            (Channel::Sms, self.sms_inbound),
            (Channel::Email, self.email_inbound),
            (Channel::Chat, self.chat_inbound),
        ]
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(channel, _)| channel)
        .unwrap_or(Channel::Sms);

        BehaviorProfile {
            median_response_secs,
            preferred_channel,
            responder: ResponderKind::from_median_secs(median_response_secs),
            message_count: user_times.len(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            lead_id: self.lead_id.clone(),
            lead_name: self.lead_name.clone(),
            lead_kind: self.lead_kind,
            current_bot: self.current_bot,
            workflow_state: self.workflow_state.clone(),
            history: self.history.clone(),
            last_profile: self.last_profile.clone(),
            frs_total: self.frs_total,
            pcs_total: self.pcs_total,
            score_history: self.score_snapshots(),
            stall_count: self.stall_count,
            sms_opted_out: self.sms_opted_out,
            last_inbound_at: self.last_inbound_at,
            last_outbound_at: self.last_outbound_at,
            created_at: self.created_at,
        }
    }
}

/// Immutable view of a session handed to readers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub lead_id: String,
    pub lead_name: Option<String>,
    pub lead_kind: LeadKind,
    pub current_bot: WorkflowKind,
    pub workflow_state: WorkflowState,
    pub history: Vec<Turn>,
    pub last_profile: Option<IntentProfile>,
    pub frs_total: f64,
    pub pcs_total: f64,
    pub score_history: Vec<ScoreSnapshot>,
    pub stall_count: u32,
    pub sms_opted_out: bool,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use leadflow_core::lead::Classification;

    fn snap(frs: f64) -> ScoreSnapshot {
        ScoreSnapshot {
            frs_total: frs,
            pcs_total: 50.0,
            classification: Classification::Warm,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_history_is_append_only_and_tracks_timestamps() {
        let mut session = LeadSession::new("lead-1", SessionSeed::default());
        let before = session.history.len();

        session.append_turn(Turn::user("hello"));
        session.append_turn(Turn::assistant("hi"));

        assert_eq!(session.history.len(), before + 2);
        assert!(session.last_inbound_at.is_some());
        assert!(session.last_outbound_at.is_some());
    }

    #[test]
    fn test_score_ring_bounded() {
        let mut session = LeadSession::new("lead-2", SessionSeed::default());
        for i in 0..30 {
            session.push_snapshot(snap(i as f64), 20);
        }
        assert_eq!(session.score_history.len(), 20);
        // Oldest dropped: ring starts at snapshot 10
        assert_eq!(session.score_history.front().unwrap().frs_total, 10.0);
    }

    #[test]
    fn test_emotion_transitions_recorded_only_on_change() {
        let mut session = LeadSession::new("lead-3", SessionSeed::default());
        session.transition_emotion(EmotionalState::Excited);
        session.transition_emotion(EmotionalState::Excited);
        session.transition_emotion(EmotionalState::Frustrated);

        assert_eq!(session.emotional_transitions.len(), 2);
        assert_eq!(session.emotional_state, EmotionalState::Frustrated);
    }

    #[test]
    fn test_switch_bot_resets_workflow_state() {
        let mut session = LeadSession::new("lead-4", SessionSeed::default());
        session.switch_bot(WorkflowKind::BuyerQualify);

        assert_eq!(session.current_bot, WorkflowKind::BuyerQualify);
        assert_eq!(session.workflow_state.kind(), WorkflowKind::BuyerQualify);
    }

    #[test]
    fn test_behavior_profile_fast_responder() {
        let mut session = LeadSession::new("lead-5", SessionSeed::default());
        let t0 = Utc::now();
        session.append_turn(Turn::user("one").with_timestamp(t0));
        session.append_turn(Turn::user("two").with_timestamp(t0 + Duration::seconds(60)));
        session.append_turn(Turn::user("three").with_timestamp(t0 + Duration::seconds(120)));
        session.note_channel(Channel::Sms);
        session.note_channel(Channel::Sms);
        session.note_channel(Channel::Email);

        let profile = session.behavior_profile();
        assert_eq!(profile.responder, ResponderKind::Fast);
        assert_eq!(profile.preferred_channel, Channel::Sms);
        assert_eq!(profile.message_count, 3);
    }

    #[test]
    fn test_behavior_profile_no_history() {
        let session = LeadSession::new("lead-6", SessionSeed::default());
        let profile = session.behavior_profile();
        assert!(profile.median_response_secs.is_none());
        assert_eq!(profile.responder, ResponderKind::Moderate);
    }
}
