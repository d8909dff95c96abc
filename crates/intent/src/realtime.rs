//! Real-time incremental intent updates
//!
//! One inbound message produces one [`IncrementalUpdate`]: small score
//! deltas from a fixed rule table over the new message plus the two most
//! recent user messages for context. The first message of a session runs the
//! full decoder instead and reports zero deltas.
//!
//! Bounded work, no I/O, no allocation beyond the result.

use std::collections::BTreeSet;

use leadflow_core::conversation::Turn;
use leadflow_core::lead::EmotionalState;
use leadflow_core::scoring::{
    truncate_trigger, IncrementalUpdate, IntentProfile, IntentSignal, RecommendedAction,
};

use crate::decoder::IntentDecoder;
use crate::markers::{
    count_matches, CASH_READY_MARKERS, COMMITMENT_MARKERS, CONDITION_FLEX_MARKERS,
    EXCITED_MARKERS, FRUSTRATED_MARKERS, SKEPTICAL_MARKERS, WEAK_COMMITMENT_MARKERS,
};

/// Strong urgency markers that trigger the immediate-call path
const IMMEDIATE_URGENCY_MARKERS: &[&str] =
    &["asap", "immediately", "urgent", "right away", "today"];

/// Result of one incremental update
#[derive(Debug, Clone)]
pub struct RealtimeOutcome {
    pub update: IncrementalUpdate,
    /// New running FRS total after applying the delta, clamped to [0, 100]
    pub frs_total: f64,
    /// New running PCS total after applying the delta, clamped to [0, 100]
    pub pcs_total: f64,
    /// Full profile; present only when the full decoder ran (first message)
    pub profile: Option<IntentProfile>,
}

/// Incremental score updater
#[derive(Debug, Clone, Default)]
pub struct RealtimeIntentUpdater {
    decoder: IntentDecoder,
}

impl RealtimeIntentUpdater {
    pub fn new(decoder: IntentDecoder) -> Self {
        Self { decoder }
    }

    /// Compute an incremental update for a new inbound message.
    ///
    /// `current` is the session's running `(frs_total, pcs_total)`; `None`
    /// means this is the first scored message and the full decoder runs.
    /// `history` is the conversation including the new message as its final
    /// turn.
    pub fn update(
        &self,
        lead_id: &str,
        history: &[Turn],
        current: Option<(f64, f64)>,
        new_message: &str,
    ) -> RealtimeOutcome {
        let Some((frs_current, pcs_current)) = current else {
            let profile = self.decoder.analyze(lead_id, history);
            return RealtimeOutcome {
                update: IncrementalUpdate::zero(new_message),
                frs_total: profile.frs.total,
                pcs_total: profile.pcs.total,
                profile: Some(profile),
            };
        };

        let lower = new_message.to_lowercase();

        let urgency_hits = count_matches(&lower, IMMEDIATE_URGENCY_MARKERS);
        let cash_hits = count_matches(&lower, CASH_READY_MARKERS);
        let strong_commit_hits = count_matches(&lower, COMMITMENT_MARKERS);
        let weak_commit_hits = count_matches(&lower, WEAK_COMMITMENT_MARKERS);
        let condition_flex_hits = count_matches(&lower, CONDITION_FLEX_MARKERS);

        let mut frs_delta = 5.0 * urgency_hits as f64 + 8.0 * cash_hits as f64;
        let mut pcs_delta = 10.0 * strong_commit_hits as f64 - 5.0 * weak_commit_hits as f64;

        let word_count = new_message.split_whitespace().count();
        if word_count > 20 {
            pcs_delta += 3.0;
        } else if word_count < 5 {
            pcs_delta -= 2.0;
        }

        // Context shift: urgency rising against the previous two user
        // messages amplifies both deltas.
        let previous_urgency = previous_urgency_level(history);
        let current_urgency = urgency_level(&lower);
        let shift = current_urgency - previous_urgency;
        if shift > 0.2 {
            frs_delta += shift * 10.0;
            pcs_delta += shift * 8.0;
        }

        let frs_total = (frs_current + frs_delta).clamp(0.0, 100.0);
        let pcs_total = (pcs_current + pcs_delta).clamp(0.0, 100.0);

        let marker_count = urgency_hits + cash_hits + strong_commit_hits + weak_commit_hits;
        let confidence = (marker_count as f64 * 0.25).min(1.0);

        let mut signals = BTreeSet::new();
        if frs_delta > 8.0 {
            signals.insert(IntentSignal::MotivationUp);
        } else if frs_delta < -5.0 {
            signals.insert(IntentSignal::MotivationDown);
        }
        if urgency_hits > 0 {
            signals.insert(IntentSignal::TimelineUrgency);
        }
        if cash_hits > 0 {
            signals.insert(IntentSignal::PriceSensitivity);
        }
        if condition_flex_hits > 0 {
            signals.insert(IntentSignal::ConditionFlexibility);
        }
        if pcs_delta > 15.0 {
            signals.insert(IntentSignal::EngagementSpike);
        } else if pcs_delta < -10.0 {
            signals.insert(IntentSignal::DisengagementWarning);
        }

        let recommended_action = recommend(
            urgency_hits,
            frs_delta,
            pcs_delta,
            frs_total,
            pcs_total,
        );

        RealtimeOutcome {
            update: IncrementalUpdate {
                frs_delta,
                pcs_delta,
                confidence,
                signals_detected: signals,
                recommended_action,
                trigger: truncate_trigger(new_message),
                at: chrono::Utc::now(),
            },
            frs_total,
            pcs_total,
            profile: None,
        }
    }
}

fn recommend(
    urgency_hits: usize,
    frs_delta: f64,
    pcs_delta: f64,
    frs_total: f64,
    pcs_total: f64,
) -> RecommendedAction {
    if urgency_hits > 0 {
        RecommendedAction::ImmediateCall
    } else if frs_delta > 10.0 && pcs_delta > 10.0 {
        RecommendedAction::AccelerateSequence
    } else if frs_delta < -5.0 && pcs_delta < -5.0 {
        RecommendedAction::ReEngagementRequired
    } else if frs_total >= 75.0 && pcs_total >= 70.0 {
        RecommendedAction::ScheduleShowing
    } else if frs_total >= 50.0 || pcs_total >= 60.0 {
        RecommendedAction::SoftFollowup
    } else {
        RecommendedAction::ContinueNurture
    }
}

/// Coarse emotional state of one message, first matching table wins
pub fn detect_emotion(message: &str) -> EmotionalState {
    let lower = message.to_lowercase();
    if count_matches(&lower, EXCITED_MARKERS) > 0 {
        EmotionalState::Excited
    } else if count_matches(&lower, FRUSTRATED_MARKERS) > 0 {
        EmotionalState::Frustrated
    } else if count_matches(&lower, SKEPTICAL_MARKERS) > 0 {
        EmotionalState::Skeptical
    } else {
        EmotionalState::Neutral
    }
}

/// Urgency density of one lowercased message, 0.0-1.0
fn urgency_level(lower: &str) -> f64 {
    (count_matches(lower, IMMEDIATE_URGENCY_MARKERS) as f64 * 0.25).min(1.0)
}

/// Urgency level over the two user messages before the newest one
fn previous_urgency_level(history: &[Turn]) -> f64 {
    let previous: Vec<String> = history
        .iter()
        .rev()
        .filter(|t| t.is_user())
        .skip(1)
        .take(2)
        .map(|t| t.content.to_lowercase())
        .collect();
    if previous.is_empty() {
        return 0.0;
    }
    urgency_level(&previous.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(messages: &[&str]) -> Vec<Turn> {
        messages.iter().map(|m| Turn::user(*m)).collect()
    }

    #[test]
    fn test_first_message_runs_full_decoder_with_zero_deltas() {
        let updater = RealtimeIntentUpdater::default();
        let history = history_of(&["I need to sell my house fast, going through a divorce."]);
        let outcome = updater.update("lead-1", &history, None, &history[0].content);

        assert_eq!(outcome.update.frs_delta, 0.0);
        assert_eq!(outcome.update.pcs_delta, 0.0);
        assert!(outcome.profile.is_some());
        assert!(outcome.frs_total > 0.0);
    }

    #[test]
    fn test_urgency_markers_boost_frs() {
        let updater = RealtimeIntentUpdater::default();
        let msg = "We need this done asap, immediately if possible";
        let history = history_of(&["earlier message", msg]);
        let outcome = updater.update("lead-2", &history, Some((40.0, 40.0)), msg);

        // Two urgency markers (+5 each) plus the context-shift amplifier
        assert!(outcome.update.frs_delta >= 10.0);
        assert!(outcome
            .update
            .signals_detected
            .contains(&IntentSignal::TimelineUrgency));
        assert_eq!(
            outcome.update.recommended_action,
            RecommendedAction::ImmediateCall
        );
    }

    #[test]
    fn test_weak_commitment_and_short_message_penalize_pcs() {
        let updater = RealtimeIntentUpdater::default();
        let msg = "maybe, not sure";
        let history = history_of(&["earlier", msg]);
        let outcome = updater.update("lead-3", &history, Some((50.0, 50.0)), msg);

        // Two weak markers (-5 each) plus short-message penalty (-2)
        assert_eq!(outcome.update.pcs_delta, -12.0);
        assert!(outcome
            .update
            .signals_detected
            .contains(&IntentSignal::DisengagementWarning));
        assert_eq!(outcome.pcs_total, 38.0);
    }

    #[test]
    fn test_cash_readiness_boost() {
        let updater = RealtimeIntentUpdater::default();
        let msg = "we are pre-approved and paying cash";
        let history = history_of(&["earlier", msg]);
        let outcome = updater.update("lead-4", &history, Some((50.0, 50.0)), msg);

        assert!(outcome.update.frs_delta >= 16.0);
        assert!(outcome
            .update
            .signals_detected
            .contains(&IntentSignal::PriceSensitivity));
    }

    #[test]
    fn test_totals_clamped_to_valid_range() {
        let updater = RealtimeIntentUpdater::default();
        let msg = "asap immediately urgent today right away, cash ready, definitely committed";
        let history = history_of(&["earlier", msg]);
        let outcome = updater.update("lead-5", &history, Some((95.0, 95.0)), msg);

        assert!(outcome.frs_total <= 100.0);
        assert!(outcome.pcs_total <= 100.0);
    }

    #[test]
    fn test_confidence_scales_with_marker_density() {
        let updater = RealtimeIntentUpdater::default();
        let quiet = "ok then";
        let history = history_of(&["earlier", quiet]);
        let outcome = updater.update("lead-6", &history, Some((50.0, 50.0)), quiet);
        assert_eq!(outcome.update.confidence, 0.0);

        let loud = "asap, definitely ready, cash in hand";
        let history = history_of(&["earlier", loud]);
        let outcome = updater.update("lead-6", &history, Some((50.0, 50.0)), loud);
        assert!(outcome.update.confidence >= 0.75);
    }

    #[test]
    fn test_emotion_detection() {
        assert_eq!(
            detect_emotion("We're so excited, this could be our dream home"),
            EmotionalState::Excited
        );
        assert_eq!(
            detect_emotion("Honestly I'm fed up with this process"),
            EmotionalState::Frustrated
        );
        assert_eq!(
            detect_emotion("I doubt that number is right"),
            EmotionalState::Skeptical
        );
        assert_eq!(detect_emotion("sounds fine"), EmotionalState::Neutral);
    }

    #[test]
    fn test_trigger_is_truncated() {
        let updater = RealtimeIntentUpdater::default();
        let msg = "a ".repeat(120);
        let history = history_of(&["earlier", &msg]);
        let outcome = updater.update("lead-7", &history, Some((50.0, 50.0)), &msg);
        assert_eq!(outcome.update.trigger.chars().count(), 100);
    }
}
