//! Intent scoring types
//!
//! The two composite scores:
//! - **FRS** (Financial Readiness): weighted sum of motivation, timeline,
//!   condition and price sub-scores.
//! - **PCS** (Psychological Commitment): unweighted average of five
//!   engagement sub-scores.
//!
//! All sub-scores live on a 0-100 scale and are clamped on construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::lead::Classification;

fn clamp_score(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Financial Readiness Score with its four pillars
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FinancialReadiness {
    /// Weighted total, 0-100
    pub total: f64,
    /// Pillar 1: motivation signals from linguistic markers
    pub motivation: f64,
    /// Pillar 2: timeline commitment
    pub timeline: f64,
    /// Pillar 3: condition realism (sellers; neutral 50 for buyers)
    pub condition: f64,
    /// Pillar 4: price responsiveness
    pub price: f64,
    /// Whether the lead anchored on a third-party automated valuation
    pub zestimate_mentioned: bool,
}

impl FinancialReadiness {
    /// Combine the four pillars with the configured weights.
    /// Weights are validated to sum to 1.0 at startup.
    pub fn weighted(
        motivation: f64,
        timeline: f64,
        condition: f64,
        price: f64,
        weights: &FrsWeights,
    ) -> Self {
        let motivation = clamp_score(motivation);
        let timeline = clamp_score(timeline);
        let condition = clamp_score(condition);
        let price = clamp_score(price);
        let total = clamp_score(
            motivation * weights.motivation
                + timeline * weights.timeline
                + condition * weights.condition
                + price * weights.price,
        );
        Self {
            total,
            motivation,
            timeline,
            condition,
            price,
            zestimate_mentioned: false,
        }
    }
}

/// Weights for the FRS pillars; must sum to 1.0
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrsWeights {
    pub motivation: f64,
    pub timeline: f64,
    pub condition: f64,
    pub price: f64,
}

impl Default for FrsWeights {
    fn default() -> Self {
        Self {
            motivation: 0.35,
            timeline: 0.30,
            condition: 0.20,
            price: 0.15,
        }
    }
}

impl FrsWeights {
    pub fn sum(&self) -> f64 {
        self.motivation + self.timeline + self.condition + self.price
    }
}

/// Psychological Commitment Score with its five components
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PsychologicalCommitment {
    /// Unweighted average of the five components, 0-100
    pub total: f64,
    /// Median seconds between adjacent lead messages, bucketed
    pub response_velocity: f64,
    /// Median word count of lead messages, bucketed
    pub message_length: f64,
    /// Fraction of lead messages asking substantive questions
    pub question_depth: f64,
    /// Objections raised vs overcome
    pub objection_handling: f64,
    /// Whether a call/tour invitation was accepted
    pub call_acceptance: f64,
}

impl PsychologicalCommitment {
    pub fn from_components(
        response_velocity: f64,
        message_length: f64,
        question_depth: f64,
        objection_handling: f64,
        call_acceptance: f64,
    ) -> Self {
        let response_velocity = clamp_score(response_velocity);
        let message_length = clamp_score(message_length);
        let question_depth = clamp_score(question_depth);
        let objection_handling = clamp_score(objection_handling);
        let call_acceptance = clamp_score(call_acceptance);
        let total = (response_velocity
            + message_length
            + question_depth
            + objection_handling
            + call_acceptance)
            / 5.0;
        Self {
            total,
            response_velocity,
            message_length,
            question_depth,
            objection_handling,
            call_acceptance,
        }
    }
}

/// Complete scored intent profile — an immutable snapshot of one analysis
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntentProfile {
    pub lead_id: String,
    pub frs: FinancialReadiness,
    pub pcs: PsychologicalCommitment,
    pub classification: Classification,
    /// Confidence that the lead is buying, 0.0-1.0
    pub buyer_confidence: f64,
    /// Confidence that the lead is selling, 0.0-1.0 (independent of buyer)
    pub seller_confidence: f64,
    /// Recommended next step identifier
    pub next_best_action: RecommendedAction,
    /// Linguistic markers that contributed to the motivation score
    pub detected_markers: BTreeSet<String>,
}

/// Fixed vocabulary of real-time intent signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentSignal {
    MotivationUp,
    MotivationDown,
    TimelineUrgency,
    PriceSensitivity,
    ConditionFlexibility,
    EngagementSpike,
    DisengagementWarning,
}

impl IntentSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentSignal::MotivationUp => "motivation-up",
            IntentSignal::MotivationDown => "motivation-down",
            IntentSignal::TimelineUrgency => "timeline-urgency",
            IntentSignal::PriceSensitivity => "price-sensitivity",
            IntentSignal::ConditionFlexibility => "condition-flexibility",
            IntentSignal::EngagementSpike => "engagement-spike",
            IntentSignal::DisengagementWarning => "disengagement-warning",
        }
    }
}

/// Recommended next action from scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedAction {
    ImmediateCall,
    AccelerateSequence,
    ReEngagementRequired,
    ScheduleShowing,
    SoftFollowup,
    #[default]
    ContinueNurture,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::ImmediateCall => "immediate-call",
            RecommendedAction::AccelerateSequence => "accelerate-sequence",
            RecommendedAction::ReEngagementRequired => "re-engagement-required",
            RecommendedAction::ScheduleShowing => "schedule-showing",
            RecommendedAction::SoftFollowup => "soft-followup",
            RecommendedAction::ContinueNurture => "continue-nurture",
        }
    }
}

/// One incremental score update, produced once per inbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalUpdate {
    pub frs_delta: f64,
    pub pcs_delta: f64,
    /// 0.0-1.0, derived from marker density
    pub confidence: f64,
    pub signals_detected: BTreeSet<IntentSignal>,
    pub recommended_action: RecommendedAction,
    /// First 100 chars of the triggering message
    pub trigger: String,
    pub at: DateTime<Utc>,
}

impl IncrementalUpdate {
    /// A zero update (first message of a session)
    pub fn zero(trigger: &str) -> Self {
        Self {
            frs_delta: 0.0,
            pcs_delta: 0.0,
            confidence: 0.0,
            signals_detected: BTreeSet::new(),
            recommended_action: RecommendedAction::ContinueNurture,
            trigger: truncate_trigger(trigger),
            at: Utc::now(),
        }
    }
}

/// Truncate a message to the 100-char trigger excerpt stored on updates
pub fn truncate_trigger(message: &str) -> String {
    message.chars().take(100).collect()
}

/// Detected stall kinds, ordered by detection priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StallKind {
    #[default]
    None,
    Thinking,
    PriceObjection,
    ZestimateFixation,
    AgentConflict,
    Busy,
    MaybeLater,
}

impl StallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StallKind::None => "none",
            StallKind::Thinking => "thinking",
            StallKind::PriceObjection => "price-objection",
            StallKind::ZestimateFixation => "zestimate-fixation",
            StallKind::AgentConflict => "agent-conflict",
            StallKind::Busy => "busy",
            StallKind::MaybeLater => "maybe-later",
        }
    }

    pub fn is_stall(&self) -> bool {
        !matches!(self, StallKind::None)
    }
}

/// Compact score snapshot kept in the session's bounded history ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub frs_total: f64,
    pub pcs_total: f64,
    pub classification: Classification,
    pub at: DateTime<Utc>,
}

impl ScoreSnapshot {
    pub fn of(profile: &IntentProfile) -> Self {
        Self {
            frs_total: profile.frs.total,
            pcs_total: profile.pcs.total,
            classification: profile.classification,
            at: Utc::now(),
        }
    }
}

/// Direction the scores are heading over the recent snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    Accelerating,
    Declining,
    Stable,
    InsufficientData,
}

/// Linear extrapolation of the last few snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryForecast {
    pub trajectory: Trajectory,
    pub confidence: f64,
    pub predicted_frs: f64,
    pub predicted_pcs: f64,
    pub frs_rate: f64,
    pub pcs_rate: f64,
}

impl TrajectoryForecast {
    pub fn insufficient() -> Self {
        Self {
            trajectory: Trajectory::InsufficientData,
            confidence: 0.0,
            predicted_frs: 0.0,
            predicted_pcs: 0.0,
            frs_rate: 0.0,
            pcs_rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frs_weighted_sum() {
        let weights = FrsWeights::default();
        let frs = FinancialReadiness::weighted(80.0, 60.0, 50.0, 40.0, &weights);
        let expected = 80.0 * 0.35 + 60.0 * 0.30 + 50.0 * 0.20 + 40.0 * 0.15;
        assert!((frs.total - expected).abs() < 0.5);
    }

    #[test]
    fn test_frs_clamps_subscores() {
        let weights = FrsWeights::default();
        let frs = FinancialReadiness::weighted(150.0, -20.0, 50.0, 50.0, &weights);
        assert_eq!(frs.motivation, 100.0);
        assert_eq!(frs.timeline, 0.0);
        assert!(frs.total <= 100.0);
    }

    #[test]
    fn test_pcs_average() {
        let pcs = PsychologicalCommitment::from_components(100.0, 70.0, 50.0, 50.0, 0.0);
        assert!((pcs.total - 54.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((FrsWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trigger_truncation() {
        let long = "x".repeat(250);
        assert_eq!(truncate_trigger(&long).len(), 100);
        assert_eq!(truncate_trigger("short"), "short");
    }
}
