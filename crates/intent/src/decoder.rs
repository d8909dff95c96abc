//! Lead intent decoder
//!
//! `analyze(lead_id, history)` walks the full conversation and produces an
//! immutable [`IntentProfile`]: the Financial Readiness Score (four weighted
//! pillars), the Psychological Commitment Score (five averaged components),
//! classification, and the independent buyer/seller intent confidences.
//!
//! Deterministic, no I/O. An empty history yields an all-zero Cold profile.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use leadflow_core::conversation::Turn;
use leadflow_core::lead::Classification;
use leadflow_core::scoring::{
    FinancialReadiness, FrsWeights, IntentProfile, PsychologicalCommitment, RecommendedAction,
};

use crate::markers::*;

/// Duration expressions like "60 days", "3 weeks", "6 months"
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(day|week|month|year)s?").unwrap());

/// Explicit price figures: "$450k", "$500,000", "450k"
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?\d[\d,]*|\b\d{2,4}k\b").unwrap());

/// Decoder configuration: FRS weights and classification thresholds
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub weights: FrsWeights,
    pub hot_threshold: f64,
    pub warm_threshold: f64,
    pub lukewarm_threshold: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            weights: FrsWeights::default(),
            hot_threshold: 75.0,
            warm_threshold: 50.0,
            lukewarm_threshold: 25.0,
        }
    }
}

/// Pure conversation-history scorer
#[derive(Debug, Clone, Default)]
pub struct IntentDecoder {
    config: DecoderConfig,
}

impl IntentDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Analyze a full conversation history into a scored profile.
    pub fn analyze(&self, lead_id: &str, history: &[Turn]) -> IntentProfile {
        let user_turns: Vec<&Turn> = history.iter().filter(|t| t.is_user()).collect();
        if user_turns.is_empty() {
            return IntentProfile {
                lead_id: lead_id.to_string(),
                next_best_action: RecommendedAction::SoftFollowup,
                ..IntentProfile::default()
            };
        }

        let all_text: String = user_turns
            .iter()
            .map(|t| t.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut detected_markers = BTreeSet::new();
        let motivation = self.motivation_score(&all_text, &mut detected_markers);
        let timeline = self.timeline_score(&all_text);
        let condition = self.condition_score(&all_text);
        let (price, zestimate_mentioned) = self.price_score(&all_text);
        if zestimate_mentioned {
            detected_markers.insert("zestimate".to_string());
        }

        let mut frs = FinancialReadiness::weighted(
            motivation,
            timeline,
            condition,
            price,
            &self.config.weights,
        );
        frs.zestimate_mentioned = zestimate_mentioned;

        let pcs = self.commitment_score(history, &user_turns);

        let classification = Classification::from_score(
            frs.total,
            self.config.hot_threshold,
            self.config.warm_threshold,
            self.config.lukewarm_threshold,
        );

        let buyer_confidence = intent_confidence(&all_text, BUYER_KEYWORDS);
        let seller_confidence = intent_confidence(&all_text, SELLER_KEYWORDS);

        IntentProfile {
            lead_id: lead_id.to_string(),
            frs,
            pcs,
            classification,
            buyer_confidence,
            seller_confidence,
            next_best_action: next_best_action(classification),
            detected_markers,
        }
    }

    /// Pillar 1: motivation from linguistic markers
    fn motivation_score(&self, text: &str, detected: &mut BTreeSet<String>) -> f64 {
        let mut score = 0.0;
        for (table, weight) in [
            (LIFE_EVENT_MARKERS, 30.0),
            (URGENCY_MARKERS, 20.0),
            (COMMITMENT_MARKERS, 15.0),
            (CURIOSITY_MARKERS, -20.0),
        ] {
            for marker in collect_matches(text, table) {
                score += weight;
                detected.insert(marker.to_string());
            }
        }
        score
    }

    /// Pillar 2: timeline commitment. Multiple durations take the minimum.
    fn timeline_score(&self, text: &str) -> f64 {
        let mut shortest_days: Option<i64> = None;

        for cap in DURATION_RE.captures_iter(text) {
            let amount: i64 = match cap[1].parse() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let days = match &cap[2] {
                "day" => amount,
                "week" => amount * 7,
                "month" => amount * 30,
                "year" => amount * 365,
                _ => continue,
            };
            shortest_days = Some(shortest_days.map_or(days, |d: i64| d.min(days)));
        }

        // Immediate-intent phrases count as a very short explicit timeline
        if count_matches(text, &["asap", "immediately", "right away", "this week"]) > 0 {
            shortest_days = Some(shortest_days.map_or(7, |d: i64| d.min(7)));
        }

        match shortest_days {
            Some(d) if d <= 30 => 100.0,
            Some(d) if d <= 90 => 80.0,
            Some(d) if d <= 180 => 60.0,
            Some(d) if d <= 365 => 40.0,
            _ => 20.0,
        }
    }

    /// Pillar 3: condition realism. Neutral 50 when condition never comes up
    /// (buyers rarely discuss condition of a home they don't own yet).
    fn condition_score(&self, text: &str) -> f64 {
        let mut score = 50.0;
        score += 15.0 * count_matches(text, DEFECT_MARKERS) as f64;
        score += 10.0 * count_matches(text, CONDITION_REALISM_MARKERS) as f64;
        score -= 25.0 * count_matches(text, CONDITION_UNREALISTIC_MARKERS) as f64;
        score
    }

    /// Pillar 4: price responsiveness. Returns (score, zestimate_mentioned).
    fn price_score(&self, text: &str) -> (f64, bool) {
        let mut score = 40.0;
        if PRICE_RE.is_match(text) {
            score += 20.0;
        }
        score += 15.0 * count_matches(text, COMPS_MARKERS) as f64;

        let zestimate = count_matches(text, ZESTIMATE_MARKERS) > 0;
        if zestimate {
            score -= 20.0;
        }
        (score, zestimate)
    }

    /// The five PCS components
    fn commitment_score(&self, history: &[Turn], user_turns: &[&Turn]) -> PsychologicalCommitment {
        let response_velocity = velocity_score(user_turns);
        let message_length = length_score(user_turns);
        let question_depth = question_depth_score(user_turns);
        let objection_handling = objection_score(history);
        let call_acceptance = if user_turns
            .iter()
            .any(|t| count_matches(&t.content.to_lowercase(), CALL_ACCEPTANCE_MARKERS) > 0)
        {
            100.0
        } else {
            0.0
        };

        PsychologicalCommitment::from_components(
            response_velocity,
            message_length,
            question_depth,
            objection_handling,
            call_acceptance,
        )
    }
}

/// keyword count / (count + 3), keeping the value in [0, 1)
fn intent_confidence(text: &str, keywords: &[&str]) -> f64 {
    let count = count_matches(text, keywords) as f64;
    count / (count + 3.0)
}

fn next_best_action(classification: Classification) -> RecommendedAction {
    match classification {
        Classification::Hot => RecommendedAction::ImmediateCall,
        Classification::Warm => RecommendedAction::ScheduleShowing,
        Classification::Lukewarm => RecommendedAction::ContinueNurture,
        Classification::Cold => RecommendedAction::SoftFollowup,
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Median seconds between adjacent user messages, bucketed. Neutral 50 with
/// fewer than two user messages.
fn velocity_score(user_turns: &[&Turn]) -> f64 {
    let mut gaps: Vec<f64> = user_turns
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds().max(0) as f64)
        .collect();

    let Some(median_secs) = median(&mut gaps) else {
        return 50.0;
    };

    match median_secs {
        s if s <= 120.0 => 100.0,
        s if s <= 600.0 => 80.0,
        s if s <= 3_600.0 => 60.0,
        s if s <= 43_200.0 => 40.0,
        s if s <= 86_400.0 => 20.0,
        _ => 10.0,
    }
}

/// Median word count of user messages, bucketed
fn length_score(user_turns: &[&Turn]) -> f64 {
    let mut counts: Vec<f64> = user_turns.iter().map(|t| t.word_count() as f64).collect();
    let Some(median_words) = median(&mut counts) else {
        return 20.0;
    };

    match median_words {
        w if w >= 20.0 => 100.0,
        w if w >= 10.0 => 70.0,
        w if w >= 5.0 => 50.0,
        _ => 20.0,
    }
}

/// Fraction of user messages asking a substantive (domain-noun) question
fn question_depth_score(user_turns: &[&Turn]) -> f64 {
    let substantive = user_turns
        .iter()
        .filter(|t| {
            let lower = t.content.to_lowercase();
            lower.contains('?') && count_matches(&lower, DOMAIN_NOUNS) > 0
        })
        .count();
    100.0 * substantive as f64 / user_turns.len() as f64
}

/// Objections raised vs overcome. An objection counts as overcome when a
/// later user message within three turns carries an agreement marker.
fn objection_score(history: &[Turn]) -> f64 {
    let mut raised = 0u32;
    let mut overcome = 0u32;

    for (i, turn) in history.iter().enumerate() {
        if !turn.is_user() {
            continue;
        }
        let lower = turn.content.to_lowercase();
        if count_matches(&lower, OBJECTION_MARKERS) == 0 {
            continue;
        }
        raised += 1;

        let resolved = history
            .iter()
            .skip(i + 1)
            .take(3)
            .filter(|t| t.is_user())
            .any(|t| count_matches(&t.content.to_lowercase(), AGREEMENT_MARKERS) > 0);
        if resolved {
            overcome += 1;
        }
    }

    let unresolved = raised.saturating_sub(overcome);
    50.0 + 10.0 * overcome as f64 - 15.0 * unresolved as f64
}
