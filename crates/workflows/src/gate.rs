//! Qualification gate
//!
//! Decides whether a prospect has warmed up enough to hand to a
//! qualification bot (or a human). Thresholds are inclusive: FRS >= 60 and
//! max(buyer, seller confidence) >= 0.70 with the defaults.

use leadflow_config::HandoffConfig;
use leadflow_core::scoring::IntentProfile;
use leadflow_core::workflow::WorkflowKind;

/// Where a passed gate routes the lead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffTarget {
    BuyerQualify,
    SellerQualify,
    /// Neither intent is confident; stay with the nurture bot
    LeadBot,
}

impl HandoffTarget {
    pub fn workflow(&self) -> WorkflowKind {
        match self {
            HandoffTarget::BuyerQualify => WorkflowKind::BuyerQualify,
            HandoffTarget::SellerQualify => WorkflowKind::SellerQualify,
            HandoffTarget::LeadBot => WorkflowKind::NurtureSequence,
        }
    }
}

/// Result of a gate evaluation
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub passed: bool,
    pub frs: f64,
    pub pcs: f64,
    /// max(buyer_confidence, seller_confidence)
    pub confidence: f64,
    pub target: HandoffTarget,
    pub disqualify_reason: Option<String>,
}

/// Evaluate the gate against a scored profile.
pub fn evaluate_gate(profile: &IntentProfile, config: &HandoffConfig) -> GateDecision {
    let frs = profile.frs.total;
    let pcs = profile.pcs.total;
    let confidence = profile.buyer_confidence.max(profile.seller_confidence);

    // Always compute the target; useful for nurture routing even on failure
    let target = select_target(profile, config.confidence_min);

    let frs_ok = frs >= config.frs_min;
    let conf_ok = confidence >= config.confidence_min;

    if frs_ok && conf_ok {
        tracing::info!(
            lead_id = %profile.lead_id,
            frs,
            confidence,
            target = ?target,
            "qualification gate passed"
        );
        return GateDecision {
            passed: true,
            frs,
            pcs,
            confidence,
            target,
            disqualify_reason: None,
        };
    }

    let mut parts = Vec::new();
    if !frs_ok {
        parts.push(format!("FRS {frs:.1} < {}", config.frs_min));
    }
    if !conf_ok {
        parts.push(format!(
            "intent confidence {confidence:.2} < {}",
            config.confidence_min
        ));
    }

    GateDecision {
        passed: false,
        frs,
        pcs,
        confidence,
        target,
        disqualify_reason: Some(parts.join("; ")),
    }
}

fn select_target(profile: &IntentProfile, confidence_min: f64) -> HandoffTarget {
    let buyer = profile.buyer_confidence;
    let seller = profile.seller_confidence;

    if buyer >= confidence_min && buyer >= seller {
        HandoffTarget::BuyerQualify
    } else if seller >= confidence_min && seller > buyer {
        HandoffTarget::SellerQualify
    } else {
        HandoffTarget::LeadBot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::scoring::FinancialReadiness;

    fn profile(frs_total: f64, buyer: f64, seller: f64) -> IntentProfile {
        IntentProfile {
            lead_id: "lead-1".into(),
            frs: FinancialReadiness {
                total: frs_total,
                ..FinancialReadiness::default()
            },
            buyer_confidence: buyer,
            seller_confidence: seller,
            ..IntentProfile::default()
        }
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let decision = evaluate_gate(&profile(60.0, 0.70, 0.0), &HandoffConfig::default());
        assert!(decision.passed);
        assert_eq!(decision.target, HandoffTarget::BuyerQualify);
    }

    #[test]
    fn test_just_below_frs_fails() {
        let decision = evaluate_gate(&profile(59.99, 0.70, 0.0), &HandoffConfig::default());
        assert!(!decision.passed);
        assert!(decision.disqualify_reason.unwrap().contains("FRS"));
    }

    #[test]
    fn test_low_confidence_fails_with_reason() {
        let decision = evaluate_gate(&profile(80.0, 0.40, 0.35), &HandoffConfig::default());
        assert!(!decision.passed);
        assert!(decision
            .disqualify_reason
            .unwrap()
            .contains("intent confidence"));
        assert_eq!(decision.target, HandoffTarget::LeadBot);
    }

    #[test]
    fn test_seller_beats_buyer_when_strictly_higher() {
        let decision = evaluate_gate(&profile(70.0, 0.70, 0.75), &HandoffConfig::default());
        assert!(decision.passed);
        assert_eq!(decision.target, HandoffTarget::SellerQualify);
    }

    #[test]
    fn test_buyer_wins_ties() {
        let decision = evaluate_gate(&profile(70.0, 0.72, 0.72), &HandoffConfig::default());
        assert_eq!(decision.target, HandoffTarget::BuyerQualify);
    }
}
