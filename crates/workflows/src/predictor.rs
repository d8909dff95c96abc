//! Default journey predictor
//!
//! A score-trend heuristic standing in for the external ML journey model.
//! Deterministic: conversion follows the latest FRS adjusted by its recent
//! slope, drop-off follows sustained decline.

use leadflow_core::traits::{JourneyPrediction, JourneyPredictor};

#[derive(Debug, Clone, Default)]
pub struct TrendJourneyPredictor;

impl JourneyPredictor for TrendJourneyPredictor {
    fn predict(&self, frs_history: &[f64], pcs_history: &[f64]) -> JourneyPrediction {
        let Some(&last_frs) = frs_history.last() else {
            return JourneyPrediction {
                conversion_probability: 0.1,
                drop_off_risk: 0.5,
            };
        };

        let frs_slope = slope(frs_history);
        let pcs_slope = slope(pcs_history);

        let conversion_probability =
            ((last_frs / 100.0) * (1.0 + frs_slope / 50.0)).clamp(0.0, 0.95);

        let drop_off_risk = if frs_slope < -3.0 || pcs_slope < -3.0 {
            (0.5 + frs_slope.abs().max(pcs_slope.abs()) / 40.0).clamp(0.0, 0.95)
        } else {
            (0.3 - last_frs / 500.0).clamp(0.05, 0.95)
        };

        JourneyPrediction {
            conversion_probability,
            drop_off_risk,
        }
    }
}

/// Average per-step change across the last three points
fn slope(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let window = &history[history.len().saturating_sub(3)..];
    (window[window.len() - 1] - window[0]) / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_history_is_low_confidence() {
        let prediction = TrendJourneyPredictor.predict(&[], &[]);
        assert!(prediction.conversion_probability < 0.2);
    }

    #[test]
    fn test_rising_hot_lead_predicts_conversion() {
        let prediction = TrendJourneyPredictor.predict(&[50.0, 65.0, 80.0], &[50.0, 60.0, 70.0]);
        assert!(prediction.conversion_probability > 0.5);
        assert!(prediction.drop_off_risk < 0.5);
    }

    #[test]
    fn test_declining_lead_predicts_drop_off() {
        let prediction = TrendJourneyPredictor.predict(&[60.0, 40.0, 20.0], &[60.0, 40.0, 20.0]);
        assert!(prediction.drop_off_risk >= 0.5);
        assert!(prediction.conversion_probability < 0.2);
    }

    #[test]
    fn test_probabilities_bounded() {
        let prediction = TrendJourneyPredictor.predict(&[100.0, 100.0, 100.0], &[100.0; 3]);
        assert!(prediction.conversion_probability <= 0.95);
        assert!(prediction.drop_off_risk >= 0.0);
    }
}
