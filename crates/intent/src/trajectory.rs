//! Score trajectory forecasting
//!
//! Linear extrapolation over the last three score snapshots. Feeds the
//! nurture workflow's early-warning rule and the session snapshot surface.

use leadflow_core::scoring::{ScoreSnapshot, Trajectory, TrajectoryForecast};

/// Forecast the score trajectory from the session's snapshot ring.
/// Fewer than three snapshots is insufficient data.
pub fn forecast_trajectory(snapshots: &[ScoreSnapshot]) -> TrajectoryForecast {
    if snapshots.len() < 3 {
        return TrajectoryForecast::insufficient();
    }

    let recent = &snapshots[snapshots.len() - 3..];
    let n = recent.len() as f64;

    let frs_rate = (recent[2].frs_total - recent[0].frs_total) / n;
    let pcs_rate = (recent[2].pcs_total - recent[0].pcs_total) / n;

    let trajectory = if frs_rate > 5.0 && pcs_rate > 5.0 {
        Trajectory::Accelerating
    } else if frs_rate < -3.0 || pcs_rate < -3.0 {
        Trajectory::Declining
    } else {
        Trajectory::Stable
    };

    TrajectoryForecast {
        trajectory,
        confidence: (snapshots.len() as f64 * 0.1).min(0.9),
        predicted_frs: (recent[2].frs_total + frs_rate).clamp(0.0, 100.0),
        predicted_pcs: (recent[2].pcs_total + pcs_rate).clamp(0.0, 100.0),
        frs_rate,
        pcs_rate,
    }
}

/// True when the last three snapshots show a strictly monotonic FRS decline.
pub fn monotonic_decline(snapshots: &[ScoreSnapshot]) -> bool {
    if snapshots.len() < 3 {
        return false;
    }
    let recent = &snapshots[snapshots.len() - 3..];
    recent[0].frs_total > recent[1].frs_total && recent[1].frs_total > recent[2].frs_total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadflow_core::lead::Classification;

    fn snap(frs: f64, pcs: f64) -> ScoreSnapshot {
        ScoreSnapshot {
            frs_total: frs,
            pcs_total: pcs,
            classification: Classification::Warm,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_insufficient_data() {
        let forecast = forecast_trajectory(&[snap(50.0, 50.0), snap(55.0, 52.0)]);
        assert_eq!(forecast.trajectory, Trajectory::InsufficientData);
        assert_eq!(forecast.confidence, 0.0);
    }

    #[test]
    fn test_accelerating() {
        let snapshots = vec![snap(40.0, 40.0), snap(55.0, 52.0), snap(70.0, 65.0)];
        let forecast = forecast_trajectory(&snapshots);
        assert_eq!(forecast.trajectory, Trajectory::Accelerating);
        assert!(forecast.predicted_frs > 70.0);
    }

    #[test]
    fn test_declining() {
        let snapshots = vec![snap(70.0, 60.0), snap(58.0, 55.0), snap(45.0, 50.0)];
        let forecast = forecast_trajectory(&snapshots);
        assert_eq!(forecast.trajectory, Trajectory::Declining);
        assert!(forecast.frs_rate < 0.0);
    }

    #[test]
    fn test_stable() {
        let snapshots = vec![snap(50.0, 50.0), snap(51.0, 50.0), snap(50.0, 51.0)];
        assert_eq!(forecast_trajectory(&snapshots).trajectory, Trajectory::Stable);
    }

    #[test]
    fn test_prediction_clamped() {
        let snapshots = vec![snap(70.0, 70.0), snap(85.0, 85.0), snap(99.0, 99.0)];
        let forecast = forecast_trajectory(&snapshots);
        assert!(forecast.predicted_frs <= 100.0);
        assert!(forecast.predicted_pcs <= 100.0);
    }

    #[test]
    fn test_monotonic_decline_detection() {
        assert!(monotonic_decline(&[
            snap(70.0, 60.0),
            snap(60.0, 55.0),
            snap(50.0, 50.0)
        ]));
        assert!(!monotonic_decline(&[
            snap(70.0, 60.0),
            snap(72.0, 55.0),
            snap(50.0, 50.0)
        ]));
        assert!(!monotonic_decline(&[snap(70.0, 60.0), snap(60.0, 55.0)]));
    }
}
