//! Rating calibration.
//!
//! A raw game score is pulled toward the score expected at the player's
//! rating. Each metric's elasticity decides how much of the raw score
//! survives: at 1 the raw score passes through, at 0 only the anchor is left.

use crate::config::CalibrationConfig;
use crate::types::{Metric, MetricVector, to_score};

/// Expected score for `rating`.
pub fn anchor_for(config: &CalibrationConfig, rating: i32) -> f64 {
    config
        .bands
        .iter()
        .find(|band| band.up_to.is_none_or(|limit| rating <= limit))
        .or_else(|| config.bands.last())
        .map_or(50.0, |band| band.anchor)
}

/// `anchor * (1 - e) + raw * e`, clamped to 0-100.
pub fn blend(anchor: f64, raw: f64, elasticity: f64) -> f64 {
    (anchor * (1.0 - elasticity) + raw * elasticity).clamp(0.0, 100.0)
}

pub fn calibrate_value(
    config: &CalibrationConfig,
    metric: Metric,
    raw: Option<u8>,
    rating: i32,
) -> Option<u8> {
    let raw = raw?;
    let anchor = anchor_for(config, rating);
    Some(to_score(blend(anchor, raw as f64, config.elasticity(metric))))
}

/// Calibrates every metric; missing raw scores stay missing.
pub fn calibrate(config: &CalibrationConfig, raw: &MetricVector, rating: i32) -> MetricVector {
    let mut calibrated = MetricVector::empty();
    for (metric, value) in raw.iter() {
        calibrated.set(metric, calibrate_value(config, metric, value, rating));
    }
    calibrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_anchor_bands() {
        let config = CalibrationConfig::default();
        assert_eq!(anchor_for(&config, 0), 15.0);
        assert_eq!(anchor_for(&config, 400), 15.0);
        assert_eq!(anchor_for(&config, 401), 37.5);
        assert_eq!(anchor_for(&config, 1200), 50.0);
        assert_eq!(anchor_for(&config, 2850), 95.0);
        assert_eq!(anchor_for(&config, 3001), 98.0);
        assert_eq!(anchor_for(&config, -50), 15.0);
    }

    #[test]
    fn test_closed_table_uses_last_band_above_it() {
        let mut config = CalibrationConfig::default();
        config.bands.pop();
        assert_eq!(anchor_for(&config, 3500), 95.0);
    }

    #[test]
    fn test_beginner_with_perfect_raw_score() {
        // 15 * 0.65 + 100 * 0.35 = 44.75
        let config = CalibrationConfig::default();
        assert_eq!(config.elasticity(Metric::Tactics), 0.35);
        assert_eq!(
            calibrate_value(&config, Metric::Tactics, Some(100), 0),
            Some(44)
        );
    }

    #[test]
    fn test_null_stays_null_for_every_metric() {
        let config = CalibrationConfig::default();
        let calibrated = calibrate(&config, &MetricVector::empty(), 1500);
        assert!(calibrated.is_empty());
        for metric in Metric::ALL {
            assert_eq!(calibrate_value(&config, metric, None, 2000), None);
        }
    }

    #[test]
    fn test_calibrate_whole_vector() {
        let config = CalibrationConfig::default();
        let raw = MetricVector::empty()
            .with(Metric::Strategy, Some(90))
            .with(Metric::TimeManagement, Some(90));

        let calibrated = calibrate(&config, &raw, 1200);

        // 50 * 0.75 + 90 * 0.25
        assert_eq!(calibrated.get(Metric::Strategy), Some(60));
        // 50 * 0.5 + 90 * 0.5
        assert_eq!(calibrated.get(Metric::TimeManagement), Some(70));
        assert_eq!(calibrated.get(Metric::Accuracy), None);
    }

    proptest! {
        #[test]
        fn prop_full_elasticity_is_identity(raw in 0u8..=100, anchor in 0.0f64..=100.0) {
            prop_assert_eq!(blend(anchor, raw as f64, 1.0), raw as f64);
        }

        #[test]
        fn prop_zero_elasticity_is_anchor(raw in 0u8..=100, anchor in 0.0f64..=100.0) {
            prop_assert_eq!(blend(anchor, raw as f64, 0.0), anchor);
        }

        #[test]
        fn prop_calibrated_lies_between_anchor_and_raw(
            raw in 0u8..=100,
            rating in -100i32..3500,
            metric in proptest::sample::select(Metric::ALL.to_vec()),
        ) {
            let config = CalibrationConfig::default();
            let anchor = anchor_for(&config, rating);
            let value = calibrate_value(&config, metric, Some(raw), rating).unwrap() as f64;
            let raw = raw as f64;
            let (lo, hi) = if anchor < raw { (anchor, raw) } else { (raw, anchor) };
            prop_assert!(value >= lo.floor() && value <= hi);
        }
    }
}
