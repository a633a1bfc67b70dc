//! Tunable tables of the scoring engine.
//!
//! Every section is optional in JSON; absent sections keep their defaults.

use crate::chess::timecontrol::TimeCategory;
use crate::error::ConfigError;
use crate::types::Metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Elasticity used for a metric missing from the calibration table.
pub const FALLBACK_ELASTICITY: f64 = 0.35;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub bullet: T,
    pub blitz: T,
    pub rapid: T,
    pub classical: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: TimeCategory) -> &T {
        match category {
            TimeCategory::Bullet => &self.bullet,
            TimeCategory::Blitz => &self.blitz,
            TimeCategory::Rapid => &self.rapid,
            TimeCategory::Classical => &self.classical,
        }
    }
}

/// Seconds-per-move limits of one time-control category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeThresholds {
    /// Below this a move counts as instinctive.
    pub int_limit: f64,
    /// From here on a move counts as calculated.
    pub calc_start: f64,
    /// Above this a quiet-position move counts as a freeze.
    pub freeze: f64,
}

impl TimeThresholds {
    const fn new(int_limit: f64, calc_start: f64, freeze: f64) -> Self {
        Self {
            int_limit,
            calc_start,
            freeze,
        }
    }
}

fn default_time_thresholds() -> PerCategory<TimeThresholds> {
    PerCategory {
        bullet: TimeThresholds::new(1.5, 2.0, 5.0),
        blitz: TimeThresholds::new(4.0, 5.0, 12.0),
        rapid: TimeThresholds::new(8.0, 10.0, 30.0),
        classical: TimeThresholds::new(15.0, 20.0, 120.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Full moves up to and including this number are opening.
    pub opening_move_limit: u32,
    /// Non-pawn, non-king material (both sides) at or below this is endgame.
    pub endgame_material: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            opening_move_limit: 15,
            endgame_material: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    /// Weight of the change in the term across the move.
    pub delta: f64,
    /// Weight of the term's value after the move.
    pub abs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub baselines: PerCategory<f64>,
    pub weights: BTreeMap<String, TermWeight>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let weights = [
            ("mobility", 20.0, 10.0),
            ("space", 25.0, 15.0),
            ("king_safety", 30.0, 10.0),
            ("pawns", 20.0, 10.0),
            ("imbalance", 10.0, 5.0),
        ]
        .into_iter()
        .map(|(term, delta, abs)| (term.to_string(), TermWeight { delta, abs }))
        .collect();

        Self {
            baselines: PerCategory {
                bullet: 85.0,
                blitz: 75.0,
                rapid: 65.0,
                classical: 60.0,
            },
            weights,
        }
    }
}

/// Expected score for ratings up to `up_to`; `None` closes the table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingBand {
    pub up_to: Option<i32>,
    pub anchor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Rating used when neither the caller nor the PGN supplies one.
    pub default_rating: i32,
    pub bands: Vec<RatingBand>,
    pub elasticity: BTreeMap<Metric, f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let band = |up_to, anchor| RatingBand { up_to, anchor };
        let elasticity = [
            (Metric::Opening, 0.30),
            (Metric::Middlegame, 0.35),
            (Metric::Endgame, 0.35),
            (Metric::Accuracy, 0.30),
            (Metric::Tactics, 0.35),
            (Metric::Strategy, 0.25),
            (Metric::Attack, 0.40),
            (Metric::Defense, 0.40),
            (Metric::Resilience, 0.45),
            (Metric::Calculation, 0.40),
            (Metric::Intuition, 0.45),
            (Metric::TimeManagement, 0.50),
        ]
        .into_iter()
        .collect();

        Self {
            default_rating: 1200,
            bands: vec![
                band(Some(400), 15.0),
                band(Some(800), 37.5),
                band(Some(1200), 50.0),
                band(Some(1600), 62.5),
                band(Some(2000), 75.0),
                band(Some(2400), 85.0),
                band(Some(2800), 92.0),
                band(Some(3000), 95.0),
                band(None, 98.0),
            ],
            elasticity,
        }
    }
}

impl CalibrationConfig {
    pub fn elasticity(&self, metric: Metric) -> f64 {
        self.elasticity
            .get(&metric)
            .copied()
            .unwrap_or(FALLBACK_ELASTICITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Sample count from which the trimmed mean replaces the plain mean.
    pub min_samples_for_trim: usize,
    /// Fraction cut from each end of the sorted samples.
    pub trim_fraction: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_samples_for_trim: 5,
            trim_fraction: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub phase: PhaseConfig,
    pub time: PerCategory<TimeThresholds>,
    pub strategy: StrategyConfig,
    pub calibration: CalibrationConfig,
    pub aggregation: AggregationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phase: PhaseConfig::default(),
            time: default_time_thresholds(),
            strategy: StrategyConfig::default(),
            calibration: CalibrationConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        for (metric, e) in &self.calibration.elasticity {
            if !(0.0..=1.0).contains(e) {
                return invalid(format!("elasticity for {metric} must be in [0, 1], got {e}"));
            }
        }

        let bands = &self.calibration.bands;
        if bands.is_empty() {
            return invalid("calibration needs at least one rating band".to_string());
        }
        for (i, pair) in bands.windows(2).enumerate() {
            match (pair[0].up_to, pair[1].up_to) {
                (Some(a), Some(b)) if a < b => {}
                (Some(_), None) => {}
                _ => {
                    return invalid(format!(
                        "rating bands must have increasing limits with only the last open (band {})",
                        i + 1
                    ));
                }
            }
        }
        if let Some(band) = bands.iter().find(|b| !(0.0..=100.0).contains(&b.anchor)) {
            return invalid(format!("anchor {} outside [0, 100]", band.anchor));
        }

        let trim = self.aggregation.trim_fraction;
        if !(0.0..0.5).contains(&trim) {
            return invalid(format!("trim fraction must be in [0, 0.5), got {trim}"));
        }

        for category in [
            TimeCategory::Bullet,
            TimeCategory::Blitz,
            TimeCategory::Rapid,
            TimeCategory::Classical,
        ] {
            let t = self.time.get(category);
            if t.int_limit <= 0.0 || t.calc_start <= t.int_limit * 0.5 {
                return invalid(format!(
                    "{category} thresholds need int_limit > 0 and calc_start > int_limit / 2"
                ));
            }
        }

        Ok(())
    }
}
