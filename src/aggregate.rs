//! Cross-game aggregation and per-player session state.

use crate::config::AggregationConfig;
use crate::types::{Metric, MetricVector};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

fn valid_samples(samples: impl IntoIterator<Item = f64>) -> Vec<f64> {
    samples
        .into_iter()
        .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
        .collect()
}

fn plain_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Outlier-robust mean of one metric's samples.
///
/// Below the trim threshold this is the plain mean; from it on, the lowest
/// and highest `trim_fraction` of the sorted samples are dropped first.
pub fn stable_estimate(
    samples: impl IntoIterator<Item = f64>,
    config: &AggregationConfig,
) -> Option<f64> {
    let mut values = valid_samples(samples);
    if values.is_empty() {
        return None;
    }
    if values.len() < config.min_samples_for_trim {
        return Some(plain_mean(&values));
    }

    values.sort_by(f64::total_cmp);
    let k = (values.len() as f64 * config.trim_fraction).floor() as usize;
    let trimmed = values.get(k..values.len().saturating_sub(k)).unwrap_or(&[]);

    if trimmed.is_empty() {
        Some(plain_mean(&values))
    } else {
        Some(plain_mean(trimmed))
    }
}

fn to_stable_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Stable per-metric estimates over a history of game vectors.
pub fn aggregate(history: &[MetricVector], config: &AggregationConfig) -> MetricVector {
    let mut stable = MetricVector::empty();
    for metric in Metric::ALL {
        let samples = history.iter().filter_map(|v| v.get(metric)).map(f64::from);
        stable.set(metric, stable_estimate(samples, config).map(to_stable_score));
    }
    stable
}

/// Mean of the non-zero stable estimates.
pub fn overall(stable: &MetricVector) -> Option<u8> {
    let present: Vec<f64> = stable
        .iter()
        .filter_map(|(_, v)| v)
        .filter(|&v| v > 0)
        .map(f64::from)
        .collect();
    if present.is_empty() {
        return None;
    }
    Some(to_stable_score(plain_mean(&present)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub games: usize,
    pub metrics: MetricVector,
    pub overall: Option<u8>,
}

/// Ordered game vectors of one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerSession {
    history: Vec<MetricVector>,
}

impl PlayerSession {
    pub fn record(&mut self, vector: MetricVector) {
        self.history.push(vector);
    }

    pub fn games(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[MetricVector] {
        &self.history
    }

    pub fn profile(&self, config: &AggregationConfig) -> ProfileSummary {
        let metrics = aggregate(&self.history, config);
        ProfileSummary {
            games: self.history.len(),
            overall: overall(&metrics),
            metrics,
        }
    }
}

/// Sessions keyed by normalized player name.
///
/// Recording for one player holds only that player's lock, so different
/// players never wait on each other.
#[derive(Debug, Default)]
pub struct SessionStore {
    config: AggregationConfig,
    sessions: RwLock<HashMap<String, Arc<Mutex<PlayerSession>>>>,
}

fn player_key(username: &str) -> String {
    username.trim().to_lowercase()
}

impl SessionStore {
    pub fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            sessions: RwLock::default(),
        }
    }

    fn session(&self, key: &str) -> Option<Arc<Mutex<PlayerSession>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn session_or_insert(&self, key: String) -> Arc<Mutex<PlayerSession>> {
        if let Some(session) = self.session(&key) {
            return session;
        }
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    /// Appends a game vector and returns the updated profile.
    pub fn record(&self, username: &str, vector: MetricVector) -> ProfileSummary {
        let session = self.session_or_insert(player_key(username));
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.record(vector);
        session.profile(&self.config)
    }

    pub fn profile(&self, username: &str) -> Option<ProfileSummary> {
        let session = self.session(&player_key(username))?;
        let session = session.lock().unwrap_or_else(PoisonError::into_inner);
        Some(session.profile(&self.config))
    }

    /// Known player keys, sorted.
    pub fn players(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn config() -> AggregationConfig {
        AggregationConfig::default()
    }

    #[test]
    fn test_few_samples_use_plain_mean() {
        assert_eq!(stable_estimate([10.0, 20.0, 90.0], &config()), Some(40.0));
        assert_eq!(stable_estimate([], &config()), None);
    }

    #[test]
    fn test_invalid_samples_are_excluded() {
        let samples = [50.0, f64::NAN, 150.0, -1.0, 70.0];
        assert_eq!(stable_estimate(samples, &config()), Some(60.0));
    }

    #[test]
    fn test_ten_samples_drop_one_from_each_end() {
        let samples = [0.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 100.0];
        assert_eq!(stable_estimate(samples, &config()), Some(50.0));
    }

    #[test]
    fn test_five_samples_trim_nothing_at_ten_percent() {
        let samples = [0.0, 50.0, 50.0, 50.0, 100.0];
        assert_eq!(stable_estimate(samples, &config()), Some(50.0));
        let samples = [10.0, 20.0, 30.0, 40.0, 100.0];
        assert_eq!(stable_estimate(samples, &config()), Some(40.0));
    }

    #[test]
    fn test_aggregate_rounds_and_keeps_missing_metrics_null() {
        let history = [
            MetricVector::empty().with(Metric::Accuracy, Some(80)),
            MetricVector::empty().with(Metric::Accuracy, Some(85)),
        ];
        let stable = aggregate(&history, &config());

        assert_eq!(stable.get(Metric::Accuracy), Some(83));
        assert_eq!(stable.get(Metric::Resilience), None);
    }

    #[test]
    fn test_overall_ignores_zero_and_missing() {
        let stable = MetricVector::empty()
            .with(Metric::Accuracy, Some(80))
            .with(Metric::Tactics, Some(60))
            .with(Metric::Strategy, Some(0));
        assert_eq!(overall(&stable), Some(70));
        assert_eq!(overall(&MetricVector::empty()), None);
    }

    #[test]
    fn test_session_profile() {
        let mut session = PlayerSession::default();
        session.record(MetricVector::empty().with(Metric::Attack, Some(70)));
        session.record(MetricVector::empty().with(Metric::Attack, Some(90)));

        let profile = session.profile(&config());

        assert_eq!(profile.games, 2);
        assert_eq!(profile.metrics.get(Metric::Attack), Some(80));
        assert_eq!(profile.overall, Some(80));
    }

    #[test]
    fn test_store_keys_players_case_insensitively() {
        let store = SessionStore::default();
        store.record("Alice", MetricVector::empty().with(Metric::Defense, Some(40)));
        let profile = store.record(
            " alice ",
            MetricVector::empty().with(Metric::Defense, Some(60)),
        );

        assert_eq!(profile.games, 2);
        assert_eq!(profile.metrics.get(Metric::Defense), Some(50));
        assert_eq!(store.players(), vec!["alice".to_string()]);
        assert!(store.profile("bob").is_none());
    }

    #[test]
    fn test_store_concurrent_recording() {
        let store = Arc::new(SessionStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let player = if i % 2 == 0 { "even" } else { "odd" };
                    for _ in 0..25 {
                        store.record(player, MetricVector::empty().with(Metric::Tactics, Some(50)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.profile("even").unwrap().games, 100);
        assert_eq!(store.profile("odd").unwrap().games, 100);
    }

    proptest! {
        #[test]
        fn prop_small_sets_equal_arithmetic_mean(
            samples in prop::collection::vec(0.0f64..=100.0, 1..5),
        ) {
            let expected = samples.iter().sum::<f64>() / samples.len() as f64;
            let got = stable_estimate(samples.iter().copied(), &config()).unwrap();
            prop_assert!((got - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_estimate_stays_within_sample_range(
            samples in prop::collection::vec(0.0f64..=100.0, 1..60),
        ) {
            let lo = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let got = stable_estimate(samples.iter().copied(), &config()).unwrap();
            prop_assert!(got >= lo - 1e-9 && got <= hi + 1e-9);
        }

        #[test]
        fn prop_extreme_outliers_are_trimmed_away(
            samples in prop::collection::vec(1.0f64..=99.0, 10..60),
        ) {
            let mut sorted = samples.clone();
            sorted.sort_by(f64::total_cmp);
            let before = stable_estimate(sorted.iter().copied(), &config()).unwrap();

            let last = sorted.len() - 1;
            sorted[0] = 0.0;
            sorted[last] = 100.0;
            let after = stable_estimate(sorted.iter().copied(), &config()).unwrap();

            prop_assert_eq!(before, after);
        }
    }
}
