//! Skill vectors for engine-annotated chess games.
//!
//! A game arrives as a [`GameRecord`]: the PGN, the player to score and one
//! [`PlyEvaluation`] per ply. [`Engine::analyze`] turns it into twelve
//! 0-100 scores, calibrated against the player's rating, and
//! [`SessionStore`] folds successive games into a stable profile.

pub mod aggregate;
pub mod calibration;
pub mod chess;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod metrics;
pub mod trace;
pub mod types;
pub mod winprob;

pub use aggregate::{PlayerSession, ProfileSummary, SessionStore, stable_estimate};
pub use config::EngineConfig;
pub use engine::{Engine, GameReport};
pub use error::{Component, ConfigError, Diagnostics, PgnError, Skip, SkipReason, TraceError};
pub use types::{
    BySide, EngineLine, GameRecord, Metric, MetricVector, PlyEvaluation, Score, Side,
};

/// Scores one game with the default configuration.
pub fn score_game(record: &GameRecord, rating: i32) -> MetricVector {
    Engine::default().score_game(record, rating)
}

/// Stable estimates over a player's game vectors with the default configuration.
pub fn aggregate(history: &[MetricVector]) -> MetricVector {
    aggregate::aggregate(history, &config::AggregationConfig::default())
}
