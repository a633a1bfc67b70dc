//! Per-game scoring: context, models, vector assembly and calibration.

use crate::calibration::calibrate;
use crate::chess::players::{declared_rating, resolve_side};
use crate::chess::read_pgn;
use crate::config::EngineConfig;
use crate::error::{Component, Diagnostics, SkipReason};
use crate::metrics::{GameContext, accuracy, attack_defense, positional, resilience, temporal};
use crate::types::{BySide, GameRecord, Metric, MetricVector, Side};
use serde::Serialize;

/// Result of scoring one game for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameReport {
    pub username: String,
    /// `None` when the player is not named in the PGN.
    pub side: Option<Side>,
    pub rating: i32,
    pub raw: MetricVector,
    pub calibrated: MetricVector,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Raw vectors for both sides of a game.
    pub fn score_sides(&self, record: &GameRecord) -> (BySide<MetricVector>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let ctx = GameContext::build(&record.pgn, &record.analysis, &self.config, &mut diagnostics);
        let vectors = score_context(&ctx, &mut diagnostics);
        (vectors, diagnostics)
    }

    /// Rating from the player's Elo tag, or the configured default.
    pub fn declared_rating(&self, record: &GameRecord) -> i32 {
        read_pgn(&record.pgn)
            .ok()
            .and_then(|game| {
                let side = resolve_side(&game.headers, &record.username)?;
                declared_rating(&game.headers, side)
            })
            .unwrap_or(self.config.calibration.default_rating)
    }

    /// Scores `record` for its player and calibrates against `rating`.
    pub fn analyze(&self, record: &GameRecord, rating: i32) -> GameReport {
        let mut diagnostics = Diagnostics::default();
        let ctx = GameContext::build(&record.pgn, &record.analysis, &self.config, &mut diagnostics);

        let side = ctx.player_side(&record.username);
        let raw = match side {
            Some(side) => score_context(&ctx, &mut diagnostics)[side],
            None => {
                log::warn!("player '{}' not found in PGN headers", record.username);
                diagnostics.push(
                    None,
                    Component::Player,
                    SkipReason::PlayerNotFound {
                        username: record.username.clone(),
                    },
                );
                MetricVector::empty()
            }
        };

        let calibrated = calibrate(&self.config.calibration, &raw, rating);
        log::debug!(
            "scored game for '{}' ({} plies, {} skips)",
            record.username,
            record.analysis.len(),
            diagnostics.len()
        );

        GameReport {
            username: record.username.clone(),
            side,
            rating,
            raw,
            calibrated,
            diagnostics,
        }
    }

    pub fn score_game(&self, record: &GameRecord, rating: i32) -> MetricVector {
        self.analyze(record, rating).calibrated
    }
}

fn score_context(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<MetricVector> {
    if ctx.plies.is_empty() {
        return BySide::splat(MetricVector::empty());
    }

    let accuracy = accuracy::score(ctx, diagnostics);
    let temporal = temporal::score(ctx, diagnostics);
    let positional = positional::score(ctx, diagnostics);
    let attack_defense = attack_defense::score(ctx, diagnostics);
    let resilience = resilience::score(ctx, diagnostics);

    let vector = |side: Side| {
        let acc = accuracy[side];
        let tmp = temporal[side];
        let pos = positional[side];
        let ad = attack_defense[side];

        MetricVector::empty()
            .with(Metric::Opening, acc.opening)
            .with(Metric::Middlegame, acc.middlegame)
            .with(Metric::Endgame, acc.endgame)
            .with(Metric::Accuracy, acc.overall)
            .with(Metric::Tactics, pos.tactics)
            .with(Metric::Strategy, pos.strategy)
            .with(Metric::Attack, ad.attack)
            .with(Metric::Defense, ad.defense)
            .with(Metric::Resilience, resilience[side])
            .with(Metric::Calculation, tmp.calculation)
            .with(Metric::Intuition, tmp.intuition)
            .with(Metric::TimeManagement, tmp.time_management)
    };

    BySide {
        white: vector(Side::White),
        black: vector(Side::Black),
    }
}
