//! Calculation, intuition and time management from per-move clock usage.

use super::{GameContext, mean};
use crate::error::{Component, Diagnostics, SkipReason};
use crate::types::{BySide, to_score};
use crate::winprob::POSITIONAL_CLAMP_CP;
use serde::Serialize;

/// Gap between the two best lines that makes a position critical.
pub const CAL_CLIFF_WP: f64 = 10.0;
const RUSH_CLIFF_WP: f64 = 15.0;
const FREEZE_CLIFF_WP: f64 = 5.0;

/// Plies before this index are opening for intuition purposes.
const INTUITION_FROM_PLY: usize = 16;
const CHRONIC_DEFICIT_FROM_PLY: usize = 10;

const TIME_ADVANTAGE_SECONDS: f64 = 30.0;
const TIME_ADVANTAGE_FRACTION: f64 = 0.15;
const MIN_CLOCK_SECONDS: f64 = 0.1;

const TMG_DECAY: f64 = 12.0;
const LOST_ON_TIME_CAP: f64 = 40.0;
const LOST_ON_TIME_PENALTY: f64 = 10.0;
const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TemporalScores {
    pub calculation: Option<u8>,
    pub intuition: Option<u8>,
    pub time_management: Option<u8>,
}

#[derive(Debug, Default)]
struct SideStats {
    calculation: Vec<f64>,
    intuition: Vec<f64>,
    penalty: f64,
    moves: usize,
}

impl SideStats {
    fn finish(&self, lost_on_time: bool) -> TemporalScores {
        let mut tmg = if self.moves > 0 {
            100.0 * (-(self.penalty / self.moves as f64) / TMG_DECAY).exp()
        } else {
            100.0
        };
        if lost_on_time {
            tmg = tmg.min(LOST_ON_TIME_CAP) - LOST_ON_TIME_PENALTY;
        }

        TemporalScores {
            calculation: Some(to_score(mean(&self.calculation).unwrap_or(NEUTRAL_SCORE))),
            intuition: Some(to_score(mean(&self.intuition).unwrap_or(NEUTRAL_SCORE))),
            time_management: Some(to_score(tmg)),
        }
    }
}

/// Scores for both sides; all `None` when the PGN gave no move timing.
pub fn score(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<TemporalScores> {
    if !ctx.has_pgn() {
        return BySide::default();
    }

    let tc = ctx.time_control;
    let limits = *ctx.config.time.get(tc.category);
    let advantage_margin = TIME_ADVANTAGE_SECONDS.max(tc.base_seconds * TIME_ADVANTAGE_FRACTION);

    let mut clocks = BySide::splat(tc.base_seconds);
    let mut stats: BySide<SideStats> = BySide::default();

    for ply in &ctx.plies {
        let Some(move_time) = ply.elapsed else {
            break;
        };
        let side = ply.mover;
        let s = &mut stats[side];
        s.moves += 1;

        clocks[side] = (clocks[side] - move_time + tc.increment_seconds).max(MIN_CLOCK_SECONDS);
        let time_diff = clocks[side] - clocks[side.opponent()];
        let has_time_advantage = time_diff > advantage_margin;

        if ply.index >= CHRONIC_DEFICIT_FROM_PLY && time_diff < 0.0 {
            s.penalty += -time_diff * 0.2 / limits.int_limit.max(1.0);
        }

        let (Some(best), Some(second)) = (
            ply.line_wp(0, POSITIONAL_CLAMP_CP),
            ply.line_wp(1, POSITIONAL_CLAMP_CP),
        ) else {
            diagnostics.push(Some(ply.index), Component::Temporal, SkipReason::NoRunnerUp);
            continue;
        };
        let cliff = (best - second).abs();
        let loss = (best - ply.played_wp(POSITIONAL_CLAMP_CP)).max(0.0);

        if ply.index >= INTUITION_FROM_PLY && move_time < limits.calc_start {
            let fast_limit = limits.int_limit * 0.5;
            let speed = if move_time <= fast_limit {
                100.0
            } else {
                let ratio = (move_time - fast_limit) / (limits.calc_start - fast_limit);
                100.0 - 50.0 * ratio
            };
            let accuracy = 100.0 * (-0.06 * loss).exp();
            s.intuition.push(accuracy * 0.7 + speed * 0.3);
        }

        if cliff > CAL_CLIFF_WP {
            let mut solve = 100.0 * (-0.05 * loss).exp();
            if move_time < limits.calc_start {
                solve = if loss < 5.0 {
                    (solve * 1.1).min(100.0)
                } else {
                    solve * 0.8
                };
            }
            s.calculation.push(solve);
        }

        // Rushed a critical position.
        if cliff > RUSH_CLIFF_WP && move_time < limits.int_limit && loss > 8.0 {
            let rush_factor = ((limits.int_limit - move_time) / limits.int_limit).max(0.0);
            let mut penalty = loss * 2.0;
            if loss > 20.0 {
                penalty += 20.0;
            }
            s.penalty += penalty * rush_factor;
        }

        // Froze in a quiet one.
        if cliff < FREEZE_CLIFF_WP && move_time > limits.freeze && loss > 4.0 {
            let overtime = move_time - limits.freeze;
            s.penalty += if has_time_advantage {
                overtime * 0.2
            } else {
                overtime
            };
        }
    }

    BySide {
        white: stats.white.finish(ctx.lost_on_time.white),
        black: stats.black.finish(ctx.lost_on_time.black),
    }
}
