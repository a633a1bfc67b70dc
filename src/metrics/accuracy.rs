//! Move accuracy by phase.
//!
//! The played evaluations form a win-percentage series starting from a
//! slightly favourable 20 cp. Each move scores against the previous point
//! of the series from its mover's perspective, and carries a weight equal
//! to the volatility of the series around it, so accuracy in sharp
//! stretches of the game counts for more.

use super::{GameContext, PlyView};
use crate::chess::phase::Phase;
use crate::error::{Component, Diagnostics, SkipReason};
use crate::types::{BySide, Score, to_score};
use crate::winprob::{ACCURACY_CLAMP_CP, to_win_percent};
use serde::Serialize;

pub const ACC_A: f64 = 103.1668100711649;
pub const ACC_B: f64 = -3.166924740191411;
pub const ACC_K: f64 = 0.04354415386753951;

const BASELINE_CP: f64 = 20.0;
const MIN_WEIGHT: f64 = 0.5;
const MAX_WEIGHT: f64 = 12.0;

/// Accuracy of one move given the mover's win percentage before and after.
pub fn move_accuracy(wp_before: f64, wp_after: f64) -> f64 {
    if wp_after >= wp_before {
        return 100.0;
    }
    let lost = wp_before - wp_after;
    (ACC_A * (-ACC_K * lost).exp() + ACC_B + 1.0).clamp(0.0, 100.0)
}

/// White-relative win percentages: the 20 cp baseline, then one point per ply.
/// A ply without a usable evaluation repeats the previous one.
pub fn win_percent_series(plies: &[PlyView<'_>]) -> Vec<f64> {
    let mut previous = Score::Centipawns(BASELINE_CP);
    let mut series = Vec::with_capacity(plies.len() + 1);
    series.push(to_win_percent(previous, ACCURACY_CLAMP_CP));

    for ply in plies {
        if ply.eval.played_eval.is_known() {
            previous = ply.eval.played_eval;
        }
        series.push(to_win_percent(previous, ACCURACY_CLAMP_CP));
    }
    series
}

fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// One weight per move of `series`.
pub fn volatility_weights(series: &[f64]) -> Vec<f64> {
    let moves = series.len().saturating_sub(1);
    let window = (series.len() / 10).clamp(2, 8);
    let windows = if series.len() > window {
        series.len() - window + 1
    } else {
        0
    };

    (0..moves)
        .map(|i| {
            if i < windows {
                sample_stdev(&series[i..i + window]).clamp(MIN_WEIGHT, MAX_WEIGHT)
            } else {
                MIN_WEIGHT
            }
        })
        .collect()
}

/// Average of the weighted mean and the harmonic mean of a bucket.
pub fn bucket_score(samples: &[(f64, f64)]) -> Option<f64> {
    let weighted = super::weighted_mean(samples)?;

    let harmonic = if samples.iter().any(|&(acc, _)| acc <= 0.0) {
        0.0
    } else {
        samples.len() as f64 / samples.iter().map(|&(acc, _)| 1.0 / acc).sum::<f64>()
    };

    Some((weighted + harmonic) / 2.0)
}

fn finish(samples: &[(f64, f64)]) -> Option<u8> {
    bucket_score(samples).map(|s| to_score((s * 100.0).round() / 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PhaseAccuracy {
    pub opening: Option<u8>,
    pub middlegame: Option<u8>,
    pub endgame: Option<u8>,
    pub overall: Option<u8>,
}

#[derive(Default)]
struct Buckets {
    opening: Vec<(f64, f64)>,
    middlegame: Vec<(f64, f64)>,
    endgame: Vec<(f64, f64)>,
    all: Vec<(f64, f64)>,
}

impl Buckets {
    fn push(&mut self, phase: Phase, sample: (f64, f64)) {
        match phase {
            Phase::Opening => self.opening.push(sample),
            Phase::Middlegame => self.middlegame.push(sample),
            Phase::Endgame => self.endgame.push(sample),
        }
        self.all.push(sample);
    }

    fn finish(&self) -> PhaseAccuracy {
        PhaseAccuracy {
            opening: finish(&self.opening),
            middlegame: finish(&self.middlegame),
            endgame: finish(&self.endgame),
            overall: finish(&self.all),
        }
    }
}

/// Phase and overall accuracy per side.
///
/// Only plies with a phase label are scored, so an unreadable PGN leaves
/// every bucket empty.
pub fn score(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<PhaseAccuracy> {
    if ctx.plies.is_empty() || !ctx.has_pgn() {
        return BySide::default();
    }

    let series = win_percent_series(&ctx.plies);
    let weights = volatility_weights(&series);
    let mut buckets = BySide {
        white: Buckets::default(),
        black: Buckets::default(),
    };

    for ply in &ctx.plies {
        let Some(phase) = ply.phase else {
            diagnostics.push(Some(ply.index), Component::Accuracy, SkipReason::NoPhaseLabel);
            continue;
        };

        let i = ply.index;
        let accuracy = move_accuracy(
            ply.mover.perspective(series[i]),
            ply.mover.perspective(series[i + 1]),
        );
        buckets[ply.mover].push(phase, (accuracy, weights[i]));
    }

    buckets.map(|b| b.finish())
}
