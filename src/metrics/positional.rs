//! Tactics and strategy.
//!
//! A ply is tactical when the position is full of threats or the opponent
//! has just blundered; it is strategic when threats are low and it is not
//! tactical. Strategic plies are scored on how the mover's positional terms
//! develop across the move.

use super::{GameContext, PlyView, mean};
use crate::chess::timecontrol::TimeCategory;
use crate::config::StrategyConfig;
use crate::error::{Component, Diagnostics, SkipReason};
use crate::trace::{Column, TraceBreakdown};
use crate::types::{BySide, Side, to_score};
use crate::winprob::POSITIONAL_CLAMP_CP;
use serde::Serialize;

pub const TAC_THREAT_MIN: f64 = 0.5;
pub const TAC_BLUNDER_OPP: f64 = 15.0;
pub const STR_THREAT_MAX: f64 = 0.4;

const STR_LOSS_TOLERANCE: f64 = 5.0;
const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PositionalScores {
    pub tactics: Option<u8>,
    pub strategy: Option<u8>,
}

#[derive(Debug, Default)]
struct SideStats {
    tactics: Vec<f64>,
    strategy: Vec<f64>,
}

/// Whether the move before `ply` gave away more than the blunder margin.
/// Without engine lines for that move there is nothing to compare against.
fn opponent_blundered(ctx: &GameContext<'_>, ply: &PlyView<'_>) -> bool {
    let Some(prev) = ply.index.checked_sub(1).and_then(|i| ctx.plies.get(i)) else {
        return false;
    };
    let Some(best) = prev.best_wp(POSITIONAL_CLAMP_CP) else {
        return false;
    };
    (best - prev.played_wp(POSITIONAL_CLAMP_CP)).abs() > TAC_BLUNDER_OPP
}

/// Baseline plus weighted term changes, minus a penalty for sloppy moves.
pub fn strategy_score(
    config: &StrategyConfig,
    category: TimeCategory,
    mover: Side,
    before: &TraceBreakdown,
    after: &TraceBreakdown,
    loss: f64,
) -> f64 {
    let (delta_scale, abs_scale) = match category {
        TimeCategory::Bullet => (0.5, 1.5),
        _ => (1.0, 1.0),
    };

    let column = Column::from(mover);
    let terms: f64 = config
        .weights
        .iter()
        .map(|(term, weight)| {
            let now = before.mg(column, term);
            let next = after.mg(column, term);
            (next - now) * weight.delta * delta_scale + next * weight.abs * abs_scale
        })
        .sum();

    let mut score = config.baselines.get(category) + terms;
    if loss > STR_LOSS_TOLERANCE {
        score -= loss * 2.0;
    }
    score.clamp(0.0, 100.0)
}

pub fn score(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<PositionalScores> {
    let category = ctx.time_control.category;
    let mut stats: BySide<SideStats> = BySide::default();

    for (curr, next) in ctx.pairs() {
        let Some(loss) = curr.loss(POSITIONAL_CLAMP_CP) else {
            diagnostics.push(Some(curr.index), Component::Tactics, SkipReason::NoTopLines);
            continue;
        };
        let Some(trace) = &curr.trace else {
            diagnostics.push(Some(curr.index), Component::Tactics, SkipReason::TraceMissing);
            continue;
        };

        let threats = trace.mg(Column::Total, "threats").abs();
        let tactical = threats > TAC_THREAT_MIN || opponent_blundered(ctx, curr);
        let s = &mut stats[curr.mover];

        if tactical {
            s.tactics.push(100.0 * (-0.10 * loss).exp());
            continue;
        }
        if threats >= STR_THREAT_MAX {
            continue;
        }

        match &next.trace {
            Some(after) => s.strategy.push(strategy_score(
                &ctx.config.strategy,
                category,
                curr.mover,
                trace,
                after,
                loss,
            )),
            None => {
                diagnostics.push(Some(curr.index), Component::Strategy, SkipReason::TraceMissing)
            }
        }
    }

    stats.map(|s| PositionalScores {
        tactics: Some(to_score(mean(&s.tactics).unwrap_or(NEUTRAL_SCORE))),
        strategy: Some(to_score(mean(&s.strategy).unwrap_or(NEUTRAL_SCORE))),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::config::EngineConfig;
    use crate::trace::parse_trace;
    use crate::types::PlyEvaluation;

    fn run(pgn: &str, analysis: &[PlyEvaluation]) -> (BySide<PositionalScores>, Diagnostics) {
        let config = EngineConfig::default();
        let mut diagnostics = Diagnostics::default();
        let ctx = GameContext::build(pgn, analysis, &config, &mut diagnostics);
        let scores = score(&ctx, &mut diagnostics);
        (scores, diagnostics)
    }

    fn quiet(mobility: (f64, f64)) -> String {
        trace_with(&[("Threats", (0.1, 0.1)), ("Mobility", mobility)])
    }

    #[test]
    fn test_strategy_rewards_improving_terms() {
        let config = StrategyConfig::default();
        let before = parse_trace(&quiet((0.2, 0.2))).unwrap();
        let after = parse_trace(&quiet((0.5, 0.2))).unwrap();

        // Rapid baseline 65 + mobility (0.3 * 20 + 0.5 * 10).
        let rapid = strategy_score(&config, TimeCategory::Rapid, Side::White, &before, &after, 0.0);
        assert!((rapid - 76.0).abs() < 1e-9);

        // Bullet: 85 + 0.3 * 10 + 0.5 * 15.
        let bullet =
            strategy_score(&config, TimeCategory::Bullet, Side::White, &before, &after, 0.0);
        assert!((bullet - 95.5).abs() < 1e-9);

        // Black's column did not move: baseline + 0.2 * 10.
        let black = strategy_score(&config, TimeCategory::Rapid, Side::Black, &before, &after, 0.0);
        assert!((black - 67.0).abs() < 1e-9);
    }

    #[test]
    fn test_strategy_loss_penalty_and_clamp() {
        let config = StrategyConfig::default();
        let t = parse_trace(&quiet((0.0, 0.0))).unwrap();

        let tolerated = strategy_score(&config, TimeCategory::Blitz, Side::White, &t, &t, 5.0);
        assert_eq!(tolerated, 75.0);
        let punished = strategy_score(&config, TimeCategory::Blitz, Side::White, &t, &t, 10.0);
        assert_eq!(punished, 55.0);
        let floor = strategy_score(&config, TimeCategory::Blitz, Side::White, &t, &t, 60.0);
        assert_eq!(floor, 0.0);
    }

    #[test]
    fn test_threatening_position_scores_tactics() {
        let sharp = trace_with(&[("Threats", (1.2, 0.1))]);
        let analysis = vec![
            with_trace(ply(0.0, &[0.0]), sharp.clone()),
            with_trace(ply(0.0, &[0.0]), sharp.clone()),
            with_trace(ply(0.0, &[0.0]), sharp),
        ];

        let (scores, _) = run("", &analysis);

        // Loss-free tactical plies for white (ply 0) and black (ply 1).
        assert_eq!(scores.white.tactics, Some(100));
        assert_eq!(scores.black.tactics, Some(100));
        assert_eq!(scores.white.strategy, Some(50));
    }

    #[test]
    fn test_opponent_blunder_makes_a_ply_tactical() {
        let analysis = vec![
            // White throws away 300 cp.
            with_trace(ply(-300.0, &[0.0]), quiet((0.2, 0.2))),
            // Black fails to punish: gives it all back.
            with_trace(ply(0.0, &[-300.0]), quiet((0.2, 0.2))),
            with_trace(ply(0.0, &[0.0]), quiet((0.2, 0.2))),
        ];

        let (scores, _) = run("", &analysis);

        // 100 * exp(-0.1 * 25.1)
        assert_eq!(scores.black.tactics, Some(8));
        assert_eq!(scores.black.strategy, Some(50));
        // White's ply 0 was quiet and sloppy.
        assert_eq!(scores.white.tactics, Some(50));
        assert!(scores.white.strategy.unwrap() < 65);
    }

    #[test]
    fn test_previous_ply_without_lines_is_not_a_blunder() {
        let analysis = vec![
            // White's move has no engine lines: it can't be judged.
            with_trace(ply(500.0, &[]), quiet((0.2, 0.2))),
            // Black's quiet move costs a little against the best line.
            with_trace(ply(600.0, &[500.0]), quiet((0.2, 0.2))),
            with_trace(ply(600.0, &[600.0]), quiet((0.2, 0.2))),
        ];
        let config = EngineConfig::default();
        let mut diagnostics = Diagnostics::default();
        let ctx = GameContext::build("", &analysis, &config, &mut diagnostics);

        assert!(!opponent_blundered(&ctx, &ctx.plies[1]));

        let scores = score(&ctx, &mut diagnostics);
        assert_eq!(scores.black.tactics, Some(50));
        assert_ne!(scores.black.strategy, Some(50));
    }

    #[test]
    fn test_missing_inputs_are_skipped() {
        let analysis = vec![
            ply(0.0, &[0.0]),
            with_trace(ply(0.0, &[]), quiet((0.2, 0.2))),
            with_trace(ply(0.0, &[0.0]), quiet((0.2, 0.2))),
            ply(0.0, &[0.0]),
        ];

        let (scores, diagnostics) = run("", &analysis);

        assert!(diagnostics.skipped(0, Component::Tactics));
        assert!(diagnostics.skipped(1, Component::Tactics));
        assert!(diagnostics.skipped(2, Component::Strategy));
        assert_eq!(scores, BySide::splat(PositionalScores {
            tactics: Some(50),
            strategy: Some(50),
        }));
    }
}
