//! Resilience: how well a side plays when it is worse or under threat.

use super::{GameContext, mean};
use crate::error::{Component, Diagnostics, SkipReason};
use crate::types::{BySide, to_score};
use crate::winprob::POSITIONAL_CLAMP_CP;

/// Win-percentage band of a position that is bad but not yet lost.
pub const PRESSURE_MIN_WP: f64 = 4.0;
pub const PRESSURE_MAX_WP: f64 = 35.0;
/// Incoming threat level that counts as pressure whatever the evaluation.
pub const PRESSURE_THREAT: f64 = 0.6;

/// Mean resilience per side; `None` for a side never under pressure.
pub fn score(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<Option<u8>> {
    let mut samples: BySide<Vec<f64>> = BySide::default();

    for ply in &ctx.plies {
        let Some(best) = ply.best_wp(POSITIONAL_CLAMP_CP) else {
            diagnostics.push(Some(ply.index), Component::Resilience, SkipReason::NoTopLines);
            continue;
        };

        let losing = (PRESSURE_MIN_WP..=PRESSURE_MAX_WP).contains(&best);
        let threatened = ply
            .trace
            .as_ref()
            .is_some_and(|t| t.mg(ply.mover.opponent(), "threats") > PRESSURE_THREAT);
        if !(losing || threatened) {
            continue;
        }

        let equity_loss = (best - ply.played_wp(POSITIONAL_CLAMP_CP)).max(0.0);
        samples[ply.mover].push(100.0 * (-0.10 * equity_loss).exp());
    }

    samples.map(|s| mean(&s).map(to_score))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::PlyEvaluation;

    fn run(analysis: &[PlyEvaluation]) -> (BySide<Option<u8>>, Diagnostics) {
        let config = EngineConfig::default();
        let mut diagnostics = Diagnostics::default();
        let ctx = GameContext::build("", analysis, &config, &mut diagnostics);
        let scores = score(&ctx, &mut diagnostics);
        (scores, diagnostics)
    }

    #[test]
    fn test_no_pressure_is_null() {
        let analysis = vec![ply(0.0, &[0.0]); 4];
        let (scores, _) = run(&analysis);
        assert_eq!(scores, BySide::splat(None));
    }

    #[test]
    fn test_holding_a_worse_position() {
        // White is at -300 (about 25%) and keeps it there.
        let analysis = vec![ply(-300.0, &[-300.0]), ply(-300.0, &[-300.0])];
        let (scores, _) = run(&analysis);

        assert_eq!(scores.white, Some(100));
        // Black is the one winning: no pressure.
        assert_eq!(scores.black, None);
    }

    #[test]
    fn test_collapse_under_pressure() {
        // Black at +300 for white, i.e. 25% for black, drops to +600.
        let analysis = vec![ply(300.0, &[300.0]), ply(600.0, &[300.0])];
        let (scores, _) = run(&analysis);

        // 100 * exp(-0.1 * (24.9 - 9.9))
        assert_eq!(scores.black, Some(22));
    }

    #[test]
    fn test_hopeless_position_is_not_pressure() {
        let analysis = vec![ply(-1000.0, &[-1000.0])];
        let (scores, _) = run(&analysis);
        assert_eq!(scores.white, None);
    }

    #[test]
    fn test_incoming_threats_count_as_pressure() {
        let analysis = vec![with_trace(ply(0.0, &[0.0]), trace((0.1, 0.9), (0.5, 0.5)))];
        let (scores, _) = run(&analysis);
        assert_eq!(scores.white, Some(100));
    }

    #[test]
    fn test_missing_lines_are_skipped() {
        let analysis = vec![ply(-300.0, &[])];
        let (scores, diagnostics) = run(&analysis);

        assert!(diagnostics.skipped(0, Component::Resilience));
        assert_eq!(scores.white, None);
    }
}
