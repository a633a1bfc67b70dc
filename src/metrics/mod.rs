//! Per-game scoring models.
//!
//! Each model reads a [`GameContext`], built once per game: the PGN is
//! replayed, the time control resolved and every static trace parsed a
//! single time. Models never fail; anything they cannot use is recorded
//! in [`Diagnostics`] and contributes nothing.

pub mod accuracy;
pub mod attack_defense;
pub mod positional;
pub mod resilience;
pub mod temporal;

use crate::chess::phase::{Phase, elapsed_times, replay};
use crate::chess::timecontrol::TimeControl;
use crate::chess::visitor::{ClockReading, PgnHeaders};
use crate::chess::{lost_on_time, players};
use crate::config::EngineConfig;
use crate::error::{Component, Diagnostics, SkipReason};
use crate::trace::{TraceBreakdown, parse_trace};
use crate::types::{BySide, PlyEvaluation, Side};
use crate::winprob::to_win_percent;

/// One entry of `analysis` together with what the PGN says about it.
#[derive(Debug, Clone)]
pub struct PlyView<'a> {
    pub index: usize,
    pub eval: &'a PlyEvaluation,
    pub mover: Side,
    /// `None` past the legal prefix of the PGN.
    pub phase: Option<Phase>,
    /// Seconds spent; `None` past the legal prefix of the PGN.
    pub elapsed: Option<f64>,
    /// `None` when the trace is absent or unreadable.
    pub trace: Option<TraceBreakdown>,
}

impl PlyView<'_> {
    /// Mover-perspective win percentage of the best engine line.
    pub fn best_wp(&self, clamp_cp: f64) -> Option<f64> {
        self.line_wp(0, clamp_cp)
    }

    /// Mover-perspective win percentage of the `rank`-th engine line.
    pub fn line_wp(&self, rank: usize, clamp_cp: f64) -> Option<f64> {
        let line = self.eval.top_lines.get(rank)?;
        Some(self.mover.perspective(to_win_percent(line.score, clamp_cp)))
    }

    /// Mover-perspective win percentage after the played move.
    pub fn played_wp(&self, clamp_cp: f64) -> f64 {
        self.mover
            .perspective(to_win_percent(self.eval.played_eval, clamp_cp))
    }

    /// Win percentage given up relative to the best line, never negative.
    pub fn loss(&self, clamp_cp: f64) -> Option<f64> {
        let best = self.best_wp(clamp_cp)?;
        Some((best - self.played_wp(clamp_cp)).max(0.0))
    }
}

/// Everything the models need to know about one game.
#[derive(Debug)]
pub struct GameContext<'a> {
    pub config: &'a EngineConfig,
    pub headers: Option<PgnHeaders>,
    pub plies: Vec<PlyView<'a>>,
    pub time_control: TimeControl,
    pub lost_on_time: BySide<bool>,
}

impl<'a> GameContext<'a> {
    pub fn build(
        pgn: &str,
        analysis: &'a [PlyEvaluation],
        config: &'a EngineConfig,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let game = match replay(pgn, &config.phase) {
            Ok(game) => Some(game),
            Err(e) => {
                log::warn!("PGN unreadable, phase and timing data unavailable: {e}");
                diagnostics.push(
                    None,
                    Component::Pgn,
                    SkipReason::PgnUnreadable {
                        message: e.to_string(),
                    },
                );
                None
            }
        };

        if let Some(san) = game.as_ref().and_then(|g| g.illegal.clone()) {
            log::warn!("illegal move '{san}' in PGN, later plies carry no phase");
            diagnostics.push(None, Component::Pgn, SkipReason::IllegalMove { san });
        }

        let headers = game.as_ref().map(|g| g.headers.clone());
        let time_control = TimeControl::from_header(
            headers.as_ref().and_then(|h| h.time_control.as_deref()),
        );
        let replayed_plies = game.as_ref().map(|g| g.plies.as_slice()).unwrap_or(&[]);
        let elapsed = elapsed_times(replayed_plies, &time_control);
        let first_mover = game.as_ref().map_or(Side::White, |g| g.first_mover);

        let plies = analysis
            .iter()
            .enumerate()
            .map(|(index, eval)| {
                let replayed = replayed_plies.get(index);
                if replayed.is_some_and(|p| p.clock == ClockReading::Malformed) {
                    diagnostics.push(
                        Some(index),
                        Component::Temporal,
                        SkipReason::ClockAnnotation,
                    );
                }
                let mover = resolve_mover(
                    index,
                    replayed.map(|p| p.mover),
                    eval.mover,
                    first_mover,
                    diagnostics,
                );

                PlyView {
                    index,
                    eval,
                    mover,
                    phase: replayed.map(|p| p.phase),
                    elapsed: elapsed.get(index).copied(),
                    trace: parse_ply_trace(index, eval, diagnostics),
                }
            })
            .collect();

        GameContext {
            config,
            lost_on_time: headers
                .as_ref()
                .map_or_else(|| BySide::splat(false), lost_on_time),
            headers,
            plies,
            time_control,
        }
    }

    /// Whether the PGN could be read at all.
    pub fn has_pgn(&self) -> bool {
        self.headers.is_some()
    }

    /// The side `username` played, if the PGN names them.
    pub fn player_side(&self, username: &str) -> Option<Side> {
        players::resolve_side(self.headers.as_ref()?, username)
    }

    /// Declared rating of `side`, if its Elo tag is a number.
    pub fn declared_rating(&self, side: Side) -> Option<i32> {
        players::declared_rating(self.headers.as_ref()?, side)
    }

    /// The ply and its successor, for models that compare two traces.
    pub fn pairs(&self) -> impl Iterator<Item = (&PlyView<'a>, &PlyView<'a>)> {
        self.plies.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// Replay wins, then the explicit field, then parity from the first mover.
fn resolve_mover(
    index: usize,
    replayed: Option<Side>,
    declared: Option<Side>,
    first_mover: Side,
    diagnostics: &mut Diagnostics,
) -> Side {
    if let (Some(replayed), Some(declared)) = (replayed, declared)
        && replayed != declared
    {
        diagnostics.push(
            Some(index),
            Component::Pgn,
            SkipReason::MoverMismatch { declared, replayed },
        );
    }

    replayed
        .or(declared)
        .unwrap_or_else(|| Side::from_parity(first_mover, index))
}

fn parse_ply_trace(
    index: usize,
    eval: &PlyEvaluation,
    diagnostics: &mut Diagnostics,
) -> Option<TraceBreakdown> {
    let raw = eval.static_trace.as_deref()?;
    match parse_trace(raw) {
        Ok(trace) => Some(trace),
        Err(error) => {
            diagnostics.push(
                Some(index),
                Component::Trace,
                SkipReason::TraceUnreadable { error },
            );
            None
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of `(value, weight)` pairs; `None` when there is no positive weight.
pub(crate) fn weighted_mean(samples: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = samples.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    Some(samples.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight)
}
