//! Centipawn / mate score to win-likelihood transform.
//!
//! Every metric model speaks in win percentages rather than raw centipawns.
//! The transform is a logistic curve with a fixed gamma; callers choose the
//! centipawn clamp that suits their metric family.

use crate::types::Score;

pub const WIN_GAMMA: f64 = 0.00368208;

/// Clamp used by the accuracy model, wide enough to register deep deficits.
pub const ACCURACY_CLAMP_CP: f64 = 10_000.0;

/// Clamp used by the positional and psych models.
pub const POSITIONAL_CLAMP_CP: f64 = 1_000.0;

pub const EVEN_CHANCES: f64 = 50.0;

/// White-relative win percentage in [0, 100].
///
/// Mate markers map straight to the boundary; unknown scores are even chances.
pub fn to_win_percent(score: Score, clamp_cp: f64) -> f64 {
    match score {
        Score::Centipawns(cp) => cp_to_win_percent(cp, clamp_cp),
        Score::Mate { winning: true } => 100.0,
        Score::Mate { winning: false } => 0.0,
        Score::Unknown => EVEN_CHANCES,
    }
}

pub fn cp_to_win_percent(cp: f64, clamp_cp: f64) -> f64 {
    if cp.is_nan() {
        return EVEN_CHANCES;
    }
    let cp = cp.clamp(-clamp_cp, clamp_cp);
    100.0 / (1.0 + (-WIN_GAMMA * cp).exp())
}
