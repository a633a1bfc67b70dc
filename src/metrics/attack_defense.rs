//! Attack and defense, scored on how threats and king safety move across a ply.

use super::{GameContext, weighted_mean};
use crate::error::{Component, Diagnostics, SkipReason};
use crate::trace::TraceBreakdown;
use crate::types::{BySide, Side, to_score};
use crate::winprob::POSITIONAL_CLAMP_CP;
use serde::Serialize;

/// Threat level above which a side counts as attacking.
pub const THREAT_TRIGGER: f64 = 0.8;
const HEAVY_THREAT: f64 = 2.0;
const KING_DAMAGE: f64 = 0.2;
const CASH_OUT_MAX_LOSS: f64 = 3.0;
const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttackDefenseScores {
    pub attack: Option<u8>,
    pub defense: Option<u8>,
}

/// Threat and king-safety terms for both sides, before and after a move.
#[derive(Debug, Clone, Copy)]
struct Terms {
    my_threats: (f64, f64),
    opp_threats: (f64, f64),
    my_king: (f64, f64),
    opp_king: (f64, f64),
}

impl Terms {
    fn read(mover: Side, before: &TraceBreakdown, after: &TraceBreakdown) -> Self {
        let pair = |side: Side, term: &str| (before.mg(side, term), after.mg(side, term));
        let opp = mover.opponent();
        Self {
            my_threats: pair(mover, "threats"),
            opp_threats: pair(opp, "threats"),
            my_king: pair(mover, "king_safety"),
            opp_king: pair(opp, "king_safety"),
        }
    }
}

/// `(score, weight)` of an attacking ply.
fn attack_sample(terms: &Terms, loss: f64) -> (f64, f64) {
    let (now, next) = terms.my_threats;
    let mut weight = 1.0;

    let mut score = if next >= now {
        if now > HEAVY_THREAT {
            weight = 2.0;
        }
        100.0
    } else if loss < CASH_OUT_MAX_LOSS {
        95.0
    } else {
        let retention = next / now.max(0.1);
        60.0 + 30.0 * retention
    };

    let (opp_king_now, opp_king_next) = terms.opp_king;
    if opp_king_now - opp_king_next > KING_DAMAGE {
        score = 100.0;
        weight = 2.0;
    }

    ((score * (-0.04 * loss).exp()).clamp(0.0, 100.0), weight)
}

/// `(score, weight)` of a defending ply.
fn defense_sample(terms: &Terms, loss: f64) -> (f64, f64) {
    let (now, next) = terms.opp_threats;
    let weight = 1.0 + now * 0.5;
    let change = next - now;

    let mut score = if change < -0.1 {
        100.0
    } else if change < 0.2 {
        if now > HEAVY_THREAT { 100.0 } else { 90.0 }
    } else {
        (80.0 - change * 40.0).max(0.0)
    };

    let (my_king_now, my_king_next) = terms.my_king;
    if my_king_next > my_king_now {
        score = 100.0;
    }

    ((score * (-0.08 * loss).exp()).clamp(0.0, 100.0), weight)
}

#[derive(Debug, Default)]
struct SideStats {
    attack: Vec<(f64, f64)>,
    defense: Vec<(f64, f64)>,
}

fn finish(samples: &[(f64, f64)]) -> Option<u8> {
    Some(to_score(weighted_mean(samples).unwrap_or(NEUTRAL_SCORE)))
}

pub fn score(ctx: &GameContext<'_>, diagnostics: &mut Diagnostics) -> BySide<AttackDefenseScores> {
    let mut stats: BySide<SideStats> = BySide::default();

    for (curr, next) in ctx.pairs() {
        let (Some(before), Some(after)) = (&curr.trace, &next.trace) else {
            let reason = SkipReason::TraceMissing;
            diagnostics.push(Some(curr.index), Component::AttackDefense, reason);
            continue;
        };
        let Some(loss) = curr.loss(POSITIONAL_CLAMP_CP) else {
            let reason = SkipReason::NoTopLines;
            diagnostics.push(Some(curr.index), Component::AttackDefense, reason);
            continue;
        };

        let terms = Terms::read(curr.mover, before, after);
        let s = &mut stats[curr.mover];

        if terms.my_threats.0 > THREAT_TRIGGER {
            s.attack.push(attack_sample(&terms, loss));
        }
        if terms.opp_threats.0 > THREAT_TRIGGER {
            s.defense.push(defense_sample(&terms, loss));
        }
    }

    stats.map(|s| AttackDefenseScores {
        attack: finish(&s.attack),
        defense: finish(&s.defense),
    })
}
