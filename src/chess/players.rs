use super::visitor::PgnHeaders;
use crate::types::{BySide, Side};

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Finds the side `username` played.
///
/// An exact case-insensitive match wins; otherwise a name containing the
/// username is accepted when only one side matches.
pub fn resolve_side(headers: &PgnHeaders, username: &str) -> Option<Side> {
    let target = normalize(username);
    if target.is_empty() {
        return None;
    }

    let names = BySide {
        white: headers.white.as_deref().map(normalize),
        black: headers.black.as_deref().map(normalize),
    };

    let exact = |side: Side| names[side].as_deref() == Some(target.as_str());
    if exact(Side::White) {
        return Some(Side::White);
    }
    if exact(Side::Black) {
        return Some(Side::Black);
    }

    let partial = |side: Side| names[side].as_deref().is_some_and(|n| n.contains(&target));
    match (partial(Side::White), partial(Side::Black)) {
        (true, false) => Some(Side::White),
        (false, true) => Some(Side::Black),
        _ => None,
    }
}

/// Rating from the side's `WhiteElo`/`BlackElo` tag, when it is a number.
pub fn declared_rating(headers: &PgnHeaders, side: Side) -> Option<i32> {
    let raw = match side {
        Side::White => headers.white_elo.as_deref(),
        Side::Black => headers.black_elo.as_deref(),
    }?;
    raw.trim().parse().ok()
}

/// Which side, if any, lost on time according to `Termination` and `Result`.
pub fn lost_on_time(headers: &PgnHeaders) -> BySide<bool> {
    let mut lost = BySide::splat(false);

    let Some(termination) = headers.termination.as_deref() else {
        return lost;
    };
    let termination = termination.to_lowercase();
    if !(termination.contains("time") || termination.contains("forfeit")) {
        return lost;
    }

    match headers.result.as_deref() {
        Some("1-0") => lost.black = true,
        Some("0-1") => lost.white = true,
        _ => {}
    }
    lost
}
