use serde::{Deserialize, Serialize};
use std::fmt;

/// Base time assumed when the header is missing or unusable.
pub const DEFAULT_BASE_SECONDS: f64 = 600.0;

/// Moves assumed when converting an increment into total game duration.
const ESTIMATED_MOVES: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeCategory {
    Bullet,
    Blitz,
    Rapid,
    /// Never derived from a header; available to callers that set it directly.
    Classical,
}

impl fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bullet => "bullet",
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
            Self::Classical => "classical",
        })
    }
}

impl TimeCategory {
    /// Category for an estimated game duration (base + 40 * increment).
    pub fn from_estimated_seconds(seconds: f64) -> Self {
        if seconds < 180.0 {
            Self::Bullet
        } else if seconds < 600.0 {
            Self::Blitz
        } else {
            Self::Rapid
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub moves: Option<u32>,
    pub base_seconds: u32,
    pub increment_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Unknown,
    Unlimited,
    Sandclock,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTimeControl {
    pub periods: Vec<Period>,
    pub mode: Mode,
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn parse_stage(s: &str) -> Option<Period> {
    let (base_part, inc_part) = match s.split_once('+') {
        Some((base, inc)) => (base, Some(inc)),
        None => (s, None),
    };

    let (moves, base_str) = match base_part.split_once('/') {
        Some((moves, base)) => (Some(parse_u32(moves)?), base),
        None => (None, base_part),
    };

    let base_seconds = parse_u32(base_str)?;
    let increment_seconds = match inc_part {
        Some(inc_str) => Some(parse_u32(inc_str)?),
        None => None,
    };

    Some(Period {
        moves,
        base_seconds,
        increment_seconds,
    })
}

/// Parses a PGN `TimeControl` tag (`180+2`, `40/5400+30:1800+30`, `?`, `-`, `*60`).
pub fn parse_timecontrol(raw: &str) -> Option<ParsedTimeControl> {
    let input = raw.trim().trim_matches('"').replace(" + ", "+");
    if input.is_empty() {
        return None;
    }

    match input.as_str() {
        "?" => {
            return Some(ParsedTimeControl {
                periods: Vec::new(),
                mode: Mode::Unknown,
            });
        }
        "-" => {
            return Some(ParsedTimeControl {
                periods: Vec::new(),
                mode: Mode::Unlimited,
            });
        }
        _ => {}
    }

    if let Some(secs) = input.strip_prefix('*').and_then(parse_u32) {
        return Some(ParsedTimeControl {
            periods: vec![Period {
                moves: None,
                base_seconds: secs,
                increment_seconds: None,
            }],
            mode: Mode::Sandclock,
        });
    }

    let periods = input
        .split(':')
        .map(parse_stage)
        .collect::<Option<Vec<_>>>()?;

    Some(ParsedTimeControl {
        periods,
        mode: Mode::Normal,
    })
}

/// Time budget and category of one game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeControl {
    pub base_seconds: f64,
    pub increment_seconds: f64,
    pub category: TimeCategory,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_SECONDS, 0.0)
    }
}

impl TimeControl {
    pub fn new(base_seconds: f64, increment_seconds: f64) -> Self {
        let estimated = base_seconds + ESTIMATED_MOVES * increment_seconds;
        Self {
            base_seconds,
            increment_seconds,
            category: TimeCategory::from_estimated_seconds(estimated),
        }
    }

    pub fn with_category(mut self, category: TimeCategory) -> Self {
        self.category = category;
        self
    }

    /// Uses the first stage of a parsed tag; anything unusable falls back to 600+0.
    pub fn from_header(raw: Option<&str>) -> Self {
        let Some(parsed) = raw.and_then(parse_timecontrol) else {
            return Self::default();
        };

        match (&parsed.mode, parsed.periods.first()) {
            (Mode::Normal | Mode::Sandclock, Some(period)) => Self::new(
                period.base_seconds as f64,
                period.increment_seconds.unwrap_or(0) as f64,
            ),
            _ => Self::default(),
        }
    }
}
