use crate::types::Side;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgnError {
    #[error("empty PGN")]
    Empty,

    #[error("no game found in PGN")]
    NoGame,

    #[error("unreadable FEN setup '{fen}': {message}")]
    Setup { fen: String, message: String },

    #[error("IO error while reading PGN: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TraceError {
    #[error("empty trace")]
    Empty,

    #[error("no evaluation row or final evaluation line recognized")]
    Unrecognized,

    #[error("malformed final evaluation '{0}'")]
    FinalEvaluation(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Part of the scoring pipeline a skip was recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Player,
    Pgn,
    Trace,
    Accuracy,
    Temporal,
    Tactics,
    Strategy,
    AttackDefense,
    Resilience,
}

/// Why a ply (or a whole component) contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    PlayerNotFound { username: String },
    PgnUnreadable { message: String },
    IllegalMove { san: String },
    ClockAnnotation,
    TraceMissing,
    TraceUnreadable { error: TraceError },
    NoTopLines,
    NoRunnerUp,
    NoPhaseLabel,
    MoverMismatch { declared: Side, replayed: Side },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerNotFound { username } => write!(f, "player '{username}' not in PGN"),
            Self::PgnUnreadable { message } => write!(f, "PGN unreadable: {message}"),
            Self::IllegalMove { san } => write!(f, "illegal move '{san}', replay stopped"),
            Self::ClockAnnotation => f.write_str("malformed clock annotation"),
            Self::TraceMissing => f.write_str("no static trace"),
            Self::TraceUnreadable { error } => write!(f, "trace unreadable: {error}"),
            Self::NoTopLines => f.write_str("no engine lines"),
            Self::NoRunnerUp => f.write_str("fewer than two engine lines"),
            Self::NoPhaseLabel => f.write_str("no phase label"),
            Self::MoverMismatch { declared, replayed } => {
                write!(f, "declared mover {declared} but PGN replay says {replayed}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skip {
    /// Index into `analysis`; `None` for game-wide skips.
    pub ply: Option<usize>,
    pub component: Component,
    pub reason: SkipReason,
}

/// Collects every local failure of one scoring call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Skip>);

impl Diagnostics {
    pub fn push(&mut self, ply: Option<usize>, component: Component, reason: SkipReason) {
        log::debug!(
            "skip: component={component:?} ply={} reason={reason}",
            ply.map_or_else(|| "-".to_string(), |p| p.to_string())
        );
        self.0.push(Skip {
            ply,
            component,
            reason,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skip> {
        self.0.iter()
    }

    /// True when `ply` was skipped by `component`.
    pub fn skipped(&self, ply: usize, component: Component) -> bool {
        self.0
            .iter()
            .any(|s| s.ply == Some(ply) && s.component == component)
    }
}
