use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Side to move for a ply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Mover of ply `index` when `first` made the first move of the record.
    pub fn from_parity(first: Side, index: usize) -> Self {
        if index.is_multiple_of(2) {
            first
        } else {
            first.opponent()
        }
    }

    /// Converts a white-relative win percentage into this side's perspective.
    pub fn perspective(self, white_win_percent: f64) -> f64 {
        match self {
            Self::White => white_win_percent,
            Self::Black => 100.0 - white_win_percent,
        }
    }
}

impl From<shakmaty::Color> for Side {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Self::White,
            shakmaty::Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// A pair of values, one per side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BySide<T> {
    pub white: T,
    pub black: T,
}

impl<T: Clone> BySide<T> {
    pub fn splat(value: T) -> Self {
        Self {
            white: value.clone(),
            black: value,
        }
    }
}

impl<T> BySide<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BySide<U> {
        BySide {
            white: f(self.white),
            black: f(self.black),
        }
    }
}

impl<T> Index<Side> for BySide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

impl<T> IndexMut<Side> for BySide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

/// Engine evaluation: white-relative centipawns or a mate marker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "Option<RawScore>")]
pub enum Score {
    Centipawns(f64),
    /// `winning` is true when the mate favours white.
    Mate {
        winning: bool,
    },
    #[default]
    Unknown,
}

impl Score {
    /// Parses the textual encodings seen in analysis payloads:
    /// `"M3"`, `"-M2"`, `"#5"`, `"-#1"` or a plain number.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.contains('M') || s.contains('#') {
            return Self::Mate {
                winning: !s.contains('-'),
            };
        }
        match s.parse::<f64>() {
            Ok(cp) if cp.is_finite() => Self::Centipawns(cp),
            _ => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<f64> for Score {
    fn from(cp: f64) -> Self {
        if cp.is_finite() {
            Self::Centipawns(cp)
        } else {
            Self::Unknown
        }
    }
}

impl From<i32> for Score {
    fn from(cp: i32) -> Self {
        Self::Centipawns(cp as f64)
    }
}

impl From<&str> for Score {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

impl From<Option<RawScore>> for Score {
    fn from(raw: Option<RawScore>) -> Self {
        match raw {
            Some(RawScore::Number(cp)) => cp.into(),
            Some(RawScore::Text(s)) => Self::parse(&s),
            None => Self::Unknown,
        }
    }
}

/// One ranked engine suggestion; index 0 of `top_lines` is the best.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct EngineLine {
    #[serde(default)]
    pub score: Score,
}

impl EngineLine {
    pub fn new(score: impl Into<Score>) -> Self {
        Self {
            score: score.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PlyEvaluation {
    #[serde(default)]
    pub played_eval: Score,
    #[serde(default)]
    pub top_lines: Vec<EngineLine>,
    #[serde(default)]
    pub static_trace: Option<String>,
    /// Explicit mover, when the producer of the analysis recorded it.
    #[serde(default)]
    pub mover: Option<Side>,
}

/// A finished game as submitted for scoring.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GameRecord {
    pub username: String,
    pub pgn: String,
    #[serde(default)]
    pub analysis: Vec<PlyEvaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "OPN")]
    Opening,
    #[serde(rename = "MID")]
    Middlegame,
    #[serde(rename = "END")]
    Endgame,
    #[serde(rename = "ACC")]
    Accuracy,
    #[serde(rename = "TAC")]
    Tactics,
    #[serde(rename = "STR")]
    Strategy,
    #[serde(rename = "ATK")]
    Attack,
    #[serde(rename = "DEF")]
    Defense,
    #[serde(rename = "RES")]
    Resilience,
    #[serde(rename = "CAL")]
    Calculation,
    #[serde(rename = "INT")]
    Intuition,
    #[serde(rename = "TMG")]
    TimeManagement,
}

impl Metric {
    pub const COUNT: usize = 12;

    pub const ALL: [Metric; Self::COUNT] = [
        Self::Opening,
        Self::Middlegame,
        Self::Endgame,
        Self::Accuracy,
        Self::Tactics,
        Self::Strategy,
        Self::Attack,
        Self::Defense,
        Self::Resilience,
        Self::Calculation,
        Self::Intuition,
        Self::TimeManagement,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Opening => "OPN",
            Self::Middlegame => "MID",
            Self::Endgame => "END",
            Self::Accuracy => "ACC",
            Self::Tactics => "TAC",
            Self::Strategy => "STR",
            Self::Attack => "ATK",
            Self::Defense => "DEF",
            Self::Resilience => "RES",
            Self::Calculation => "CAL",
            Self::Intuition => "INT",
            Self::TimeManagement => "TMG",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Twelve 0-100 scores; `None` means "insufficient data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Metric, Option<u8>>",
    into = "BTreeMap<Metric, Option<u8>>"
)]
pub struct MetricVector([Option<u8>; Metric::COUNT]);

impl MetricVector {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<u8> {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: Option<u8>) {
        self.0[metric.index()] = value.map(|v| v.min(100));
    }

    pub fn with(mut self, metric: Metric, value: Option<u8>) -> Self {
        self.set(metric, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Option<u8>)> + '_ {
        Metric::ALL.iter().map(|&m| (m, self.get(m)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl From<BTreeMap<Metric, Option<u8>>> for MetricVector {
    fn from(map: BTreeMap<Metric, Option<u8>>) -> Self {
        let mut vector = Self::default();
        for (metric, value) in map {
            vector.set(metric, value);
        }
        vector
    }
}

impl From<MetricVector> for BTreeMap<Metric, Option<u8>> {
    fn from(vector: MetricVector) -> Self {
        vector.iter().collect()
    }
}

/// Truncates a raw score into the 0-100 integer range.
pub(crate) fn to_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}
