//! Parser for the engine's static evaluation trace.
//!
//! The trace is a fixed-width table, one row per evaluation term:
//!
//! ```text
//!      Term    |    White    |    Black    |    Total
//!              |   MG    EG  |   MG    EG  |   MG    EG
//!  ------------+-------------+-------------+------------
//!     Material |   ----  ----|   ----  ----|   0.00  0.00
//!  King safety |   0.71 -0.07|   0.28 -0.07|   0.43  0.00
//!      Threats |   0.46  0.51|   0.12  0.14|   0.34  0.37
//!
//! Final evaluation: +0.23 (white side)
//! ```
//!
//! Placeholders such as `----` mean the value is absent.

use crate::error::TraceError;
use crate::types::Side;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<term>[A-Za-z][A-Za-z ]*?)\s*\|\s*",
        r"(?P<w_mg>[-+\d.]+)\s+(?P<w_eg>[-+\d.]+)\s*\|\s*",
        r"(?P<b_mg>[-+\d.]+)\s+(?P<b_eg>[-+\d.]+)\s*\|\s*",
        r"(?P<t_mg>[-+\d.]+)\s+(?P<t_eg>[-+\d.]+)",
    ))
    .expect("trace row pattern is valid")
});

static FINAL_EVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Final evaluation:\s*(?P<value>[-+\d.]+)")
        .expect("final evaluation pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TermValue {
    pub mg: Option<f64>,
    pub eg: Option<f64>,
}

impl TermValue {
    fn from_pair(mg: Option<f64>, eg: Option<f64>) -> Option<Self> {
        (mg.is_some() || eg.is_some()).then_some(Self { mg, eg })
    }
}

pub type TermMap = BTreeMap<String, TermValue>;

/// Column of the trace table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    White,
    Black,
    Total,
}

impl From<Side> for Column {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Self::White,
            Side::Black => Self::Black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TraceBreakdown {
    pub white: TermMap,
    pub black: TermMap,
    pub total: TermMap,
    pub final_evaluation: Option<f64>,
}

impl TraceBreakdown {
    pub fn column(&self, column: Column) -> &TermMap {
        match column {
            Column::White => &self.white,
            Column::Black => &self.black,
            Column::Total => &self.total,
        }
    }

    pub fn term(&self, column: impl Into<Column>, term: &str) -> Option<&TermValue> {
        self.column(column.into()).get(term)
    }

    /// Middlegame value of `term`, 0 when the term or its mg value is absent.
    pub fn mg(&self, column: impl Into<Column>, term: &str) -> f64 {
        self.term(column, term).and_then(|t| t.mg).unwrap_or(0.0)
    }
}

/// Lower-cases a term label and joins its words with underscores.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_trace(trace: &str) -> Result<TraceBreakdown, TraceError> {
    if trace.trim().is_empty() {
        return Err(TraceError::Empty);
    }

    let mut breakdown = TraceBreakdown::default();
    let mut recognized = false;

    for line in trace.lines() {
        if let Some(caps) = FINAL_EVAL_PATTERN.captures(line) {
            let raw = &caps["value"];
            let value =
                parse_value(raw).ok_or_else(|| TraceError::FinalEvaluation(raw.to_string()))?;
            breakdown.final_evaluation = Some(value);
            recognized = true;
            continue;
        }

        let Some(caps) = ROW_PATTERN.captures(line) else {
            continue;
        };
        recognized = true;

        let term = normalize_term(&caps["term"]);
        let cell = |name: &str| parse_value(&caps[name]);

        if let Some(value) = TermValue::from_pair(cell("w_mg"), cell("w_eg")) {
            breakdown.white.insert(term.clone(), value);
        }
        if let Some(value) = TermValue::from_pair(cell("b_mg"), cell("b_eg")) {
            breakdown.black.insert(term.clone(), value);
        }
        if let Some(value) = TermValue::from_pair(cell("t_mg"), cell("t_eg")) {
            breakdown.total.insert(term, value);
        }
    }

    if recognized {
        Ok(breakdown)
    } else {
        Err(TraceError::Unrecognized)
    }
}
