use crate::error::PgnError;
use pgn_reader::{Outcome, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use regex::Regex;
use smallvec::SmallVec;
use std::io;
use std::ops::ControlFlow;
use std::sync::LazyLock;

static CLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[%clk\s+([^\]]*)\]").unwrap());

/// Remaining-clock annotation attached to a move.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClockReading {
    #[default]
    Absent,
    Seconds(f64),
    Malformed,
}

impl ClockReading {
    pub fn seconds(self) -> Option<f64> {
        match self {
            Self::Seconds(s) => Some(s),
            Self::Absent | Self::Malformed => None,
        }
    }
}

/// Mainline move with the clock reading from the comment that follows it.
#[derive(Debug, Clone)]
pub struct PgnMove {
    pub san: SanPlus,
    pub clock: ClockReading,
}

pub type MoveList = SmallVec<[PgnMove; 128]>;

/// Header tags the scoring engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgnHeaders {
    pub white: Option<String>,
    pub black: Option<String>,
    pub white_elo: Option<String>,
    pub black_elo: Option<String>,
    pub result: Option<String>,
    pub termination: Option<String>,
    pub time_control: Option<String>,
    pub fen: Option<String>,
}

impl PgnHeaders {
    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot = match key {
            b"White" => &mut self.white,
            b"Black" => &mut self.black,
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            b"Result" => &mut self.result,
            b"Termination" => &mut self.termination,
            b"TimeControl" => &mut self.time_control,
            b"FEN" => &mut self.fen,
            _ => return,
        };

        if slot.is_some() {
            return;
        }

        let value = String::from_utf8_lossy(value.as_bytes());
        let value = value.trim();
        if !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgnGame {
    pub headers: PgnHeaders,
    pub moves: MoveList,
}

/// Parses a `[%clk H:MM:SS]` value (also `M:SS`, `SS`, fractional seconds).
pub fn parse_clock(raw: &str) -> Option<f64> {
    let parts = raw
        .trim()
        .split(':')
        .map(|p| p.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0))
        .collect::<Option<SmallVec<[f64; 3]>>>()?;

    match parts.as_slice() {
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        [m, s] => Some(m * 60.0 + s),
        [s] => Some(*s),
        _ => None,
    }
}

fn clock_from_comment(comment: &str) -> ClockReading {
    match CLOCK_PATTERN.captures(comment) {
        Some(caps) => match parse_clock(&caps[1]) {
            Some(seconds) => ClockReading::Seconds(seconds),
            None => ClockReading::Malformed,
        },
        None => ClockReading::Absent,
    }
}

/// Collects headers and the mainline of one game; variations are skipped.
#[derive(Default)]
struct GameVisitor {
    headers: PgnHeaders,
    outcome: Option<String>,
}

impl Visitor for GameVisitor {
    type Tags = PgnHeaders;
    type Movetext = MoveList;
    type Output = PgnGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.outcome = None;
        ControlFlow::Continue(PgnHeaders::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        self.headers = tags;
        ControlFlow::Continue(MoveList::new())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        movetext.push(PgnMove {
            san,
            clock: ClockReading::Absent,
        });
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        // Comments before the first move carry no clock for anyone.
        if let Some(last) = movetext.last_mut()
            && last.clock == ClockReading::Absent
        {
            last.clock = clock_from_comment(&String::from_utf8_lossy(comment.as_bytes()));
        }
        ControlFlow::Continue(())
    }

    fn outcome(
        &mut self,
        _movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        self.outcome = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    /// A missing `Result` tag is taken from the movetext termination marker.
    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        let mut headers = std::mem::take(&mut self.headers);
        if headers.result.is_none() {
            headers.result = self.outcome.take();
        }
        PgnGame {
            headers,
            moves: movetext,
        }
    }
}

/// Reads the first game of `pgn`.
pub fn read_pgn(pgn: &str) -> Result<PgnGame, PgnError> {
    if pgn.trim().is_empty() {
        return Err(PgnError::Empty);
    }

    let mut reader = Reader::new(io::Cursor::new(pgn.as_bytes()));
    let mut visitor = GameVisitor::default();

    reader.read_game(&mut visitor)?.ok_or(PgnError::NoGame)
}
