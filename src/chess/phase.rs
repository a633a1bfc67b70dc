use super::timecontrol::TimeControl;
use super::visitor::{ClockReading, PgnHeaders, read_pgn};
use crate::config::PhaseConfig;
use crate::error::PgnError;
use crate::types::{BySide, Side};
use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::{Board, CastlingMode, Chess, Position};

/// Smallest elapsed time recorded for a move, in seconds.
pub const MIN_ELAPSED_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

/// A mainline move as seen from the position it was played in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayedPly {
    pub mover: Side,
    pub phase: Phase,
    pub clock: ClockReading,
}

#[derive(Debug, Clone)]
pub struct ReplayedGame {
    pub headers: PgnHeaders,
    pub first_mover: Side,
    /// Legal prefix of the mainline.
    pub plies: Vec<ReplayedPly>,
    /// SAN of the first move that could not be played, if replay stopped early.
    pub illegal: Option<String>,
}

/// Queens 9, rooks 5, bishops and knights 3, summed over both sides.
pub fn material_score(board: &Board) -> u32 {
    board.queens().count() as u32 * 9
        + board.rooks().count() as u32 * 5
        + board.bishops().count() as u32 * 3
        + board.knights().count() as u32 * 3
}

/// Endgame takes precedence over the opening move limit.
pub fn phase_of(pos: &Chess, config: &PhaseConfig) -> Phase {
    if material_score(pos.board()) <= config.endgame_material {
        Phase::Endgame
    } else if pos.fullmoves().get() <= config.opening_move_limit {
        Phase::Opening
    } else {
        Phase::Middlegame
    }
}

fn starting_position(headers: &PgnHeaders) -> Result<Chess, PgnError> {
    let Some(fen) = headers.fen.as_deref() else {
        return Ok(Chess::default());
    };

    let setup_error = |message: String| PgnError::Setup {
        fen: fen.to_string(),
        message,
    };

    let parsed: Fen = fen.parse().map_err(|e| setup_error(format!("{e}")))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| setup_error(format!("{e}")))
}

/// Replays the mainline, labelling each move with its mover and phase.
///
/// Labels are taken before the move is played. Replay stops at the first
/// illegal move; the plies before it keep their labels.
pub fn replay(pgn: &str, config: &PhaseConfig) -> Result<ReplayedGame, PgnError> {
    let game = read_pgn(pgn)?;
    let mut pos = starting_position(&game.headers)?;
    let first_mover = Side::from(pos.turn());

    let mut plies = Vec::with_capacity(game.moves.len());
    let mut illegal = None;

    for pgn_move in &game.moves {
        let Ok(m) = pgn_move.san.san.to_move(&pos) else {
            illegal = Some(pgn_move.san.to_string());
            break;
        };

        plies.push(ReplayedPly {
            mover: Side::from(pos.turn()),
            phase: phase_of(&pos, config),
            clock: pgn_move.clock,
        });
        pos.play_unchecked(m);
    }

    Ok(ReplayedGame {
        headers: game.headers,
        first_mover,
        plies,
        illegal,
    })
}

/// Seconds spent on each ply, reconstructed from remaining-clock readings.
///
/// Every side starts on the base time. A move without a usable reading
/// spends no time and leaves its side's clock unchanged: it is recorded as
/// the 0.1 s minimum and the increment is not credited.
pub fn elapsed_times(plies: &[ReplayedPly], time_control: &TimeControl) -> Vec<f64> {
    let mut clocks = BySide::splat(time_control.base_seconds);

    plies
        .iter()
        .map(|ply| match ply.clock.seconds() {
            Some(remaining) => {
                let previous = clocks[ply.mover];
                clocks[ply.mover] = remaining;
                (previous - remaining + time_control.increment_seconds).max(MIN_ELAPSED_SECONDS)
            }
            None => MIN_ELAPSED_SECONDS,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUY_LOPEZ: &str = "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 \
        6. Re1 b5 7. Bb3 d6 8. c3 O-O 9. h3 Nb8 10. d4 Nbd7 *";

    #[test]
    fn test_replay_labels_mover_and_opening() {
        let game = replay(RUY_LOPEZ, &PhaseConfig::default()).unwrap();

        assert_eq!(game.plies.len(), 20);
        assert_eq!(game.first_mover, Side::White);
        assert!(game.illegal.is_none());
        assert_eq!(game.plies[0].mover, Side::White);
        assert_eq!(game.plies[1].mover, Side::Black);
        assert!(game.plies.iter().all(|p| p.phase == Phase::Opening));
    }

    #[test]
    fn test_opening_limit_is_configurable() {
        let config = PhaseConfig {
            opening_move_limit: 4,
            ..PhaseConfig::default()
        };
        let game = replay(RUY_LOPEZ, &config).unwrap();

        // Ply 7 is black's fourth move, ply 8 white's fifth.
        assert_eq!(game.plies[7].phase, Phase::Opening);
        assert_eq!(game.plies[8].phase, Phase::Middlegame);
    }

    #[test]
    fn test_illegal_move_stops_replay() {
        let game = replay("1. e4 e5 2. Ke3 Nc6 *", &PhaseConfig::default()).unwrap();

        assert_eq!(game.plies.len(), 2);
        assert_eq!(game.illegal.as_deref(), Some("Ke3"));
    }

    #[test]
    fn test_fen_setup_sets_first_mover_and_endgame() {
        let pgn = r#"[FEN "4k3/8/8/8/8/8/4P3/R3K3 b - - 0 40"]
[SetUp "1"]

40... Kd7 41. Ra7+ Kc6 *"#;
        let game = replay(pgn, &PhaseConfig::default()).unwrap();

        assert_eq!(game.first_mover, Side::Black);
        assert_eq!(game.plies.len(), 3);
        assert_eq!(game.plies[0].mover, Side::Black);
        assert_eq!(game.plies[1].mover, Side::White);
        assert!(game.plies.iter().all(|p| p.phase == Phase::Endgame));
    }

    #[test]
    fn test_bad_fen_is_setup_error() {
        let pgn = "[FEN \"not a fen\"]\n\n1. e4 *";
        assert!(matches!(
            replay(pgn, &PhaseConfig::default()),
            Err(PgnError::Setup { .. })
        ));
    }

    #[test]
    fn test_material_score_of_start_position() {
        // 2 * (9 + 2 * 5 + 2 * 3 + 2 * 3)
        assert_eq!(material_score(Chess::default().board()), 62);
    }

    #[test]
    fn test_elapsed_times_from_clocks() {
        let pgn = "1. e4 { [%clk 0:03:00] } e5 { [%clk 0:02:58] } \
            2. Nf3 { [%clk 0:02:55] } Nc6 { [%clk 0:02:50] } *";
        let game = replay(pgn, &PhaseConfig::default()).unwrap();
        let tc = TimeControl::new(180.0, 2.0);

        let elapsed = elapsed_times(&game.plies, &tc);

        assert_eq!(elapsed, vec![2.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn test_missing_clock_spends_nothing_and_holds_clock() {
        let pgn = "1. e4 { [%clk 0:01:50] } e5 2. Nf3 { [%clk 0:01:40] } Nc6 *";
        let game = replay(pgn, &PhaseConfig::default()).unwrap();
        let tc = TimeControl::new(120.0, 0.0);

        let elapsed = elapsed_times(&game.plies, &tc);

        assert_eq!(elapsed, vec![10.0, 0.1, 10.0, 0.1]);
    }

    #[test]
    fn test_missing_clock_ignores_increment() {
        let game = replay("1. e4 e5 2. Nf3 { [%clk 0:02:57] } *", &PhaseConfig::default()).unwrap();
        let tc = TimeControl::new(180.0, 5.0);

        let elapsed = elapsed_times(&game.plies, &tc);

        // White's clock was held at 180 through the unannotated first move.
        assert_eq!(elapsed, vec![0.1, 0.1, 8.0]);
    }

    #[test]
    fn test_elapsed_time_has_a_floor() {
        // Clock went up by more than the increment.
        let pgn = "1. e4 { [%clk 0:01:05] } *";
        let game = replay(pgn, &PhaseConfig::default()).unwrap();

        let elapsed = elapsed_times(&game.plies, &TimeControl::new(60.0, 0.0));
        assert_eq!(elapsed, vec![MIN_ELAPSED_SECONDS]);
    }
}
