//! PGN reading, move replay and header interpretation.

pub mod phase;
pub mod players;
pub mod timecontrol;
pub mod visitor;

pub use phase::{Phase, ReplayedGame, ReplayedPly, elapsed_times, replay};
pub use players::{declared_rating, lost_on_time, resolve_side};
pub use timecontrol::{TimeCategory, TimeControl};
pub use visitor::{ClockReading, PgnGame, PgnHeaders, read_pgn};
