//! Stderr logger for the `log` facade, filtered by the `CHESS_LOG` variable.

use log::{LevelFilter, Log, Metadata, Record};
use std::env;

struct StderrLogger {
    level: LevelFilter,
}

fn level_from_str(s: &str) -> LevelFilter {
    match s.trim().to_lowercase().as_str() {
        "off" | "none" => LevelFilter::Off,
        "error" | "err" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Error,
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the logger. Calling it twice keeps the first installation.
pub fn init() {
    let level = env::var("CHESS_LOG")
        .map(|s| level_from_str(&s))
        .unwrap_or(LevelFilter::Error);

    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}
