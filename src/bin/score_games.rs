use anyhow::{Context, Result, bail};
use chess_skill_vector::{
    Engine, EngineConfig, GameRecord, GameReport, MetricVector, ProfileSummary, SessionStore,
};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Compression {
    Zstd,
}

/// Scores engine-annotated games and prints per-game and per-player JSON lines.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input files or glob patterns (a JSON object, a JSON array or JSON lines)
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Decompress every input; `.zst` files are decompressed regardless
    #[arg(long, value_enum)]
    compression: Option<Compression>,

    /// Rating used for calibration instead of the PGN Elo tags
    #[arg(long)]
    rating: Option<i32>,

    /// JSON file overriding the default engine tables
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutputLine<'a> {
    Game(&'a GameReport),
    Profile {
        player: &'a str,
        games: usize,
        metrics: &'a MetricVector,
        overall: Option<u8>,
    },
}

impl<'a> OutputLine<'a> {
    fn profile(player: &'a str, summary: &'a ProfileSummary) -> Self {
        Self::Profile {
            player,
            games: summary.games,
            metrics: &summary.metrics,
            overall: summary.overall,
        }
    }
}

fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') {
            let matches = glob::glob(pattern)
                .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
            let before = paths.len();
            paths.extend(matches.filter_map(|entry| entry.ok()));
            if paths.len() == before {
                log::warn!("pattern '{pattern}' matched no files");
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn open_input(path: &Path, compression: Option<Compression>) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let zstd = compression == Some(Compression::Zstd)
        || path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zst"));

    if zstd {
        let decoder = ZstdDecoder::new(file).with_context(|| {
            format!("failed to initialize zstd decoder for '{}'", path.display())
        })?;
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

/// A JSON array of records, or one or more whitespace-separated records.
fn parse_records(text: &str) -> Result<Vec<GameRecord>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("invalid JSON array of games");
    }
    serde_json::Deserializer::from_str(text)
        .into_iter::<GameRecord>()
        .enumerate()
        .map(|(i, record)| record.with_context(|| format!("invalid game record #{}", i + 1)))
        .collect()
}

fn load_file(path: &Path, compression: Option<Compression>) -> Result<Vec<GameRecord>> {
    let mut text = String::new();
    open_input(path, compression)?
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    parse_records(&text).with_context(|| format!("in '{}'", path.display()))
}

/// Loads every input. A bad file is fatal only when it is the sole input.
fn load_all(paths: &[PathBuf], compression: Option<Compression>) -> Result<Vec<GameRecord>> {
    if paths.is_empty() {
        bail!("no input files");
    }
    if let [only] = paths {
        return load_file(only, compression);
    }

    let mut records = Vec::new();
    for path in paths {
        match load_file(path, compression) {
            Ok(loaded) => records.extend(loaded),
            Err(e) => log::warn!("skipping input: {e:#}"),
        }
    }
    Ok(records)
}

fn main() -> Result<()> {
    chess_skill_vector::log::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };
    let store = SessionStore::new(config.aggregation.clone());
    let engine = Engine::new(config);

    let paths = expand_inputs(&args.inputs)?;
    let records = load_all(&paths, args.compression)?;
    log::info!("scoring {} games from {} files", records.len(), paths.len());

    let reports: Vec<GameReport> = records
        .par_iter()
        .map(|record| {
            let rating = args.rating.unwrap_or_else(|| engine.declared_rating(record));
            engine.analyze(record, rating)
        })
        .collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for report in &reports {
        store.record(&report.username, report.calibrated);
        serde_json::to_writer(&mut out, &OutputLine::Game(report))?;
        writeln!(out)?;
    }

    for player in store.players() {
        let Some(summary) = store.profile(&player) else {
            continue;
        };
        serde_json::to_writer(&mut out, &OutputLine::profile(&player, &summary))?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const RECORD: &str = r#"{"username": "alice", "pgn": "[White \"alice\"]\n[Black \"bob\"]\n\n1. e4 e5 *", "analysis": [{"played_eval": 20, "top_lines": [{"score": 20}]}, {"played_eval": "M3", "top_lines": [{"score": "M3"}]}]}"#;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_single_object() {
        let records = parse_records(RECORD).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].username, "alice");
        assert_eq!(records[0].analysis.len(), 2);
    }

    #[test]
    fn test_parse_array_and_json_lines() {
        let array = format!("[{RECORD}, {RECORD}]");
        assert_eq!(parse_records(&array).unwrap().len(), 2);

        let lines = format!("{RECORD}\n{RECORD}\n{RECORD}\n");
        assert_eq!(parse_records(&lines).unwrap().len(), 3);

        assert!(parse_records("{\"pgn\": 3}").is_err());
    }

    #[test]
    fn test_zstd_input_by_extension_and_flag() {
        let dir = TempDir::new().unwrap();
        let compressed = zstd::encode_all(RECORD.as_bytes(), 0).unwrap();
        let by_extension = write(&dir, "games.json.zst", &compressed);
        let by_flag = write(&dir, "games.bin", &compressed);

        assert_eq!(load_file(&by_extension, None).unwrap().len(), 1);
        assert_eq!(load_file(&by_flag, Some(Compression::Zstd)).unwrap().len(), 1);
        assert!(load_file(&by_flag, None).is_err());
    }

    #[test]
    fn test_glob_expansion() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", RECORD.as_bytes());
        write(&dir, "b.json", RECORD.as_bytes());
        write(&dir, "notes.txt", b"not json");

        let pattern = format!("{}/*.json", dir.path().display());
        let paths = expand_inputs(&[pattern]).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.extension().unwrap() == "json"));
    }

    #[test]
    fn test_bad_file_fatal_only_when_alone() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.json", RECORD.as_bytes());
        let bad = write(&dir, "bad.json", b"{ nope");

        assert!(load_all(std::slice::from_ref(&bad), None).is_err());
        assert_eq!(load_all(&[good, bad], None).unwrap().len(), 1);
        assert!(load_all(&[], None).is_err());
    }

    #[test]
    fn test_profile_line_shape() {
        let store = SessionStore::default();
        let engine = Engine::default();
        let record = &parse_records(RECORD).unwrap()[0];
        let report = engine.analyze(record, 1200);
        let summary = store.record(&report.username, report.calibrated);

        let line = serde_json::to_value(OutputLine::profile("alice", &summary)).unwrap();

        assert_eq!(line["type"], "profile");
        assert_eq!(line["player"], "alice");
        assert_eq!(line["games"], 1);
        assert!(line["metrics"].is_object());
    }
}
