//! Persist best scores per level to disk (XDG config or ~/.config/meerkatui).

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// Level number → best score.
pub type BestScores = BTreeMap<u32, u32>;

/// Returns the path to the high scores file (config dir / meerkatui / highscores).
fn config_path() -> PathBuf {
    let home_config = || {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config")
    };
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_config(),
    };
    base.join("meerkatui").join(FILENAME)
}

/// One `level score` pair per line; anything unparsable is skipped.
fn parse(content: &str) -> BestScores {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let level = parts.next()?.parse().ok()?;
            let score = parts.next()?.parse().ok()?;
            Some((level, score))
        })
        .collect()
}

/// Load best scores from disk. Empty on missing/unreadable file.
pub fn load_best_scores() -> BestScores {
    let path = config_path();
    match fs::read_to_string(&path) {
        Ok(content) => parse(&content),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("ignoring best scores at {}: {e}", path.display());
            }
            BestScores::new()
        }
    }
}

/// Save best scores to disk. Creates config directory if needed.
pub fn save_best_scores(scores: &BestScores) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    for (level, score) in scores {
        writeln!(f, "{} {}", level, score)?;
    }
    Ok(())
}

/// Record `score` for `level`; true if it beat the previous best.
pub fn record(scores: &mut BestScores, level: u32, score: u32) -> bool {
    if score > scores.get(&level).copied().unwrap_or(0) {
        scores.insert(level, score);
        true
    } else {
        false
    }
}
