//! Meerkatui: Meerkat Challenge, a whack-a-mole reaction game in the terminal.

mod actor;
mod app;
mod assets;
mod behavior;
mod error;
mod game;
mod geometry;
mod highscores;
mod hit;
mod input;
mod level;
mod loops;
mod score;
mod sprite;
mod sync;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use level::Level;
use std::path::{Path, PathBuf};

/// Options derived from the CLI that shape a session.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// First level shown (built-in or custom).
    pub level: Level,
    /// Cells added around a click when testing it against a meerkat.
    pub hit_margin: u16,
    /// Fixed seed for reproducible pop-ups; random per level when None.
    pub seed: Option<u64>,
    pub frame_rate: f64,
    pub art_dir: Option<PathBuf>,
    pub bell: bool,
    pub animation: bool,
}

impl GameConfig {
    fn from_args(args: &Args) -> Self {
        let custom = args.target.is_some() || args.time_limit.is_some() || args.actors.is_some();
        let level = if custom {
            Level::custom(
                args.target.unwrap_or(DEFAULT_TARGET),
                args.time_limit.unwrap_or(DEFAULT_TIME_LIMIT),
                args.actors.unwrap_or(DEFAULT_ACTORS),
            )
        } else {
            Level::builtin(args.level)
                .or_else(|| Level::builtin(1))
                .unwrap_or_else(|| Level::custom(DEFAULT_TARGET, DEFAULT_TIME_LIMIT, DEFAULT_ACTORS))
        };
        Self {
            level,
            hit_margin: args.hit_margin,
            seed: args.seed,
            frame_rate: args.frame_rate,
            art_dir: args.art_dir.clone(),
            bell: !args.no_bell,
            animation: !args.no_animation,
        }
    }
}

/// Custom level defaults for whichever of --target/--time-limit/--actors is left out.
const DEFAULT_TARGET: u32 = 10;
const DEFAULT_TIME_LIMIT: u32 = 30;
const DEFAULT_ACTORS: u32 = 1;

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded ({e}); using One Dark");
        theme::Theme::default()
    });
    let config = GameConfig::from_args(&args);
    log::info!("starting at {}", config.level.title());
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// stderr belongs to the TUI, so logs only go to a file when asked for.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Meerkat Challenge in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "meerkatui",
    version,
    about = "Meerkat Challenge: click the meerkats before they duck back down.",
    long_about = "Meerkatui is a whack-a-mole style reaction game for the terminal.\n\n\
        Meerkats pop up at random spots on the board. Click one with the mouse while it is up \
        to score. Reach the level's target before the countdown runs out.\n\n\
        CONTROLS:\n  Mouse click   Hit a meerkat    P          Pause / resume\n  \
        Left/Right    Choose level     Enter      Start\n  R             Retry            N          Next level\n  \
        Q / Esc       Quit menu\n\n\
        Vim keys (h/l, j/k) work in menus. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Built-in level to start at.
    #[arg(short, long, default_value = "1", value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..=i64::from(Level::count())))]
    pub level: u32,

    /// Custom level: meerkats to hit. Any custom flag replaces the built-in levels.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub target: Option<u32>,

    /// Custom level: time limit in seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u32).range(1..))]
    pub time_limit: Option<u32>,

    /// Custom level: meerkats on the board at once.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=32))]
    pub actors: Option<u32>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second (also the engine tick rate).
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Extra cells around a click that still count as a hit.
    #[arg(long, default_value = "1", value_name = "CELLS")]
    pub hit_margin: u16,

    /// Seed for meerkat placement and timing (reproducible games).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Directory with meerkat.txt and meerkat_hit.txt glyph art.
    #[arg(long, value_name = "DIR")]
    pub art_dir: Option<PathBuf>,

    /// Do not ring the terminal bell on a hit.
    #[arg(long)]
    pub no_bell: bool,

    /// Disable the board fade-in.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs here (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_level_from_args() {
        let args = Args::parse_from(["meerkatui", "--level", "3", "--no-bell"]);
        let config = GameConfig::from_args(&args);
        assert_eq!(config.level, Level::builtin(3).unwrap());
        assert!(!config.bell);
        assert!(config.animation);
        assert_eq!(config.hit_margin, 1);
    }

    #[test]
    fn test_any_custom_flag_makes_a_custom_level() {
        let args = Args::parse_from(["meerkatui", "--time-limit", "5"]);
        let config = GameConfig::from_args(&args);
        assert_eq!(
            config.level,
            Level::custom(DEFAULT_TARGET, 5, DEFAULT_ACTORS)
        );
    }

    #[test]
    fn test_level_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["meerkatui", "--level", "0"]).is_err());
        assert!(Args::try_parse_from(["meerkatui", "--level", "11"]).is_err());
        assert!(Args::try_parse_from(["meerkatui", "--target", "0"]).is_err());
    }

    #[test]
    fn test_palette_aliases() {
        let args = Args::parse_from(["meerkatui", "--palette", "colourblind"]);
        assert_eq!(args.palette, Palette::Colorblind);
        let args = Args::parse_from(["meerkatui", "--palette", "contrast"]);
        assert_eq!(args.palette, Palette::HighContrast);
    }
}
