//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::game::SceneColors;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette mapped onto the board, the meerkats and the HUD.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Board ground.
    pub ground: Color,
    /// Grass tufts on the ground.
    pub detail: Color,
    pub meerkat: Color,
    /// Meerkat art right after a hit.
    pub meerkat_hit: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (time, score).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (key hints).
    pub inactive_fg: Color,
    /// Score shown once the target is beaten.
    pub over_target: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const ONEDARK: [(&str, Color); 8] = [
    ("meter_bg", Color::Rgb(0x31, 0x35, 0x3F)),
    ("mem_box", Color::Rgb(0x98, 0xC3, 0x79)),
    ("title", Color::Rgb(0xE5, 0xC0, 0x7B)),
    ("cpu_end", Color::Rgb(0xE0, 0x6C, 0x75)),
    ("div_line", Color::Rgb(0x3F, 0x44, 0x4F)),
    ("main_fg", Color::Rgb(0xAB, 0xB2, 0xBF)),
    ("hi_fg", Color::Rgb(0x56, 0xB6, 0xC2)),
    ("inactive_fg", Color::Rgb(0x5C, 0x63, 0x70)),
];

fn onedark(key: &str) -> Color {
    ONEDARK
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(Color::Reset, |&(_, c)| c)
}

impl Theme {
    pub fn onedark_default() -> Self {
        Self::from_map(&HashMap::new())
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or file is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override meerkat colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.ground = Color::Rgb(0, 0, 0);
                self.detail = Color::Rgb(0x00, 0x88, 0x00);
                self.meerkat = Color::Rgb(0xFF, 0xFF, 0x00);
                self.meerkat_hit = Color::Rgb(0xFF, 0x00, 0xFF);
            }
            crate::Palette::Colorblind => {
                // Orange/blue never collide under the common deficiencies.
                self.detail = Color::Rgb(0x00, 0x77, 0xBB);
                self.meerkat = Color::Rgb(0xEE, 0x77, 0x33);
                self.meerkat_hit = Color::Rgb(0x00, 0x99, 0x88);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
                .unwrap_or_else(|| onedark(key))
        };
        Self {
            ground: get("meter_bg"),
            detail: get("mem_box"),
            meerkat: get("title"),
            meerkat_hit: get("cpu_end"),
            div_line: get("div_line"),
            main_fg: get("main_fg"),
            title: get("title"),
            inactive_fg: get("inactive_fg"),
            over_target: get("hi_fg"),
        }
    }

    pub fn scene_colors(&self) -> SceneColors {
        SceneColors {
            ground: self.ground,
            detail: self.detail,
            meerkat: self.meerkat,
            meerkat_hit: self.meerkat_hit,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?),
        3 => (channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
