//! Visual and audio providers supplied by the host.

use crate::error::EngineError;
use crate::sprite::Image;
use ratatui::style::Color;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const MEERKAT: &str = "meerkat";
pub const MEERKAT_HIT: &str = "meerkat_hit";

const MEERKAT_ART: &str = r"
 .-.-.
( o o )
 ) v (
(_____)
";

const MEERKAT_HIT_ART: &str = r"
 .-.-.
( x x )
 ) o (
(_____)
";

/// Supplies glyph art by name. Failing to load is fatal to assembling a level.
pub trait VisualSource {
    fn load(&self, name: &str, color: Color) -> Result<Image, EngineError>;
}

/// Art compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinArt;

impl VisualSource for BuiltinArt {
    fn load(&self, name: &str, color: Color) -> Result<Image, EngineError> {
        let text = match name {
            MEERKAT => MEERKAT_ART,
            MEERKAT_HIT => MEERKAT_HIT_ART,
            _ => return Err(EngineError::unavailable(name, "no built-in art")),
        };
        Ok(Image::from_text(text, color))
    }
}

/// Art read from `<dir>/<name>.txt`.
#[derive(Debug, Clone)]
pub struct ArtDir(pub PathBuf);

impl VisualSource for ArtDir {
    fn load(&self, name: &str, color: Color) -> Result<Image, EngineError> {
        let path = self.0.join(format!("{name}.txt"));
        let text = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::unavailable(name, format!("{}: {e}", path.display())))?;
        let image = Image::from_text(&text, color);
        if image.is_empty() {
            return Err(EngineError::unavailable(
                name,
                format!("{} is empty", path.display()),
            ));
        }
        Ok(image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Hit,
}

/// Fire-and-forget sound. Implementations swallow their own failures.
pub trait AudioCue: Send + Sync {
    fn play(&self, cue: Cue);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl AudioCue for Silent {
    fn play(&self, _cue: Cue) {}
}

/// Terminal bell. Cues arrive on the input thread; the host rings them between frames
/// so the BEL byte never lands inside a frame's escape sequences.
#[derive(Debug, Default)]
pub struct TerminalBell {
    pending: AtomicUsize,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring whatever was queued since the last call. Write errors are ignored.
    pub fn ring_pending(&self, out: &mut impl Write) {
        let n = self.pending.swap(0, Ordering::AcqRel);
        if n == 0 {
            return;
        }
        // One bell per frame is all a terminal can make audible.
        let _ = out.write_all(b"\x07").and_then(|()| out.flush());
    }
}

impl AudioCue for TerminalBell {
    fn play(&self, cue: Cue) {
        match cue {
            Cue::Hit => {
                self.pending.fetch_add(1, Ordering::AcqRel);
            }
        }
    }
}
