//! Score against the level target.

use crate::level::Level;
use std::sync::atomic::{AtomicU32, Ordering};

/// Incremented from the input thread, read by the HUD on the tick thread.
#[derive(Debug)]
pub struct Score {
    value: AtomicU32,
    level: Level,
}

impl Score {
    pub fn new(level: Level) -> Self {
        Self {
            value: AtomicU32::new(0),
            level,
        }
    }

    pub fn add(&self, delta: u32) {
        self.value.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Points still needed, or `+N` once the target is beaten.
    pub fn render(&self) -> String {
        let score = i64::from(self.get());
        let needed = i64::from(self.level.target_score) - score;
        if needed >= 0 {
            needed.to_string()
        } else {
            format!("+{}", -needed)
        }
    }
}
