//! Level countdown.

use crate::error::EngineError;
use crate::loops::{GameComponent, Pausable, StopHandle};

#[derive(Debug)]
pub struct Timer {
    remaining_ms: i64,
    fired: bool,
    stop: StopHandle,
}

impl Timer {
    pub fn new(limit_ms: u64, stop: StopHandle) -> Self {
        Self {
            remaining_ms: i64::try_from(limit_ms).unwrap_or(i64::MAX),
            fired: false,
            stop,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms.max(0) as u64
    }

    #[cfg(test)]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Whole seconds left, floored.
    pub fn render(&self) -> String {
        (self.remaining_ms() / 1000).to_string()
    }
}

impl GameComponent for Timer {
    fn play(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        self.remaining_ms = self
            .remaining_ms
            .saturating_sub(i64::try_from(elapsed_ms).unwrap_or(i64::MAX));
        if self.remaining_ms <= 0 && !self.fired {
            self.fired = true;
            log::info!("time is up");
            self.stop.request();
        }
        Ok(())
    }
}

impl Pausable for Timer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_exactly_once_at_limit() {
        let stop = StopHandle::default();
        let mut t = Timer::new(5000, stop.clone());
        for _ in 0..4 {
            t.play(1000).unwrap();
        }
        t.play(999).unwrap();
        assert!(!t.has_fired());
        assert!(!stop.is_requested());
        t.play(1).unwrap();
        assert!(t.has_fired());
        assert!(stop.is_requested());
        t.play(500).unwrap();
        t.play(500).unwrap();
        assert!(t.has_fired());
        assert_eq!(t.remaining_ms(), 0);
    }

    #[test]
    fn test_render_floors_seconds() {
        let mut t = Timer::new(5000, StopHandle::default());
        assert_eq!(t.render(), "5");
        t.play(1).unwrap();
        assert_eq!(t.render(), "4");
        t.play(4000).unwrap();
        assert_eq!(t.render(), "0");
        t.play(5000).unwrap();
        assert_eq!(t.render(), "0");
    }

    #[test]
    fn test_overshooting_tick_fires() {
        let stop = StopHandle::default();
        let mut t = Timer::new(1000, stop.clone());
        t.play(1600).unwrap();
        assert!(stop.is_requested());
    }
}
