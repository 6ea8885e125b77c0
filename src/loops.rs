//! The three engine loops: update (`GameLoop`), redraw (`GraphicsLoop`) and input (`InputLoop`),
//! plus the capability traits they drive.

use crate::error::EngineError;
use crate::hit::{HitDetector, TouchEvent};
use crate::sync::{Shared, lock};
use ratatui::style::Color;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives the elapsed time (ms) since the previous tick.
pub trait GameComponent: Send {
    fn play(&mut self, elapsed_ms: u64) -> Result<(), EngineError>;
}

/// Anything whose time-driven advancement can be suspended.
///
/// Components that only advance inside `play` keep the default no-ops: the loop
/// withholds their ticks while paused.
pub trait Pausable: Send {
    fn pause(&mut self) {}
    fn unpause(&mut self) {}
}

/// Called exactly once when the game loop stops.
pub trait StopListener: Send {
    fn on_stop(&mut self);
}

/// Host paint surface, in board cells.
pub trait Canvas {
    fn width(&self) -> u16;
    fn height(&self) -> u16;
    /// Out-of-range coordinates are ignored.
    fn put(&mut self, x: i32, y: i32, ch: char, fg: Color);
    fn fill(&mut self, bg: Color);
}

pub trait Drawable: Send {
    fn draw(&self, canvas: &mut dyn Canvas);
}

pub type SharedComponent = Shared<dyn GameComponent>;
pub type SharedPausable = Shared<dyn Pausable>;
pub type SharedListener = Shared<dyn StopListener>;
pub type SharedDrawable = Shared<dyn Drawable>;

/// Lets a component (the level timer) ask the loop to stop at the end of the current tick.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    Stopped,
}

/// Central scheduler. Components are polled in registration order every tick.
pub struct GameLoop {
    components: Vec<SharedComponent>,
    listeners: Vec<SharedListener>,
    state: LoopState,
    paused: bool,
    stop: StopHandle,
    played_ms: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            listeners: Vec::new(),
            state: LoopState::NotStarted,
            paused: false,
            stop: StopHandle::default(),
            played_ms: 0,
        }
    }

    pub fn add_component(&mut self, component: SharedComponent) -> Result<(), EngineError> {
        self.ensure_not_stopped("register a component")?;
        self.components.push(component);
        Ok(())
    }

    pub fn add_stop_listener(&mut self, listener: SharedListener) -> Result<(), EngineError> {
        self.ensure_not_stopped("register a stop listener")?;
        self.listeners.push(listener);
        Ok(())
    }

    fn ensure_not_stopped(&self, what: &str) -> Result<(), EngineError> {
        if self.state == LoopState::Stopped {
            return Err(EngineError::invalid_state(format!(
                "cannot {what}: game loop already stopped"
            )));
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Total ms delivered to components (excludes paused time).
    #[cfg(test)]
    pub fn played_ms(&self) -> u64 {
        self.played_ms
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            LoopState::Stopped => Err(EngineError::invalid_state("game loop cannot restart")),
            LoopState::Running => Ok(()),
            LoopState::NotStarted => {
                log::info!("game loop started with {} components", self.components.len());
                self.state = LoopState::Running;
                Ok(())
            }
        }
    }

    /// Deliver one tick. Does nothing unless running and unpaused.
    /// A component error aborts the rest of the tick and is returned as is.
    pub fn tick(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        if self.state != LoopState::Running || self.paused {
            return Ok(());
        }
        self.played_ms += elapsed_ms;
        for c in &self.components {
            lock(c).play(elapsed_ms)?;
        }
        if self.stop.is_requested() {
            self.stop();
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Terminal. Runs every stop listener once, in registration order.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        log::info!(
            "game loop stopping after {} ms; {} stop listeners",
            self.played_ms,
            self.listeners.len()
        );
        for l in &self.listeners {
            lock(l).on_stop();
        }
        self.state = LoopState::Stopped;
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Pausable for GameLoop {
    fn pause(&mut self) {
        self.paused = true;
    }

    fn unpause(&mut self) {
        self.paused = false;
    }
}

/// Redraw driver: paints its drawables in registration order. Later ones paint on top.
pub struct GraphicsLoop {
    drawables: Vec<SharedDrawable>,
    invalidated: bool,
    released: bool,
}

impl GraphicsLoop {
    pub fn new() -> Self {
        Self {
            drawables: Vec::new(),
            invalidated: true,
            released: false,
        }
    }

    pub fn register(&mut self, drawable: SharedDrawable) -> Result<(), EngineError> {
        if self.released {
            return Err(EngineError::invalid_state(
                "cannot register a drawable: graphics released",
            ));
        }
        self.drawables.push(drawable);
        self.invalidated = true;
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn paint(&mut self, canvas: &mut dyn Canvas) {
        for d in &self.drawables {
            lock(d).draw(canvas);
        }
        self.invalidated = false;
    }

    #[cfg(test)]
    pub fn drawables(&self) -> usize {
        self.drawables.len()
    }
}

impl Default for GraphicsLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl GameComponent for GraphicsLoop {
    fn play(&mut self, _elapsed_ms: u64) -> Result<(), EngineError> {
        self.invalidate();
        Ok(())
    }
}

impl StopListener for GraphicsLoop {
    fn on_stop(&mut self) {
        log::debug!("releasing {} drawables", self.drawables.len());
        self.drawables.clear();
        self.released = true;
        self.invalidated = true;
    }
}

/// Forwards raw touches to every registered hit detector. Called from the input thread.
#[derive(Default)]
pub struct InputLoop {
    detectors: Vec<HitDetector>,
}

impl InputLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, detector: HitDetector) {
        self.detectors.push(detector);
    }

    /// True if any detector consumed the touch. Overlapping actors may all be hit.
    pub fn on_touch(&self, event: TouchEvent) -> bool {
        let mut consumed = false;
        for d in &self.detectors {
            consumed |= d.on_touch(event);
        }
        consumed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sync::shared;
    use std::collections::BTreeMap;

    /// Canvas fake recording the last glyph written to each cell.
    pub(crate) struct RecordingCanvas {
        width: u16,
        height: u16,
        cells: BTreeMap<(i32, i32), char>,
        puts: usize,
    }

    impl RecordingCanvas {
        pub(crate) fn new(width: u16, height: u16) -> Self {
            Self {
                width,
                height,
                cells: BTreeMap::new(),
                puts: 0,
            }
        }

        pub(crate) fn text_at(&self, x: i32, y: i32, len: i32) -> String {
            (x..x + len)
                .map(|cx| self.cells.get(&(cx, y)).copied().unwrap_or(' '))
                .collect()
        }

        pub(crate) fn puts(&self) -> usize {
            self.puts
        }
    }

    impl Canvas for RecordingCanvas {
        fn width(&self) -> u16 {
            self.width
        }
        fn height(&self) -> u16 {
            self.height
        }
        fn put(&mut self, x: i32, y: i32, ch: char, _fg: Color) {
            if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
                return;
            }
            self.cells.insert((x, y), ch);
            self.puts += 1;
        }
        fn fill(&mut self, _bg: Color) {
            self.cells.clear();
        }
    }

    struct Recorder {
        name: &'static str,
        log: Shared<Vec<String>>,
    }

    impl GameComponent for Recorder {
        fn play(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
            lock(&self.log).push(format!("{}:{}", self.name, elapsed_ms));
            Ok(())
        }
    }

    impl StopListener for Recorder {
        fn on_stop(&mut self) {
            lock(&self.log).push(format!("stop:{}", self.name));
        }
    }

    struct Glyph(i32, char);

    impl Drawable for Glyph {
        fn draw(&self, canvas: &mut dyn Canvas) {
            canvas.put(self.0, 0, self.1, Color::White);
        }
    }

    fn recorder(name: &'static str, log: &Shared<Vec<String>>) -> Shared<Recorder> {
        shared(Recorder { name, log: log.clone() })
    }

    #[test]
    fn test_components_polled_in_order_only_while_running() {
        let log = shared(Vec::new());
        let mut gl = GameLoop::new();
        gl.add_component(recorder("a", &log)).unwrap();
        gl.add_component(recorder("b", &log)).unwrap();
        gl.tick(10).unwrap();
        assert!(lock(&log).is_empty());
        gl.start().unwrap();
        gl.tick(16).unwrap();
        gl.pause();
        gl.tick(16).unwrap();
        gl.unpause();
        gl.tick(5).unwrap();
        assert_eq!(*lock(&log), vec!["a:16", "b:16", "a:5", "b:5"]);
        assert_eq!(gl.played_ms(), 21);
    }

    #[test]
    fn test_stop_runs_listeners_once_in_order_and_is_terminal() {
        let log = shared(Vec::new());
        let mut gl = GameLoop::new();
        gl.add_component(recorder("c", &log)).unwrap();
        gl.add_stop_listener(recorder("first", &log)).unwrap();
        gl.add_stop_listener(recorder("second", &log)).unwrap();
        gl.start().unwrap();
        gl.stop();
        gl.stop();
        gl.tick(16).unwrap();
        assert_eq!(*lock(&log), vec!["stop:first", "stop:second"]);
        assert_eq!(gl.state(), LoopState::Stopped);
        assert!(matches!(gl.start(), Err(EngineError::InvalidState(_))));
        assert!(matches!(
            gl.add_component(recorder("late", &log)),
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            gl.add_stop_listener(recorder("late", &log)),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn test_stop_request_takes_effect_after_the_tick() {
        let log = shared(Vec::new());
        let mut gl = GameLoop::new();
        gl.add_component(recorder("a", &log)).unwrap();
        gl.add_component(recorder("b", &log)).unwrap();
        gl.add_stop_listener(recorder("end", &log)).unwrap();
        gl.start().unwrap();
        gl.stop_handle().request();
        gl.tick(16).unwrap();
        gl.tick(16).unwrap();
        assert_eq!(*lock(&log), vec!["a:16", "b:16", "stop:end"]);
    }

    #[test]
    fn test_graphics_paints_in_registration_order_and_releases_on_stop() {
        let mut gfx = GraphicsLoop::new();
        gfx.register(shared(Glyph(0, 'a'))).unwrap();
        gfx.register(shared(Glyph(0, 'b'))).unwrap();
        gfx.register(shared(Glyph(1, 'c'))).unwrap();
        let mut canvas = RecordingCanvas::new(4, 1);
        gfx.paint(&mut canvas);
        assert_eq!(canvas.text_at(0, 0, 2), "bc");
        assert!(!gfx.is_invalidated());
        gfx.play(16).unwrap();
        assert!(gfx.is_invalidated());
        gfx.on_stop();
        assert_eq!(gfx.drawables(), 0);
        assert!(gfx.register(shared(Glyph(0, 'd'))).is_err());
    }
}
