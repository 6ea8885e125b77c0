//! App: terminal init, input thread, frame loop and screen handling.

use crate::GameConfig;
use crate::assets::{ArtDir, AudioCue, BuiltinArt, Silent, TerminalBell, VisualSource};
use crate::behavior::PopUpTuning;
use crate::game::{EngineOptions, Game, assemble};
use crate::geometry::Board;
use crate::highscores::{self, BestScores};
use crate::input::{Action, key_to_action, mouse_to_touch};
use crate::level::{Level, LevelResult};
use crate::loops::InputLoop;
use crate::sync::lock;
use crate::theme::Theme;
use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyEventKind, MouseEvent};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// How long the input thread blocks before re-checking for shutdown.
const INPUT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Level assembled, started and paused; waiting for Enter.
    StartLevel,
    Playing,
    QuitMenu,
    LevelEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Levels,
    Exit,
}

impl QuitOption {
    fn down(self) -> Self {
        match self {
            Self::Resume => Self::Levels,
            Self::Levels => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn up(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::Levels => Self::Resume,
            Self::Exit => Self::Levels,
        }
    }
}

/// Where mouse presses go. Written by the main thread, read by the input thread.
#[derive(Default)]
struct TouchSurface {
    /// Screen position of board cell (0, 0).
    origin: Mutex<Rect>,
    /// Input loop of the level in play; None between levels.
    target: Mutex<Option<Arc<InputLoop>>>,
}

impl TouchSurface {
    fn touch(&self, mouse: MouseEvent) -> bool {
        let origin = *lock(&self.origin);
        let Some(touch) = mouse_to_touch(mouse, origin) else {
            return false;
        };
        let target = lock(&self.target).clone();
        target.is_some_and(|input| input.on_touch(touch))
    }

    fn attach(&self, input: Option<Arc<InputLoop>>) {
        *lock(&self.target) = input;
    }
}

/// Reads terminal events. Mouse presses go straight to the level's input loop;
/// everything else is forwarded to the main thread.
fn spawn_input_thread(
    surface: Arc<TouchSurface>,
    tx: Sender<Event>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::Acquire) {
                match event::poll(INPUT_POLL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        log::warn!("input poll failed: {e}");
                        break;
                    }
                }
                match event::read() {
                    Ok(Event::Mouse(mouse)) => {
                        if surface.touch(mouse) {
                            log::debug!("tap at {},{} hit", mouse.column, mouse.row);
                        }
                    }
                    Ok(other) => {
                        if tx.send(other).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("input read failed: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(handle)
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    visuals: Box<dyn VisualSource>,
    audio: Arc<dyn AudioCue>,
    /// Set when the bell is enabled; rung between frames.
    bell: Option<Arc<TerminalBell>>,
    /// Board size in cells, fitted to the terminal when a level is assembled.
    board_width: u16,
    board_height: u16,
    game: Game,
    screen: Screen,
    quit_selected: QuitOption,
    result: Option<LevelResult>,
    new_best: bool,
    best: BestScores,
    results_tx: Sender<LevelResult>,
    results_rx: Receiver<LevelResult>,
    touch: Arc<TouchSurface>,
    /// Set whenever something outside the engine changed what is on screen.
    dirty: bool,
    /// TachyonFX board fade when a level begins.
    fade: Option<Effect>,
    /// Last time we processed the fade (for delta).
    fade_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let visuals: Box<dyn VisualSource> = match &config.art_dir {
            Some(dir) => Box::new(ArtDir(dir.clone())),
            None => Box::new(BuiltinArt),
        };
        let bell = config.bell.then(|| Arc::new(TerminalBell::new()));
        let audio: Arc<dyn AudioCue> = match &bell {
            Some(bell) => bell.clone(),
            None => Arc::new(Silent),
        };
        let (term_cols, term_rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let (board_width, board_height) =
            crate::ui::board_size_for_terminal(term_cols, term_rows);
        let (results_tx, results_rx) = mpsc::channel();
        let touch = Arc::new(TouchSurface::default());
        let level = config.level.clone();
        let game = Self::build_game(
            level,
            (board_width, board_height),
            visuals.as_ref(),
            &audio,
            &config,
            &theme,
            &results_tx,
            &touch,
        )?;
        Ok(Self {
            config,
            theme,
            visuals,
            audio,
            bell,
            board_width,
            board_height,
            game,
            screen: Screen::StartLevel,
            quit_selected: QuitOption::Resume,
            result: None,
            new_best: false,
            best: highscores::load_best_scores(),
            results_tx,
            results_rx,
            touch,
            dirty: true,
            fade: None,
            fade_process_time: None,
        })
    }

    /// Assemble `level`, start it and hold it paused behind the start overlay.
    fn build_game(
        level: Level,
        (width, height): (u16, u16),
        visuals: &dyn VisualSource,
        audio: &Arc<dyn AudioCue>,
        config: &GameConfig,
        theme: &Theme,
        results_tx: &Sender<LevelResult>,
        touch: &TouchSurface,
    ) -> Result<Game> {
        if !crate::ui::board_is_roomy(width, height) {
            log::warn!("terminal is small: board is only {width}x{height}");
        }
        let options = EngineOptions {
            tuning: PopUpTuning::default(),
            hit_margin: config.hit_margin,
            seed: config.seed.unwrap_or_else(rand::random),
            colors: theme.scene_colors(),
        };
        let tx = results_tx.clone();
        let mut game = assemble(
            level,
            Board::new(width, height),
            visuals,
            audio.clone(),
            &options,
            move |result| {
                // The receiver only goes away with the app.
                let _ = tx.send(result);
            },
        )?;
        game.start()?;
        game.pause();
        touch.attach(Some(game.input()));
        Ok(game)
    }

    /// Drop the current level (stopping it if still running) and show the start overlay for `level`.
    fn enter_level(&mut self, level: Level) -> Result<()> {
        self.touch.attach(None);
        self.game.stop();
        // A level abandoned mid-play still reports; that result is not a real finish.
        while self.results_rx.try_recv().is_ok() {}
        self.game = Self::build_game(
            level,
            (self.board_width, self.board_height),
            self.visuals.as_ref(),
            &self.audio,
            &self.config,
            &self.theme,
            &self.results_tx,
            &self.touch,
        )?;
        self.screen = Screen::StartLevel;
        self.result = None;
        self.new_best = false;
        self.fade = None;
        self.fade_process_time = None;
        self.dirty = true;
        Ok(())
    }

    fn best_for_level(&self) -> Option<u32> {
        let level = self.game.level();
        if level.is_custom() {
            None
        } else {
            self.best.get(&level.number).copied()
        }
    }

    /// Pick up the level-end hand-off, if the last tick ended the level.
    fn collect_result(&mut self) {
        let Ok(result) = self.results_rx.try_recv() else {
            return;
        };
        self.touch.attach(None);
        self.new_best = !result.level.is_custom()
            && highscores::record(&mut self.best, result.level.number, result.score);
        if self.new_best {
            if let Err(e) = highscores::save_best_scores(&self.best) {
                log::warn!("could not save best scores: {e}");
            }
        }
        self.result = Some(result);
        self.screen = Screen::LevelEnd;
        self.dirty = true;
    }

    fn resume(&mut self) {
        if self.game.is_started() {
            self.game.unpause();
        }
        self.screen = Screen::Playing;
    }

    /// Apply a key action. Returns true when the app should exit.
    fn apply_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::StartLevel => match action {
                Action::Quit => return Ok(true),
                Action::Prev => {
                    if let Some(level) = self.game.level().previous() {
                        self.enter_level(level)?;
                    }
                }
                Action::Next => {
                    if let Some(level) = self.game.level().next() {
                        self.enter_level(level)?;
                    }
                }
                Action::Confirm => {
                    self.resume();
                    if self.config.animation {
                        self.fade = Some(crate::ui::board_fade(&self.theme));
                        self.fade_process_time = None;
                    }
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Pause => {
                    if self.game.is_paused() {
                        self.game.unpause();
                    } else {
                        self.game.pause();
                    }
                }
                Action::Quit => {
                    if !self.game.is_paused() {
                        self.game.pause();
                    }
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::Next => self.quit_selected = self.quit_selected.down(),
                Action::Up | Action::Prev => self.quit_selected = self.quit_selected.up(),
                Action::Confirm => match self.quit_selected {
                    QuitOption::Resume => self.resume(),
                    QuitOption::Levels => self.enter_level(self.game.level().clone())?,
                    QuitOption::Exit => return Ok(true),
                },
                Action::Pause | Action::Quit => self.resume(),
                _ => {}
            },
            Screen::LevelEnd => match action {
                Action::Quit => return Ok(true),
                Action::Retry | Action::Confirm => {
                    self.enter_level(self.game.level().clone())?;
                }
                Action::Next => {
                    let next = self
                        .result
                        .as_ref()
                        .filter(|r| r.passed())
                        .and_then(|r| r.level.next());
                    if let Some(level) = next {
                        self.enter_level(level)?;
                    }
                }
                _ => {}
            },
        }
        self.dirty = true;
        Ok(false)
    }

    /// Handle one forwarded terminal event. Returns true when the app should exit.
    fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                return self.apply_action(key_to_action(key));
            }
            Event::FocusLost => {
                if self.screen == Screen::Playing && !self.game.is_paused() {
                    log::info!("focus lost");
                    self.game.pause();
                }
            }
            Event::Resize(cols, rows) => {
                // The board keeps its size during a level; only a fresh one is refitted.
                if self.screen == Screen::StartLevel {
                    let fit = crate::ui::board_size_for_terminal(cols, rows);
                    if fit != (self.board_width, self.board_height) {
                        (self.board_width, self.board_height) = fit;
                        self.enter_level(self.game.level().clone())?;
                    }
                }
            }
            _ => {}
        }
        self.dirty = true;
        Ok(false)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        // Not every terminal reports focus; pausing on focus loss is best effort.
        let _ = execute!(stdout, EnableFocusChange);

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let result = match spawn_input_thread(self.touch.clone(), tx, shutdown.clone()) {
            Ok(handle) => {
                let result = self.run_loop(&mut terminal, &rx);
                shutdown.store(true, Ordering::Release);
                let _ = handle.join();
                result
            }
            Err(e) => Err(e),
        };
        self.touch.attach(None);
        self.game.stop();

        // Restore
        let _ = execute!(std::io::stdout(), DisableFocusChange);
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal, events: &Receiver<Event>) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let elapsed_ms = now.duration_since(last_frame).as_millis();
            last_frame = now;
            self.game
                .tick(u64::try_from(elapsed_ms).unwrap_or(u64::MAX))?;
            self.collect_result();

            if self.dirty || self.fade.is_some() || self.game.needs_redraw() {
                self.draw(terminal, now)?;
                self.dirty = false;
            }
            if let Some(bell) = &self.bell {
                bell.ring_pending(terminal.backend_mut());
            }
            if self.fade.as_ref().is_some_and(Effect::done) {
                self.fade = None;
                self.fade_process_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            match events.recv_timeout(timeout) {
                Ok(event) => {
                    if self.handle_event(event)? {
                        return Ok(());
                    }
                    while let Ok(event) = events.try_recv() {
                        if self.handle_event(event)? {
                            return Ok(());
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => bail!("input thread stopped"),
            }
        }
    }

    fn draw(&mut self, terminal: &mut DefaultTerminal, now: Instant) -> Result<()> {
        let best = self.best_for_level();
        let (board_w, board_h) = {
            let board = self.game.board();
            (board.width, board.height)
        };
        let view = crate::ui::View {
            screen: self.screen,
            game: &self.game,
            theme: &self.theme,
            best,
            result: self.result.as_ref(),
            new_best: self.new_best,
            quit_selected: self.quit_selected,
        };
        let fade = &mut self.fade;
        let fade_process_time = &mut self.fade_process_time;
        let touch = &self.touch;
        terminal.draw(|f| {
            *lock(&touch.origin) = crate::ui::board_rect(f.area(), board_w, board_h);
            crate::ui::draw(f, &view, fade, fade_process_time, now);
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MEERKAT;
    use crossterm::event::{KeyModifiers, MouseButton, MouseEventKind};

    fn press(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_quit_menu_cycles_both_ways() {
        let mut opt = QuitOption::Resume;
        for _ in 0..3 {
            opt = opt.down();
        }
        assert_eq!(opt, QuitOption::Resume);
        assert_eq!(QuitOption::Resume.up(), QuitOption::Exit);
        assert_eq!(QuitOption::Exit.down(), QuitOption::Resume);
        assert_eq!(QuitOption::Levels.up(), QuitOption::Resume);
    }

    #[test]
    fn test_touch_surface_routes_press_to_board_cells() {
        let (tx, rx) = mpsc::channel();
        let options = EngineOptions {
            tuning: PopUpTuning {
                hidden: 100..=100,
                rise: 150,
                visible: 600..=600,
                hit_flash: 200,
            },
            seed: 7,
            ..EngineOptions::default()
        };
        let mut game = assemble(
            Level::custom(3, 30, 1),
            Board::new(40, 12),
            &BuiltinArt,
            Arc::new(Silent),
            &options,
            move |r| {
                let _ = tx.send(r);
            },
        )
        .unwrap();
        game.start().unwrap();
        game.tick(100).unwrap();
        let target = game.visible_actors()[0];

        let surface = TouchSurface::default();
        let origin = Rect::new(10, 3, 40, 12);
        *lock(&surface.origin) = origin;
        let col = u16::try_from(target.x + 1).unwrap() + origin.x;
        let row = u16::try_from(target.y + 1).unwrap() + origin.y;

        // Nothing attached yet.
        assert!(!surface.touch(press(col, row)));
        surface.attach(Some(game.input()));
        assert!(surface.touch(press(col, row)));
        assert_eq!(game.score(), 1);

        surface.attach(None);
        game.stop();
        assert_eq!(rx.try_recv().map(|r| r.score), Ok(1));
    }

    #[test]
    fn test_builtin_art_is_available_for_every_level() {
        let art = BuiltinArt.load(MEERKAT, ratatui::style::Color::White).unwrap();
        let (w, h) = crate::ui::board_size_for_terminal(80, 24);
        assert!(art.size().width <= w && art.size().height <= h);
        for n in 1..=Level::count() {
            assert!(Level::builtin(n).is_some());
        }
    }
}
