//! The game facade and the function that wires a level together.

use crate::actor::{Actor, BoardLink, RandomPlacer};
use crate::assets::{AudioCue, Cue, MEERKAT, MEERKAT_HIT, VisualSource};
use crate::behavior::{PopUpBehavior, PopUpTuning};
use crate::error::EngineError;
use crate::geometry::Board;
#[cfg(test)]
use crate::geometry::Bounds;
use crate::hit::{HitCallback, HitDetector};
use crate::level::{Level, LevelResult};
use crate::loops::{
    Canvas, Drawable, GameLoop, GraphicsLoop, InputLoop, LoopState, SharedPausable, StopListener,
};
use crate::score::Score;
use crate::sprite::Sprite;
use crate::sync::{PauseToken, Shared, lock, shared};
use crate::timer::Timer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::style::Color;
use std::sync::Arc;

/// Colours the engine paints with; the host derives them from its theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneColors {
    pub ground: Color,
    pub detail: Color,
    pub meerkat: Color,
    pub meerkat_hit: Color,
}

impl Default for SceneColors {
    fn default() -> Self {
        Self {
            ground: Color::Rgb(0x31, 0x35, 0x3F),
            detail: Color::Rgb(0x98, 0xC3, 0x79),
            meerkat: Color::Rgb(0xE5, 0xC0, 0x7B),
            meerkat_hit: Color::Rgb(0xE0, 0x6C, 0x75),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub tuning: PopUpTuning,
    /// Cells added around a tap when testing it against a meerkat.
    pub hit_margin: u16,
    pub seed: u64,
    pub colors: SceneColors,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tuning: PopUpTuning::default(),
            hit_margin: 1,
            seed: 0,
            colors: SceneColors::default(),
        }
    }
}

/// Ground with a sprinkling of grass tufts.
struct Background {
    colors: SceneColors,
}

impl Drawable for Background {
    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.fill(self.colors.ground);
        for y in 0..i32::from(canvas.height()) {
            for x in 0..i32::from(canvas.width()) {
                if (x * 7 + y * 13) % 23 == 0 {
                    canvas.put(x, y, '"', self.colors.detail);
                }
            }
        }
    }
}

/// Last stop listener: hands the final score back to the host, once.
struct LevelEnd {
    level: Level,
    score: Arc<Score>,
    behaviors: Vec<Shared<PopUpBehavior>>,
    callback: Option<Box<dyn FnOnce(LevelResult) + Send>>,
}

impl StopListener for LevelEnd {
    fn on_stop(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let result = LevelResult {
            level: self.level.clone(),
            score: self.score.get(),
            misses: self.behaviors.iter().map(|b| lock(b).misses()).sum(),
        };
        log::info!(
            "{} over: score {} / target {} ({} missed)",
            result.level.title(),
            result.score,
            result.level.target_score,
            result.misses
        );
        callback(result);
    }
}

/// Aggregates every pausable part of a running level.
///
/// Lifecycle: not started, running (possibly paused), stopped. Stopping is terminal.
/// Calling [`Game::unpause`] before [`Game::start`] is a caller error; the host guards it.
pub struct Game {
    level: Level,
    board: Arc<Board>,
    game_loop: Shared<GameLoop>,
    graphics: Shared<GraphicsLoop>,
    input: Arc<InputLoop>,
    score: Arc<Score>,
    timer: Shared<Timer>,
    actors: Vec<Shared<Actor>>,
    behaviors: Vec<Shared<PopUpBehavior>>,
    /// Timer, behaviors, then the game loop itself.
    pausables: Vec<SharedPausable>,
    paused: PauseToken,
    started: bool,
}

impl Game {
    pub fn start(&mut self) -> Result<(), EngineError> {
        lock(&self.game_loop).start()?;
        self.started = true;
        log::info!("{} started", self.level.title());
        Ok(())
    }

    /// Publishes the pause first so taps stop scoring, then pauses the game loop last.
    pub fn pause(&mut self) {
        self.paused.set(true);
        for p in &self.pausables {
            lock(p).pause();
        }
        log::info!("paused");
    }

    /// Resumes the game loop first, then everything else.
    pub fn unpause(&mut self) {
        for p in self.pausables.iter().rev() {
            lock(p).unpause();
        }
        self.paused.set(false);
        log::info!("resumed");
    }

    /// Ends the level now. Stop listeners (including the level-end callback) run once.
    pub fn stop(&mut self) {
        lock(&self.game_loop).stop();
    }

    pub fn tick(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        lock(&self.game_loop).tick(elapsed_ms)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.paused.is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.game_loop).state() == LoopState::Stopped
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn input(&self) -> Arc<InputLoop> {
        self.input.clone()
    }

    pub fn score(&self) -> u32 {
        self.score.get()
    }

    pub fn score_text(&self) -> String {
        self.score.render()
    }

    pub fn timer_text(&self) -> String {
        lock(&self.timer).render()
    }

    pub fn remaining_ms(&self) -> u64 {
        lock(&self.timer).remaining_ms()
    }

    pub fn hits(&self) -> u32 {
        self.behaviors.iter().map(|b| lock(b).hits()).sum()
    }

    pub fn misses(&self) -> u32 {
        self.behaviors.iter().map(|b| lock(b).misses()).sum()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Boxes of the meerkats currently up.
    #[cfg(test)]
    pub(crate) fn visible_actors(&self) -> Vec<Bounds> {
        self.actors
            .iter()
            .filter_map(|a| {
                let a = lock(a);
                a.is_visible().then(|| a.bounds()).flatten()
            })
            .collect()
    }

    pub fn needs_redraw(&self) -> bool {
        lock(&self.graphics).is_invalidated()
    }

    pub fn paint(&self, canvas: &mut dyn Canvas) {
        lock(&self.graphics).paint(canvas);
    }

    #[cfg(test)]
    pub(crate) fn behaviors(&self) -> &[Shared<PopUpBehavior>] {
        &self.behaviors
    }
}

/// Wire a level: loops, background, score, timer and one actor/behavior/detector per meerkat.
///
/// `on_level_end` runs exactly once, after every other stop listener.
pub fn assemble(
    level: Level,
    board: Board,
    visuals: &dyn VisualSource,
    audio: Arc<dyn AudioCue>,
    options: &EngineOptions,
    on_level_end: impl FnOnce(LevelResult) + Send + 'static,
) -> Result<Game, EngineError> {
    let colors = options.colors;
    let normal = visuals.load(MEERKAT, colors.meerkat)?;
    let hit = visuals.load(MEERKAT_HIT, colors.meerkat_hit)?;
    let board = Arc::new(board);
    log::info!(
        "assembling {}: target {} in {} s, {} meerkats on {}x{}",
        level.title(),
        level.target_score,
        level.time_limit_secs,
        level.actor_count,
        board.width,
        board.height
    );

    let game_loop = shared(GameLoop::new());
    let graphics = shared(GraphicsLoop::new());
    let mut input = InputLoop::new();
    let paused = PauseToken::new();
    let mut pausables: Vec<SharedPausable> = Vec::new();

    lock(&game_loop).add_component(graphics.clone())?;
    lock(&graphics).register(shared(Background { colors }))?;

    let score = Arc::new(Score::new(level.clone()));

    let timer = shared(Timer::new(level.time_limit_ms(), lock(&game_loop).stop_handle()));
    lock(&game_loop).add_component(timer.clone())?;
    pausables.push(timer.clone());

    let mut actors = Vec::new();
    let mut behaviors = Vec::new();
    for i in 0..level.actor_count as usize {
        let salt = 2 * i as u64;
        let placer = RandomPlacer::new(
            board.clone(),
            StdRng::seed_from_u64(options.seed.wrapping_add(salt)),
        );
        let actor = shared(
            Actor::new(i, Box::new(placer), Sprite::new(normal.clone(), hit.clone()))
                .with_observer(Box::new(BoardLink::new(board.clone(), options.tuning.rise))),
        );
        let behavior = shared(PopUpBehavior::new(
            actor.clone(),
            options.tuning.clone(),
            StdRng::seed_from_u64(options.seed.wrapping_add(salt + 1)),
        ));

        let on_hit: HitCallback = {
            let behavior = behavior.clone();
            let score = score.clone();
            let audio = audio.clone();
            Arc::new(move || {
                // The behavior refuses taps on a meerkat that is already going down.
                // Held across the score update so a stop cannot read the score in between.
                let mut behavior = lock(&behavior);
                if behavior.hit() {
                    score.add(1);
                    audio.play(Cue::Hit);
                    log::debug!("meerkat {i} hit; score {}", score.get());
                }
            })
        };

        lock(&graphics).register(actor.clone())?;
        lock(&game_loop).add_component(behavior.clone())?;
        pausables.push(behavior.clone());
        input.register(HitDetector::new(
            actor.clone(),
            options.hit_margin,
            paused.clone(),
            on_hit,
        ));
        actors.push(actor);
        behaviors.push(behavior);
    }

    lock(&game_loop).add_stop_listener(graphics.clone())?;
    for behavior in &behaviors {
        lock(&game_loop).add_stop_listener(behavior.clone())?;
    }
    lock(&game_loop).add_stop_listener(shared(LevelEnd {
        level: level.clone(),
        score: score.clone(),
        behaviors: behaviors.clone(),
        callback: Some(Box::new(on_level_end)),
    }))?;
    pausables.push(game_loop.clone());

    Ok(Game {
        level,
        board,
        game_loop,
        graphics,
        input: Arc::new(input),
        score,
        timer,
        actors,
        behaviors,
        pausables,
        paused,
        started: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{BuiltinArt, Silent};
    use crate::behavior::PopUpState;
    use crate::hit::TouchEvent;
    use crate::loops::Pausable;
    use crate::loops::tests::RecordingCanvas;

    fn quick_options() -> EngineOptions {
        EngineOptions {
            tuning: PopUpTuning {
                hidden: 100..=100,
                rise: 150,
                visible: 600..=600,
                hit_flash: 200,
            },
            seed: 42,
            ..EngineOptions::default()
        }
    }

    fn build(level: Level) -> (Game, Shared<Vec<LevelResult>>) {
        build_with(level, &quick_options())
    }

    fn build_with(level: Level, options: &EngineOptions) -> (Game, Shared<Vec<LevelResult>>) {
        let results = shared(Vec::new());
        let sink = results.clone();
        let game = assemble(
            level,
            Board::new(60, 20),
            &BuiltinArt,
            Arc::new(Silent),
            options,
            move |r| lock(&sink).push(r),
        )
        .unwrap();
        (game, results)
    }

    fn centre(b: Bounds) -> TouchEvent {
        TouchEvent::new(b.x + b.width / 2, b.y + b.height / 2)
    }

    #[test]
    fn test_end_to_end_single_hit() {
        let (mut game, results) = build(Level::custom(5, 1, 1));
        game.start().unwrap();
        let mut elapsed = 0;
        while game.visible_actors().is_empty() {
            game.tick(50).unwrap();
            elapsed += 50;
            assert!(elapsed < 1000, "meerkat never came up");
        }
        let target = game.visible_actors()[0];
        assert!(game.input().on_touch(centre(target)));
        assert_eq!(game.score(), 1);
        assert_eq!(game.score_text(), "4");
        while elapsed < 1000 {
            assert!(!game.is_stopped());
            game.tick(50).unwrap();
            elapsed += 50;
        }
        assert!(game.is_stopped());
        for _ in 0..5 {
            game.tick(50).unwrap();
        }
        game.stop();
        let results = lock(&results);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1);
        assert_eq!(results[0].level, Level::custom(5, 1, 1));
    }

    #[test]
    fn test_pause_freezes_behaviors() {
        let (mut game, _) = build(Level::custom(5, 30, 1));
        game.start().unwrap();
        game.tick(100).unwrap();
        game.tick(150).unwrap();
        let behavior = game.behaviors()[0].clone();
        assert_eq!(lock(&behavior).state(), PopUpState::Visible);
        let before = lock(&behavior).elapsed_in_state();
        let remaining = game.remaining_ms();

        game.pause();
        assert!(game.is_paused());
        for _ in 0..10 {
            game.tick(100).unwrap();
        }
        assert_eq!(lock(&behavior).state(), PopUpState::Visible);
        assert_eq!(lock(&behavior).elapsed_in_state(), before);
        assert_eq!(game.remaining_ms(), remaining);

        game.unpause();
        assert!(!game.is_paused());
        game.tick(600).unwrap();
        assert_eq!(lock(&behavior).state(), PopUpState::Hidden);
        assert_eq!(game.misses(), 1);
    }

    #[test]
    fn test_taps_ignored_while_paused() {
        let (mut game, _) = build(Level::custom(5, 30, 1));
        game.start().unwrap();
        game.tick(100).unwrap();
        let target = game.visible_actors()[0];
        game.pause();
        assert!(!game.input().on_touch(centre(target)));
        assert_eq!(game.score(), 0);
        game.unpause();
        assert!(game.input().on_touch(centre(target)));
        assert_eq!(game.score(), 1);
    }

    #[test]
    fn test_double_tap_during_flash_scores_once() {
        let (mut game, _) = build(Level::custom(5, 30, 1));
        game.start().unwrap();
        game.tick(100).unwrap();
        let target = game.visible_actors()[0];
        assert!(game.input().on_touch(centre(target)));
        // Still up, showing the hit art; the detector fires but the behavior refuses.
        assert!(game.input().on_touch(centre(target)));
        assert_eq!(game.score(), 1);
        assert_eq!(game.hits(), 1);
        game.tick(200).unwrap();
        assert!(game.visible_actors().is_empty());
    }

    #[test]
    fn test_tap_after_stop_is_refused() {
        let options = EngineOptions {
            tuning: PopUpTuning {
                visible: 60_000..=60_000,
                ..quick_options().tuning
            },
            ..quick_options()
        };
        let (mut game, results) = build_with(Level::custom(5, 30, 1), &options);
        game.start().unwrap();
        game.tick(100).unwrap();
        game.tick(150).unwrap();
        let target = game.visible_actors()[0];
        game.stop();
        assert!(game.is_stopped());
        assert!(game.visible_actors().is_empty());
        assert!(!game.input().on_touch(centre(target)));
        assert_eq!(game.score(), 0);
        assert_eq!(game.hits(), 0);
        let results = lock(&results);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, game.score());
    }

    /// (name, call, token paused, game loop paused) as seen when the call arrived.
    type Call = (&'static str, &'static str, bool, bool);

    struct CallRecorder {
        name: &'static str,
        token: PauseToken,
        game_loop: Shared<GameLoop>,
        calls: Shared<Vec<Call>>,
    }

    impl CallRecorder {
        fn record(&self, call: &'static str) {
            let loop_paused = lock(&self.game_loop).is_paused();
            lock(&self.calls).push((self.name, call, self.token.is_paused(), loop_paused));
        }
    }

    impl Pausable for CallRecorder {
        fn pause(&mut self) {
            self.record("pause");
        }

        fn unpause(&mut self) {
            self.record("unpause");
        }
    }

    fn recorder(game: &Game, name: &'static str, calls: &Shared<Vec<Call>>) -> SharedPausable {
        shared(CallRecorder {
            name,
            token: game.paused.clone(),
            game_loop: game.game_loop.clone(),
            calls: calls.clone(),
        })
    }

    #[test]
    fn test_pause_order_token_first_loop_last() {
        let (mut game, _) = build(Level::custom(5, 30, 1));
        game.start().unwrap();
        let calls = shared(Vec::new());
        let first = recorder(&game, "first", &calls);
        let before_loop = recorder(&game, "before loop", &calls);
        game.pausables.insert(0, first);
        let loop_at = game.pausables.len() - 1;
        game.pausables.insert(loop_at, before_loop);

        game.pause();
        assert_eq!(
            *lock(&calls),
            vec![("first", "pause", true, false), ("before loop", "pause", true, false)]
        );
        assert!(lock(&game.game_loop).is_paused());

        lock(&calls).clear();
        game.unpause();
        assert_eq!(
            *lock(&calls),
            vec![("before loop", "unpause", true, false), ("first", "unpause", true, false)]
        );
        assert!(!game.is_paused());
    }

    #[test]
    fn test_missed_tap_is_not_an_error() {
        let (mut game, _) = build(Level::custom(5, 30, 2));
        game.start().unwrap();
        assert!(!game.input().on_touch(TouchEvent::new(-50, -50)));
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_stop_releases_graphics_and_reports_once() {
        let (mut game, results) = build(Level::custom(3, 30, 2));
        game.start().unwrap();
        game.tick(16).unwrap();
        let mut canvas = RecordingCanvas::new(60, 20);
        game.paint(&mut canvas);
        assert!(canvas.puts() > 0);
        game.stop();
        game.stop();
        assert!(game.is_stopped());
        assert_eq!(lock(&results).len(), 1);
        let mut after = RecordingCanvas::new(60, 20);
        game.paint(&mut after);
        assert_eq!(after.puts(), 0);
        assert!(game.start().is_err());
    }

    #[test]
    fn test_missing_art_is_fatal() {
        struct NoArt;
        impl VisualSource for NoArt {
            fn load(&self, name: &str, _color: Color) -> Result<crate::sprite::Image, EngineError> {
                Err(EngineError::unavailable(name, "gone"))
            }
        }
        let result = assemble(
            Level::custom(1, 1, 1),
            Board::new(10, 10),
            &NoArt,
            Arc::new(Silent),
            &EngineOptions::default(),
            |_| {},
        );
        assert!(matches!(result, Err(EngineError::ResourceUnavailable { .. })));
    }

    #[test]
    fn test_not_started_game_ignores_ticks() {
        let (mut game, _) = build(Level::custom(5, 1, 1));
        assert!(!game.is_started());
        for _ in 0..40 {
            game.tick(100).unwrap();
        }
        assert!(!game.is_stopped());
        assert_eq!(game.timer_text(), "1");
    }
}
