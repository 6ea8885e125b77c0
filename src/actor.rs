//! Actors: placeable, showable, hittable, drawable pop-up targets.

use crate::error::EngineError;
use crate::geometry::{ActorId, Board, Bounds, Point, Size};
use crate::loops::{Canvas, Drawable};
use crate::sprite::{AnimationId, Animator, PopUp, Sprite, Variant};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Chooses where an actor appears each time it is shown.
pub trait Placer: Send {
    fn place(&mut self, size: Size) -> Point;
}

/// Uniformly random placement on a shared board.
pub struct RandomPlacer {
    board: Arc<Board>,
    rng: StdRng,
}

impl RandomPlacer {
    pub fn new(board: Arc<Board>, rng: StdRng) -> Self {
        Self { board, rng }
    }
}

impl Placer for RandomPlacer {
    fn place(&mut self, size: Size) -> Point {
        self.board.random_point(size, &mut self.rng)
    }
}

/// Reacts to an actor appearing or disappearing. The actor is fully placed before `on_show`.
pub trait VisibilityObserver: Send {
    fn on_show(&mut self, actor: &mut Actor);
    fn on_hide(&mut self, actor: &mut Actor);
}

/// Registers the actor with the board while shown and starts its rise animation.
pub struct BoardLink {
    board: Arc<Board>,
    rise_ms: u64,
    rising: Option<AnimationId>,
}

impl BoardLink {
    pub fn new(board: Arc<Board>, rise_ms: u64) -> Self {
        Self {
            board,
            rise_ms,
            rising: None,
        }
    }
}

impl VisibilityObserver for BoardLink {
    fn on_show(&mut self, actor: &mut Actor) {
        self.board.register(actor.id());
        let depth = actor.size().height;
        self.rising = Some(actor.register_animation(Box::new(PopUp::new(self.rise_ms, depth))));
    }

    fn on_hide(&mut self, actor: &mut Actor) {
        self.board.deregister(actor.id());
        if let Some(id) = self.rising.take() {
            actor.unregister_animation(id);
        }
    }
}

pub struct Actor {
    id: ActorId,
    location: Option<Point>,
    visible: bool,
    sprite: Sprite,
    placer: Box<dyn Placer>,
    observer: Option<Box<dyn VisibilityObserver>>,
}

impl Actor {
    pub fn new(id: ActorId, placer: Box<dyn Placer>, sprite: Sprite) -> Self {
        Self {
            id,
            location: None,
            visible: false,
            sprite,
            placer,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn VisibilityObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn size(&self) -> Size {
        self.sprite.size()
    }

    #[cfg(test)]
    pub fn location(&self) -> Option<Point> {
        self.location
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// World-space box, if placed.
    pub fn bounds(&self) -> Option<Bounds> {
        self.location.map(|at| Bounds::at(at, self.size()))
    }

    /// Place, mark visible, then notify.
    pub fn show(&mut self) -> Result<(), EngineError> {
        if self.visible {
            return Err(EngineError::invalid_state(format!(
                "actor {} is already visible",
                self.id
            )));
        }
        let at = self.placer.place(self.size());
        self.location = Some(at);
        self.visible = true;
        self.notify(|observer, actor| observer.on_show(actor));
        Ok(())
    }

    /// Safe to call while hidden.
    pub fn hide(&mut self) {
        self.visible = false;
        self.location = None;
        self.notify(|observer, actor| observer.on_hide(actor));
    }

    fn notify(&mut self, f: impl FnOnce(&mut dyn VisibilityObserver, &mut Self)) {
        if let Some(mut observer) = self.observer.take() {
            f(observer.as_mut(), self);
            self.observer = Some(observer);
        }
    }

    /// Whether the actor's box overlaps `query`. Does not check visibility.
    pub fn is_hit(&self, query: &Bounds) -> bool {
        self.bounds().is_some_and(|b| b.intersects(query))
    }

    #[cfg(test)]
    pub fn variant(&self) -> Variant {
        self.sprite.variant()
    }

    pub fn set_variant(&mut self, variant: Variant) {
        self.sprite.set_variant(variant);
    }

    pub fn register_animation(&mut self, animator: Box<dyn Animator>) -> AnimationId {
        self.sprite.register_animation(animator)
    }

    pub fn unregister_animation(&mut self, id: AnimationId) -> bool {
        self.sprite.unregister_animation(id)
    }

    pub fn advance_animations(&mut self, elapsed_ms: u64) {
        self.sprite.advance_animations(elapsed_ms);
    }

    #[cfg(test)]
    pub fn active_animations(&self) -> usize {
        self.sprite.active_animations()
    }
}

impl Drawable for Actor {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if let (true, Some(at)) = (self.visible, self.location) {
            self.sprite.draw(canvas, at);
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("visible", &self.visible)
            .field("sprite", &self.sprite)
            .finish_non_exhaustive()
    }
}
