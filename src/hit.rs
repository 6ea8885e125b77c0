//! Touch-to-actor hit detection.

use crate::actor::Actor;
use crate::geometry::{Bounds, Point};
use crate::sync::{PauseToken, Shared, lock};
use std::sync::Arc;

/// Raw tap/click position in board cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub at: Point,
}

impl TouchEvent {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { at: Point::new(x, y) }
    }
}

/// What to do once an actor is hit. Runs on the input thread.
pub type HitCallback = Arc<dyn Fn() + Send + Sync>;

/// Detection only: decides whether a touch hit its actor and hands the action to the callback.
pub struct HitDetector {
    actor: Shared<Actor>,
    margin: u16,
    paused: PauseToken,
    on_hit: HitCallback,
}

impl HitDetector {
    pub fn new(actor: Shared<Actor>, margin: u16, paused: PauseToken, on_hit: HitCallback) -> Self {
        Self {
            actor,
            margin,
            paused,
            on_hit,
        }
    }

    /// True if the touch landed on the visible actor (within the margin) while unpaused.
    pub fn on_touch(&self, event: TouchEvent) -> bool {
        let query = Bounds::around(event.at, self.margin);
        let hit = {
            let actor = lock(&self.actor);
            actor.is_visible() && actor.is_hit(&query)
        };
        // Actor lock released: the callback locks the behavior, which locks the actor.
        if !hit || self.paused.is_paused() {
            return false;
        }
        (self.on_hit)();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::tests::fixed_actor;
    use crate::sync::shared;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting() -> (HitCallback, Arc<AtomicU32>) {
        let n = Arc::new(AtomicU32::new(0));
        let c = n.clone();
        (
            Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
            n,
        )
    }

    #[test]
    fn test_touch_within_margin_fires_once() {
        // 3x2 actor at (10, 5)
        let actor = shared(fixed_actor(0, Point::new(10, 5)));
        lock(&actor).show().unwrap();
        let (cb, n) = counting();
        let d = HitDetector::new(actor, 1, PauseToken::new(), cb);
        assert!(d.on_touch(TouchEvent::new(11, 6)));
        assert!(d.on_touch(TouchEvent::new(9, 4)));
        assert!(!d.on_touch(TouchEvent::new(8, 5)));
        assert!(!d.on_touch(TouchEvent::new(14, 5)));
        assert_eq!(n.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hidden_actor_is_never_hit() {
        let actor = shared(fixed_actor(0, Point::new(0, 0)));
        let (cb, n) = counting();
        let d = HitDetector::new(actor.clone(), 2, PauseToken::new(), cb);
        assert!(!d.on_touch(TouchEvent::new(0, 0)));
        lock(&actor).show().unwrap();
        lock(&actor).hide();
        assert!(!d.on_touch(TouchEvent::new(1, 1)));
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_paused_game_ignores_touches() {
        let actor = shared(fixed_actor(0, Point::new(2, 2)));
        lock(&actor).show().unwrap();
        let paused = PauseToken::new();
        let (cb, n) = counting();
        let d = HitDetector::new(actor, 0, paused.clone(), cb);
        paused.set(true);
        assert!(!d.on_touch(TouchEvent::new(2, 2)));
        paused.set(false);
        assert!(d.on_touch(TouchEvent::new(2, 2)));
        assert_eq!(n.load(Ordering::SeqCst), 1);
    }
}
