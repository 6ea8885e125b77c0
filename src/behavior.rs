//! Pop-up behavior: drives one actor through appear, wait, hit-or-timeout, cooldown.

use crate::actor::Actor;
use crate::error::EngineError;
use crate::loops::{GameComponent, Pausable, StopListener};
use crate::sprite::Variant;
use crate::sync::{Shared, lock};
use rand::Rng;
use rand::rngs::StdRng;
use std::ops::RangeInclusive;

/// Timings for one pop-up cycle, all in ms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopUpTuning {
    /// Delay spent hidden before the next appearance.
    pub hidden: RangeInclusive<u64>,
    /// Length of the rise animation.
    pub rise: u64,
    /// How long the actor stays up, once risen, if nobody hits it.
    pub visible: RangeInclusive<u64>,
    /// How long the hit art shows before the actor ducks.
    pub hit_flash: u64,
}

impl Default for PopUpTuning {
    fn default() -> Self {
        Self {
            hidden: 400..=2200,
            rise: 150,
            visible: 800..=1600,
            hit_flash: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopUpState {
    Hidden,
    Rising,
    Visible,
    Hit,
}

pub struct PopUpBehavior {
    actor: Shared<Actor>,
    state: PopUpState,
    in_state_ms: u64,
    /// Deadline for the current state (hidden wait or visible budget).
    budget_ms: u64,
    tuning: PopUpTuning,
    rng: StdRng,
    hits: u32,
    misses: u32,
    /// Set once the level stops; the actor stays down from then on.
    retired: bool,
}

impl PopUpBehavior {
    pub fn new(actor: Shared<Actor>, tuning: PopUpTuning, mut rng: StdRng) -> Self {
        let budget_ms = rng.gen_range(tuning.hidden.clone());
        Self {
            actor,
            state: PopUpState::Hidden,
            in_state_ms: 0,
            budget_ms,
            tuning,
            rng,
            hits: 0,
            misses: 0,
            retired: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PopUpState {
        self.state
    }

    #[cfg(test)]
    pub fn elapsed_in_state(&self) -> u64 {
        self.in_state_ms
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    fn enter(&mut self, state: PopUpState) {
        let id = lock(&self.actor).id();
        log::debug!("meerkat {id}: {:?} -> {state:?} after {} ms", self.state, self.in_state_ms);
        self.state = state;
        self.in_state_ms = 0;
        self.budget_ms = match state {
            PopUpState::Hidden => self.rng.gen_range(self.tuning.hidden.clone()),
            PopUpState::Rising => self.tuning.rise,
            PopUpState::Visible => self.rng.gen_range(self.tuning.visible.clone()),
            PopUpState::Hit => self.tuning.hit_flash,
        };
    }

    /// Accepts a hit while rising or up. Returns false if there was nothing to hit,
    /// e.g. a second tap during the hit flash.
    pub fn hit(&mut self) -> bool {
        if self.retired {
            return false;
        }
        match self.state {
            PopUpState::Rising | PopUpState::Visible => {
                self.hits += 1;
                lock(&self.actor).set_variant(Variant::Hit);
                self.enter(PopUpState::Hit);
                true
            }
            PopUpState::Hidden | PopUpState::Hit => false,
        }
    }
}

impl GameComponent for PopUpBehavior {
    fn play(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        if self.retired {
            return Ok(());
        }
        lock(&self.actor).advance_animations(elapsed_ms);
        self.in_state_ms += elapsed_ms;
        if self.in_state_ms < self.budget_ms {
            return Ok(());
        }
        match self.state {
            PopUpState::Hidden => {
                lock(&self.actor).show()?;
                self.enter(PopUpState::Rising);
            }
            PopUpState::Rising => self.enter(PopUpState::Visible),
            PopUpState::Visible => {
                self.misses += 1;
                lock(&self.actor).hide();
                self.enter(PopUpState::Hidden);
            }
            PopUpState::Hit => {
                {
                    let mut actor = lock(&self.actor);
                    actor.set_variant(Variant::Normal);
                    actor.hide();
                }
                self.enter(PopUpState::Hidden);
            }
        }
        Ok(())
    }
}

impl Pausable for PopUpBehavior {}

/// Lowers the actor for good. Runs before the final score is read, so a tap racing
/// the stop either lands first or is refused.
impl StopListener for PopUpBehavior {
    fn on_stop(&mut self) {
        self.retired = true;
        let mut actor = lock(&self.actor);
        log::debug!("meerkat {} retired", actor.id());
        actor.set_variant(Variant::Normal);
        actor.hide();
    }
}
