//! Phase orchestrator.
//!
//! An explicit state machine advanced by [`Orchestrator::tick`]. Each
//! [`Stage`] runs a short script of [`Step`]s; a step either finishes the
//! moment it starts (panel requests, session writes) or suspends across
//! ticks (delays, walk legs, speech, waits on UI flags).
//!
//! Within one tick the active step receives the frame's `dt`. Steps started
//! later in the same tick are advanced with zero time, so a tick never
//! spends its `dt` twice.

mod engine;
mod movement;
mod speech;
mod stage;

use serde::Serialize;

pub use engine::{Orchestrator, RunStatus};
pub use movement::{Facing, PoseTarget, TurnDirection, WalkLeg};
pub use speech::SpeechStep;
pub use stage::{Countdown, Route, Stage, Step};

/// Presentation flags the rendering host animates from.
///
/// At most one of turning and talking is up at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub walking: bool,
    pub turning_left: bool,
    pub turning_right: bool,
    pub talking: bool,
}

impl Presentation {
    pub fn turning(&self) -> bool {
        self.turning_left || self.turning_right
    }

    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn set_turning(&mut self, direction: TurnDirection) {
        self.turning_left = direction == TurnDirection::Left;
        self.turning_right = direction == TurnDirection::Right;
    }

    fn clear_turning(&mut self) {
        self.turning_left = false;
        self.turning_right = false;
    }
}
