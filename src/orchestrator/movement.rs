//! Walk legs: turn in place, walk, arrive, settle.

use std::time::Duration;

use diner_common::{Cue, Point, angle_between, rotate_towards, yaw_between};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TimingSection;
use crate::cue::CuePlayer;
use crate::mover::Mover;

use super::Presentation;
use super::stage::Countdown;

/// Targets closer than this (squared, in floor units) need no turn.
const NEGLIGIBLE_DISTANCE_SQ: f32 = 0.01;

/// Which way the agent visibly turns. Chosen by the script, not by geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn cue(self) -> Cue {
        match self {
            TurnDirection::Left => Cue::TurnLeft,
            TurnDirection::Right => Cue::TurnRight,
        }
    }
}

/// Orientation requirement at the end of a leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Facing {
    /// Keep whatever heading the walk ends with.
    Free,
    /// Turn toward this point while closing in on the destination.
    Toward(Point),
}

/// Destination plus facing requirement for one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTarget {
    pub point: Point,
    pub facing: Facing,
}

/// Collaborators a leg drives.
pub struct LegEnv<'a> {
    pub mover: &'a mut dyn Mover,
    pub cues: Option<&'a mut (dyn CuePlayer + 'static)>,
    pub presentation: &'a mut Presentation,
    pub timing: &'a TimingSection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LegState {
    Begin,
    Turning {
        target_yaw: f32,
        cue: Duration,
        elapsed: Duration,
    },
    PostTurn(Countdown),
    StartMove,
    Walking,
    Settling(Countdown),
    Arrived,
}

/// One movement request, advanced frame by frame.
#[derive(Debug, Clone)]
pub struct WalkLeg {
    target: PoseTarget,
    direction: TurnDirection,
    state: LegState,
}

impl WalkLeg {
    pub fn new(target: PoseTarget, direction: TurnDirection) -> Self {
        Self {
            target,
            direction,
            state: LegState::Begin,
        }
    }

    pub fn target(&self) -> PoseTarget {
        self.target
    }

    pub fn is_arrived(&self) -> bool {
        self.state == LegState::Arrived
    }

    /// Advance by `dt`. Returns true once the agent has arrived and settled.
    pub fn advance(&mut self, dt: Duration, env: LegEnv<'_>) -> bool {
        let LegEnv {
            mover,
            mut cues,
            presentation,
            timing,
        } = env;
        let mut dt = dt;

        loop {
            match self.state {
                LegState::Begin => {
                    mover.halt();
                    mover.clear_path();

                    let position = mover.position();
                    let target_yaw = yaw_between(position, self.target.point);
                    let close = position.distance_sq(self.target.point) <= NEGLIGIBLE_DISTANCE_SQ;
                    let aligned =
                        angle_between(mover.heading(), target_yaw) <= timing.turn_tolerance_deg;
                    if close || aligned {
                        debug!(target = %self.target.point, "No turn needed");
                        self.state = LegState::StartMove;
                        continue;
                    }

                    let cue = self.direction.cue();
                    let cue_duration = match cues.as_deref_mut() {
                        Some(player) => player.play(cue),
                        None => {
                            warn!(%cue, "No cue player attached; turning without a cue");
                            Duration::ZERO
                        }
                    };
                    presentation.set_turning(self.direction);
                    debug!(direction = ?self.direction, target_yaw, "Turning toward target");
                    self.state = LegState::Turning {
                        target_yaw,
                        cue: cue_duration,
                        elapsed: Duration::ZERO,
                    };
                    dt = Duration::ZERO;
                }
                LegState::Turning {
                    target_yaw,
                    cue,
                    elapsed,
                } => {
                    let elapsed = elapsed + dt;
                    let heading = rotate_towards(
                        mover.heading(),
                        target_yaw,
                        timing.turn_speed_deg * dt.as_secs_f32(),
                    );
                    mover.set_heading(heading);

                    let aligned = angle_between(heading, target_yaw) <= timing.turn_tolerance_deg;
                    if elapsed >= cue && aligned {
                        mover.set_heading(target_yaw);
                        presentation.clear_turning();
                        self.state = LegState::PostTurn(Countdown::new(timing.post_turn_pause()));
                        dt = Duration::ZERO;
                        continue;
                    }
                    self.state = LegState::Turning {
                        target_yaw,
                        cue,
                        elapsed,
                    };
                    return false;
                }
                LegState::PostTurn(mut pause) => {
                    if pause.advance(dt) {
                        self.state = LegState::StartMove;
                        dt = Duration::ZERO;
                        continue;
                    }
                    self.state = LegState::PostTurn(pause);
                    return false;
                }
                LegState::StartMove => {
                    mover.move_to(self.target.point);
                    presentation.walking = true;
                    debug!(target = %self.target.point, "Walking");
                    self.state = LegState::Walking;
                    return false;
                }
                LegState::Walking => {
                    if !mover.has_path() || mover.has_pending_path() {
                        return false;
                    }
                    let remaining = mover.remaining_distance();
                    let margin = mover.stopping_margin();

                    if let Facing::Toward(focus) = self.target.facing {
                        if remaining <= timing.arrival_rotation_distance && remaining > margin {
                            let yaw = yaw_between(mover.position(), focus);
                            let heading = rotate_towards(
                                mover.heading(),
                                yaw,
                                timing.approach_turn_speed_deg * dt.as_secs_f32(),
                            );
                            mover.set_heading(heading);
                        }
                    }

                    if remaining <= margin.max(timing.arrival_floor) {
                        presentation.walking = false;
                        debug!(remaining, "Arrived; settling");
                        self.state = LegState::Settling(Countdown::new(timing.settle()));
                        dt = Duration::ZERO;
                        continue;
                    }
                    return false;
                }
                LegState::Settling(mut settle) => {
                    if settle.advance(dt) {
                        self.state = LegState::Arrived;
                        return true;
                    }
                    self.state = LegState::Settling(settle);
                    return false;
                }
                LegState::Arrived => return true,
            }
        }
    }
}
