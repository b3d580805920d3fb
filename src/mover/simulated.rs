use std::time::Duration;

use diner_common::Point;

use super::Mover;

/// Kinematic stand-in for a navigation agent.
///
/// Walks in a straight line at constant speed and stops at its stopping
/// distance. Path computation takes a configurable number of frames, like a
/// real navigator answering a request asynchronously.
#[derive(Debug, Clone)]
pub struct SimulatedMover {
    position: Point,
    heading: f32,
    speed: f32,
    stopping_distance: f32,
    destination: Option<Point>,
    pending_frames: u32,
    path_delay_frames: u32,
    halted: bool,
}

impl SimulatedMover {
    pub fn new(position: Point, speed: f32, stopping_distance: f32) -> Self {
        Self {
            position,
            heading: 0.0,
            speed,
            stopping_distance,
            destination: None,
            pending_frames: 0,
            path_delay_frames: 1,
            halted: true,
        }
    }

    /// Frames a path request stays pending.
    pub fn with_path_delay(mut self, frames: u32) -> Self {
        self.path_delay_frames = frames;
        self
    }

    pub fn destination(&self) -> Option<Point> {
        self.destination
    }
}

impl Mover for SimulatedMover {
    fn position(&self) -> Point {
        self.position
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn set_heading(&mut self, yaw: f32) {
        self.heading = yaw;
    }

    fn move_to(&mut self, target: Point) {
        self.destination = Some(target);
        self.pending_frames = self.path_delay_frames;
        self.halted = false;
    }

    fn has_path(&self) -> bool {
        self.destination.is_some()
    }

    fn has_pending_path(&self) -> bool {
        self.destination.is_some() && self.pending_frames > 0
    }

    fn remaining_distance(&self) -> f32 {
        match self.destination {
            Some(dest) if self.pending_frames == 0 => self.position.distance_to(dest),
            _ => 0.0,
        }
    }

    fn stopping_margin(&self) -> f32 {
        self.stopping_distance
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn clear_path(&mut self) {
        self.destination = None;
        self.pending_frames = 0;
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn update(&mut self, dt: Duration) {
        let Some(dest) = self.destination else {
            return;
        };
        if self.pending_frames > 0 {
            self.pending_frames -= 1;
            return;
        }
        if self.halted {
            return;
        }
        let remaining = self.position.distance_to(dest);
        if remaining <= self.stopping_distance {
            return;
        }
        let step = (self.speed * dt.as_secs_f32()).min(remaining - self.stopping_distance);
        self.position = self.position.step_towards(dest, step);
    }
}
