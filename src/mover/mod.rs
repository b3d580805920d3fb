//! Point-to-point locomotion seam.
//!
//! The orchestrator never plans paths. It asks a [`Mover`] to head for a
//! point, then watches progress until arrival. Orientation is a yaw the
//! orchestrator sets directly while turning in place.

mod simulated;

use std::time::Duration;

use diner_common::Point;

pub use simulated::SimulatedMover;

/// Navigation agent driven by the orchestrator.
pub trait Mover: Send {
    /// Current position on the floor plane.
    fn position(&self) -> Point;

    /// Current yaw in degrees.
    fn heading(&self) -> f32;

    fn set_heading(&mut self, yaw: f32);

    /// Request a path to `target` and resume motion.
    fn move_to(&mut self, target: Point);

    /// True once a path exists (computed or still being computed).
    fn has_path(&self) -> bool;

    /// True while a requested path is still being computed.
    fn has_pending_path(&self) -> bool;

    /// Distance left along the current path.
    fn remaining_distance(&self) -> f32;

    /// Distance from the target at which the agent stops on its own.
    fn stopping_margin(&self) -> f32;

    /// Stop moving without discarding the path.
    fn halt(&mut self);

    /// Discard the current path.
    fn clear_path(&mut self);

    fn is_halted(&self) -> bool;

    /// Advance by one frame. Navigators that run on their own clock ignore this.
    fn update(&mut self, _dt: Duration) {}
}
