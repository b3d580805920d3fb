//! Ground-plane geometry.
//!
//! The agent moves on a flat floor, so positions are `(x, z)` pairs and
//! orientation is a single yaw angle in degrees. Yaw 0 faces +z and yaw 90
//! faces +x.

use serde::{Deserialize, Serialize};

/// A point on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx * dx + dz * dz
    }

    /// Move toward `target` by at most `max_step`, never overshooting.
    pub fn step_towards(&self, target: Point, max_step: f32) -> Point {
        let dist = self.distance_to(target);
        if dist <= max_step || dist <= f32::EPSILON {
            return target;
        }
        let t = max_step / dist;
        Point::new(
            self.x + (target.x - self.x) * t,
            self.z + (target.z - self.z) * t,
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.z)
    }
}

/// Yaw (degrees, normalized to `[0, 360)`) that looks from `from` toward `to`.
pub fn yaw_between(from: Point, to: Point) -> f32 {
    let yaw = (to.x - from.x).atan2(to.z - from.z).to_degrees();
    normalize(yaw)
}

/// Unsigned shortest angle between two yaws, in `[0, 180]`.
pub fn angle_between(a: f32, b: f32) -> f32 {
    signed_delta(a, b).abs()
}

/// Rotate `current` toward `target` along the shortest arc by at most `max_delta` degrees.
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = signed_delta(current, target);
    if delta.abs() <= max_delta {
        return normalize(target);
    }
    normalize(current + max_delta.copysign(delta))
}

fn signed_delta(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    delta
}

fn normalize(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
