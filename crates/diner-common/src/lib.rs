//! Shared domain types for the diner experiment runtime.
//!
//! Everything here is plain data: ground-plane geometry, the four experiment
//! phases, participant conditions, cue identifiers and the per-participant
//! session record. The orchestration runtime in the `diner` crate builds on
//! these types; nothing in this crate performs I/O.

pub mod cue;
pub mod geometry;
pub mod phase;
pub mod session;

pub use cue::Cue;
pub use geometry::{Point, angle_between, rotate_towards, yaw_between};
pub use phase::{Condition, ConditionProfile, InvalidCondition, Phase};
pub use session::{RECORD_COLUMNS, Session, SurveyAnswers};
