//! Experiment phases and participant conditions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cue::Cue;

/// One of the four ordered stages of the scripted interaction.
///
/// Ordering follows declaration order, so `Phase::Greeting < Phase::Farewell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Agent greets the participant and hands over the read-only menu.
    Greeting,
    /// Participant picks and confirms a dish.
    Ordering,
    /// Participant answers the questionnaire.
    Survey,
    /// Agent thanks the participant and leaves.
    Farewell,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Greeting,
        Phase::Ordering,
        Phase::Survey,
        Phase::Farewell,
    ];

    /// Ordinal in `1..=4`.
    pub fn number(self) -> u8 {
        match self {
            Phase::Greeting => 1,
            Phase::Ordering => 2,
            Phase::Survey => 3,
            Phase::Farewell => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.number() == n)
    }

    pub fn next(self) -> Option<Phase> {
        Phase::from_number(self.number() + 1)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition must be between 1 and 4, got {0}")]
pub struct InvalidCondition(pub u8);

/// Experimental condition assigned to a participant, `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Condition(u8);

impl Condition {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Result<Self, InvalidCondition> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidCondition(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Presentation settings for this condition.
    ///
    /// Conditions 1-2 share the first ambience track, 3-4 the second; odd
    /// conditions use the cool white balance and even ones the warm one.
    pub fn profile(self) -> ConditionProfile {
        let ambience = if self.0 <= 2 {
            Cue::AmbienceA
        } else {
            Cue::AmbienceB
        };
        let white_balance = if self.0 % 2 == 1 { -20.0 } else { 20.0 };
        ConditionProfile {
            condition: self,
            ambience,
            white_balance,
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for Condition {
    type Error = InvalidCondition;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Condition::new(value)
    }
}

impl From<Condition> for u8 {
    fn from(c: Condition) -> u8 {
        c.0
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scene settings derived from a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionProfile {
    pub condition: Condition,
    /// Background track played when the run starts.
    pub ambience: Cue,
    /// Colour temperature offset applied by the renderer.
    pub white_balance: f32,
}
