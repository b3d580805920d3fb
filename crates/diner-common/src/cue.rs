//! Cue identifiers.

use serde::{Deserialize, Serialize};

/// A named playable voice line or animation.
///
/// The set is closed: every cue the experiment can play is listed here, and
/// descriptors are resolved against this enum once when configuration loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Greeting,
    OrderPrompt,
    SurveyPrompt,
    SurveyClosing,
    Farewell,
    TurnLeft,
    TurnRight,
    AmbienceA,
    AmbienceB,
}

impl Cue {
    pub const ALL: [Cue; 9] = [
        Cue::Greeting,
        Cue::OrderPrompt,
        Cue::SurveyPrompt,
        Cue::SurveyClosing,
        Cue::Farewell,
        Cue::TurnLeft,
        Cue::TurnRight,
        Cue::AmbienceA,
        Cue::AmbienceB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Cue::Greeting => "greeting",
            Cue::OrderPrompt => "order_prompt",
            Cue::SurveyPrompt => "survey_prompt",
            Cue::SurveyClosing => "survey_closing",
            Cue::Farewell => "farewell",
            Cue::TurnLeft => "turn_left",
            Cue::TurnRight => "turn_right",
            Cue::AmbienceA => "ambience_a",
            Cue::AmbienceB => "ambience_b",
        }
    }

    /// True for cues the agent speaks (and gestures while speaking).
    pub fn is_voice(self) -> bool {
        matches!(
            self,
            Cue::Greeting | Cue::OrderPrompt | Cue::SurveyPrompt | Cue::SurveyClosing | Cue::Farewell
        )
    }
}

impl std::fmt::Display for Cue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Cue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cue::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown cue '{}'", s))
    }
}
