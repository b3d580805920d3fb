//! Stage table and per-stage step scripts.

use std::time::Duration;

use diner_common::{Cue, Phase, Point};
use serde::Serialize;

use crate::config::TimingSection;
use crate::gate::GateFlag;

use super::movement::{Facing, PoseTarget, TurnDirection};

/// Position in the scripted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Phase1Outbound,
    Phase1Greet,
    Phase1Return,
    WaitOrderNow,
    Phase2Outbound,
    Phase2Order,
    WaitOrderConfirm,
    Phase3Survey,
    Phase4Outbound,
    Phase4Thanks,
    Phase4Return,
    Done,
}

impl Stage {
    /// Every stage a run visits, in order.
    pub const SEQUENCE: [Stage; 12] = [
        Stage::Phase1Outbound,
        Stage::Phase1Greet,
        Stage::Phase1Return,
        Stage::WaitOrderNow,
        Stage::Phase2Outbound,
        Stage::Phase2Order,
        Stage::WaitOrderConfirm,
        Stage::Phase3Survey,
        Stage::Phase4Outbound,
        Stage::Phase4Thanks,
        Stage::Phase4Return,
        Stage::Done,
    ];

    pub fn phase(self) -> Option<Phase> {
        match self {
            Stage::Idle => None,
            Stage::Phase1Outbound | Stage::Phase1Greet | Stage::Phase1Return | Stage::WaitOrderNow => {
                Some(Phase::Greeting)
            }
            Stage::Phase2Outbound | Stage::Phase2Order | Stage::WaitOrderConfirm => {
                Some(Phase::Ordering)
            }
            Stage::Phase3Survey => Some(Phase::Survey),
            Stage::Phase4Outbound | Stage::Phase4Thanks | Stage::Phase4Return | Stage::Done => {
                Some(Phase::Farewell)
            }
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Phase1Outbound),
            Stage::Done => None,
            other => Stage::SEQUENCE
                .iter()
                .position(|s| *s == other)
                .and_then(|i| Stage::SEQUENCE.get(i + 1))
                .copied(),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Done
    }

    /// Steps the stage runs, in order.
    pub fn script(self, route: &Route, timing: &TimingSection) -> Vec<Step> {
        let outbound = Step::Walk(
            PoseTarget {
                point: route.destination,
                facing: Facing::Toward(route.participant),
            },
            TurnDirection::Right,
        );
        let homebound = Step::Walk(
            PoseTarget {
                point: route.origin,
                facing: Facing::Free,
            },
            TurnDirection::Left,
        );

        match self {
            Stage::Idle | Stage::Done => Vec::new(),
            Stage::Phase1Outbound | Stage::Phase2Outbound => {
                vec![Step::Delay(timing.walk_delay()), outbound]
            }
            Stage::Phase1Greet => vec![
                Step::ShowPanels(Phase::Greeting),
                Step::Speak(Cue::Greeting),
            ],
            Stage::Phase1Return | Stage::Phase4Return => {
                vec![Step::Delay(timing.return_delay()), homebound]
            }
            Stage::WaitOrderNow => vec![Step::AwaitFlag(GateFlag::OrderNowClicked)],
            Stage::Phase2Order => vec![
                Step::ShowPanels(Phase::Ordering),
                Step::Speak(Cue::OrderPrompt),
            ],
            Stage::WaitOrderConfirm => vec![
                Step::AwaitFlag(GateFlag::OrderingConfirmed),
                Step::CaptureOrder,
                Step::HideOrderPanels,
            ],
            Stage::Phase3Survey => vec![
                Step::ShowPanels(Phase::Survey),
                Step::StartSurvey,
                Step::Speak(Cue::SurveyPrompt),
                Step::AwaitSurvey,
            ],
            Stage::Phase4Outbound => vec![
                Step::FlushRecord,
                Step::Delay(timing.walk_delay()),
                outbound,
            ],
            Stage::Phase4Thanks => vec![Step::Speak(Cue::Farewell)],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Phase1Outbound => "phase1_outbound",
            Stage::Phase1Greet => "phase1_greet",
            Stage::Phase1Return => "phase1_return",
            Stage::WaitOrderNow => "wait_order_now",
            Stage::Phase2Outbound => "phase2_outbound",
            Stage::Phase2Order => "phase2_order",
            Stage::WaitOrderConfirm => "wait_order_confirm",
            Stage::Phase3Survey => "phase3_survey",
            Stage::Phase4Outbound => "phase4_outbound",
            Stage::Phase4Thanks => "phase4_thanks",
            Stage::Phase4Return => "phase4_return",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// The three points a run moves between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub origin: Point,
    pub destination: Point,
    pub participant: Point,
}

/// One unit of work inside a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Delay(Duration),
    Walk(PoseTarget, TurnDirection),
    ShowPanels(Phase),
    Speak(Cue),
    AwaitFlag(GateFlag),
    /// Copy the confirmed order into the session.
    CaptureOrder,
    HideOrderPanels,
    StartSurvey,
    AwaitSurvey,
    /// Seal the session and hand it to the record sink.
    FlushRecord,
}

/// Countdown timer. Leftover frame time is not carried into the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
        }
    }

    /// Consume `dt`; true once the timer has run out.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.remaining.is_zero()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}
