//! Scripted participant for unattended runs.
//!
//! Watches the menu board and answers whatever prompt is on screen after a
//! short reaction delay. Used by `diner run --autopilot` and the end-to-end
//! tests.

use tracing::debug;

use crate::gate::{ConfirmChoice, MenuBoard, MenuEvent, PanelId, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    MenuRead,
    OrderMenu,
    OrderConfirm,
    Question(usize),
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    order: String,
    answers: Vec<u32>,
    reaction_frames: u32,
    seen: Option<Prompt>,
    waited: u32,
}

impl Autopilot {
    pub fn new(order: impl Into<String>, answers: Vec<u32>) -> Self {
        Self {
            order: order.into(),
            answers,
            reaction_frames: 2,
            seen: None,
            waited: 0,
        }
    }

    /// Frames a prompt must stay on screen before it is answered.
    pub fn with_reaction_frames(mut self, frames: u32) -> Self {
        self.reaction_frames = frames;
        self
    }

    /// Look at the board once per frame; returns the events to send.
    pub fn observe(&mut self, board: &MenuBoard) -> Vec<UiEvent> {
        let prompt = Self::prompt(board);
        if prompt != self.seen {
            self.seen = prompt;
            self.waited = 0;
        }
        let Some(prompt) = prompt else {
            return Vec::new();
        };
        if self.waited < self.reaction_frames {
            self.waited += 1;
            return Vec::new();
        }
        self.waited = 0;

        debug!(?prompt, "Autopilot responding");
        match prompt {
            Prompt::MenuRead => vec![UiEvent::Menu(MenuEvent::OrderNow)],
            Prompt::OrderMenu => vec![UiEvent::Menu(MenuEvent::SelectFood(self.order.clone()))],
            Prompt::OrderConfirm => vec![UiEvent::Menu(MenuEvent::Confirm {
                choice: ConfirmChoice::Yes,
                on: true,
            })],
            Prompt::Question(q) => {
                vec![UiEvent::SurveyOption(self.answers.get(q).copied().unwrap_or(0))]
            }
        }
    }

    fn prompt(board: &MenuBoard) -> Option<Prompt> {
        if let Some(q) = board.visible_question() {
            return Some(Prompt::Question(q));
        }
        if board.is_visible(PanelId::OrderConfirm) {
            return Some(Prompt::OrderConfirm);
        }
        if board.is_visible(PanelId::OrderMenu) && !board.is_initializing() {
            return Some(Prompt::OrderMenu);
        }
        if board.is_visible(PanelId::MenuRead) {
            return Some(Prompt::MenuRead);
        }
        None
    }
}
