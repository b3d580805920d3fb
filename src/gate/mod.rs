//! UI gate: the contract between the orchestrator and the participant-facing UI.
//!
//! Traffic is one-way in each direction:
//!
//! - UI → orchestrator: flags published on a `watch` channel ([`FlagPublisher`]).
//!   The orchestrator reads the latest value each tick and never writes.
//! - orchestrator → UI: panel requests sent as [`PanelCommand`]s over an
//!   unbounded `mpsc` channel, applied by the UI when the host syncs it.
//!
//! [`channel`] builds both ends: a [`MenuBoard`] for the UI side and a
//! [`GateHandle`] implementing [`UiGate`] for the orchestrator.

mod board;
mod flags;

use diner_common::Phase;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::errors::GateError;

pub use board::{ConfirmChoice, ConfirmToggles, MenuBoard, MenuEvent};
pub use flags::{FlagPublisher, GateFlag, GateFlags};

/// A UI panel the orchestrator can show or hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    /// Read-only menu handed over in phase 1.
    MenuRead,
    /// Dish selection.
    OrderMenu,
    /// Yes/No confirmation of the selected dish.
    OrderConfirm,
    /// Questionnaire container.
    SurveyRoot,
    /// One question of the questionnaire.
    Survey(usize),
}

impl PanelId {
    /// Phase whose panel group this panel belongs to.
    pub fn group(self) -> Phase {
        match self {
            PanelId::MenuRead => Phase::Greeting,
            PanelId::OrderMenu | PanelId::OrderConfirm => Phase::Ordering,
            PanelId::SurveyRoot | PanelId::Survey(_) => Phase::Survey,
        }
    }
}

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelId::MenuRead => f.write_str("menu_read"),
            PanelId::OrderMenu => f.write_str("order_menu"),
            PanelId::OrderConfirm => f.write_str("order_confirm"),
            PanelId::SurveyRoot => f.write_str("survey"),
            PanelId::Survey(i) => write!(f, "survey_{}", i + 1),
        }
    }
}

/// Panel request from the orchestrator to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    /// Show the primary panel group of a phase, closing the others.
    ShowPhase(Phase),
    Show(PanelId),
    Hide(PanelId),
    /// Close every panel and clear published flags for a fresh run.
    Reset,
}

/// Everything the UI can deliver to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Menu(MenuEvent),
    /// Option picked on the visible survey panel.
    SurveyOption(u32),
}

/// The orchestrator's view of the UI.
pub trait UiGate: Send {
    /// Fails once the UI end has gone away.
    fn connected(&self) -> Result<(), GateError>;

    /// Level-triggered read of a published flag.
    fn read_flag(&self, flag: GateFlag) -> Result<bool, GateError>;

    /// The dish the participant confirmed, if any.
    fn order_choice(&self) -> Result<Option<String>, GateError>;

    /// Show the primary panel group for `phase`.
    fn show_panel(&mut self, phase: Phase) -> Result<(), GateError>;

    fn show(&mut self, panel: PanelId) -> Result<(), GateError>;

    fn hide_panel(&mut self, panel: PanelId) -> Result<(), GateError>;

    /// Ask the UI to start over: all panels closed, all flags cleared.
    fn reset(&mut self) -> Result<(), GateError>;
}

/// Orchestrator end of the gate channel.
#[derive(Debug)]
pub struct GateHandle {
    flags: watch::Receiver<GateFlags>,
    commands: mpsc::UnboundedSender<PanelCommand>,
}

impl GateHandle {
    fn send(&self, command: PanelCommand) -> Result<(), GateError> {
        self.commands
            .send(command)
            .map_err(|_| GateError::Disconnected)
    }
}

impl UiGate for GateHandle {
    fn connected(&self) -> Result<(), GateError> {
        if self.commands.is_closed() || self.flags.has_changed().is_err() {
            return Err(GateError::Disconnected);
        }
        Ok(())
    }

    fn read_flag(&self, flag: GateFlag) -> Result<bool, GateError> {
        self.connected()?;
        Ok(self.flags.borrow().get(flag))
    }

    fn order_choice(&self) -> Result<Option<String>, GateError> {
        self.connected()?;
        Ok(self.flags.borrow().order_choice.clone())
    }

    fn show_panel(&mut self, phase: Phase) -> Result<(), GateError> {
        self.send(PanelCommand::ShowPhase(phase))
    }

    fn show(&mut self, panel: PanelId) -> Result<(), GateError> {
        self.send(PanelCommand::Show(panel))
    }

    fn hide_panel(&mut self, panel: PanelId) -> Result<(), GateError> {
        self.send(PanelCommand::Hide(panel))
    }

    fn reset(&mut self) -> Result<(), GateError> {
        self.send(PanelCommand::Reset)
    }
}

/// Build a connected UI board and orchestrator gate handle.
pub fn channel() -> (MenuBoard, GateHandle) {
    let (publisher, flags) = FlagPublisher::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let board = MenuBoard::new(publisher, rx);
    let handle = GateHandle {
        flags,
        commands: tx,
    };
    (board, handle)
}
