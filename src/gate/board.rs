//! In-process menu board: the UI end of the gate.
//!
//! Holds panel visibility and toggle state, applies orchestrator panel
//! commands, and turns participant input into published flags.

use std::collections::BTreeSet;

use diner_common::Phase;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::flags::{FlagPublisher, GateFlag, GateFlags};
use super::{PanelCommand, PanelId};

/// Which confirmation toggle an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    No,
}

/// Participant input on the menu panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    OrderNow,
    SelectFood(String),
    /// A confirmation toggle changed state.
    Confirm { choice: ConfirmChoice, on: bool },
}

/// Visual state of the Yes/No toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmToggles {
    pub yes: bool,
    pub no: bool,
}

impl ConfirmToggles {
    fn set(&mut self, choice: ConfirmChoice, on: bool) {
        match choice {
            ConfirmChoice::Yes => self.yes = on,
            ConfirmChoice::No => self.no = on,
        }
    }
}

#[derive(Debug)]
pub struct MenuBoard {
    publisher: FlagPublisher,
    commands: mpsc::UnboundedReceiver<PanelCommand>,
    visible: BTreeSet<PanelId>,
    /// Last food picked; kept across silent toggle resets.
    selected_food: Option<String>,
    /// Which food toggle is visually on. Cleared by silent resets.
    food_toggle: Option<String>,
    confirm: ConfirmToggles,
    /// Food selection is ignored for one frame after the order menu is prepared.
    initializing: bool,
}

impl MenuBoard {
    pub(super) fn new(
        publisher: FlagPublisher,
        commands: mpsc::UnboundedReceiver<PanelCommand>,
    ) -> Self {
        Self {
            publisher,
            commands,
            visible: BTreeSet::new(),
            selected_food: None,
            food_toggle: None,
            confirm: ConfirmToggles::default(),
            initializing: false,
        }
    }

    /// Apply every panel command the orchestrator has sent so far.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    /// Start-of-frame housekeeping.
    pub fn frame(&mut self) {
        if self.initializing {
            self.initializing = false;
            debug!("Order menu ready for selection");
        }
        self.enforce_exclusivity();
    }

    pub fn apply(&mut self, command: PanelCommand) {
        debug!(?command, "Applying panel command");
        match command {
            PanelCommand::ShowPhase(phase) => self.show_phase(phase),
            PanelCommand::Show(panel) => {
                self.visible.insert(panel);
            }
            PanelCommand::Hide(PanelId::SurveyRoot) => {
                self.visible.retain(|p| p.group() != Phase::Survey);
            }
            PanelCommand::Hide(panel) => {
                self.visible.remove(&panel);
            }
            PanelCommand::Reset => self.reset(),
        }
        self.enforce_exclusivity();
    }

    fn show_phase(&mut self, phase: Phase) {
        let stale: Vec<PanelId> = self
            .visible
            .iter()
            .copied()
            .filter(|p| p.group() != phase)
            .collect();
        for panel in stale {
            debug!(%panel, %phase, "Closing panel from another phase");
            self.visible.remove(&panel);
        }

        match phase {
            Phase::Greeting => {
                self.visible.insert(PanelId::MenuRead);
            }
            Phase::Ordering => {
                self.visible.remove(&PanelId::OrderConfirm);
                self.visible.insert(PanelId::OrderMenu);
                self.reset_food_silently();
                self.confirm = ConfirmToggles::default();
                self.publisher.set_level(GateFlag::FoodSelected, false);
                self.initializing = true;
            }
            Phase::Survey => {
                self.visible.insert(PanelId::SurveyRoot);
            }
            Phase::Farewell => {}
        }
    }

    fn reset(&mut self) {
        self.visible.clear();
        self.selected_food = None;
        self.reset_food_silently();
        self.confirm = ConfirmToggles::default();
        self.initializing = false;
        self.publisher.reset();
        info!("Menu board reset");
    }

    /// Handle participant input. Returns whether the event had any effect.
    pub fn handle(&mut self, event: MenuEvent) -> bool {
        let handled = match event {
            MenuEvent::OrderNow => self.on_order_now(),
            MenuEvent::SelectFood(id) => self.on_select_food(id),
            MenuEvent::Confirm { choice, on } => self.on_confirm(choice, on),
        };
        self.enforce_exclusivity();
        handled
    }

    fn on_order_now(&mut self) -> bool {
        if !self.is_visible(PanelId::MenuRead) {
            warn!("Order now pressed while the menu is not shown; ignoring");
            return false;
        }
        self.visible.remove(&PanelId::MenuRead);
        self.reset_food_silently();
        self.visible.remove(&PanelId::OrderConfirm);
        self.publisher.raise_once(GateFlag::OrderNowClicked);
        true
    }

    fn on_select_food(&mut self, id: String) -> bool {
        if self.initializing {
            debug!(food = %id, "Order menu still initializing; ignoring selection");
            return false;
        }
        if !self.is_visible(PanelId::OrderMenu) {
            warn!(food = %id, "Food selected while the order menu is hidden; ignoring");
            return false;
        }
        info!(food = %id, "Food selected");
        self.food_toggle = Some(id.clone());
        self.selected_food = Some(id);
        self.publisher.set_level(GateFlag::FoodSelected, true);

        self.visible.remove(&PanelId::OrderMenu);
        self.confirm = ConfirmToggles::default();
        self.visible.insert(PanelId::OrderConfirm);
        true
    }

    fn on_confirm(&mut self, choice: ConfirmChoice, on: bool) -> bool {
        self.confirm.set(choice, on);
        if !on {
            return false;
        }
        if !self.is_visible(PanelId::OrderConfirm) {
            warn!(?choice, "Confirmation pressed while it is not shown; ignoring");
            return false;
        }

        match choice {
            ConfirmChoice::Yes => {
                let Some(food) = self.selected_food.clone() else {
                    warn!("Confirmed without a selected dish; ignoring");
                    return false;
                };
                self.publisher.publish_order(&food);
                self.publisher.raise_once(GateFlag::OrderingConfirmed);
                info!(order = %food, "Order confirmed");
                for panel in [PanelId::MenuRead, PanelId::OrderMenu, PanelId::OrderConfirm] {
                    self.visible.remove(&panel);
                }
            }
            ConfirmChoice::No => {
                info!("Order declined; back to the menu");
                self.visible.remove(&PanelId::OrderConfirm);
                self.selected_food = None;
                self.reset_food_silently();
                self.publisher.set_level(GateFlag::FoodSelected, false);
                self.visible.insert(PanelId::OrderMenu);
            }
        }
        true
    }

    /// Clear the food toggle without treating it as a selection.
    fn reset_food_silently(&mut self) {
        self.food_toggle = None;
    }

    fn enforce_exclusivity(&mut self) {
        if self.is_visible(PanelId::OrderMenu) && self.is_visible(PanelId::OrderConfirm) {
            warn!("Order menu and confirmation both visible; closing confirmation");
            self.visible.remove(&PanelId::OrderConfirm);
            self.confirm = ConfirmToggles::default();
        }
    }

    pub fn is_visible(&self, panel: PanelId) -> bool {
        self.visible.contains(&panel)
    }

    pub fn visible_panels(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.visible.iter().copied()
    }

    /// Index of the survey question currently on screen.
    pub fn visible_question(&self) -> Option<usize> {
        self.visible.iter().find_map(|p| match p {
            PanelId::Survey(i) => Some(*i),
            _ => None,
        })
    }

    pub fn flags(&self) -> GateFlags {
        self.publisher.snapshot()
    }

    pub fn selected_food(&self) -> Option<&str> {
        self.selected_food.as_deref()
    }

    pub fn food_toggle(&self) -> Option<&str> {
        self.food_toggle.as_deref()
    }

    pub fn confirm_toggles(&self) -> ConfirmToggles {
        self.confirm
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing
    }
}
