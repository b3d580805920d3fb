//! Published gate flags.
//!
//! The UI side owns the only [`FlagPublisher`]; the orchestrator holds a
//! `watch::Receiver` inside its gate handle and can only read.

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

/// Named flags the orchestrator polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFlag {
    /// "Order now" pressed on the read-only menu. Set once.
    OrderNowClicked,
    /// A dish is currently selected. Cleared when the participant declines.
    FoodSelected,
    /// The participant confirmed the order. Set once.
    OrderingConfirmed,
}

impl GateFlag {
    /// Flags that may only go from false to true.
    pub fn is_once(self) -> bool {
        matches!(self, GateFlag::OrderNowClicked | GateFlag::OrderingConfirmed)
    }
}

impl std::fmt::Display for GateFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GateFlag::OrderNowClicked => "orderNowClicked",
            GateFlag::FoodSelected => "foodSelected",
            GateFlag::OrderingConfirmed => "orderingConfirmed",
        };
        f.write_str(name)
    }
}

/// Snapshot of everything the UI publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateFlags {
    pub order_now_clicked: bool,
    pub food_selected: bool,
    pub ordering_confirmed: bool,
    /// Dish confirmed by the participant, published together with `ordering_confirmed`.
    pub order_choice: Option<String>,
}

impl GateFlags {
    pub fn get(&self, flag: GateFlag) -> bool {
        match flag {
            GateFlag::OrderNowClicked => self.order_now_clicked,
            GateFlag::FoodSelected => self.food_selected,
            GateFlag::OrderingConfirmed => self.ordering_confirmed,
        }
    }

    fn slot(&mut self, flag: GateFlag) -> &mut bool {
        match flag {
            GateFlag::OrderNowClicked => &mut self.order_now_clicked,
            GateFlag::FoodSelected => &mut self.food_selected,
            GateFlag::OrderingConfirmed => &mut self.ordering_confirmed,
        }
    }
}

/// Write half of the flag channel.
#[derive(Debug)]
pub struct FlagPublisher {
    tx: watch::Sender<GateFlags>,
}

impl FlagPublisher {
    pub fn new() -> (Self, watch::Receiver<GateFlags>) {
        let (tx, rx) = watch::channel(GateFlags::default());
        (Self { tx }, rx)
    }

    /// Set a once-flag. Returns false (and changes nothing) if it was already set.
    pub fn raise_once(&self, flag: GateFlag) -> bool {
        let raised = self.tx.send_if_modified(|flags| {
            let slot = flags.slot(flag);
            if *slot {
                false
            } else {
                *slot = true;
                true
            }
        });
        if raised {
            info!(%flag, "Gate flag raised");
        } else {
            debug!(%flag, "Gate flag already raised; ignoring");
        }
        raised
    }

    /// Set a level flag. Once-flags cannot be lowered through this.
    pub fn set_level(&self, flag: GateFlag, value: bool) {
        if flag.is_once() && !value {
            debug!(%flag, "Refusing to lower a once-flag");
            return;
        }
        self.tx.send_if_modified(|flags| {
            let slot = flags.slot(flag);
            let changed = *slot != value;
            *slot = value;
            changed
        });
    }

    pub fn publish_order(&self, choice: &str) {
        self.tx.send_modify(|flags| flags.order_choice = Some(choice.to_string()));
    }

    /// Clear every flag and the order choice.
    pub fn reset(&self) {
        self.tx.send_replace(GateFlags::default());
        debug!("Gate flags cleared");
    }

    pub fn snapshot(&self) -> GateFlags {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateFlags> {
        self.tx.subscribe()
    }
}
