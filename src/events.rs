//! Typed checkout notifications for the UI layer.
//!
//! Events travel over an explicit unbounded channel owned by whoever opened the storefront.
//! Sending never blocks and never fails the operation that emitted it.

use tokio::sync::mpsc;
use tracing::debug;

use crate::checkout::methods::DeliveryMethodId;
use crate::model::{OrderId, StockConflict};

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    /// Validation found lines the inventory cannot cover.
    StockConflictDetected { conflicts: Vec<StockConflict> },
    /// Delivery methods were reloaded for `city`.
    DeliveryMethodsRefreshed {
        city: Option<String>,
        methods: Vec<DeliveryMethodId>,
    },
    /// A previously chosen delivery method no longer serves the selected city.
    DeliverySelectionCleared { method: DeliveryMethodId },
    OrderPlaced {
        order_id: OrderId,
        confirmation_ref: String,
    },
    /// Persisted checkout state was discarded.
    CheckoutReset { reason: String },
}

pub type EventReceiver = mpsc::UnboundedReceiver<CheckoutEvent>;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::UnboundedSender<CheckoutEvent>,
}

impl EventSender {
    /// A sender whose events go nowhere.
    pub fn detached() -> Self {
        let (sender, _) = channel();
        sender
    }

    pub fn emit(&self, event: CheckoutEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            debug!(?event, "No event listener");
        }
    }
}

pub fn channel() -> (EventSender, EventReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSender { sender }, receiver)
}
