//! # Error Taxonomy
//!
//! Every failure that reaches the UI is either one of a fixed set of [`ErrorKind`]s or
//! unclassified. [`ErrorTaxonomyRouter`] maps each kind to exactly one [`RecoveryAction`] and
//! drives the UI through [`UiCallbacks`].
//!
//! | Kind | Recovery |
//! |---|---|
//! | `ORDER_CANCELLED` | clear checkout state, redirect to cart (non-empty) or catalog |
//! | `ORDER_COMPLETED` | clear checkout state, redirect to order history |
//! | `ORDER_EXPIRED` | clear checkout state, redirect to cart (non-empty) or catalog |
//! | `SESSION_EXPIRED` | prompt re-authentication, cart untouched |
//! | `CART_OUTDATED` | clear checkout state, redirect to cart |
//! | `PRODUCT_UNAVAILABLE` | clear checkout state, redirect to cart |
//! | `STOCK_VALIDATION_FAILED` | conflict resolution if any line has partial stock, else cart |
//! | `STOCK_RESERVATION_FAILED` | clear checkout state, redirect to cart |
//! | `PENDING_ORDERS_FOUND` | prompt to resolve prior orders |
//! | `INSUFFICIENT_STOCK` | refresh the cart view |
//! | `EMPTY_CART` | clear checkout state, redirect to catalog |
//!
//! Unclassified errors mentioning stock are routed to the cart; anything else, and every
//! [`TaxonomyError::Transient`] infrastructure failure, is left to the caller (`handle` returns
//! `false`).

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::cart_actor::CartError;
use crate::checkout::session::clear_checkout_state;
use crate::checkout::storage::DurableStore;
use crate::model::StockConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    OrderCancelled,
    OrderCompleted,
    OrderExpired,
    SessionExpired,
    CartOutdated,
    ProductUnavailable,
    StockValidationFailed,
    StockReservationFailed,
    PendingOrdersFound,
    InsufficientStock,
    EmptyCart,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        Self::OrderCancelled,
        Self::OrderCompleted,
        Self::OrderExpired,
        Self::SessionExpired,
        Self::CartOutdated,
        Self::ProductUnavailable,
        Self::StockValidationFailed,
        Self::StockReservationFailed,
        Self::PendingOrdersFound,
        Self::InsufficientStock,
        Self::EmptyCart,
    ];

    /// Wire code, as reported by the order service.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OrderCancelled => "ORDER_CANCELLED",
            Self::OrderCompleted => "ORDER_COMPLETED",
            Self::OrderExpired => "ORDER_EXPIRED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::CartOutdated => "CART_OUTDATED",
            Self::ProductUnavailable => "PRODUCT_UNAVAILABLE",
            Self::StockValidationFailed => "STOCK_VALIDATION_FAILED",
            Self::StockReservationFailed => "STOCK_RESERVATION_FAILED",
            Self::PendingOrdersFound => "PENDING_ORDERS_FOUND",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::EmptyCart => "EMPTY_CART",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure as presented to the UI layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaxonomyError {
    #[error("{kind}: {message}")]
    Classified {
        kind: ErrorKind,
        message: String,
        /// Populated for the two stock-validation kinds.
        conflicts: Vec<StockConflict>,
    },

    #[error("{0}")]
    Unclassified(String),

    /// A timeout or an unreachable backend. Never matched against the stock keywords.
    #[error("{0}")]
    Transient(String),
}

impl TaxonomyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Classified {
            kind,
            message: message.into(),
            conflicts: Vec::new(),
        }
    }

    pub fn stock(kind: ErrorKind, conflicts: Vec<StockConflict>) -> Self {
        let message = match conflicts.len() {
            1 => "1 item in your cart is short on stock".to_string(),
            n => format!("{n} items in your cart are short on stock"),
        };
        Self::Classified {
            kind,
            message,
            conflicts,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Classified { kind, .. } => Some(*kind),
            Self::Unclassified(_) | Self::Transient(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Classified { message, .. }
            | Self::Unclassified(message)
            | Self::Transient(message) => message,
        }
    }

    pub fn conflicts(&self) -> &[StockConflict] {
        match self {
            Self::Classified { conflicts, .. } => conflicts,
            Self::Unclassified(_) | Self::Transient(_) => &[],
        }
    }
}

impl From<CartError> for TaxonomyError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::VersionMismatch { .. }
            | CartError::NotActive { .. }
            | CartError::NotFound(_) => TaxonomyError::new(ErrorKind::CartOutdated, error.to_string()),
            CartError::Timeout
            | CartError::ActorCommunicationError(_)
            | CartError::UnexpectedResponse(_) => TaxonomyError::Transient(error.to_string()),
            other => TaxonomyError::Unclassified(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Cart,
    Catalog,
    OrderHistory,
}

/// What the UI does about one error.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    Redirect {
        target: RedirectTarget,
        clear_checkout: bool,
    },
    PromptReauth,
    ResolveConflicts(Vec<StockConflict>),
    PromptPendingOrders,
    RefreshCart,
    /// Not handled here; the caller shows a generic message.
    Unhandled,
}

impl RecoveryAction {
    pub fn clears_checkout_state(&self) -> bool {
        matches!(
            self,
            Self::Redirect {
                clear_checkout: true,
                ..
            }
        )
    }
}

/// The UI hooks the router drives.
pub trait UiCallbacks {
    fn notify(&mut self, kind: Option<ErrorKind>, message: &str);
    fn redirect(&mut self, target: RedirectTarget, delay: Duration);
    fn refresh_cart(&mut self);
    fn prompt_reauth(&mut self);
    fn open_conflict_resolution(&mut self, conflicts: &[StockConflict]);
    fn prompt_pending_orders(&mut self);
    fn has_cart_items(&self) -> bool;
}

const STOCK_KEYWORDS: [&str; 3] = ["stock", "inventory", "sold out"];

pub struct ErrorTaxonomyRouter {
    store: Arc<dyn DurableStore>,
    redirect_delay: Duration,
}

impl ErrorTaxonomyRouter {
    /// `store` is the checkout session's scoped store; it is what "clear checkout state" clears.
    pub fn new(store: Arc<dyn DurableStore>, redirect_delay: Duration) -> Self {
        Self {
            store,
            redirect_delay,
        }
    }

    /// Picks the recovery for `error` without touching anything.
    pub fn plan(&self, error: &TaxonomyError, has_cart_items: bool) -> RecoveryAction {
        let cart_or_catalog = if has_cart_items {
            RedirectTarget::Cart
        } else {
            RedirectTarget::Catalog
        };
        let redirect = |target, clear_checkout| RecoveryAction::Redirect {
            target,
            clear_checkout,
        };

        let kind = match error {
            TaxonomyError::Classified { kind, .. } => *kind,
            TaxonomyError::Transient(_) => return RecoveryAction::Unhandled,
            TaxonomyError::Unclassified(message) => {
                let message = message.to_lowercase();
                return if STOCK_KEYWORDS.iter().any(|word| message.contains(word)) {
                    redirect(RedirectTarget::Cart, false)
                } else {
                    RecoveryAction::Unhandled
                };
            }
        };

        match kind {
            ErrorKind::OrderCancelled | ErrorKind::OrderExpired => redirect(cart_or_catalog, true),
            ErrorKind::OrderCompleted => redirect(RedirectTarget::OrderHistory, true),
            ErrorKind::SessionExpired => RecoveryAction::PromptReauth,
            ErrorKind::CartOutdated
            | ErrorKind::ProductUnavailable
            | ErrorKind::StockReservationFailed => redirect(RedirectTarget::Cart, true),
            ErrorKind::StockValidationFailed => {
                if error.conflicts().iter().any(StockConflict::is_partial) {
                    RecoveryAction::ResolveConflicts(error.conflicts().to_vec())
                } else {
                    redirect(RedirectTarget::Cart, false)
                }
            }
            ErrorKind::PendingOrdersFound => RecoveryAction::PromptPendingOrders,
            ErrorKind::InsufficientStock => RecoveryAction::RefreshCart,
            ErrorKind::EmptyCart => redirect(RedirectTarget::Catalog, true),
        }
    }

    /// Runs the recovery for `error`. Returns `false` when the error is transient, or outside
    /// the taxonomy and not stock related; nothing is touched in that case.
    pub fn handle(&self, error: &TaxonomyError, ui: &mut dyn UiCallbacks) -> bool {
        let action = self.plan(error, ui.has_cart_items());
        if action == RecoveryAction::Unhandled {
            warn!(%error, "Unclassified checkout error");
            return false;
        }
        info!(kind = ?error.kind(), ?action, "Routing checkout error");

        if action.clears_checkout_state() {
            if let Err(storage) = clear_checkout_state(self.store.as_ref()) {
                warn!(%storage, "Failed to clear checkout state");
            }
        }

        ui.notify(error.kind(), error.message());
        match action {
            RecoveryAction::Redirect { target, .. } => ui.redirect(target, self.redirect_delay),
            RecoveryAction::PromptReauth => ui.prompt_reauth(),
            RecoveryAction::ResolveConflicts(conflicts) => ui.open_conflict_resolution(&conflicts),
            RecoveryAction::PromptPendingOrders => ui.prompt_pending_orders(),
            RecoveryAction::RefreshCart => ui.refresh_cart(),
            RecoveryAction::Unhandled => {}
        }
        true
    }
}
