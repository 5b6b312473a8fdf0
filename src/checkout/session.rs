//! The persisted checkout session.
//!
//! Each field lives under its own key as JSON, so a step change rewrites only the progress keys.
//! Loading normalizes the one state that must never be resumed as-is: `Confirmation` without a
//! recorded order.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use super::form::FormData;
use super::step::CheckoutStep;
use super::storage::{DurableStore, StorageError};
use crate::model::OrderId;

pub const FORM_DATA: &str = "form_data";
pub const CURRENT_STEP: &str = "current_step";
pub const COMPLETED_STEPS: &str = "completed_steps";
pub const ORDER_ID: &str = "order_id";
pub const SUBMISSION_KEY: &str = "submission_key";

/// Every key a checkout session writes.
pub const CHECKOUT_KEYS: [&str; 5] = [
    FORM_DATA,
    CURRENT_STEP,
    COMPLETED_STEPS,
    ORDER_ID,
    SUBMISSION_KEY,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub current_step: CheckoutStep,
    pub completed_steps: BTreeSet<CheckoutStep>,
    pub form: FormData,
    pub order_id: Option<OrderId>,
    /// Idempotency key for order submission, stable across retries of this checkout.
    pub submission_key: String,
}

impl Default for CheckoutSession {
    fn default() -> Self {
        Self {
            current_step: CheckoutStep::Contact,
            completed_steps: BTreeSet::new(),
            form: FormData::default(),
            order_id: None,
            submission_key: Uuid::new_v4().to_string(),
        }
    }
}

impl CheckoutSession {
    /// Reads a persisted session; `None` if checkout was never begun (or was cleared).
    pub fn load(store: &dyn DurableStore) -> Result<Option<Self>, StorageError> {
        let Some(current_step) = read::<CheckoutStep>(store, CURRENT_STEP)? else {
            return Ok(None);
        };
        let stored_key: Option<String> = read(store, SUBMISSION_KEY)?;
        let minted_key = stored_key.is_none();
        let mut session = Self {
            current_step,
            completed_steps: read(store, COMPLETED_STEPS)?.unwrap_or_default(),
            form: read(store, FORM_DATA)?.unwrap_or_default(),
            order_id: read(store, ORDER_ID)?,
            submission_key: stored_key.unwrap_or_else(|| Uuid::new_v4().to_string()),
        };
        if minted_key {
            write(store, SUBMISSION_KEY, &session.submission_key)?;
        }
        if session.normalize() {
            info!("Confirmation without a recorded order, checkout restarts at contact");
            session.save_progress(store)?;
        }
        Ok(Some(session))
    }

    /// Enforces that `Confirmation` implies a recorded order. Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        if self.current_step == CheckoutStep::Confirmation && self.order_id.is_none() {
            self.current_step = CheckoutStep::Contact;
            true
        } else {
            false
        }
    }

    pub fn save_all(&self, store: &dyn DurableStore) -> Result<(), StorageError> {
        write(store, SUBMISSION_KEY, &self.submission_key)?;
        self.save_form(store)?;
        self.save_order(store)?;
        self.save_progress(store)
    }

    pub fn save_form(&self, store: &dyn DurableStore) -> Result<(), StorageError> {
        write(store, FORM_DATA, &self.form)
    }

    pub fn save_progress(&self, store: &dyn DurableStore) -> Result<(), StorageError> {
        write(store, COMPLETED_STEPS, &self.completed_steps)?;
        write(store, CURRENT_STEP, &self.current_step)
    }

    pub fn save_order(&self, store: &dyn DurableStore) -> Result<(), StorageError> {
        match &self.order_id {
            Some(order_id) => write(store, ORDER_ID, order_id),
            None => store.remove(ORDER_ID),
        }
    }
}

/// The one shared "clear checkout state" operation. Cart contents are never touched here.
pub fn clear_checkout_state(store: &dyn DurableStore) -> Result<(), StorageError> {
    for key in CHECKOUT_KEYS {
        store.remove(key)?;
    }
    Ok(())
}

fn read<T: DeserializeOwned>(store: &dyn DurableStore, key: &str) -> Result<Option<T>, StorageError> {
    store
        .load(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn write<T: Serialize + ?Sized>(
    store: &dyn DurableStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.save(key, &raw)
}
