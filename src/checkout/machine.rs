//! # Checkout State Machine
//!
//! Drives `Contact → Delivery → Payment → Confirmation` for one visitor. Every change to the
//! form, the step or the completed set is written to the durable store before the call returns
//! and before any network call that depends on it.
//!
//! Entering `Delivery` loads delivery methods for the chosen city; entering `Payment` loads
//! payment methods. A city change while at or past `Delivery` reloads delivery methods and drops
//! a selection the new city no longer offers. `Confirmation` is reached only through
//! [`CheckoutStateMachine::record_order`].

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::form::{FormData, FormPatch};
use super::methods::{DeliveryMethod, MethodRegistry, MethodsError, PaymentMethod};
use super::session::{clear_checkout_state, CheckoutSession};
use super::step::CheckoutStep;
use super::storage::{DurableStore, StorageError};
use crate::events::{CheckoutEvent, EventSender};
use crate::model::{OrderId, OrderStatus};
use crate::placement::{OrderService, OrderServiceError};
use crate::retry::ReadPolicy;
use crate::taxonomy::{ErrorKind, TaxonomyError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Methods(#[from] MethodsError),

    /// `Confirmation` is entered by placing the order, not by stepping.
    #[error("Place the order to continue")]
    OrderNotPlaced,
}

impl From<CheckoutError> for TaxonomyError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::Storage(_) | CheckoutError::Methods(_) => {
                TaxonomyError::Transient(error.to_string())
            }
            CheckoutError::OrderNotPlaced => TaxonomyError::Unclassified(error.to_string()),
        }
    }
}

pub struct CheckoutStateMachine {
    session: CheckoutSession,
    store: Arc<dyn DurableStore>,
    registry: Arc<dyn MethodRegistry>,
    events: EventSender,
    reads: ReadPolicy,
    delivery_methods: Vec<DeliveryMethod>,
    payment_methods: Vec<PaymentMethod>,
}

impl CheckoutStateMachine {
    /// Resumes the persisted session, or starts and persists a fresh one.
    #[instrument(skip_all)]
    pub async fn begin(
        store: Arc<dyn DurableStore>,
        registry: Arc<dyn MethodRegistry>,
        events: EventSender,
        reads: ReadPolicy,
    ) -> Result<Self, CheckoutError> {
        let session = match CheckoutSession::load(store.as_ref())? {
            Some(session) => {
                info!(step = %session.current_step, "Resuming checkout");
                session
            }
            None => {
                let session = CheckoutSession::default();
                session.save_all(store.as_ref())?;
                info!("Checkout started");
                session
            }
        };

        let mut machine = Self {
            session,
            store,
            registry,
            events,
            reads,
            delivery_methods: Vec::new(),
            payment_methods: Vec::new(),
        };
        if machine.step() >= CheckoutStep::Delivery {
            machine.refresh_delivery_methods().await?;
        }
        if machine.step() >= CheckoutStep::Payment {
            machine.refresh_payment_methods().await?;
        }
        Ok(machine)
    }

    pub fn session(&self) -> &CheckoutSession {
        &self.session
    }

    pub fn step(&self) -> CheckoutStep {
        self.session.current_step
    }

    pub fn form(&self) -> &FormData {
        &self.session.form
    }

    pub fn delivery_methods(&self) -> &[DeliveryMethod] {
        &self.delivery_methods
    }

    pub fn payment_methods(&self) -> &[PaymentMethod] {
        &self.payment_methods
    }

    /// Completes the current step and moves forward one.
    #[instrument(skip(self))]
    pub async fn next_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        if self.step() >= CheckoutStep::Payment {
            return Err(CheckoutError::OrderNotPlaced);
        }
        let completed = self.step();
        self.session.completed_steps.insert(completed);
        self.session.current_step = completed.next();
        self.session.save_progress(self.store.as_ref())?;

        match self.step() {
            CheckoutStep::Delivery => self.refresh_delivery_methods().await?,
            CheckoutStep::Payment => self.refresh_payment_methods().await?,
            _ => {}
        }
        Ok(self.step())
    }

    /// Moves back one step. Completed steps stay completed.
    pub fn prev_step(&mut self) -> Result<CheckoutStep, CheckoutError> {
        if self.step() == CheckoutStep::Confirmation {
            return Ok(self.step());
        }
        self.session.current_step = self.step().prev();
        self.session.save_progress(self.store.as_ref())?;
        Ok(self.step())
    }

    #[instrument(skip_all)]
    pub async fn update_form_data(
        &mut self,
        patch: FormPatch,
    ) -> Result<&FormData, CheckoutError> {
        let city_changed = self.session.form.apply(patch);
        self.session.save_form(self.store.as_ref())?;

        if city_changed && self.step() >= CheckoutStep::Delivery {
            self.refresh_delivery_methods().await?;
        }
        Ok(&self.session.form)
    }

    /// Records the placed order and enters `Confirmation`.
    pub fn record_order(&mut self, order_id: OrderId) -> Result<(), CheckoutError> {
        for step in [CheckoutStep::Contact, CheckoutStep::Delivery, CheckoutStep::Payment] {
            self.session.completed_steps.insert(step);
        }
        self.session.order_id = Some(order_id);
        self.session.save_order(self.store.as_ref())?;
        self.session.current_step = CheckoutStep::Confirmation;
        self.session.save_progress(self.store.as_ref())?;
        Ok(())
    }

    /// Deletes the persisted session; it can no longer be resumed.
    pub fn destroy(&self) -> Result<(), CheckoutError> {
        clear_checkout_state(self.store.as_ref())?;
        Ok(())
    }

    /// Abandons checkout. The cart is not touched.
    pub fn abandon(self) -> Result<(), CheckoutError> {
        info!(step = %self.step(), "Checkout abandoned");
        self.events.emit(CheckoutEvent::CheckoutReset {
            reason: "abandoned".into(),
        });
        self.destroy()
    }

    /// Checks a recorded order against the order service. An order that was cancelled,
    /// expired or completed out of band comes back as the matching taxonomy error.
    #[instrument(skip_all)]
    pub async fn reconcile(&self, orders: &dyn OrderService) -> Result<(), TaxonomyError> {
        let Some(order_id) = self.session.order_id else {
            return Ok(());
        };
        let status = match orders.order_status(order_id).await {
            Ok(status) => status,
            Err(
                OrderServiceError::Unavailable(message)
                | OrderServiceError::Rejected { message, .. },
            ) => {
                warn!(%order_id, %message, "Order status unavailable");
                return Ok(());
            }
            Err(OrderServiceError::Timeout) => {
                warn!(%order_id, "Order status lookup timed out");
                return Ok(());
            }
        };
        let kind = match status {
            None | Some(OrderStatus::Cancelled) => ErrorKind::OrderCancelled,
            Some(OrderStatus::Expired) => ErrorKind::OrderExpired,
            Some(OrderStatus::Completed) => ErrorKind::OrderCompleted,
            Some(OrderStatus::Pending) => return Ok(()),
        };
        info!(%order_id, %kind, "Recorded order was invalidated");
        Err(TaxonomyError::new(kind, format!("Order {order_id} is no longer pending")))
    }

    async fn refresh_delivery_methods(&mut self) -> Result<(), CheckoutError> {
        let city = self.session.form.city().map(str::to_string);
        let registry = &self.registry;
        let methods = self
            .reads
            .run("list_delivery_methods", || {
                registry.list_delivery_methods(city.as_deref())
            })
            .await?;

        self.events.emit(CheckoutEvent::DeliveryMethodsRefreshed {
            city: city.clone(),
            methods: methods.iter().map(|method| method.id.clone()).collect(),
        });

        if let Some(selected) = self.session.form.delivery_method_id.clone() {
            let still_offered = methods.iter().find(|method| method.id == selected);
            match still_offered {
                None => {
                    info!(method = %selected, ?city, "Delivery method no longer offered, clearing");
                    self.session.form.delivery_method_id = None;
                    self.session.form.shop_id = None;
                    self.session.save_form(self.store.as_ref())?;
                    self.events
                        .emit(CheckoutEvent::DeliverySelectionCleared { method: selected });
                }
                Some(method) => {
                    let shop_valid = self
                        .session
                        .form
                        .shop_id
                        .as_ref()
                        .map_or(true, |shop| method.shops.contains(shop));
                    if !shop_valid {
                        self.session.form.shop_id = None;
                        self.session.save_form(self.store.as_ref())?;
                    }
                }
            }
        }
        self.delivery_methods = methods;
        Ok(())
    }

    async fn refresh_payment_methods(&mut self) -> Result<(), CheckoutError> {
        let registry = &self.registry;
        self.payment_methods = self
            .reads
            .run("list_payment_methods", || registry.list_payment_methods())
            .await?;
        Ok(())
    }
}
