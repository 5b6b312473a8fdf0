//! # Order Placement
//!
//! The terminal step of checkout. [`OrderPlacer::place`] runs, in order:
//!
//! 1. refuse an empty cart (`EMPTY_CART`)
//! 2. validate stock again (a conflict now is `STOCK_RESERVATION_FAILED`)
//! 3. price delivery: city base fee plus method surcharge, each 0 when unknown
//! 4. total = subtotal + delivery fee + tax
//! 5. normalize the phone number
//! 6. submit once, with every line's current and regular price
//! 7. on success clear the ordered lines from the cart, record the order and destroy the
//!    checkout session; lines added while the order was in flight stay in the cart
//!
//! Any failure leaves the cart as it was. Submission is never retried here: duplicate
//! suppression belongs to the order service, keyed by the session's submission key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::error::Elapsed;
use tracing::{error, info, instrument, warn};

use crate::checkout::{CheckoutStateMachine, FormData, MethodRegistry};
use crate::clients::CartClient;
use crate::events::{CheckoutEvent, EventSender};
use crate::model::{
    Cart, Money, OrderId, OrderLine, OrderPayload, OrderReceipt, OrderStatus,
};
use crate::retry::ReadPolicy;
use crate::taxonomy::{ErrorKind, TaxonomyError};
use crate::validation::{StockValidator, ValidationResult, ValidationStage};

/// The external order service.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Not idempotent from the caller's side; the service suppresses duplicates by
    /// `payload.idempotency_key`.
    async fn create_order(&self, payload: OrderPayload) -> Result<OrderReceipt, OrderServiceError>;

    /// `None` when the service does not know the order.
    async fn order_status(&self, id: OrderId) -> Result<Option<OrderStatus>, OrderServiceError>;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderServiceError {
    /// Refused with a taxonomy code.
    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Order service unavailable: {0}")]
    Unavailable(String),

    #[error("Order service timed out")]
    Timeout,
}

impl From<Elapsed> for OrderServiceError {
    fn from(_: Elapsed) -> Self {
        OrderServiceError::Timeout
    }
}

impl From<OrderServiceError> for TaxonomyError {
    fn from(error: OrderServiceError) -> Self {
        match error {
            OrderServiceError::Rejected { kind, message } => TaxonomyError::new(kind, message),
            other => TaxonomyError::Transient(other.to_string()),
        }
    }
}

/// Delivery fees per city and the tax rate.
#[derive(Debug, Clone, Default)]
pub struct PricingPolicy {
    city_fees: HashMap<String, Money>,
    tax_rate_bps: u32,
}

impl PricingPolicy {
    pub fn new(city_fees: impl IntoIterator<Item = (String, Money)>, tax_rate_bps: u32) -> Self {
        Self {
            city_fees: city_fees
                .into_iter()
                .map(|(city, fee)| (city.trim().to_lowercase(), fee))
                .collect(),
            tax_rate_bps,
        }
    }

    pub fn city_base_fee(&self, city: Option<&str>) -> Money {
        city.and_then(|city| self.city_fees.get(&city.trim().to_lowercase()))
            .copied()
            .unwrap_or(0)
    }

    /// `subtotal * rate / 10_000`, rounded down.
    pub fn tax(&self, subtotal: Money) -> Money {
        let tax = u128::from(subtotal) * u128::from(self.tax_rate_bps) / 10_000;
        Money::try_from(tax).unwrap_or(Money::MAX)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Invalid phone number: {0}")]
pub struct InvalidPhone(pub String);

const MIN_PHONE_DIGITS: usize = 7;

/// International form: `+` followed by digits.
///
/// A leading `+` or `00` is an explicit country code; a leading `0` is a trunk prefix replaced
/// by `country_code`; anything else is a national number and gets `country_code` prepended.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, InvalidPhone> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(InvalidPhone(raw.to_string()));
    }
    let country: String = country_code.chars().filter(char::is_ascii_digit).collect();

    let international = if trimmed.starts_with('+') {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("{country}{rest}")
    } else if !country.is_empty() && digits.starts_with(&country) && digits.len() > 10 {
        digits
    } else {
        format!("{country}{digits}")
    };
    Ok(format!("+{international}"))
}

impl From<InvalidPhone> for TaxonomyError {
    fn from(error: InvalidPhone) -> Self {
        TaxonomyError::Unclassified(error.to_string())
    }
}

pub struct OrderPlacer {
    carts: CartClient,
    validator: StockValidator,
    orders: Arc<dyn OrderService>,
    registry: Arc<dyn MethodRegistry>,
    pricing: PricingPolicy,
    country_code: String,
    submit_timeout: Duration,
    reads: ReadPolicy,
    events: EventSender,
}

/// Everything the placer needs besides the cart and the checkout.
pub struct PlacementDeps {
    pub carts: CartClient,
    pub validator: StockValidator,
    pub orders: Arc<dyn OrderService>,
    pub registry: Arc<dyn MethodRegistry>,
    pub events: EventSender,
}

impl OrderPlacer {
    pub fn new(
        deps: PlacementDeps,
        pricing: PricingPolicy,
        country_code: impl Into<String>,
        submit_timeout: Duration,
        reads: ReadPolicy,
    ) -> Self {
        Self {
            carts: deps.carts,
            validator: deps.validator,
            orders: deps.orders,
            registry: deps.registry,
            pricing,
            country_code: country_code.into(),
            submit_timeout,
            reads,
            events: deps.events,
        }
    }

    #[instrument(skip_all, fields(cart_id = %cart.id))]
    pub async fn place(
        &self,
        cart: &Cart,
        checkout: &mut CheckoutStateMachine,
    ) -> Result<OrderReceipt, TaxonomyError> {
        if cart.is_empty() {
            return Err(TaxonomyError::new(ErrorKind::EmptyCart, "Your cart is empty"));
        }
        cart.ensure_active()?;

        if let ValidationResult::Conflicted(conflicts) = self.validator.validate(cart).await? {
            warn!(conflicts = conflicts.len(), "Stock changed before submission");
            self.events.emit(CheckoutEvent::StockConflictDetected {
                conflicts: conflicts.clone(),
            });
            return Err(TaxonomyError::stock(
                ValidationStage::Submission.error_kind(),
                conflicts,
            ));
        }

        let payload = self
            .build_payload(cart, checkout.form(), &checkout.session().submission_key)
            .await?;
        info!(total = payload.total, lines = payload.lines.len(), "Submitting order");

        let receipt = tokio::time::timeout(self.submit_timeout, self.orders.create_order(payload))
            .await
            .map_err(OrderServiceError::from)
            .and_then(|result| result)
            .map_err(|e| {
                warn!(error = %e, "Order submission failed");
                TaxonomyError::from(e)
            })?;
        info!(order_id = %receipt.order_id, confirmation_ref = %receipt.confirmation_ref, "Order placed");

        if let Err(e) = self.carts.mark_cleared(cart).await {
            error!(error = %e, order_id = %receipt.order_id, "Order placed but cart not cleared");
        }
        if let Err(e) = checkout
            .record_order(receipt.order_id)
            .and_then(|()| checkout.destroy())
        {
            error!(error = %e, "Order placed but checkout state not cleared");
        }
        self.events.emit(CheckoutEvent::OrderPlaced {
            order_id: receipt.order_id,
            confirmation_ref: receipt.confirmation_ref.clone(),
        });
        Ok(receipt)
    }

    async fn build_payload(
        &self,
        cart: &Cart,
        form: &FormData,
        submission_key: &str,
    ) -> Result<OrderPayload, TaxonomyError> {
        let subtotal = cart.subtotal();
        let delivery_fee = self
            .pricing
            .city_base_fee(form.city())
            .saturating_add(self.surcharge(form).await);
        let tax = self.pricing.tax(subtotal);
        let total = subtotal.saturating_add(delivery_fee).saturating_add(tax);

        let mut contact = form.contact.clone();
        contact.phone = normalize_phone(&contact.phone, &self.country_code)?;

        let lines = cart
            .lines
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                price: line.unit_price,
                regular_price: line.regular_price,
                name: line.snapshot.name.clone(),
                size: line.snapshot.size.clone(),
                sku: line.snapshot.sku.clone(),
            })
            .collect();

        Ok(OrderPayload {
            idempotency_key: submission_key.to_string(),
            owner: cart.owner.clone(),
            cart_id: cart.id,
            contact,
            address: form.address.clone(),
            delivery_method_id: form.delivery_method_id.clone(),
            shop_id: form.shop_id.clone(),
            payment_method_id: form.payment_method_id.clone(),
            comment: form.comment.clone(),
            lines,
            currency: cart.currency.clone(),
            subtotal,
            delivery_fee,
            tax,
            total,
        })
    }

    async fn surcharge(&self, form: &FormData) -> Money {
        let Some(method) = &form.delivery_method_id else {
            return 0;
        };
        let registry = &self.registry;
        match self
            .reads
            .run("delivery_surcharge", || registry.delivery_surcharge(method))
            .await
        {
            Ok(price) => price,
            Err(e) => {
                warn!(%method, error = %e, "Surcharge unavailable, charging 0");
                0
            }
        }
    }
}
