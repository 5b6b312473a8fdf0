//! Orders as submitted to, and stored by, the order service.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::cart::{CartId, Money};
use super::contact::{Address, ContactDetails};
use super::owner::CartOwner;
use super::product::{ProductId, VariantId};
use crate::checkout::methods::{DeliveryMethodId, PaymentMethodId, ShopId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Price snapshot of one cart line at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub price: Money,
    pub regular_price: Money,
    pub name: String,
    pub size: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Repeated submissions of one checkout share this key.
    pub idempotency_key: String,
    pub owner: CartOwner,
    pub cart_id: CartId,
    pub contact: ContactDetails,
    pub address: Address,
    pub delivery_method_id: Option<DeliveryMethodId>,
    pub shop_id: Option<ShopId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub comment: Option<String>,
    pub lines: Vec<OrderLine>,
    pub currency: String,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub confirmation_ref: String,
    pub status: OrderStatus,
    pub payload: OrderPayload,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub confirmation_ref: String,
}

impl From<&Order> for OrderReceipt {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            confirmation_ref: order.confirmation_ref.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
}
