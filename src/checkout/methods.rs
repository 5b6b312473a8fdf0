//! Delivery and payment method registries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::model::Money;
use crate::retry::Transient;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(DeliveryMethodId);
string_id!(PaymentMethodId);
string_id!(ShopId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMethod {
    pub id: DeliveryMethodId,
    pub kind: DeliveryKind,
    /// Surcharge on top of the city base fee.
    pub price: Money,
    pub estimated_time: Option<String>,
    pub shops: Vec<ShopId>,
    /// `None` serves every city.
    pub cities: Option<Vec<String>>,
}

impl DeliveryMethod {
    pub fn serves(&self, city: Option<&str>) -> bool {
        match (&self.cities, city) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(cities), Some(city)) => cities.iter().any(|c| c.eq_ignore_ascii_case(city)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MethodsError {
    #[error("Method registry timed out")]
    Timeout,

    #[error("Method registry unavailable: {0}")]
    Unavailable(String),
}

impl Transient for MethodsError {
    fn is_transient(&self) -> bool {
        true
    }
}

impl From<Elapsed> for MethodsError {
    fn from(_: Elapsed) -> Self {
        MethodsError::Timeout
    }
}

#[async_trait]
pub trait MethodRegistry: Send + Sync {
    /// Methods available for `city`; without a city only city-independent methods qualify.
    async fn list_delivery_methods(
        &self,
        city: Option<&str>,
    ) -> Result<Vec<DeliveryMethod>, MethodsError>;

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, MethodsError>;

    /// Surcharge of `id`, 0 when unknown.
    async fn delivery_surcharge(&self, id: &DeliveryMethodId) -> Result<Money, MethodsError> {
        let methods = self.list_delivery_methods(None).await?;
        Ok(methods
            .iter()
            .find(|method| &method.id == id)
            .map_or(0, |method| method.price))
    }
}

/// A fixed in-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticMethodRegistry {
    delivery: Vec<DeliveryMethod>,
    payment: Vec<PaymentMethod>,
}

impl StaticMethodRegistry {
    pub fn new(delivery: Vec<DeliveryMethod>, payment: Vec<PaymentMethod>) -> Self {
        Self { delivery, payment }
    }
}

#[async_trait]
impl MethodRegistry for StaticMethodRegistry {
    async fn list_delivery_methods(
        &self,
        city: Option<&str>,
    ) -> Result<Vec<DeliveryMethod>, MethodsError> {
        Ok(self
            .delivery
            .iter()
            .filter(|method| method.serves(city))
            .cloned()
            .collect())
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, MethodsError> {
        Ok(self.payment.clone())
    }

    async fn delivery_surcharge(&self, id: &DeliveryMethodId) -> Result<Money, MethodsError> {
        Ok(self
            .delivery
            .iter()
            .find(|method| &method.id == id)
            .map_or(0, |method| method.price))
    }
}
