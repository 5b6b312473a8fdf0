//! Read-only view of the catalog used by stock validation.

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::model::{Product, ProductId, VariantId};
use crate::product_actor::ProductError;
use crate::retry::Transient;

/// Product/variant availability lookup.
///
/// Implemented by [`ProductClient`](crate::clients::ProductClient) for the in-memory catalog;
/// a remote catalog only needs to provide this one call.
#[async_trait]
pub trait InventorySnapshot: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, InventoryError>;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Inventory lookup timed out")]
    Timeout,

    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

impl Transient for InventoryError {
    fn is_transient(&self) -> bool {
        true
    }
}

impl From<Elapsed> for InventoryError {
    fn from(_: Elapsed) -> Self {
        InventoryError::Timeout
    }
}

impl From<ProductError> for InventoryError {
    fn from(error: ProductError) -> Self {
        match error {
            ProductError::Timeout => InventoryError::Timeout,
            other => InventoryError::Unavailable(other.to_string()),
        }
    }
}

/// How many units of a variant can be bought right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Inventory tracking is disabled for the variant.
    Unbounded,
    Limited(u32),
}

impl Availability {
    /// A missing, inactive or unlisted product/variant has nothing available.
    pub fn of(product: Option<&Product>, variant: &VariantId) -> Self {
        match product.and_then(|product| product.purchasable_variant(variant)) {
            None => Self::Limited(0),
            Some(variant) => variant.stock.map_or(Self::Unbounded, Self::Limited),
        }
    }

    pub fn covers(&self, requested: u32) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(available) => requested <= *available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProductStatus, Variant};

    fn product(status: ProductStatus, stock: Option<u32>, active: bool) -> Product {
        Product {
            id: ProductId(1),
            name: "Linen shirt".into(),
            status,
            image: None,
            variants: vec![Variant {
                id: VariantId(1),
                size: Some("M".into()),
                sku: Some("LS-M".into()),
                price: 4_000,
                promotional_price: None,
                is_active: active,
                stock,
            }],
        }
    }

    #[test]
    fn untracked_stock_is_unbounded() {
        let product = product(ProductStatus::Active, None, true);
        let availability = Availability::of(Some(&product), &VariantId(1));
        assert_eq!(availability, Availability::Unbounded);
        assert!(availability.covers(u32::MAX));
    }

    #[test]
    fn tracked_stock_is_limited() {
        let product = product(ProductStatus::Active, Some(2), true);
        let availability = Availability::of(Some(&product), &VariantId(1));
        assert_eq!(availability, Availability::Limited(2));
        assert!(availability.covers(2));
        assert!(!availability.covers(3));
    }

    #[test]
    fn unpurchasable_means_zero() {
        let archived = product(ProductStatus::Archived, None, true);
        let inactive = product(ProductStatus::Active, Some(10), false);
        let active = product(ProductStatus::Active, Some(10), true);

        assert_eq!(Availability::of(Some(&archived), &VariantId(1)), Availability::Limited(0));
        assert_eq!(Availability::of(Some(&inactive), &VariantId(1)), Availability::Limited(0));
        assert_eq!(Availability::of(Some(&active), &VariantId(9)), Availability::Limited(0));
        assert_eq!(Availability::of(None, &VariantId(1)), Availability::Limited(0));
    }
}
