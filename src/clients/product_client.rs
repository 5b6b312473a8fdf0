//! # Product Client
//!
//! Typed access to the catalog actor. Checkout only reads through it (as an
//! [`InventorySnapshot`]); the order service reserves and releases stock with it.
use actor_framework::{ActorClient, ResourceClient};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::inventory::{InventoryError, InventorySnapshot};
use crate::model::{Product, ProductCreate, ProductId, ProductStatus, ProductUpdate, VariantId};
use crate::product_actor::{ProductAction, ProductActionResult, ProductError};

/// Client for interacting with the Product actor.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl ProductClient {
    pub fn new(inner: ResourceClient<Product>) -> Self {
        Self { inner }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
        }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<ProductId, ProductError> {
        debug!("Sending request");
        Ok(self.inner.create(params).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, ProductError> {
        debug!("Sending request");
        let update = ProductUpdate {
            status: Some(status),
            ..ProductUpdate::default()
        };
        Ok(self.inner.update(id, update).await?)
    }

    /// `None` turns inventory tracking off for the variant.
    pub async fn set_stock(
        &self,
        id: ProductId,
        variant: VariantId,
        stock: Option<u32>,
    ) -> Result<(), ProductError> {
        self.act(id, ProductAction::SetStock { variant, stock }).await
    }

    pub async fn set_variant_active(
        &self,
        id: ProductId,
        variant: VariantId,
        active: bool,
    ) -> Result<(), ProductError> {
        self.act(id, ProductAction::SetVariantActive { variant, active })
            .await
    }

    pub async fn set_promotional_price(
        &self,
        id: ProductId,
        variant: VariantId,
        price: Option<u64>,
    ) -> Result<(), ProductError> {
        self.act(id, ProductAction::SetPromotionalPrice { variant, price })
            .await
    }

    /// Fails with [`ProductError::InsufficientStock`] when tracked stock is short.
    pub async fn reserve_stock(
        &self,
        id: ProductId,
        variant: VariantId,
        quantity: u32,
    ) -> Result<(), ProductError> {
        self.act(id, ProductAction::ReserveStock { variant, quantity })
            .await
    }

    pub async fn release_stock(
        &self,
        id: ProductId,
        variant: VariantId,
        quantity: u32,
    ) -> Result<(), ProductError> {
        self.act(id, ProductAction::ReleaseStock { variant, quantity })
            .await
    }

    #[instrument(skip(self))]
    async fn act(&self, id: ProductId, action: ProductAction) -> Result<(), ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, action).await? {
            ProductActionResult::Updated => Ok(()),
        }
    }
}

#[async_trait]
impl ActorClient<Product> for ProductClient {
    type Error = ProductError;

    fn inner(&self) -> &ResourceClient<Product> {
        &self.inner
    }
}

#[async_trait]
impl InventorySnapshot for ProductClient {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, InventoryError> {
        Ok(self.get(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_framework::mock::{create_mock_client, expect_action, MockClient};
    use actor_framework::FrameworkError;

    #[tokio::test]
    async fn test_reserve_stock_sends_action() {
        let (client, mut receiver) = create_mock_client::<Product>(10);
        let product_client = ProductClient::new(client);

        let task = tokio::spawn(async move {
            product_client
                .reserve_stock(ProductId(1), VariantId(2), 5)
                .await
        });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, ProductId(1));
        assert!(matches!(
            action,
            ProductAction::ReserveStock {
                variant: VariantId(2),
                quantity: 5
            }
        ));
        responder.send(Ok(ProductActionResult::Updated)).unwrap();

        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_reserve_stock_insufficient_stock() {
        let mut mock = MockClient::<Product>::new();
        mock.expect_action(ProductId(1))
            .return_err(FrameworkError::EntityError(Box::new(
                ProductError::InsufficientStock {
                    variant: VariantId(2),
                    requested: 5,
                    available: 1,
                },
            )));
        let product_client = ProductClient::new(mock.client());

        let result = product_client
            .reserve_stock(ProductId(1), VariantId(2), 5)
            .await;
        assert_eq!(
            result,
            Err(ProductError::InsufficientStock {
                variant: VariantId(2),
                requested: 5,
                available: 1,
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_inventory_lookup_maps_timeouts() {
        let mut mock = MockClient::<Product>::new();
        mock.expect_get(ProductId(3))
            .return_err(FrameworkError::Timeout(Duration::from_millis(10)));
        let product_client = ProductClient::new(mock.client());

        let result = product_client.get_product(ProductId(3)).await;
        assert_eq!(result, Err(InventoryError::Timeout));
    }
}
