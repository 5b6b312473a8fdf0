//! [`ActorEntity`] implementation for [`Order`].
//!
//! Orders are keyed by their submission idempotency key, so a resubmitted checkout can never
//! create a second order. Creation validates every line against the catalog and reserves
//! stock; a failed reservation releases whatever was already taken.

use actor_framework::{ActorClient, ActorEntity};
use async_trait::async_trait;
use jiff::Timestamp;
use tracing::warn;

use super::error::OrderError;
use crate::clients::ProductClient;
use crate::model::{Order, OrderId, OrderLine, OrderPayload, OrderStatus, OrderUpdate};
use crate::product_actor::ProductError;

impl Order {
    async fn release_lines(&self, catalog: &ProductClient, lines: &[&OrderLine]) {
        for line in lines {
            if let Err(error) = catalog
                .release_stock(line.product_id, line.variant_id, line.quantity)
                .await
            {
                warn!(order_id = %self.id, product_id = %line.product_id, %error, "Stock release failed");
            }
        }
    }
}

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Key = String;
    type Create = OrderPayload;
    type Update = OrderUpdate;
    type Action = ();
    type ActionResult = ();
    type Context = ProductClient;
    type Error = OrderError;

    fn from_create_params(id: OrderId, payload: OrderPayload) -> Result<Self, Self::Error> {
        if payload.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        Ok(Self {
            id,
            confirmation_ref: format!("CO-{:06}", id.0),
            status: OrderStatus::Pending,
            payload,
            created_at: Timestamp::now(),
        })
    }

    fn key(&self) -> Option<String> {
        Some(self.payload.idempotency_key.clone())
    }

    async fn on_create(&mut self, catalog: &ProductClient) -> Result<(), Self::Error> {
        for line in &self.payload.lines {
            let product = catalog
                .get(line.product_id)
                .await
                .map_err(|e| OrderError::Catalog(e.to_string()))?;
            if product
                .as_ref()
                .and_then(|product| product.purchasable_variant(&line.variant_id))
                .is_none()
            {
                return Err(OrderError::ProductUnavailable {
                    product: line.product_id,
                    variant: line.variant_id,
                });
            }
        }

        let mut reserved = Vec::with_capacity(self.payload.lines.len());
        for line in &self.payload.lines {
            match catalog
                .reserve_stock(line.product_id, line.variant_id, line.quantity)
                .await
            {
                Ok(()) => reserved.push(line),
                Err(error) => {
                    self.release_lines(catalog, &reserved).await;
                    return Err(match error {
                        ProductError::InsufficientStock { .. } => {
                            OrderError::InsufficientStock(error.to_string())
                        }
                        other => OrderError::Catalog(other.to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Status transitions. Only pending orders move; cancelling or expiring returns stock.
    async fn on_update(
        &mut self,
        update: OrderUpdate,
        catalog: &ProductClient,
    ) -> Result<(), Self::Error> {
        let Some(next) = update.status else {
            return Ok(());
        };
        if next == self.status {
            return Ok(());
        }
        if self.status.is_terminal() || next == OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if matches!(next, OrderStatus::Cancelled | OrderStatus::Expired) {
            let lines: Vec<&OrderLine> = self.payload.lines.iter().collect();
            self.release_lines(catalog, &lines).await;
        }
        self.status = next;
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &ProductClient) -> Result<(), Self::Error> {
        Ok(())
    }
}
