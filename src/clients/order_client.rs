//! # Order Client
//!
//! Typed access to the order actor, and the [`OrderService`] checkout submits through.
use actor_framework::{ActorClient, ResourceClient};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::model::{Order, OrderId, OrderPayload, OrderReceipt, OrderStatus, OrderUpdate};
use crate::order_actor::OrderError;
use crate::placement::{OrderService, OrderServiceError};
use crate::taxonomy::ErrorKind;

/// Client for interacting with the Order actor.
///
/// Stock checks and reservation happen in the actor's `on_create` hook.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, OrderError> {
        debug!("Sending request");
        let update = OrderUpdate {
            status: Some(status),
        };
        Ok(self.inner.update(id, update).await?)
    }

    pub async fn complete(&self, id: OrderId) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Completed).await
    }

    pub async fn cancel(&self, id: OrderId) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Cancelled).await
    }

    pub async fn expire(&self, id: OrderId) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Expired).await
    }

    /// Creates the order, or returns the one already holding the payload's idempotency key.
    #[instrument(skip_all, fields(key = %payload.idempotency_key))]
    pub async fn submit(&self, payload: OrderPayload) -> Result<OrderReceipt, OrderError> {
        let key = payload.idempotency_key.clone();
        let id = match self.inner.create(payload).await.map_err(OrderError::from) {
            Ok(id) => id,
            Err(OrderError::Duplicate(_)) => {
                info!("Duplicate submission, returning the existing order");
                let existing = self
                    .find(key.clone())
                    .await?
                    .ok_or(OrderError::NotFound(key))?;
                return Ok(OrderReceipt::from(&existing));
            }
            Err(e) => return Err(e),
        };
        let order = self
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;
        Ok(OrderReceipt::from(&order))
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }
}

impl From<OrderError> for OrderServiceError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::InsufficientStock(message) => OrderServiceError::Rejected {
                kind: ErrorKind::StockReservationFailed,
                message,
            },
            e @ OrderError::ProductUnavailable { .. } => OrderServiceError::Rejected {
                kind: ErrorKind::ProductUnavailable,
                message: e.to_string(),
            },
            e @ OrderError::EmptyOrder => OrderServiceError::Rejected {
                kind: ErrorKind::EmptyCart,
                message: e.to_string(),
            },
            OrderError::Timeout => OrderServiceError::Timeout,
            other => OrderServiceError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl OrderService for OrderClient {
    async fn create_order(&self, payload: OrderPayload) -> Result<OrderReceipt, OrderServiceError> {
        Ok(self.submit(payload).await?)
    }

    async fn order_status(&self, id: OrderId) -> Result<Option<OrderStatus>, OrderServiceError> {
        Ok(self.get(id).await?.map(|order| order.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, CartId, CartOwner, ContactDetails, SessionId};
    use actor_framework::mock::MockClient;
    use actor_framework::FrameworkError;
    use jiff::Timestamp;

    fn payload() -> OrderPayload {
        OrderPayload {
            idempotency_key: "k-1".into(),
            owner: CartOwner::Guest(SessionId("g".into())),
            cart_id: CartId(1),
            contact: ContactDetails::default(),
            address: Address::default(),
            delivery_method_id: None,
            shop_id: None,
            payment_method_id: None,
            comment: None,
            lines: Vec::new(),
            currency: "UAH".into(),
            subtotal: 0,
            delivery_fee: 0,
            tax: 0,
            total: 0,
        }
    }

    fn order(id: u32) -> Order {
        Order {
            id: OrderId(id),
            confirmation_ref: format!("CO-{id:06}"),
            status: OrderStatus::Pending,
            payload: payload(),
            created_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_submission_returns_existing_order() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_create()
            .return_err(FrameworkError::Conflict("\"k-1\"".into()));
        mock.expect_find("k-1".to_string()).return_ok(Some(order(4)));
        let client = OrderClient::new(mock.client());

        let receipt = client.create_order(payload()).await.unwrap();
        assert_eq!(receipt.order_id, OrderId(4));
        assert_eq!(receipt.confirmation_ref, "CO-000004");
        mock.verify();
    }

    #[tokio::test]
    async fn test_stock_failure_is_rejected_with_kind() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_create()
            .return_err(FrameworkError::EntityError(Box::new(
                OrderError::InsufficientStock("size M".into()),
            )));
        let client = OrderClient::new(mock.client());

        let result = client.create_order(payload()).await;
        assert!(matches!(
            result,
            Err(OrderServiceError::Rejected {
                kind: ErrorKind::StockReservationFailed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_order_has_no_status() {
        let mut mock = MockClient::<Order>::new();
        mock.expect_get(OrderId(9)).return_ok(None);
        mock.expect_get(OrderId(4)).return_ok(Some(order(4)));
        let client = OrderClient::new(mock.client());

        assert_eq!(client.order_status(OrderId(9)).await.unwrap(), None);
        assert_eq!(
            client.order_status(OrderId(4)).await.unwrap(),
            Some(OrderStatus::Pending)
        );
        mock.verify();
    }
}
