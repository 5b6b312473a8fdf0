//! Error types for the Order actor.

use actor_framework::FrameworkError;
use thiserror::Error;

use crate::model::{OrderStatus, ProductId, VariantId};

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order has no lines")]
    EmptyOrder,

    #[error("{product}/{variant} can no longer be purchased")]
    ProductUnavailable {
        product: ProductId,
        variant: VariantId,
    },

    /// Stock ran out between validation and reservation.
    #[error("Stock reservation failed: {0}")]
    InsufficientStock(String),

    #[error("Order cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Another order already used this idempotency key.
    #[error("Duplicate submission: {0}")]
    Duplicate(String),

    #[error("Order request timed out")]
    Timeout,

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(error: FrameworkError) -> Self {
        match error.downcast_entity::<OrderError>() {
            Ok(order) => order,
            Err(FrameworkError::Conflict(key)) => OrderError::Duplicate(key),
            Err(FrameworkError::NotFound(id)) => OrderError::NotFound(id),
            Err(FrameworkError::Timeout(_)) => OrderError::Timeout,
            Err(other) => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
