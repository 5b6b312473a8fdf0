//! Error types for the Cart actor.

use actor_framework::FrameworkError;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::model::{CartId, CartState, LineId};
use crate::retry::Transient;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart not found: {0}")]
    NotFound(String),

    /// The owner already holds an active cart.
    #[error("An active cart already exists for {0}")]
    AlreadyActive(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Quantity overflow on {0}")]
    QuantityOverflow(LineId),

    #[error("Line not found: {0}")]
    LineNotFound(LineId),

    #[error("Cart {id} is {state}")]
    NotActive { id: CartId, state: CartState },

    #[error("Cart {0} still has lines")]
    NotEmpty(CartId),

    #[error("Cart changed: expected version {expected}, found {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("Invalid merge: {0}")]
    InvalidMerge(String),

    #[error("Unexpected actor response: {0}")]
    UnexpectedResponse(String),

    #[error("Cart request timed out")]
    Timeout,

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl Transient for CartError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ActorCommunicationError(_))
    }
}

impl From<Elapsed> for CartError {
    fn from(_: Elapsed) -> Self {
        CartError::Timeout
    }
}

impl From<FrameworkError> for CartError {
    fn from(error: FrameworkError) -> Self {
        match error.downcast_entity::<CartError>() {
            Ok(cart) => cart,
            Err(FrameworkError::Conflict(owner)) => CartError::AlreadyActive(owner),
            Err(FrameworkError::NotFound(id)) => CartError::NotFound(id),
            Err(FrameworkError::Timeout(_)) => CartError::Timeout,
            Err(other) => CartError::ActorCommunicationError(other.to_string()),
        }
    }
}
