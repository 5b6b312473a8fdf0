//! Error types for the Product actor.

use actor_framework::FrameworkError;
use thiserror::Error;

use crate::model::VariantId;

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Unknown variant: {0}")]
    UnknownVariant(VariantId),

    #[error("Duplicate variant: {0}")]
    DuplicateVariant(VariantId),

    #[error("Insufficient stock for {variant}: requested {requested}, available {available}")]
    InsufficientStock {
        variant: VariantId,
        requested: u32,
        available: u32,
    },

    #[error("Product has no variants")]
    NoVariants,

    #[error("Product request timed out")]
    Timeout,

    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for ProductError {
    fn from(error: FrameworkError) -> Self {
        match error.downcast_entity::<ProductError>() {
            Ok(product) => product,
            Err(FrameworkError::NotFound(id)) => ProductError::NotFound(id),
            Err(FrameworkError::Timeout(_)) => ProductError::Timeout,
            Err(other) => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}
