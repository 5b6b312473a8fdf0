//! # Framework Errors
//!
//! Errors raised by the actor plumbing itself, plus a boxed slot for entity errors.

use std::time::Duration;

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Another live entity already holds this secondary key.
    #[error("Key already taken: {0}")]
    Conflict(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Recovers the typed entity error, handing back `self` for anything else.
    pub fn downcast_entity<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::EntityError(inner) => inner
                .downcast::<E>()
                .map(|typed| *typed)
                .map_err(Self::EntityError),
            other => Err(other),
        }
    }

    /// Plumbing failures a caller may retry for idempotent reads.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ActorClosed | Self::ActorDropped | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("shelf empty")]
    struct ShelfEmpty;

    #[test]
    fn downcast_recovers_entity_error() {
        let error = FrameworkError::EntityError(Box::new(ShelfEmpty));
        assert_eq!(error.downcast_entity::<ShelfEmpty>().ok(), Some(ShelfEmpty));
    }

    #[test]
    fn downcast_keeps_plumbing_errors() {
        let error = FrameworkError::Timeout(Duration::from_millis(5));
        assert!(matches!(
            error.downcast_entity::<ShelfEmpty>(),
            Err(FrameworkError::Timeout(_))
        ));
    }

    #[test]
    fn transient_errors() {
        assert!(FrameworkError::ActorClosed.is_transient());
        assert!(!FrameworkError::Conflict("k".into()).is_transient());
    }
}
