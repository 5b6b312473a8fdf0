//! # ActorClient Trait
//!
//! Shared plumbing for resource-specific client wrappers: `get`, `find` and `delete` come for
//! free once a wrapper exposes its inner `ResourceClient` and an error type that framework
//! errors convert into.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit standard operations.
///
/// The error type converts from [`FrameworkError`], which is where a wrapper recovers its own
/// entity errors (see [`FrameworkError::downcast_entity`]).
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The resource-specific error type.
    type Error: From<FrameworkError> + Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Fetch an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        Ok(self.inner().get(id).await?)
    }

    /// Fetch the entity currently holding `key`.
    #[tracing::instrument(skip(self))]
    async fn find(&self, key: T::Key) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        Ok(self.inner().find(key).await?)
    }

    /// Delete an entity by ID.
    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        Ok(self.inner().delete(id).await?)
    }
}
