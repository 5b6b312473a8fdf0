//! # ActorEntity Trait
//!
//! The contract every resource (carts, catalog entries, orders) implements to be managed by
//! the generic [`ResourceActor`](crate::ResourceActor). Associated types pin down the id,
//! payloads, actions, injected context and error of each resource, so a cart action can never
//! be sent to the catalog actor.
//!
//! # Secondary keys
//!
//! An entity may expose a unique secondary key through [`ActorEntity::key`]. The actor keeps an
//! index of live keys and refuses any create, update or action that would leave two entities
//! holding the same key. Returning `None` keeps an entity out of the index, which is how a
//! resource "releases" its key (e.g. a cart that is no longer active frees its owner).
//!
//! # Hooks run on drafts
//!
//! `on_update` and `handle_action` receive a draft copy of the stored entity. The actor commits
//! the draft only when the hook returns `Ok` and the key index accepts it, so a hook that fails
//! halfway through never leaves a partially mutated entity behind.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any resource entity must implement to be managed by `ResourceActor`.
///
/// This trait is `#[async_trait]` so hooks can await other actors. The `Context` type is
/// injected into every hook when the actor starts (`run(context)`), not at construction.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier for this entity.
    /// Must be convertible from u32 for automatic ID generation.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + From<u32>;

    /// Unique secondary key (use `()` when the entity has none).
    type Key: Eq + Hash + Clone + Send + Sync + Debug;

    /// The data required to create a new instance.
    type Create: Send + Sync + Debug;

    /// The data required to update an existing instance.
    type Update: Send + Sync + Debug;

    /// Enum representing resource-specific operations.
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// One error enum per actor. Clients recover it with
    /// [`FrameworkError::downcast_entity`](crate::FrameworkError::downcast_entity).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full Entity from the ID and Payload.
    /// This is called synchronously before `on_create`.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// The entity's current secondary key, if it holds one.
    fn key(&self) -> Option<Self::Key> {
        None
    }

    // --- Lifecycle Hooks (Async) ---

    /// Called after the entity is built and before it is stored.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called on a draft when an update request is received.
    async fn on_update(
        &mut self,
        update: Self::Update,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error>;

    /// Called immediately before the entity is removed from the system.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler (Async) ---

    /// Handle a custom resource-specific action on a draft.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
