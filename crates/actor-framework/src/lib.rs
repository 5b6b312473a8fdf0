//! # Actor Framework
//!
//! Building blocks for resource-oriented actor systems: each resource type (a cart, a catalog
//! entry, an order) lives inside one [`ResourceActor`] task that owns its state and serves
//! requests one at a time. Callers hold a cheap, cloneable [`ResourceClient`].
//!
//! ## Layers
//!
//! 1. **Entity** ([`ActorEntity`]) - business rules: creation, update and action hooks, and an
//!    optional unique secondary key.
//! 2. **Runtime** ([`ResourceActor`]) - message loop, id generation, key index, draft commits.
//! 3. **Interface** ([`ResourceClient`], [`ActorClient`]) - typed requests, optional timeouts.
//!
//! ## Guarantees
//!
//! - Requests against one actor are linearized: no locks, no lost updates.
//! - At most one live entity holds a given key. `Create`, `Update` and `Action` that would
//!   break this fail with [`FrameworkError::Conflict`].
//! - A hook that returns `Err` leaves the stored entity exactly as it was.
//!
//! ```rust
//! use actor_framework::{ActorEntity, FrameworkError, ResourceActor};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)]
//! struct Seat { id: u32, holder: Option<String> }
//!
//! #[derive(Debug)] enum SeatAction { Hold(String), Release }
//! #[derive(Debug, thiserror::Error)] #[error("seat already held")] struct SeatTaken;
//!
//! #[async_trait]
//! impl ActorEntity for Seat {
//!     type Id = u32;
//!     type Key = String;
//!     type Create = ();
//!     type Update = ();
//!     type Action = SeatAction;
//!     type ActionResult = ();
//!     type Context = ();
//!     type Error = SeatTaken;
//!
//!     fn from_create_params(id: u32, _: ()) -> Result<Self, Self::Error> {
//!         Ok(Self { id, holder: None })
//!     }
//!
//!     // One seat per holder.
//!     fn key(&self) -> Option<String> { self.holder.clone() }
//!
//!     async fn on_update(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
//!
//!     async fn handle_action(&mut self, action: SeatAction, _: &()) -> Result<(), Self::Error> {
//!         match action {
//!             SeatAction::Hold(_) if self.holder.is_some() => Err(SeatTaken),
//!             SeatAction::Hold(name) => { self.holder = Some(name); Ok(()) }
//!             SeatAction::Release => { self.holder = None; Ok(()) }
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = ResourceActor::<Seat>::new(10);
//!     tokio::spawn(actor.run(()));
//!
//!     let first = client.create(()).await.unwrap();
//!     let second = client.create(()).await.unwrap();
//!     client.perform_action(first, SeatAction::Hold("ada".into())).await.unwrap();
//!
//!     // "ada" already holds a seat.
//!     let clash = client.perform_action(second, SeatAction::Hold("ada".into())).await;
//!     assert!(matches!(clash, Err(FrameworkError::Conflict(_))));
//!
//!     let seat = client.find("ada".to_string()).await.unwrap().unwrap();
//!     assert_eq!(seat.id, first);
//! }
//! ```
//!
//! ## Context Injection
//!
//! Dependencies are handed to `run(context)` rather than `new()`, so actors can be created in
//! any order and wired afterwards.
//!
//! ## Testing
//!
//! See the [`mock`] module for `MockClient` and request-inspection helpers.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
