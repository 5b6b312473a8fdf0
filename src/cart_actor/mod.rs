//! # Cart Actor
//!
//! The cart store: one actor owns every cart, so mutations of a given cart are applied one at a
//! time and each action commits atomically (see [`actor_framework::ResourceActor`]).
//!
//! - [`entity`] - `ActorEntity` implementation, owner-keyed uniqueness
//! - [`actions`] - [`CartAction`] / [`CartActionResult`]
//! - [`error`] - [`CartError`]
//!
//! Callers use [`CartClient`](crate::clients::CartClient) rather than the raw resource client.

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::*;
pub use error::*;

use crate::model::Cart;
use actor_framework::{ResourceActor, ResourceClient};

/// Creates a new Cart actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Cart>, ResourceClient<Cart>) {
    ResourceActor::new(buffer_size)
}
