//! # Order Actor
//!
//! An in-memory order service. It depends on the catalog (`Context = ProductClient`) to check
//! and reserve stock while an order is created, the same late-bound wiring every actor here
//! uses. Checkout reaches it through [`OrderClient`](crate::clients::OrderClient), which
//! implements [`OrderService`](crate::placement::OrderService).

pub mod entity;
pub mod error;

pub use error::*;

use crate::model::Order;
use actor_framework::{ResourceActor, ResourceClient};

/// Creates a new Order actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Order>, ResourceClient<Order>) {
    ResourceActor::new(buffer_size)
}
