//! # Product Actor
//!
//! An in-memory catalog standing in for the external product service. It serves read-only
//! lookups to checkout through [`ProductClient`](crate::clients::ProductClient), and tests use
//! its actions to move stock and availability underneath an open cart.

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::model::Product;
use actor_framework::{ResourceActor, ResourceClient};

/// Creates a new Product actor and its client.
pub fn new(buffer_size: usize) -> (ResourceActor<Product>, ResourceClient<Product>) {
    ResourceActor::new(buffer_size)
}
