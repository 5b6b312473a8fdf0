//! # Lifecycle
//!
//! Wiring: [`CheckoutSystem`] spawns and stops the actors, [`Storefront`] is one visitor's view
//! of them, and [`tracing`] sets up logging.

pub mod storefront;
pub mod system;
pub mod tracing;

pub use storefront::{Backends, Storefront};
pub use system::{CheckoutSystem, OpenError, CHECKOUT_SCOPE};
