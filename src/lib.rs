//! # Checkout Engine
//!
//! > **Cart and checkout consistency on resource-oriented actors.**
//!
//! Carts, the catalog and orders each live in a [`ResourceActor`](actor_framework::ResourceActor)
//! that applies one message at a time, so every mutation of a cart is linearized without locks.
//! Around them sit the pieces that keep a visitor's cart and checkout consistent: who owns the
//! cart, how a guest cart folds into a user's on login, when stock is checked and how conflicts
//! are resolved, how checkout resumes after a reload, and how every failure maps to one fixed
//! recovery.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Actors ([`cart_actor`], [`product_actor`], [`order_actor`])
//! - **Role**: `ActorEntity` implementations. The cart entity is keyed by its owner while
//!   active, which is what keeps one active cart per owner under concurrent creates.
//!
//! ### 2. The Interface ([`clients`])
//! - **Role**: Typed wrappers around `ResourceClient`.
//! - **Key items**: [`CartClient`](clients::CartClient),
//!   [`ProductClient`](clients::ProductClient) (an [`InventorySnapshot`](inventory::InventorySnapshot)),
//!   [`OrderClient`](clients::OrderClient) (an [`OrderService`](placement::OrderService)).
//!
//! ### 3. The Flow
//! - [`identity`]: request credentials to a [`CartOwner`](model::CartOwner)
//! - [`merge`]: guest cart into authenticated cart, at most once per login
//! - [`validation`] and [`conflicts`]: stock checks and their atomic resolution
//! - [`checkout`]: the resumable step machine and its durable storage
//! - [`placement`]: pricing, phone normalization and order submission
//! - [`taxonomy`]: error kinds and their recovery actions
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! - **Role**: Spawns and wires the actors, and opens a
//!   [`Storefront`](lifecycle::Storefront) per visitor.
//! - **Key items**: [`CheckoutSystem`](lifecycle::CheckoutSystem),
//!   [`setup_tracing`](lifecycle::tracing::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo flow with info logs
//! RUST_LOG=info cargo run -- --city-fee Kyiv=5000
//!
//! # Run the tests
//! cargo test --workspace
//! ```

pub mod cart_actor;
pub mod checkout;
pub mod clients;
pub mod config;
pub mod conflicts;
pub mod events;
pub mod identity;
pub mod inventory;
pub mod lifecycle;
pub mod merge;
pub mod model;
pub mod order_actor;
pub mod placement;
pub mod product_actor;
pub mod retry;
pub mod taxonomy;
pub mod validation;
