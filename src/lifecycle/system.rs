//! Actor startup, per-visitor storefronts and shutdown.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use super::storefront::{Backends, Storefront};
use crate::checkout::{DurableStore, MethodRegistry, ScopedStore};
use crate::clients::{CartClient, OrderClient, ProductClient};
use crate::config::CheckoutConfig;
use crate::events::{self, EventReceiver};
use crate::identity::{Credentials, IdentityError, IdentityResolver, UuidSessionMinter};
use crate::taxonomy::TaxonomyError;

/// Scope the checkout session's keys live under in a visitor's store.
pub const CHECKOUT_SCOPE: &str = "checkout";

#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The guest cart carried alongside authenticated credentials could not be merged.
    #[error(transparent)]
    GuestCart(#[from] TaxonomyError),
}

/// Starts and stops the actors behind checkout, and opens a [`Storefront`] per visitor.
///
/// # Architecture
///
/// - **Cart actor**: every cart, with one active cart per owner
/// - **Product actor**: the catalog and its stock
/// - **Order actor**: orders; reserves stock through the product actor on create
///
/// ```ignore
/// let system = CheckoutSystem::new(CheckoutConfig::default(), registry);
/// let (mut storefront, events) = system.open_storefront(&credentials, store).await?;
/// storefront.add_item(product, variant, 2).await?;
/// drop(storefront);
/// system.shutdown().await?;
/// ```
pub struct CheckoutSystem {
    pub carts: CartClient,
    pub products: ProductClient,
    pub orders: OrderClient,
    registry: Arc<dyn MethodRegistry>,
    identity: IdentityResolver,
    config: CheckoutConfig,
    handles: Vec<JoinHandle<()>>,
}

impl CheckoutSystem {
    /// Spawns each actor in its own task. The order actor gets the product client as its
    /// context.
    pub fn new(config: CheckoutConfig, registry: Arc<dyn MethodRegistry>) -> Self {
        let (cart_actor, cart_client) = crate::cart_actor::new(config.buffer_size);
        let (product_actor, product_client) = crate::product_actor::new(config.buffer_size);
        let (order_actor, order_client) = crate::order_actor::new(config.buffer_size);

        let timeout = config.request_timeout();
        let carts = CartClient::new(cart_client, config.currency.clone()).with_timeout(timeout);
        let products = ProductClient::new(product_client).with_timeout(timeout);
        let orders = OrderClient::new(order_client).with_timeout(timeout);

        let cart_handle = tokio::spawn(cart_actor.run(()));
        let product_handle = tokio::spawn(product_actor.run(()));
        let order_handle = tokio::spawn(order_actor.run(products.clone()));

        let identity = IdentityResolver::new(
            Arc::new(UuidSessionMinter),
            config.session_cookie.clone(),
            config.session_ttl(),
        );
        info!(currency = %config.currency, "Checkout system started");

        Self {
            carts,
            products,
            orders,
            registry,
            identity,
            config,
            handles: vec![cart_handle, product_handle, order_handle],
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Resolves who is asking and opens their storefront. `store` is the visitor's durable
    /// storage; the checkout session lives under [`CHECKOUT_SCOPE`] inside it.
    ///
    /// An authenticated request still carrying a guest session gets that session's cart merged
    /// into the owner's before the storefront is handed out.
    pub async fn open_storefront(
        &self,
        credentials: &Credentials,
        store: Arc<dyn DurableStore>,
    ) -> Result<(Storefront, EventReceiver), OpenError> {
        let resolved = self.identity.resolve(credentials)?;
        let leftover = resolved
            .guest_session
            .clone()
            .filter(|_| !resolved.owner.is_guest());
        let (events, receiver) = events::channel();
        let store: Arc<dyn DurableStore> = Arc::new(ScopedStore::new(store, CHECKOUT_SCOPE));
        let backends = Backends {
            carts: self.carts.clone(),
            products: self.products.clone(),
            orders: self.orders.clone(),
            registry: self.registry.clone(),
        };
        let mut storefront = Storefront::new(resolved, backends, store, events, &self.config);
        if let Some(session) = leftover {
            storefront.adopt_guest_session(session).await?;
        }
        Ok((storefront, receiver))
    }

    /// Drops the system's clients and waits for every actor to stop.
    ///
    /// Actors stop once every client is gone, so open storefronts must be dropped first.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!("Shutting down checkout system");
        drop(self.carts);
        drop(self.products);
        drop(self.orders);
        drop(self.identity);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Actor task failed");
                return Err(e);
            }
        }
        info!("Checkout system stopped");
        Ok(())
    }
}
