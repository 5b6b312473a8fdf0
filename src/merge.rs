//! # Cart Merge
//!
//! Folds a guest cart into the cart of the identity that just logged in or signed up.
//!
//! The guest cart's state is the consumed-once marker: once it is `merged` (or re-owned) the
//! guest owner has no active cart, so a repeated or concurrent merge for the same login finds
//! nothing to do. Quantities are summed without any stock cap; validation caps them later.
//!
//! Paths, cheapest first:
//! - no guest cart, or an empty one: return the authenticated cart (created if needed)
//! - no authenticated cart: re-own the guest cart
//! - an empty authenticated cart: retire it, then re-own the guest cart
//! - otherwise: consume the guest cart's lines and absorb them into the authenticated cart
//!
//! A path that loses a race with a concurrent writer falls through to a fresh attempt.

use tracing::{info, instrument, warn};

use crate::cart_actor::CartError;
use crate::clients::CartClient;
use crate::model::{Cart, CartOwner};
use crate::retry::ReadPolicy;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct CartMergeEngine {
    carts: CartClient,
    reads: ReadPolicy,
}

impl CartMergeEngine {
    pub fn new(carts: CartClient, reads: ReadPolicy) -> Self {
        Self { carts, reads }
    }

    #[instrument(skip_all, fields(%guest, %authenticated))]
    pub async fn merge_guest_into_authenticated(
        &self,
        guest: &CartOwner,
        authenticated: &CartOwner,
    ) -> Result<Cart, CartError> {
        if !guest.is_guest() || authenticated.is_guest() {
            return Err(CartError::InvalidMerge(format!(
                "cannot merge {guest} into {authenticated}"
            )));
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let guest_cart = self
                .find_active(guest)
                .await?
                .filter(|cart| !cart.is_empty());
            let Some(guest_cart) = guest_cart else {
                info!(path = "noop", "No guest lines to merge");
                return self.carts.find_or_create(authenticated).await;
            };

            let merged = match self.find_active(authenticated).await? {
                None => self.reown(&guest_cart, authenticated).await?,
                Some(auth_cart) if auth_cart.is_empty() => {
                    match self.carts.retire(auth_cart.id).await {
                        Ok(_) => self.reown(&guest_cart, authenticated).await?,
                        Err(CartError::NotEmpty(_) | CartError::NotActive { .. }) => None,
                        Err(e) => return Err(e),
                    }
                }
                Some(auth_cart) => Some(
                    self.fold_lines(&guest_cart, &auth_cart, authenticated)
                        .await?,
                ),
            };

            if let Some(cart) = merged {
                return Ok(cart);
            }
            warn!(attempt, "Carts changed during merge, retrying");
        }

        Err(CartError::InvalidMerge(format!(
            "carts for {authenticated} kept changing during merge"
        )))
    }

    async fn find_active(&self, owner: &CartOwner) -> Result<Option<Cart>, CartError> {
        let carts = &self.carts;
        self.reads
            .run("find_active", || carts.find_active(owner))
            .await
    }

    /// `None` when a concurrent writer got in the way.
    async fn reown(
        &self,
        guest_cart: &Cart,
        authenticated: &CartOwner,
    ) -> Result<Option<Cart>, CartError> {
        match self.carts.reown(guest_cart.id, authenticated.clone()).await {
            Ok(cart) => {
                info!(path = "reown", cart_id = %cart.id, "Guest cart re-owned");
                Ok(Some(cart))
            }
            Err(CartError::AlreadyActive(_) | CartError::NotActive { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fold_lines(
        &self,
        guest_cart: &Cart,
        auth_cart: &Cart,
        authenticated: &CartOwner,
    ) -> Result<Cart, CartError> {
        let lines = match self.carts.consume_for_merge(guest_cart.id).await {
            Ok(lines) => lines,
            Err(CartError::NotActive { .. }) => {
                info!(path = "noop", "Guest cart already consumed");
                return self.carts.find_or_create(authenticated).await;
            }
            Err(e) => return Err(e),
        };

        match self.carts.absorb(auth_cart.id, lines).await {
            Ok(cart) => {
                info!(
                    path = "line_merge",
                    from = %guest_cart.id,
                    into = %cart.id,
                    lines = cart.lines.len(),
                    "Guest lines merged"
                );
                Ok(cart)
            }
            Err(e) => {
                warn!(error = %e, "Absorb failed, reinstating guest cart");
                if let Err(reinstate) = self.carts.reinstate(guest_cart.id).await {
                    warn!(error = %reinstate, cart_id = %guest_cart.id, "Reinstate failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartState, LineSnapshot, NewLine, ProductId, SessionId, UserId, VariantId};
    use actor_framework::ActorClient;
    use std::time::Duration;

    fn engine() -> CartMergeEngine {
        let (actor, client) = crate::cart_actor::new(32);
        tokio::spawn(actor.run(()));
        CartMergeEngine::new(
            CartClient::new(client, "UAH"),
            ReadPolicy {
                timeout: Duration::from_secs(1),
                attempts: 2,
            },
        )
    }

    fn guest() -> CartOwner {
        CartOwner::Guest(SessionId("g".into()))
    }

    fn user() -> CartOwner {
        CartOwner::User(UserId("u".into()))
    }

    fn line(product: u32, variant: u32, quantity: u32) -> NewLine {
        NewLine {
            product_id: ProductId(product),
            variant_id: VariantId(variant),
            quantity,
            unit_price: 100,
            regular_price: 100,
            snapshot: LineSnapshot::default(),
        }
    }

    async fn cart_with(engine: &CartMergeEngine, owner: &CartOwner, lines: &[NewLine]) -> Cart {
        let mut cart = engine.carts.create_cart(owner).await.unwrap();
        for line in lines {
            cart = engine.carts.add_line(cart.id, line.clone()).await.unwrap();
        }
        cart
    }

    fn quantities(cart: &Cart) -> Vec<(u32, u32, u32)> {
        let mut lines: Vec<_> = cart
            .lines
            .iter()
            .map(|l| (l.product_id.0, l.variant_id.0, l.quantity))
            .collect();
        lines.sort();
        lines
    }

    #[tokio::test]
    async fn rejects_wrong_owner_kinds() {
        let engine = engine();
        let result = engine.merge_guest_into_authenticated(&user(), &guest()).await;
        assert!(matches!(result, Err(CartError::InvalidMerge(_))));
    }

    #[tokio::test]
    async fn reowns_when_user_has_no_cart() {
        let engine = engine();
        let guest_cart = cart_with(&engine, &guest(), &[line(1, 1, 2)]).await;

        let merged = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();

        assert_eq!(merged.id, guest_cart.id);
        assert_eq!(merged.owner, user());
        assert!(engine.carts.find_active(&guest()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retires_empty_user_cart() {
        let engine = engine();
        let empty = cart_with(&engine, &user(), &[]).await;
        let guest_cart = cart_with(&engine, &guest(), &[line(1, 1, 2)]).await;

        let merged = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();

        assert_eq!(merged.id, guest_cart.id);
        let retired = engine.carts.get(empty.id).await.unwrap().unwrap();
        assert_eq!(retired.state, CartState::Merged);
    }

    #[tokio::test]
    async fn sums_matching_lines() {
        let engine = engine();
        cart_with(&engine, &user(), &[line(1, 1, 3), line(2, 2, 1)]).await;
        let guest_cart = cart_with(&engine, &guest(), &[line(1, 1, 2)]).await;

        let merged = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();

        assert_eq!(quantities(&merged), vec![(1, 1, 5), (2, 2, 1)]);
        assert!(engine.carts.find_active(&guest()).await.unwrap().is_none());
        let consumed = engine.carts.get(guest_cart.id).await.unwrap().unwrap();
        assert_eq!(consumed.state, CartState::Merged);
    }

    #[tokio::test]
    async fn second_merge_is_a_noop() {
        let engine = engine();
        cart_with(&engine, &user(), &[line(1, 1, 3)]).await;
        cart_with(&engine, &guest(), &[line(1, 1, 2)]).await;

        let first = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();
        let second = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(quantities(&second), vec![(1, 1, 5)]);
    }

    #[tokio::test]
    async fn empty_guest_cart_leaves_user_cart_alone() {
        let engine = engine();
        let user_cart = cart_with(&engine, &user(), &[line(3, 1, 1)]).await;
        cart_with(&engine, &guest(), &[]).await;

        let result = engine
            .merge_guest_into_authenticated(&guest(), &user())
            .await
            .unwrap();

        assert_eq!(result.id, user_cart.id);
        assert_eq!(result.version, user_cart.version);
    }
}
