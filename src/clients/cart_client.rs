//! # Cart Client
//!
//! The cart store's public face. Every operation is one message to the cart actor, so each
//! mutation is applied to exactly one cart, atomically, in arrival order.
use actor_framework::{ActorClient, ResourceClient};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::cart_actor::{CartAction, CartActionResult, CartCreate, CartError, CartUpdate};
use crate::model::{Cart, CartId, CartOwner, ItemAdjustment, LineId, NewLine};

/// Client for interacting with the Cart actor.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
    currency: String,
}

impl CartClient {
    pub fn new(inner: ResourceClient<Cart>, currency: impl Into<String>) -> Self {
        Self {
            inner,
            currency: currency.into(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
            currency: self.currency,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The owner's active cart, if any. Merged and cleared carts are never returned.
    pub async fn find_active(&self, owner: &CartOwner) -> Result<Option<Cart>, CartError> {
        self.find(owner.clone()).await
    }

    /// Creates an active cart; fails with [`CartError::AlreadyActive`] if the owner has one.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        debug!("Sending request");
        let id = self
            .inner
            .create(CartCreate {
                owner: owner.clone(),
                currency: self.currency.clone(),
            })
            .await?;
        info!(cart_id = %id, "Cart created");
        self.get(id)
            .await?
            .ok_or_else(|| CartError::NotFound(id.to_string()))
    }

    /// Returns the owner's active cart, creating it when absent. A concurrent creator winning
    /// the race is resolved by reading its cart.
    #[instrument(skip(self))]
    pub async fn find_or_create(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        if let Some(cart) = self.find_active(owner).await? {
            return Ok(cart);
        }
        match self.create_cart(owner).await {
            Err(CartError::AlreadyActive(_)) => self
                .find_active(owner)
                .await?
                .ok_or_else(|| CartError::NotFound(owner.to_string())),
            result => result,
        }
    }

    pub async fn add_line(&self, cart: CartId, line: NewLine) -> Result<Cart, CartError> {
        self.act(cart, CartAction::AddLine(line)).await
    }

    /// Zero removes the line.
    pub async fn update_line(
        &self,
        cart: CartId,
        line: LineId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.act(cart, CartAction::UpdateLine { line, quantity })
            .await
    }

    pub async fn remove_line(&self, cart: CartId, line: LineId) -> Result<Cart, CartError> {
        self.act(cart, CartAction::RemoveLine(line)).await
    }

    pub async fn clear(&self, cart: CartId) -> Result<Cart, CartError> {
        self.act(cart, CartAction::Clear).await
    }

    /// Applies a resolution batch in one mutation, refused if the cart moved past
    /// `expected_version`.
    pub async fn apply_adjustments(
        &self,
        cart: CartId,
        adjustments: Vec<ItemAdjustment>,
        expected_version: Option<u64>,
    ) -> Result<Cart, CartError> {
        self.act(
            cart,
            CartAction::ApplyAdjustments {
                adjustments,
                expected_version,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn consume_for_merge(&self, cart: CartId) -> Result<Vec<NewLine>, CartError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(cart, CartAction::ConsumeForMerge)
            .await?
        {
            CartActionResult::Consumed(lines) => Ok(lines),
            CartActionResult::Cart(_) => Err(CartError::UnexpectedResponse(
                "expected consumed lines".into(),
            )),
        }
    }

    pub async fn absorb(&self, cart: CartId, lines: Vec<NewLine>) -> Result<Cart, CartError> {
        self.act(cart, CartAction::Absorb(lines)).await
    }

    pub async fn reinstate(&self, cart: CartId) -> Result<Cart, CartError> {
        self.act(cart, CartAction::Reinstate).await
    }

    /// Retires an empty cart; [`CartError::NotEmpty`] if lines were added meanwhile.
    pub async fn retire(&self, cart: CartId) -> Result<Cart, CartError> {
        self.act(cart, CartAction::Retire).await
    }

    /// Moves the cart to a new owner; [`CartError::AlreadyActive`] if that owner has a cart.
    #[instrument(skip(self))]
    pub async fn reown(&self, cart: CartId, owner: CartOwner) -> Result<Cart, CartError> {
        debug!("Sending request");
        let update = CartUpdate {
            owner: Some(owner),
            expected_version: None,
        };
        Ok(self.inner.update(cart, update).await?)
    }

    /// Settles `ordered` (the cart as submitted) after its order went through. Lines added
    /// since are kept.
    pub async fn mark_cleared(&self, ordered: &Cart) -> Result<Cart, CartError> {
        self.act(
            ordered.id,
            CartAction::MarkCleared {
                ordered_version: ordered.version,
                ordered: ordered.lines.clone(),
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn act(&self, cart: CartId, action: CartAction) -> Result<Cart, CartError> {
        debug!("Sending request");
        let result = self.inner.perform_action(cart, action).await?;
        expect_cart(result)
    }
}

fn expect_cart(result: CartActionResult) -> Result<Cart, CartError> {
    match result {
        CartActionResult::Cart(cart) => Ok(cart),
        CartActionResult::Consumed(_) => {
            Err(CartError::UnexpectedResponse("expected a cart".into()))
        }
    }
}

#[async_trait]
impl ActorClient<Cart> for CartClient {
    type Error = CartError;

    fn inner(&self) -> &ResourceClient<Cart> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineSnapshot, ProductId, SessionId, VariantId};
    use crate::retry::Transient;
    use actor_framework::mock::{create_mock_client, expect_action, expect_create, MockClient};
    use actor_framework::FrameworkError;

    fn guest() -> CartOwner {
        CartOwner::Guest(SessionId("s-1".into()))
    }

    fn new_line(quantity: u32) -> NewLine {
        NewLine {
            product_id: ProductId(1),
            variant_id: VariantId(1),
            quantity,
            unit_price: 500,
            regular_price: 500,
            snapshot: LineSnapshot::default(),
        }
    }

    #[tokio::test]
    async fn test_add_line_sends_action() {
        let (client, mut receiver) = create_mock_client::<Cart>(10);
        let cart_client = CartClient::new(client, "UAH");

        let task = tokio::spawn(async move { cart_client.add_line(CartId(4), new_line(2)).await });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, CartId(4));
        let CartAction::AddLine(line) = action else {
            panic!("Expected AddLine");
        };
        assert_eq!(line.quantity, 2);

        let mut cart = Cart::new(CartId(4), guest(), "UAH");
        cart.add_line(line).unwrap();
        responder.send(Ok(CartActionResult::Cart(cart))).unwrap();

        let cart = task.await.unwrap().unwrap();
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_create_cart_uses_configured_currency() {
        let (client, mut receiver) = create_mock_client::<Cart>(10);
        let cart_client = CartClient::new(client, "EUR");

        let task = tokio::spawn(async move { cart_client.create_cart(&guest()).await });

        let (params, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(params.currency, "EUR");
        assert_eq!(params.owner, guest());
        responder.send(Ok(CartId(1))).unwrap();

        let (id, responder) = actor_framework::mock::expect_get(&mut receiver)
            .await
            .expect("Expected Get request");
        responder
            .send(Ok(Some(Cart::new(id, guest(), "EUR"))))
            .unwrap();

        let cart = task.await.unwrap().unwrap();
        assert_eq!(cart.id, CartId(1));
        assert_eq!(cart.currency, "EUR");
    }

    #[tokio::test]
    async fn test_find_or_create_recovers_from_lost_race() {
        let mut mock = MockClient::<Cart>::new();
        mock.expect_find(guest()).return_ok(None);
        mock.expect_create()
            .return_err(FrameworkError::Conflict(guest().to_string()));
        mock.expect_find(guest())
            .return_ok(Some(Cart::new(CartId(9), guest(), "UAH")));

        let cart_client = CartClient::new(mock.client(), "UAH");
        let cart = cart_client.find_or_create(&guest()).await.unwrap();

        assert_eq!(cart.id, CartId(9));
        mock.verify();
    }

    #[tokio::test]
    async fn test_entity_errors_are_recovered() {
        let mut mock = MockClient::<Cart>::new();
        mock.expect_action(CartId(2))
            .return_err(FrameworkError::EntityError(Box::new(
                CartError::InvalidQuantity(0),
            )));

        let cart_client = CartClient::new(mock.client(), "UAH");
        let result = cart_client.add_line(CartId(2), new_line(0)).await;

        assert_eq!(result.unwrap_err(), CartError::InvalidQuantity(0));
    }

    #[tokio::test]
    async fn test_consume_for_merge_rejects_wrong_result() {
        let mut mock = MockClient::<Cart>::new();
        mock.expect_action(CartId(3))
            .return_ok(CartActionResult::Cart(Cart::new(CartId(3), guest(), "UAH")));

        let cart_client = CartClient::new(mock.client(), "UAH");
        let result = cart_client.consume_for_merge(CartId(3)).await;

        assert!(matches!(result, Err(CartError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let (client, _receiver) = create_mock_client::<Cart>(10);
        let cart_client = CartClient::new(client, "UAH").with_timeout(Duration::from_millis(20));

        let error = cart_client.find_active(&guest()).await.unwrap_err();
        assert_eq!(error, CartError::Timeout);
        assert!(error.is_transient());
    }
}
