//! [`ActorEntity`] implementation for [`Cart`].
//!
//! The secondary key is the owner, held only while the cart is active. That single rule is the
//! one-active-cart-per-owner constraint: a second create for the same owner, a reown onto an
//! owner that already has a cart, or reinstating a merged cart whose owner moved on are all
//! refused by the actor's key index.

use actor_framework::ActorEntity;
use async_trait::async_trait;

use super::actions::{CartAction, CartActionResult};
use super::error::CartError;
use crate::model::{Cart, CartId, CartOwner};

#[derive(Debug, Clone)]
pub struct CartCreate {
    pub owner: CartOwner,
    pub currency: String,
}

/// Field updates; currently the owner binding (used to re-own a guest cart).
#[derive(Debug, Clone)]
pub struct CartUpdate {
    pub owner: Option<CartOwner>,
    pub expected_version: Option<u64>,
}

#[async_trait]
impl ActorEntity for Cart {
    type Id = CartId;
    type Key = CartOwner;
    type Create = CartCreate;
    type Update = CartUpdate;
    type Action = CartAction;
    type ActionResult = CartActionResult;
    type Context = ();
    type Error = CartError;

    fn from_create_params(id: CartId, params: CartCreate) -> Result<Self, Self::Error> {
        Ok(Cart::new(id, params.owner, params.currency))
    }

    fn key(&self) -> Option<CartOwner> {
        self.is_active().then(|| self.owner.clone())
    }

    async fn on_update(&mut self, update: CartUpdate, _ctx: &()) -> Result<(), Self::Error> {
        self.ensure_version(update.expected_version)?;
        match update.owner {
            Some(owner) => self.reown(owner),
            None => self.ensure_active(),
        }
    }

    async fn handle_action(
        &mut self,
        action: CartAction,
        _ctx: &(),
    ) -> Result<CartActionResult, Self::Error> {
        match action {
            CartAction::AddLine(line) => {
                self.add_line(line)?;
            }
            CartAction::UpdateLine { line, quantity } => self.update_line(line, quantity)?,
            CartAction::RemoveLine(line) => self.remove_line(line)?,
            CartAction::Clear => self.clear()?,
            CartAction::ApplyAdjustments {
                adjustments,
                expected_version,
            } => {
                self.ensure_version(expected_version)?;
                self.apply_adjustments(&adjustments)?;
            }
            CartAction::ConsumeForMerge => {
                return self.consume_for_merge().map(CartActionResult::Consumed);
            }
            CartAction::Absorb(lines) => self.absorb(lines)?,
            CartAction::Reinstate => self.reinstate()?,
            CartAction::Retire => self.retire_if_empty()?,
            CartAction::MarkCleared {
                ordered_version,
                ordered,
            } => self.mark_cleared(ordered_version, &ordered)?,
        }
        Ok(CartActionResult::Cart(self.clone()))
    }
}
