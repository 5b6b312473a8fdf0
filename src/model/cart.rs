//! The cart aggregate and its line rules.
//!
//! Every mutating method is all-or-nothing: it either returns `Ok` with the cart updated and
//! its `version` bumped once, or returns `Err` with the cart untouched.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::conflict::ItemAdjustment;
use super::owner::CartOwner;
use super::product::{ProductId, VariantId};
use crate::cart_actor::CartError;

/// Amount in minor currency units.
pub type Money = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(pub u32);

impl From<u32> for CartId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cart_{}", self.0)
    }
}

/// Identifier of a line, unique within its cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub u32);

impl Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartState {
    Active,
    /// Folded into another cart at login.
    Merged,
    /// Emptied by a successful order.
    Cleared,
}

impl Display for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Merged => "merged",
            Self::Cleared => "cleared",
        };
        f.write_str(label)
    }
}

/// Display data captured when the line was added, kept even if the catalog entry changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub name: String,
    pub image: Option<String>,
    pub size: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Price per unit when the line was first added (may be promotional).
    pub unit_price: Money,
    pub regular_price: Money,
    pub snapshot: LineSnapshot,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.saturating_mul(Money::from(self.quantity))
    }

    pub fn matches(&self, product_id: &ProductId, variant_id: &VariantId) -> bool {
        &self.product_id == product_id && &self.variant_id == variant_id
    }

    pub fn to_new_line(&self) -> NewLine {
        NewLine {
            product_id: self.product_id,
            variant_id: self.variant_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            regular_price: self.regular_price,
            snapshot: self.snapshot.clone(),
        }
    }
}

/// A line as requested by a caller, before the cart assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Money,
    pub regular_price: Money,
    pub snapshot: LineSnapshot,
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub state: CartState,
    pub lines: Vec<CartLine>,
    pub currency: String,
    /// Bumped by every committed mutation.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    next_line: u32,
}

impl Cart {
    pub fn new(id: CartId, owner: CartOwner, currency: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            owner,
            state: CartState::Active,
            lines: Vec::new(),
            currency: currency.into(),
            version: 1,
            created_at: now,
            updated_at: now,
            next_line: 1,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == CartState::Active
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .fold(0, |total: Money, line| total.saturating_add(line.line_total()))
    }

    pub fn line(&self, id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub fn line_for(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.matches(product_id, variant_id))
    }

    pub fn ensure_active(&self) -> Result<(), CartError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CartError::NotActive {
                id: self.id,
                state: self.state,
            })
        }
    }

    pub fn ensure_version(&self, expected: Option<u64>) -> Result<(), CartError> {
        match expected {
            Some(expected) if expected != self.version => Err(CartError::VersionMismatch {
                expected,
                actual: self.version,
            }),
            _ => Ok(()),
        }
    }

    /// Adds a line, or sums into the existing line for the same product and variant.
    pub fn add_line(&mut self, line: NewLine) -> Result<LineId, CartError> {
        self.ensure_active()?;
        let id = self.merge_line(line)?;
        self.touch();
        Ok(id)
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn update_line(&mut self, id: LineId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_line(id);
        }
        self.ensure_active()?;
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id == id)
            .ok_or(CartError::LineNotFound(id))?;
        line.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, id: LineId) -> Result<(), CartError> {
        self.ensure_active()?;
        let position = self
            .lines
            .iter()
            .position(|line| line.id == id)
            .ok_or(CartError::LineNotFound(id))?;
        self.lines.remove(position);
        self.touch();
        Ok(())
    }

    /// Empties the cart; it stays active.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_active()?;
        self.lines.clear();
        self.touch();
        Ok(())
    }

    /// Applies a whole resolution batch or none of it.
    pub fn apply_adjustments(&mut self, adjustments: &[ItemAdjustment]) -> Result<(), CartError> {
        self.ensure_active()?;
        let mut lines = self.lines.clone();
        for adjustment in adjustments {
            let line = adjustment.line();
            let position = lines
                .iter()
                .position(|candidate| candidate.id == line)
                .ok_or(CartError::LineNotFound(line))?;
            match *adjustment {
                ItemAdjustment::Remove { .. } => {
                    lines.remove(position);
                }
                ItemAdjustment::ReduceTo { quantity, .. } => {
                    if quantity == 0 || quantity > lines[position].quantity {
                        return Err(CartError::InvalidQuantity(quantity));
                    }
                    lines[position].quantity = quantity;
                }
            }
        }
        self.lines = lines;
        self.touch();
        Ok(())
    }

    /// Folds lines from another cart in, summing quantities without any stock cap.
    pub fn absorb(&mut self, incoming: Vec<NewLine>) -> Result<(), CartError> {
        self.ensure_active()?;
        let mut draft = self.clone();
        for line in incoming {
            draft.merge_line(line)?;
        }
        *self = draft;
        self.touch();
        Ok(())
    }

    /// Marks the cart `merged` and hands back its lines for the receiving cart.
    pub fn consume_for_merge(&mut self) -> Result<Vec<NewLine>, CartError> {
        self.ensure_active()?;
        self.state = CartState::Merged;
        self.touch();
        Ok(self.lines.iter().map(CartLine::to_new_line).collect())
    }

    /// Undoes `consume_for_merge` when the receiving cart could not take the lines.
    pub fn reinstate(&mut self) -> Result<(), CartError> {
        if self.state != CartState::Merged {
            return Err(CartError::NotActive {
                id: self.id,
                state: self.state,
            });
        }
        self.state = CartState::Active;
        self.touch();
        Ok(())
    }

    /// Retires an empty cart so its owner binding can go to another cart.
    pub fn retire_if_empty(&mut self) -> Result<(), CartError> {
        self.ensure_active()?;
        if !self.is_empty() {
            return Err(CartError::NotEmpty(self.id));
        }
        self.state = CartState::Merged;
        self.touch();
        Ok(())
    }

    pub fn reown(&mut self, owner: CartOwner) -> Result<(), CartError> {
        self.ensure_active()?;
        self.owner = owner;
        self.touch();
        Ok(())
    }

    /// Settles the cart after an order of `ordered` was placed from it at `ordered_version`.
    ///
    /// If nothing changed since, the cart goes `cleared`. Otherwise only the ordered quantities
    /// are taken out and the cart stays active with whatever was added in the meantime.
    pub fn mark_cleared(
        &mut self,
        ordered_version: u64,
        ordered: &[CartLine],
    ) -> Result<(), CartError> {
        self.ensure_active()?;
        if self.version == ordered_version {
            self.lines.clear();
            self.state = CartState::Cleared;
        } else {
            for placed in ordered {
                let Some(position) = self
                    .lines
                    .iter()
                    .position(|line| line.matches(&placed.product_id, &placed.variant_id))
                else {
                    continue;
                };
                let remaining = self.lines[position].quantity.saturating_sub(placed.quantity);
                if remaining == 0 {
                    self.lines.remove(position);
                } else {
                    self.lines[position].quantity = remaining;
                }
            }
        }
        self.touch();
        Ok(())
    }

    fn merge_line(&mut self, line: NewLine) -> Result<LineId, CartError> {
        if line.quantity < 1 {
            return Err(CartError::InvalidQuantity(line.quantity));
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|existing| existing.matches(&line.product_id, &line.variant_id))
        {
            existing.quantity = existing
                .quantity
                .checked_add(line.quantity)
                .ok_or(CartError::QuantityOverflow(existing.id))?;
            return Ok(existing.id);
        }
        let id = LineId(self.next_line);
        self.next_line += 1;
        self.lines.push(CartLine {
            id,
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            regular_price: line.regular_price,
            snapshot: line.snapshot,
        });
        Ok(id)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Timestamp::now();
    }
}

/// What the UI renders for the current visitor.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub owner: CartOwner,
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    pub currency: String,
    pub subtotal: Money,
    pub item_count: u32,
    pub is_empty: bool,
}

impl CartView {
    pub fn of(cart: &Cart) -> Self {
        Self {
            owner: cart.owner.clone(),
            cart_id: Some(cart.id),
            lines: cart.lines.clone(),
            currency: cart.currency.clone(),
            subtotal: cart.subtotal(),
            item_count: cart.item_count(),
            is_empty: cart.is_empty(),
        }
    }

    /// The view for an owner without an active cart.
    pub fn empty(owner: CartOwner, currency: impl Into<String>) -> Self {
        Self {
            owner,
            cart_id: None,
            lines: Vec::new(),
            currency: currency.into(),
            subtotal: 0,
            item_count: 0,
            is_empty: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::owner::{SessionId, UserId};

    fn new_line(product: u32, variant: u32, quantity: u32) -> NewLine {
        NewLine {
            product_id: ProductId(product),
            variant_id: VariantId(variant),
            quantity,
            unit_price: 1_000,
            regular_price: 1_200,
            snapshot: LineSnapshot {
                name: format!("product {product}"),
                ..LineSnapshot::default()
            },
        }
    }

    fn guest_cart() -> Cart {
        Cart::new(CartId(1), CartOwner::Guest(SessionId("s1".into())), "USD")
    }

    #[test]
    fn adding_same_variant_twice_aggregates() {
        let mut cart = guest_cart();
        let first = cart.add_line(new_line(1, 1, 2)).unwrap();
        let second = cart.add_line(new_line(1, 1, 3)).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), 5_000);
    }

    #[test]
    fn different_variants_get_separate_lines() {
        let mut cart = guest_cart();
        cart.add_line(new_line(1, 1, 1)).unwrap();
        cart.add_line(new_line(1, 2, 1)).unwrap();
        assert_eq!(cart.lines.len(), 2);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cart = guest_cart();
        let version = cart.version;
        assert_eq!(
            cart.add_line(new_line(1, 1, 0)),
            Err(CartError::InvalidQuantity(0))
        );
        assert_eq!(cart.version, version);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_to_zero_removes_line() {
        let mut cart = guest_cart();
        let line = cart.add_line(new_line(1, 1, 2)).unwrap();
        cart.update_line(line, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.remove_line(line),
            Err(CartError::LineNotFound(line))
        );
    }

    #[test]
    fn clear_keeps_cart_active() {
        let mut cart = guest_cart();
        cart.add_line(new_line(1, 1, 2)).unwrap();
        cart.clear().unwrap();
        assert!(cart.is_empty());
        assert!(cart.is_active());
    }

    #[test]
    fn adjustment_batch_is_all_or_nothing() {
        let mut cart = guest_cart();
        let a = cart.add_line(new_line(1, 1, 4)).unwrap();
        let b = cart.add_line(new_line(2, 1, 3)).unwrap();
        let before = cart.clone();

        let failing = [
            ItemAdjustment::Remove { line: a },
            ItemAdjustment::ReduceTo {
                line: LineId(99),
                quantity: 1,
            },
        ];
        assert!(cart.apply_adjustments(&failing).is_err());
        assert_eq!(cart.lines, before.lines);
        assert_eq!(cart.version, before.version);

        let batch = [
            ItemAdjustment::Remove { line: a },
            ItemAdjustment::ReduceTo {
                line: b,
                quantity: 1,
            },
        ];
        cart.apply_adjustments(&batch).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].id, b);
        assert_eq!(cart.lines[0].quantity, 1);
        assert_eq!(cart.version, before.version + 1);
    }

    #[test]
    fn absorb_sums_matching_lines_and_appends_others() {
        let mut auth = Cart::new(CartId(2), CartOwner::User(UserId("u1".into())), "USD");
        auth.add_line(new_line(1, 1, 3)).unwrap();
        auth.add_line(new_line(2, 2, 1)).unwrap();

        auth.absorb(vec![new_line(1, 1, 2)]).unwrap();

        let quantities: Vec<_> = auth
            .lines
            .iter()
            .map(|line| (line.product_id.0, line.variant_id.0, line.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 1, 5), (2, 2, 1)]);
    }

    #[test]
    fn consumed_cart_refuses_mutation_until_reinstated() {
        let mut cart = guest_cart();
        let line = cart.add_line(new_line(1, 1, 1)).unwrap();
        let lines = cart.consume_for_merge().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(cart.state, CartState::Merged);
        assert!(matches!(
            cart.update_line(line, 3),
            Err(CartError::NotActive { .. })
        ));
        assert!(cart.consume_for_merge().is_err());

        cart.reinstate().unwrap();
        cart.update_line(line, 3).unwrap();
    }

    #[test]
    fn retire_requires_empty_cart() {
        let mut cart = guest_cart();
        cart.add_line(new_line(1, 1, 1)).unwrap();
        assert_eq!(cart.retire_if_empty(), Err(CartError::NotEmpty(cart.id)));
        cart.clear().unwrap();
        cart.retire_if_empty().unwrap();
        assert_eq!(cart.state, CartState::Merged);
    }

    #[test]
    fn ordered_cart_is_cleared() {
        let mut cart = guest_cart();
        cart.add_line(new_line(1, 1, 2)).unwrap();
        let ordered = cart.lines.clone();
        cart.mark_cleared(cart.version, &ordered).unwrap();
        assert_eq!(cart.state, CartState::Cleared);
        assert!(cart.is_empty());
    }

    #[test]
    fn lines_added_after_ordering_survive_clearing() {
        let mut cart = guest_cart();
        cart.add_line(new_line(1, 1, 2)).unwrap();
        let ordered_version = cart.version;
        let ordered = cart.lines.clone();

        cart.add_line(new_line(1, 1, 1)).unwrap();
        cart.add_line(new_line(2, 1, 4)).unwrap();
        cart.mark_cleared(ordered_version, &ordered).unwrap();

        assert!(cart.is_active());
        let quantities: Vec<_> = cart
            .lines
            .iter()
            .map(|line| (line.product_id.0, line.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 1), (2, 4)]);
    }

    #[test]
    fn version_check() {
        let cart = guest_cart();
        assert!(cart.ensure_version(None).is_ok());
        assert!(cart.ensure_version(Some(cart.version)).is_ok());
        assert_eq!(
            cart.ensure_version(Some(cart.version + 1)),
            Err(CartError::VersionMismatch {
                expected: cart.version + 1,
                actual: cart.version,
            })
        );
    }
}
