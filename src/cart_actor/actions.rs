//! Custom actions for the Cart actor.
//!
//! Each action is one atomic step against one cart. Mutating actions carry the cart version
//! the caller last saw when a stale write must be refused (`expected_version`).

use crate::model::{Cart, CartLine, ItemAdjustment, LineId, NewLine};

#[derive(Debug, Clone)]
pub enum CartAction {
    AddLine(NewLine),
    UpdateLine {
        line: LineId,
        quantity: u32,
    },
    RemoveLine(LineId),
    Clear,
    /// A conflict-resolution batch, applied whole or not at all.
    ApplyAdjustments {
        adjustments: Vec<ItemAdjustment>,
        expected_version: Option<u64>,
    },
    /// Marks a guest cart `merged` and returns its lines.
    ConsumeForMerge,
    /// Folds merged lines into this cart.
    Absorb(Vec<NewLine>),
    /// Reverts `ConsumeForMerge`.
    Reinstate,
    /// Releases an empty cart's owner binding.
    Retire,
    /// Settles the cart after a successful order. `ordered` is what was submitted, taken
    /// from the cart at `ordered_version`.
    MarkCleared {
        ordered_version: u64,
        ordered: Vec<CartLine>,
    },
}

#[derive(Debug, Clone)]
pub enum CartActionResult {
    /// The cart after the action.
    Cart(Cart),
    /// Lines taken from a consumed cart.
    Consumed(Vec<NewLine>),
}
