//! Conflict resolution: from a failed validation to a cart that passes.
//!
//! The whole set of adjustments goes to the cart actor as one `ApplyAdjustments` action, so
//! either every line changes or none does. The action carries the version the conflicts were
//! computed against; a cart that moved in between is refused as outdated.

use tracing::{info, instrument, warn};

use crate::clients::CartClient;
use crate::events::{CheckoutEvent, EventSender};
use crate::model::{Cart, ItemAdjustment, StockConflict};
use crate::taxonomy::{ErrorKind, TaxonomyError};
use crate::validation::{StockValidator, ValidationResult, ValidationStage};

/// Default remedy per conflict: keep what is left, or drop the line when nothing is.
pub fn propose(conflicts: &[StockConflict]) -> Vec<ItemAdjustment> {
    conflicts
        .iter()
        .map(|conflict| {
            if conflict.available_stock > 0 {
                ItemAdjustment::ReduceTo {
                    line: conflict.line.id,
                    quantity: conflict.available_stock,
                }
            } else {
                ItemAdjustment::Remove {
                    line: conflict.line.id,
                }
            }
        })
        .collect()
}

/// Checks each `ReduceTo` stays within `0 < quantity ≤ available` for its conflict.
pub fn check_bounds(
    conflicts: &[StockConflict],
    adjustments: &[ItemAdjustment],
) -> Result<(), TaxonomyError> {
    for adjustment in adjustments {
        if let ItemAdjustment::ReduceTo { line, quantity } = *adjustment {
            let limit = conflicts
                .iter()
                .find(|conflict| conflict.line.id == line)
                .map(|conflict| conflict.available_stock);
            match limit {
                Some(available) if quantity > 0 && quantity <= available => {}
                Some(available) => {
                    return Err(TaxonomyError::new(
                        ErrorKind::InsufficientStock,
                        format!("{line} can be reduced to at most {available}, not {quantity}"),
                    ))
                }
                None if quantity > 0 => {}
                None => {
                    return Err(TaxonomyError::Unclassified(format!(
                        "{line} cannot be reduced to 0"
                    )))
                }
            }
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ConflictResolutionProtocol {
    carts: CartClient,
    validator: StockValidator,
    events: EventSender,
}

impl ConflictResolutionProtocol {
    pub fn new(carts: CartClient, validator: StockValidator, events: EventSender) -> Self {
        Self {
            carts,
            validator,
            events,
        }
    }

    pub fn propose(&self, conflicts: &[StockConflict]) -> Vec<ItemAdjustment> {
        propose(conflicts)
    }

    /// Applies `adjustments` to `cart` as one batch, then validates once more. Conflicts that
    /// survive the batch are reported as `STOCK_VALIDATION_FAILED`, never retried here.
    #[instrument(skip_all, fields(cart_id = %cart.id, adjustments = adjustments.len()))]
    pub async fn apply(
        &self,
        cart: &Cart,
        conflicts: &[StockConflict],
        adjustments: Vec<ItemAdjustment>,
    ) -> Result<Cart, TaxonomyError> {
        check_bounds(conflicts, &adjustments)?;

        let updated = self
            .carts
            .apply_adjustments(cart.id, adjustments, Some(cart.version))
            .await?;
        info!(version = updated.version, "Conflict resolution applied");

        match self.validator.validate(&updated).await? {
            ValidationResult::Ok => Ok(updated),
            ValidationResult::Conflicted(remaining) => {
                warn!(remaining = remaining.len(), "Conflicts persist after resolution");
                self.events.emit(CheckoutEvent::StockConflictDetected {
                    conflicts: remaining.clone(),
                });
                Err(TaxonomyError::stock(
                    ValidationStage::Checkout.error_kind(),
                    remaining,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartLine, LineId, LineSnapshot, ProductId, VariantId};

    fn conflict(line: u32, requested: u32, available: u32) -> StockConflict {
        StockConflict {
            line: CartLine {
                id: LineId(line),
                product_id: ProductId(line),
                variant_id: VariantId(1),
                quantity: requested,
                unit_price: 100,
                regular_price: 100,
                snapshot: LineSnapshot::default(),
            },
            requested_quantity: requested,
            available_stock: available,
        }
    }

    #[test]
    fn proposes_reduce_or_remove() {
        let proposal = propose(&[conflict(1, 5, 2), conflict(2, 3, 0)]);
        assert_eq!(
            proposal,
            vec![
                ItemAdjustment::ReduceTo {
                    line: LineId(1),
                    quantity: 2
                },
                ItemAdjustment::Remove { line: LineId(2) },
            ]
        );
    }

    #[test]
    fn reduce_beyond_available_is_refused() {
        let conflicts = [conflict(1, 5, 2)];
        let too_many = [ItemAdjustment::ReduceTo {
            line: LineId(1),
            quantity: 3,
        }];
        let zero = [ItemAdjustment::ReduceTo {
            line: LineId(1),
            quantity: 0,
        }];
        assert_eq!(
            check_bounds(&conflicts, &too_many).unwrap_err().kind(),
            Some(ErrorKind::InsufficientStock)
        );
        assert!(check_bounds(&conflicts, &zero).is_err());
        assert!(check_bounds(&conflicts, &propose(&conflicts)).is_ok());
    }
}
