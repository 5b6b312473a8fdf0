//! Custom actions for the Product actor: per-variant inventory, availability and pricing.

use crate::model::VariantId;

#[derive(Debug, Clone)]
pub enum ProductAction {
    /// `None` disables inventory tracking for the variant.
    SetStock {
        variant: VariantId,
        stock: Option<u32>,
    },
    SetVariantActive {
        variant: VariantId,
        active: bool,
    },
    SetPromotionalPrice {
        variant: VariantId,
        price: Option<u64>,
    },
    /// Takes units out of tracked stock; untracked variants always succeed.
    ReserveStock {
        variant: VariantId,
        quantity: u32,
    },
    /// Returns units taken by `ReserveStock`.
    ReleaseStock {
        variant: VariantId,
        quantity: u32,
    },
}

/// Results from ProductActions.
#[derive(Debug, Clone)]
pub enum ProductActionResult {
    Updated,
}
