//! Stock conflicts and the adjustments that resolve them.

use serde::{Deserialize, Serialize};

use super::cart::{CartLine, LineId};

/// A line asking for more than is available right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConflict {
    pub line: CartLine,
    pub requested_quantity: u32,
    pub available_stock: u32,
}

impl StockConflict {
    /// Some stock remains, so the line can be reduced instead of removed.
    pub fn is_partial(&self) -> bool {
        self.available_stock > 0
    }
}

/// The remedy chosen for one conflicting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemAdjustment {
    Remove { line: LineId },
    ReduceTo { line: LineId, quantity: u32 },
}

impl ItemAdjustment {
    pub fn line(&self) -> LineId {
        match self {
            Self::Remove { line } | Self::ReduceTo { line, .. } => *line,
        }
    }
}
