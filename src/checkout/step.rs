//! The four checkout steps.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CheckoutStep {
    Contact = 0,
    Delivery = 1,
    Payment = 2,
    Confirmation = 3,
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("Checkout step out of range: {0}")]
pub struct StepOutOfRange(pub u8);

impl CheckoutStep {
    pub const ALL: [CheckoutStep; 4] = [
        Self::Contact,
        Self::Delivery,
        Self::Payment,
        Self::Confirmation,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// One step forward, clamped at `Confirmation`.
    pub fn next(self) -> Self {
        Self::try_from(self.index() + 1).unwrap_or(Self::Confirmation)
    }

    /// One step back, clamped at `Contact`.
    pub fn prev(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(|index| Self::try_from(index).ok())
            .unwrap_or(Self::Contact)
    }
}

impl From<CheckoutStep> for u8 {
    fn from(step: CheckoutStep) -> Self {
        step.index()
    }
}

impl TryFrom<u8> for CheckoutStep {
    type Error = StepOutOfRange;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(StepOutOfRange(index))
    }
}

impl Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Contact => "contact",
            Self::Delivery => "delivery",
            Self::Payment => "payment",
            Self::Confirmation => "confirmation",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_clamp_at_both_ends() {
        assert_eq!(CheckoutStep::Contact.prev(), CheckoutStep::Contact);
        assert_eq!(CheckoutStep::Contact.next(), CheckoutStep::Delivery);
        assert_eq!(CheckoutStep::Confirmation.next(), CheckoutStep::Confirmation);
        assert_eq!(CheckoutStep::Confirmation.prev(), CheckoutStep::Payment);
    }

    #[test]
    fn persisted_as_index() {
        assert_eq!(serde_json::to_string(&CheckoutStep::Payment).unwrap(), "2");
        assert_eq!(
            serde_json::from_str::<CheckoutStep>("3").unwrap(),
            CheckoutStep::Confirmation
        );
        assert!(serde_json::from_str::<CheckoutStep>("7").is_err());
    }
}
