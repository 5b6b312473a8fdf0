//! Stock validation: cart lines against live availability.
//!
//! Validation takes no locks. It reads, decides and reports; availability may change right
//! after, which is why checkout validates twice and reports the second failure differently
//! (see [`ValidationStage`]).

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::inventory::{Availability, InventoryError, InventorySnapshot};
use crate::model::{Cart, Product, ProductId, StockConflict};
use crate::retry::ReadPolicy;
use crate::taxonomy::{ErrorKind, TaxonomyError};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Ok,
    Conflicted(Vec<StockConflict>),
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn conflicts(&self) -> &[StockConflict] {
        match self {
            Self::Ok => &[],
            Self::Conflicted(conflicts) => conflicts,
        }
    }

    /// The taxonomy error for a failed validation at `stage`; `None` when ok.
    pub fn into_error(self, stage: ValidationStage) -> Option<TaxonomyError> {
        match self {
            Self::Ok => None,
            Self::Conflicted(conflicts) => Some(TaxonomyError::stock(stage.error_kind(), conflicts)),
        }
    }
}

/// When validation runs. The user already saw a clean checkout validation by the time
/// submission validates, so a conflict there is a different error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Checkout,
    Submission,
}

impl ValidationStage {
    pub fn error_kind(self) -> ErrorKind {
        match self {
            Self::Checkout => ErrorKind::StockValidationFailed,
            Self::Submission => ErrorKind::StockReservationFailed,
        }
    }
}

impl From<InventoryError> for TaxonomyError {
    fn from(error: InventoryError) -> Self {
        TaxonomyError::Transient(error.to_string())
    }
}

#[derive(Clone)]
pub struct StockValidator {
    inventory: Arc<dyn InventorySnapshot>,
    reads: ReadPolicy,
}

impl StockValidator {
    pub fn new(inventory: Arc<dyn InventorySnapshot>, reads: ReadPolicy) -> Self {
        Self { inventory, reads }
    }

    /// One conflict per line whose quantity exceeds availability. Missing, inactive and
    /// unlisted variants count as zero available; untracked stock never conflicts.
    #[instrument(skip_all, fields(cart_id = %cart.id, lines = cart.lines.len()))]
    pub async fn validate(&self, cart: &Cart) -> Result<ValidationResult, InventoryError> {
        let mut products: HashMap<ProductId, Option<Product>> = HashMap::new();
        let mut conflicts = Vec::new();

        for line in &cart.lines {
            if !products.contains_key(&line.product_id) {
                let inventory = &self.inventory;
                let id = line.product_id;
                let product = self
                    .reads
                    .run("get_product", || inventory.get_product(id))
                    .await?;
                products.insert(id, product);
            }
            let product = products.get(&line.product_id).and_then(Option::as_ref);

            if let Availability::Limited(available) = Availability::of(product, &line.variant_id) {
                if line.quantity > available {
                    debug!(line_id = %line.id, requested = line.quantity, available, "Stock conflict");
                    conflicts.push(StockConflict {
                        line: line.clone(),
                        requested_quantity: line.quantity,
                        available_stock: available,
                    });
                }
            }
        }

        if conflicts.is_empty() {
            Ok(ValidationResult::Ok)
        } else {
            info!(conflicts = conflicts.len(), "Cart failed stock validation");
            Ok(ValidationResult::Conflicted(conflicts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartId, CartOwner, LineSnapshot, NewLine, ProductStatus, SessionId, Variant, VariantId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeInventory {
        products: HashMap<ProductId, Product>,
        lookups: AtomicU32,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl InventorySnapshot for FakeInventory {
        async fn get_product(&self, id: ProductId) -> Result<Option<Product>, InventoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(InventoryError::Unavailable("catalog restarting".into()));
            }
            Ok(self.products.get(&id).cloned())
        }
    }

    const READS: ReadPolicy = ReadPolicy {
        timeout: Duration::from_secs(1),
        attempts: 3,
    };

    fn product(id: u32, stocks: &[Option<u32>]) -> Product {
        Product {
            id: ProductId(id),
            name: format!("product {id}"),
            status: ProductStatus::Active,
            image: None,
            variants: stocks
                .iter()
                .enumerate()
                .map(|(index, stock)| Variant {
                    id: VariantId(index as u32 + 1),
                    size: None,
                    sku: None,
                    price: 1_000,
                    promotional_price: None,
                    is_active: true,
                    stock: *stock,
                })
                .collect(),
        }
    }

    fn cart(lines: &[(u32, u32, u32)]) -> Cart {
        let mut cart = Cart::new(CartId(1), CartOwner::Guest(SessionId("s".into())), "UAH");
        for &(product, variant, quantity) in lines {
            cart.add_line(NewLine {
                product_id: ProductId(product),
                variant_id: VariantId(variant),
                quantity,
                unit_price: 1_000,
                regular_price: 1_000,
                snapshot: LineSnapshot::default(),
            })
            .unwrap();
        }
        cart
    }

    fn validator(inventory: FakeInventory) -> (StockValidator, Arc<FakeInventory>) {
        let inventory = Arc::new(inventory);
        (StockValidator::new(inventory.clone(), READS), inventory)
    }

    #[tokio::test]
    async fn reports_shortfall_with_exact_shape() {
        let mut inventory = FakeInventory::default();
        inventory.products.insert(ProductId(1), product(1, &[Some(2), None]));
        let (validator, _) = validator(inventory);

        let result = validator.validate(&cart(&[(1, 1, 5), (1, 2, 40)])).await.unwrap();

        let conflicts = result.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].requested_quantity, 5);
        assert_eq!(conflicts[0].available_stock, 2);
        assert_eq!(conflicts[0].line.variant_id, VariantId(1));
    }

    #[tokio::test]
    async fn zero_stock_and_missing_products_are_reported() {
        let mut inventory = FakeInventory::default();
        inventory.products.insert(ProductId(1), product(1, &[Some(0)]));
        let (validator, _) = validator(inventory);

        let result = validator.validate(&cart(&[(1, 1, 1), (2, 1, 1)])).await.unwrap();

        let available: Vec<u32> = result.conflicts().iter().map(|c| c.available_stock).collect();
        assert_eq!(available, vec![0, 0]);
    }

    #[tokio::test]
    async fn clean_cart_is_ok() {
        let mut inventory = FakeInventory::default();
        inventory.products.insert(ProductId(1), product(1, &[Some(3)]));
        let (validator, _) = validator(inventory);

        let result = validator.validate(&cart(&[(1, 1, 3)])).await.unwrap();
        assert!(result.is_ok());
        assert_eq!(result.into_error(ValidationStage::Checkout), None);
    }

    #[tokio::test]
    async fn each_product_is_read_once() {
        let mut inventory = FakeInventory::default();
        inventory.products.insert(ProductId(1), product(1, &[None, None, None]));
        let (validator, inventory) = validator(inventory);

        validator
            .validate(&cart(&[(1, 1, 1), (1, 2, 1), (1, 3, 1)]))
            .await
            .unwrap();
        assert_eq!(inventory.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_lookup_failures_are_retried() {
        let mut inventory = FakeInventory::default();
        inventory.products.insert(ProductId(1), product(1, &[Some(1)]));
        inventory.failures_left = AtomicU32::new(2);
        let (validator, inventory) = validator(inventory);

        let result = validator.validate(&cart(&[(1, 1, 1)])).await.unwrap();
        assert!(result.is_ok());
        assert_eq!(inventory.lookups.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn stage_picks_the_error_kind() {
        let conflict = StockConflict {
            line: cart(&[(1, 1, 5)]).lines[0].clone(),
            requested_quantity: 5,
            available_stock: 2,
        };
        let result = ValidationResult::Conflicted(vec![conflict]);
        let checkout = result.clone().into_error(ValidationStage::Checkout).unwrap();
        let submission = result.into_error(ValidationStage::Submission).unwrap();
        assert_eq!(checkout.kind(), Some(ErrorKind::StockValidationFailed));
        assert_eq!(submission.kind(), Some(ErrorKind::StockReservationFailed));
        assert_eq!(submission.conflicts().len(), 1);
    }
}
