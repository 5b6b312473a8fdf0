//! [`ActorEntity`] implementation for [`Product`].

use actor_framework::ActorEntity;
use async_trait::async_trait;
use std::collections::HashSet;

use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;
use crate::model::{Product, ProductCreate, ProductId, ProductUpdate, Variant, VariantId};

impl Product {
    fn variant_mut(&mut self, id: VariantId) -> Result<&mut Variant, ProductError> {
        self.variants
            .iter_mut()
            .find(|variant| variant.id == id)
            .ok_or(ProductError::UnknownVariant(id))
    }
}

#[async_trait]
impl ActorEntity for Product {
    type Id = ProductId;
    type Key = ();
    type Create = ProductCreate;
    type Update = ProductUpdate;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Context = ();
    type Error = ProductError;

    fn from_create_params(id: ProductId, params: ProductCreate) -> Result<Self, Self::Error> {
        if params.variants.is_empty() {
            return Err(ProductError::NoVariants);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = params.variants.iter().find(|variant| !seen.insert(variant.id)) {
            return Err(ProductError::DuplicateVariant(duplicate.id));
        }
        Ok(Self {
            id,
            name: params.name,
            status: params.status,
            image: params.image,
            variants: params.variants,
        })
    }

    async fn on_update(&mut self, update: ProductUpdate, _ctx: &()) -> Result<(), Self::Error> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: ProductAction,
        _ctx: &(),
    ) -> Result<ProductActionResult, Self::Error> {
        match action {
            ProductAction::SetStock { variant, stock } => {
                self.variant_mut(variant)?.stock = stock;
            }
            ProductAction::SetVariantActive { variant, active } => {
                self.variant_mut(variant)?.is_active = active;
            }
            ProductAction::SetPromotionalPrice { variant, price } => {
                self.variant_mut(variant)?.promotional_price = price;
            }
            ProductAction::ReserveStock { variant, quantity } => {
                let target = self.variant_mut(variant)?;
                if let Some(available) = target.stock {
                    if available < quantity {
                        return Err(ProductError::InsufficientStock {
                            variant,
                            requested: quantity,
                            available,
                        });
                    }
                    target.stock = Some(available - quantity);
                }
            }
            ProductAction::ReleaseStock { variant, quantity } => {
                let target = self.variant_mut(variant)?;
                if let Some(available) = target.stock {
                    target.stock = Some(available.saturating_add(quantity));
                }
            }
        }
        Ok(ProductActionResult::Updated)
    }
}
