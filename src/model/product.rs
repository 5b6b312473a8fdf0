//! Catalog entries as seen by the cart: a product and its purchasable variants.
//!
//! The catalog itself is an outside collaborator; this crate only reads it (see
//! [`InventorySnapshot`](crate::inventory::InventorySnapshot)). The in-memory catalog actor in
//! [`product_actor`](crate::product_actor) stores these same records.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::cart::Money;

/// Type-safe identifier for Products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u32);

impl From<u32> for ProductId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "product_{}", self.0)
    }
}

/// Identifier of a variant, unique within its product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub u32);

impl Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "variant_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub size: Option<String>,
    pub sku: Option<String>,
    /// Regular price in minor units.
    pub price: Money,
    pub promotional_price: Option<Money>,
    pub is_active: bool,
    /// `None` when inventory tracking is disabled for the variant.
    pub stock: Option<u32>,
}

impl Variant {
    /// The price a customer pays today.
    pub fn current_price(&self) -> Money {
        self.promotional_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub status: ProductStatus,
    pub image: Option<String>,
    pub variants: Vec<Variant>,
}

impl Product {
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|variant| &variant.id == id)
    }

    /// The variant if both it and the product can currently be bought.
    pub fn purchasable_variant(&self, id: &VariantId) -> Option<&Variant> {
        if self.status != ProductStatus::Active {
            return None;
        }
        self.variant(id).filter(|variant| variant.is_active)
    }
}

#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub name: String,
    pub status: ProductStatus,
    pub image: Option<String>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub status: Option<ProductStatus>,
}
