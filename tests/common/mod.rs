#![allow(dead_code)]

use std::sync::Arc;

use checkout_engine::checkout::{
    DeliveryKind, DeliveryMethod, MemoryStore, PaymentMethod, StaticMethodRegistry,
};
use checkout_engine::config::CheckoutConfig;
use checkout_engine::events::{CheckoutEvent, EventReceiver};
use checkout_engine::identity::Credentials;
use checkout_engine::lifecycle::{CheckoutSystem, Storefront};
use checkout_engine::model::{ProductCreate, ProductId, ProductStatus, SessionId, Variant, VariantId};

pub const COURIER: &str = "courier";
pub const PICKUP: &str = "pickup";

pub fn registry() -> StaticMethodRegistry {
    StaticMethodRegistry::new(
        vec![
            DeliveryMethod {
                id: COURIER.into(),
                kind: DeliveryKind::Delivery,
                price: 3_000,
                estimated_time: Some("1 day".into()),
                shops: Vec::new(),
                cities: Some(vec!["Kyiv".into()]),
            },
            DeliveryMethod {
                id: PICKUP.into(),
                kind: DeliveryKind::Pickup,
                price: 0,
                estimated_time: None,
                shops: vec!["podil".into()],
                cities: None,
            },
        ],
        vec![PaymentMethod {
            id: "card".into(),
            kind: "card".into(),
            name: "Card".into(),
        }],
    )
}

pub fn system() -> CheckoutSystem {
    let config = CheckoutConfig {
        city_fees: vec![("Kyiv".to_string(), 5_000)],
        ..CheckoutConfig::default()
    };
    CheckoutSystem::new(config, Arc::new(registry()))
}

pub fn variant(id: u32, price: u64, stock: Option<u32>) -> Variant {
    Variant {
        id: VariantId(id),
        size: Some(format!("S{id}")),
        sku: Some(format!("SKU-{id}")),
        price,
        promotional_price: None,
        is_active: true,
        stock,
    }
}

pub async fn seed(system: &CheckoutSystem, variants: Vec<Variant>) -> ProductId {
    system
        .products
        .create_product(ProductCreate {
            name: "Linen shirt".into(),
            status: ProductStatus::Active,
            image: None,
            variants,
        })
        .await
        .expect("seed product")
}

/// Drains whatever events have been emitted so far.
pub fn drain(events: &mut EventReceiver) -> Vec<CheckoutEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub async fn guest(system: &CheckoutSystem, session: &str) -> (Storefront, EventReceiver) {
    open(system, session, Arc::new(MemoryStore::default())).await
}

pub async fn open(
    system: &CheckoutSystem,
    session: &str,
    store: Arc<MemoryStore>,
) -> (Storefront, EventReceiver) {
    system
        .open_storefront(&Credentials::guest(SessionId(session.into())), store)
        .await
        .expect("open storefront")
}
