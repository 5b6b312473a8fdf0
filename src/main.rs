//! # Checkout Engine demo
//!
//! Runs one visitor through the whole flow against in-memory actors:
//! 1. a guest fills a cart
//! 2. logs in, which merges the guest cart into theirs
//! 3. walks the checkout steps, hits a stock conflict and resolves it
//! 4. places the order, which clears the cart and the checkout session

use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};

use checkout_engine::checkout::{
    DeliveryKind, DeliveryMethod, FormPatch, MemoryStore, PaymentMethod, StaticMethodRegistry,
};
use checkout_engine::config::CheckoutConfig;
use checkout_engine::conflicts::propose;
use checkout_engine::identity::{AuthenticatedUser, Credentials};
use checkout_engine::lifecycle::tracing::setup_tracing;
use checkout_engine::lifecycle::{CheckoutSystem, Storefront};
use checkout_engine::model::{
    ProductCreate, ProductId, ProductStatus, StockConflict, UserId, Variant, VariantId,
};
use checkout_engine::taxonomy::{ErrorKind, RedirectTarget, TaxonomyError, UiCallbacks};
use checkout_engine::validation::ValidationResult;

#[derive(Debug, Parser)]
#[command(name = "checkout-engine", about = "Cart and checkout demo", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CheckoutConfig,
}

/// Recovery hooks that only log.
struct LogUi {
    cart_items: bool,
}

impl UiCallbacks for LogUi {
    fn notify(&mut self, kind: Option<ErrorKind>, message: &str) {
        warn!(?kind, message, "Notify");
    }
    fn redirect(&mut self, target: RedirectTarget, delay: Duration) {
        info!(?target, ?delay, "Redirect");
    }
    fn refresh_cart(&mut self) {
        info!("Refresh cart");
    }
    fn prompt_reauth(&mut self) {
        info!("Prompt re-authentication");
    }
    fn open_conflict_resolution(&mut self, conflicts: &[StockConflict]) {
        info!(conflicts = conflicts.len(), "Open conflict resolution");
    }
    fn prompt_pending_orders(&mut self) {
        info!("Prompt pending orders");
    }
    fn has_cart_items(&self) -> bool {
        self.cart_items
    }
}

#[tokio::main]
async fn main() {
    let _env = dotenvy::dotenv();
    let cli = Cli::parse();
    setup_tracing();

    if let Err(error) = run(cli.config).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(config: CheckoutConfig) -> Result<(), String> {
    let system = CheckoutSystem::new(config, Arc::new(registry()));
    let shirt = seed_catalog(&system).await?;

    let (mut storefront, mut events) = system
        .open_storefront(&Credentials::default(), Arc::new(MemoryStore::default()))
        .await
        .map_err(|e| e.to_string())?;
    if let Some(cookie) = storefront.set_cookie() {
        info!(name = %cookie.name, max_age = ?cookie.max_age, "Issuing session cookie");
    }

    let result = shop(&mut storefront, shirt)
        .instrument(tracing::info_span!("visitor"))
        .await;
    if let Err(error) = &result {
        let mut ui = LogUi {
            cart_items: storefront
                .get_cart()
                .await
                .map(|cart| !cart.is_empty)
                .unwrap_or(false),
        };
        if !storefront.report(error, &mut ui) {
            warn!(%error, "Something went wrong");
        }
    }

    drop(storefront);
    while let Ok(event) = events.try_recv() {
        info!(?event, "Checkout event");
    }
    system.shutdown().await.map_err(|e| e.to_string())?;
    result.map_err(|e| e.to_string())
}

async fn shop(storefront: &mut Storefront, shirt: ProductId) -> Result<(), TaxonomyError> {
    storefront.add_item(shirt, VariantId(1), 2).await?;
    let cart = storefront.add_item(shirt, VariantId(2), 2).await?;
    info!(items = cart.item_count, subtotal = cart.subtotal, "Guest cart filled");

    let cart = storefront
        .authenticate(AuthenticatedUser::User(UserId("alice".into())))
        .await?;
    info!(owner = %cart.owner, items = cart.item_count, "Logged in");

    let session = storefront.begin_checkout().await?;
    info!(step = %session.current_step, "Checkout begun");
    storefront
        .update_form_data(FormPatch {
            name: Some("Alice".into()),
            email: Some("alice@example.com".into()),
            phone: Some("050 123 45 67".into()),
            city: Some("Kyiv".into()),
            street: Some("Khreshchatyk 1".into()),
            ..FormPatch::default()
        })
        .await?;
    storefront.advance_step().await?;
    storefront
        .update_form_data(FormPatch {
            delivery_method_id: Some("courier".into()),
            ..FormPatch::default()
        })
        .await?;

    if let ValidationResult::Conflicted(conflicts) = storefront.validate_for_checkout().await? {
        let cart = storefront.resolve_conflicts(propose(&conflicts)).await?;
        info!(items = cart.item_count, "Conflicts resolved");
    }

    storefront.advance_step().await?;
    storefront
        .update_form_data(FormPatch {
            payment_method_id: Some("card".into()),
            ..FormPatch::default()
        })
        .await?;

    let receipt = storefront.place_order().await?;
    info!(order_id = %receipt.order_id, confirmation_ref = %receipt.confirmation_ref, "Order placed");

    let cart = storefront.get_cart().await?;
    info!(is_empty = cart.is_empty, "Cart after order");
    Ok(())
}

fn registry() -> StaticMethodRegistry {
    StaticMethodRegistry::new(
        vec![
            DeliveryMethod {
                id: "courier".into(),
                kind: DeliveryKind::Delivery,
                price: 3_000,
                estimated_time: Some("1-2 days".into()),
                shops: Vec::new(),
                cities: Some(vec!["Kyiv".into(), "Lviv".into()]),
            },
            DeliveryMethod {
                id: "pickup".into(),
                kind: DeliveryKind::Pickup,
                price: 0,
                estimated_time: None,
                shops: vec!["podil".into()],
                cities: None,
            },
        ],
        vec![
            PaymentMethod {
                id: "card".into(),
                kind: "card".into(),
                name: "Card".into(),
            },
            PaymentMethod {
                id: "cash".into(),
                kind: "cash_on_delivery".into(),
                name: "Cash on delivery".into(),
            },
        ],
    )
}

async fn seed_catalog(system: &CheckoutSystem) -> Result<ProductId, String> {
    let variant = |id, size: &str, stock| Variant {
        id: VariantId(id),
        size: Some(size.to_string()),
        sku: Some(format!("LS-{size}")),
        price: 120_000,
        promotional_price: Some(99_000),
        is_active: true,
        stock: Some(stock),
    };
    let shirt = system
        .products
        .create_product(ProductCreate {
            name: "Linen shirt".into(),
            status: ProductStatus::Active,
            image: None,
            variants: vec![variant(1, "M", 5), variant(2, "L", 1)],
        })
        .await
        .map_err(|e| e.to_string())?;
    info!(product_id = %shirt, "Catalog seeded");
    Ok(shirt)
}
