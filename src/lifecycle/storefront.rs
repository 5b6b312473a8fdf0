//! # Storefront
//!
//! What the UI layer talks to for one visitor: the cart operations, checkout steps, conflict
//! resolution and order placement, each returning either a result or a [`TaxonomyError`] for
//! [`Storefront::report`].
//!
//! Checkout-stage validation is remembered per cart version. `place_order` re-runs it when the
//! cart changed since the last successful `validate_for_checkout`, then the placer validates
//! once more at submission.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::checkout::{
    clear_checkout_state, CheckoutSession, CheckoutStateMachine, CheckoutStep, DurableStore,
    FormData, FormPatch, MethodRegistry,
};
use crate::clients::{CartClient, OrderClient, ProductClient};
use crate::config::CheckoutConfig;
use crate::conflicts::ConflictResolutionProtocol;
use crate::events::{CheckoutEvent, EventSender};
use crate::identity::{AuthenticatedUser, ResolvedOwner, SessionCookie};
use crate::inventory::InventorySnapshot;
use crate::merge::CartMergeEngine;
use crate::model::{
    Cart, CartId, CartOwner, CartView, ItemAdjustment, LineId, LineSnapshot, NewLine, OrderReceipt,
    ProductId, SessionId, StockConflict, VariantId,
};
use crate::placement::{OrderPlacer, PlacementDeps, PricingPolicy};
use crate::retry::ReadPolicy;
use crate::taxonomy::{ErrorKind, ErrorTaxonomyRouter, TaxonomyError, UiCallbacks};
use crate::validation::{StockValidator, ValidationResult, ValidationStage};

/// The actor clients and registry a storefront works against.
#[derive(Clone)]
pub struct Backends {
    pub carts: CartClient,
    pub products: ProductClient,
    pub orders: OrderClient,
    pub registry: Arc<dyn MethodRegistry>,
}

/// Conflicts from the last failed validation, and the cart version they were found on.
struct PendingConflicts {
    cart: CartId,
    version: u64,
    conflicts: Vec<StockConflict>,
}

pub struct Storefront {
    owner: CartOwner,
    set_cookie: Option<SessionCookie>,
    backends: Backends,
    store: Arc<dyn DurableStore>,
    events: EventSender,
    reads: ReadPolicy,
    merge: CartMergeEngine,
    validator: StockValidator,
    resolution: ConflictResolutionProtocol,
    placer: OrderPlacer,
    router: ErrorTaxonomyRouter,
    checkout: Option<CheckoutStateMachine>,
    validated: Option<(CartId, u64)>,
    pending: Option<PendingConflicts>,
}

impl Storefront {
    pub fn new(
        resolved: ResolvedOwner,
        backends: Backends,
        store: Arc<dyn DurableStore>,
        events: EventSender,
        config: &CheckoutConfig,
    ) -> Self {
        let reads = config.read_policy();
        let inventory: Arc<dyn InventorySnapshot> = Arc::new(backends.products.clone());
        let validator = StockValidator::new(inventory, reads);
        let placer = OrderPlacer::new(
            PlacementDeps {
                carts: backends.carts.clone(),
                validator: validator.clone(),
                orders: Arc::new(backends.orders.clone()),
                registry: backends.registry.clone(),
                events: events.clone(),
            },
            PricingPolicy::new(config.city_fees.clone(), config.tax_rate_bps),
            config.country_code.clone(),
            config.request_timeout(),
            reads,
        );

        Self {
            owner: resolved.owner,
            set_cookie: resolved.set_cookie,
            merge: CartMergeEngine::new(backends.carts.clone(), reads),
            resolution: ConflictResolutionProtocol::new(
                backends.carts.clone(),
                validator.clone(),
                events.clone(),
            ),
            router: ErrorTaxonomyRouter::new(store.clone(), config.redirect_delay()),
            validator,
            placer,
            backends,
            store,
            events,
            reads,
            checkout: None,
            validated: None,
            pending: None,
        }
    }

    pub fn owner(&self) -> &CartOwner {
        &self.owner
    }

    /// Set when a guest session was minted for this visit.
    pub fn set_cookie(&self) -> Option<&SessionCookie> {
        self.set_cookie.as_ref()
    }

    pub fn checkout(&self) -> Option<&CheckoutStateMachine> {
        self.checkout.as_ref()
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub async fn get_cart(&self) -> Result<CartView, TaxonomyError> {
        Ok(match self.active_cart().await? {
            Some(cart) => CartView::of(&cart),
            None => CartView::empty(self.owner.clone(), self.backends.carts.currency()),
        })
    }

    /// Adds `quantity` of a purchasable variant at today's price. Stock is not checked here.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<CartView, TaxonomyError> {
        let products = &self.backends.products;
        let product = self
            .reads
            .run("get_product", || products.get_product(product_id))
            .await?;
        let unavailable = || {
            TaxonomyError::new(
                ErrorKind::ProductUnavailable,
                format!("{product_id}/{variant_id} is not available"),
            )
        };
        let product = product.ok_or_else(unavailable)?;
        let variant = product
            .purchasable_variant(&variant_id)
            .ok_or_else(unavailable)?;

        let line = NewLine {
            product_id,
            variant_id,
            quantity,
            unit_price: variant.current_price(),
            regular_price: variant.price,
            snapshot: LineSnapshot {
                name: product.name.clone(),
                image: product.image.clone(),
                size: variant.size.clone(),
                sku: variant.sku.clone(),
            },
        };
        let cart = self.backends.carts.find_or_create(&self.owner).await?;
        let cart = self.backends.carts.add_line(cart.id, line).await?;
        Ok(CartView::of(&cart))
    }

    /// A quantity of 0 removes the line.
    pub async fn update_item(&self, line: LineId, quantity: u32) -> Result<CartView, TaxonomyError> {
        let cart = self.require_cart().await?;
        let cart = self
            .backends
            .carts
            .update_line(cart.id, line, quantity)
            .await?;
        Ok(CartView::of(&cart))
    }

    pub async fn remove_item(&self, line: LineId) -> Result<CartView, TaxonomyError> {
        let cart = self.require_cart().await?;
        let cart = self.backends.carts.remove_line(cart.id, line).await?;
        Ok(CartView::of(&cart))
    }

    pub async fn clear_cart(&self) -> Result<CartView, TaxonomyError> {
        let cart = self.require_cart().await?;
        let cart = self.backends.carts.clear(cart.id).await?;
        Ok(CartView::of(&cart))
    }

    /// Switches this visitor to `user`, folding a guest cart into theirs.
    #[instrument(skip(self), fields(from = %self.owner))]
    pub async fn authenticate(&mut self, user: AuthenticatedUser) -> Result<CartView, TaxonomyError> {
        let authenticated = CartOwner::from(user);
        let cart = if self.owner.is_guest() {
            self.merge
                .merge_guest_into_authenticated(&self.owner, &authenticated)
                .await?
        } else {
            self.backends.carts.find_or_create(&authenticated).await?
        };
        info!(owner = %authenticated, cart_id = %cart.id, "Visitor authenticated");
        self.owner = authenticated;
        self.set_cookie = None;
        self.validated = None;
        self.pending = None;
        Ok(CartView::of(&cart))
    }

    /// Folds the cart of a guest session that arrived alongside authenticated credentials into
    /// this owner's cart. Nothing happens for a guest visitor, or when that session holds no
    /// lines (including a cart already merged on an earlier request).
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn adopt_guest_session(&mut self, session: SessionId) -> Result<(), TaxonomyError> {
        if self.owner.is_guest() {
            return Ok(());
        }
        let guest = CartOwner::Guest(session);
        let carts = &self.backends.carts;
        let leftover = self
            .reads
            .run("find_active", || carts.find_active(&guest))
            .await?;
        if !leftover.is_some_and(|cart| !cart.is_empty()) {
            return Ok(());
        }

        let cart = self
            .merge
            .merge_guest_into_authenticated(&guest, &self.owner)
            .await?;
        info!(%guest, cart_id = %cart.id, "Adopted guest cart");
        self.validated = None;
        self.pending = None;
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Resumes or starts checkout for a non-empty cart, then checks a recorded order is still
    /// pending.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn begin_checkout(&mut self) -> Result<&CheckoutSession, TaxonomyError> {
        self.require_items().await?;
        let machine = CheckoutStateMachine::begin(
            self.store.clone(),
            self.backends.registry.clone(),
            self.events.clone(),
            self.reads,
        )
        .await?;
        machine.reconcile(&self.backends.orders).await?;
        Ok(self.checkout.insert(machine).session())
    }

    pub async fn advance_step(&mut self) -> Result<CheckoutStep, TaxonomyError> {
        Ok(self.machine()?.next_step().await?)
    }

    pub fn retreat_step(&mut self) -> Result<CheckoutStep, TaxonomyError> {
        Ok(self.machine()?.prev_step()?)
    }

    pub async fn update_form_data(&mut self, patch: FormPatch) -> Result<FormData, TaxonomyError> {
        Ok(self.machine()?.update_form_data(patch).await?.clone())
    }

    /// Checkout-stage validation of the active cart. Conflicts are emitted as an event and kept
    /// for [`Storefront::resolve_conflicts`].
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn validate_for_checkout(&mut self) -> Result<ValidationResult, TaxonomyError> {
        let cart = self.require_items().await?;
        let result = self.validator.validate(&cart).await?;
        match &result {
            ValidationResult::Ok => {
                self.validated = Some((cart.id, cart.version));
                self.pending = None;
            }
            ValidationResult::Conflicted(conflicts) => {
                warn!(conflicts = conflicts.len(), "Stock conflicts found");
                self.events.emit(CheckoutEvent::StockConflictDetected {
                    conflicts: conflicts.clone(),
                });
                self.validated = None;
                self.pending = Some(PendingConflicts {
                    cart: cart.id,
                    version: cart.version,
                    conflicts: conflicts.clone(),
                });
            }
        }
        Ok(result)
    }

    /// Applies `adjustments` to the conflicts found by the last validation, as one batch.
    #[instrument(skip(self, adjustments), fields(owner = %self.owner))]
    pub async fn resolve_conflicts(
        &mut self,
        adjustments: Vec<ItemAdjustment>,
    ) -> Result<CartView, TaxonomyError> {
        let pending = self.pending.take().ok_or_else(|| {
            TaxonomyError::Unclassified("No stock conflicts to resolve".to_string())
        })?;
        let cart = self.require_cart().await?;
        if cart.id != pending.cart || cart.version != pending.version {
            return Err(TaxonomyError::new(
                ErrorKind::CartOutdated,
                "Cart changed since it was validated",
            ));
        }

        let updated = self
            .resolution
            .apply(&cart, &pending.conflicts, adjustments)
            .await?;
        self.validated = Some((updated.id, updated.version));
        Ok(CartView::of(&updated))
    }

    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn place_order(&mut self) -> Result<OrderReceipt, TaxonomyError> {
        if self.checkout.is_none() {
            return Err(not_started());
        }
        let cart = self.require_items().await?;

        if self.validated != Some((cart.id, cart.version)) {
            if let Some(error) = self
                .validate_for_checkout()
                .await?
                .into_error(ValidationStage::Checkout)
            {
                return Err(error);
            }
        }

        let checkout = self.checkout.as_mut().ok_or_else(not_started)?;
        let receipt = self.placer.place(&cart, checkout).await?;
        self.checkout = None;
        self.validated = None;
        Ok(receipt)
    }

    /// Discards checkout progress. The cart is untouched.
    pub fn abandon_checkout(&mut self) -> Result<(), TaxonomyError> {
        match self.checkout.take() {
            Some(machine) => machine.abandon()?,
            None => {
                clear_checkout_state(self.store.as_ref())
                    .map_err(|e| TaxonomyError::Transient(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Routes `error` to its recovery. When the recovery clears checkout state, the in-memory
    /// checkout goes with it.
    pub fn report(&mut self, error: &TaxonomyError, ui: &mut dyn UiCallbacks) -> bool {
        let clears = self
            .router
            .plan(error, ui.has_cart_items())
            .clears_checkout_state();
        let handled = self.router.handle(error, ui);
        if clears {
            self.checkout = None;
            self.validated = None;
            self.pending = None;
        }
        handled
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn active_cart(&self) -> Result<Option<Cart>, TaxonomyError> {
        let carts = &self.backends.carts;
        let owner = &self.owner;
        Ok(self
            .reads
            .run("find_active", || carts.find_active(owner))
            .await?)
    }

    async fn require_cart(&self) -> Result<Cart, TaxonomyError> {
        self.active_cart().await?.ok_or_else(|| {
            TaxonomyError::new(ErrorKind::CartOutdated, "There is no active cart")
        })
    }

    async fn require_items(&self) -> Result<Cart, TaxonomyError> {
        match self.active_cart().await? {
            Some(cart) if !cart.is_empty() => Ok(cart),
            _ => Err(TaxonomyError::new(ErrorKind::EmptyCart, "Your cart is empty")),
        }
    }

    fn machine(&mut self) -> Result<&mut CheckoutStateMachine, TaxonomyError> {
        self.checkout.as_mut().ok_or_else(not_started)
    }
}

fn not_started() -> TaxonomyError {
    TaxonomyError::Unclassified("Checkout has not been started".to_string())
}
