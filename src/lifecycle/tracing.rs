//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `fmt` subscriber filtered by `RUST_LOG`, falling back to
//! `info` when the variable is unset or invalid.
//!
//! ```bash
//! RUST_LOG=info cargo run                          # lifecycle, merge paths, orders placed
//! RUST_LOG=debug cargo run                         # every actor request with its payload
//! RUST_LOG=checkout_engine::merge=debug cargo run  # one module only
//! ```
//!
//! Client methods carry `#[instrument]` spans and the actors add their own, so a single
//! `place_order` shows up as one nested tree:
//!
//! ```text
//! INFO place:submit: Submitting order total=134000 lines=2
//! INFO Created order_id=order_1 size=1
//! INFO place: Order placed order_id=order_1 confirmation_ref=CO-000001
//! ```
use tracing_subscriber::EnvFilter;

/// Safe to call more than once; later calls keep the first subscriber.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
