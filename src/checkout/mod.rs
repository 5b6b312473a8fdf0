//! # Checkout
//!
//! The client-durable side of checkout: the step machine, its form data, the persisted session
//! and the storage it is written through, and the delivery/payment registries it reads.

pub mod form;
pub mod machine;
pub mod methods;
pub mod session;
pub mod step;
pub mod storage;

pub use form::{FormData, FormPatch};
pub use machine::{CheckoutError, CheckoutStateMachine};
pub use methods::{
    DeliveryKind, DeliveryMethod, DeliveryMethodId, MethodRegistry, MethodsError, PaymentMethod,
    PaymentMethodId, ShopId, StaticMethodRegistry,
};
pub use session::{clear_checkout_state, CheckoutSession};
pub use step::CheckoutStep;
pub use storage::{DurableStore, FileStore, MemoryStore, ScopedStore, StorageError};
