//! Plain data shared by the actors, the checkout flow and the UI surface.

pub mod cart;
pub mod conflict;
pub mod contact;
pub mod order;
pub mod owner;
pub mod product;

pub use cart::*;
pub use conflict::*;
pub use contact::*;
pub use order::*;
pub use owner::*;
pub use product::*;
