//! Domain models for the storefront.
//!
//! These are validated types: the gateway client converts wire payloads into
//! them at the boundary, so services never see a negative price, an empty
//! size, or a zero quantity.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartLine, GuestCartEntry, ProductRef};
pub use order::{Order, OrderItem};
pub use product::{Product, ProductPage, ProductQuery};
pub use user::{Credentials, Registration, User};
