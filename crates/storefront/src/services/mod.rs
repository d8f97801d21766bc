//! Storefront services.
//!
//! # Services
//!
//! - `auth` - Session state: login, registration, persisted credential
//! - `cart` - Cart reconciliation engine (guest and account carts)
//! - `catalog` - Product listing and detail
//! - `checkout` - Order placement and history

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, SessionState, SessionStatus};
pub use cart::{CartEngine, CartError, CartMode, ReconciliationError};
pub use catalog::{Catalog, CatalogError};
pub use checkout::{Checkout, CheckoutError};
