//! Shopfront storefront client library.
//!
//! Catalog browsing, a guest/account shopping cart, checkout, and order
//! history against a remote REST gateway. The core is the cart engine in
//! [`services::cart`], which merges the persisted guest cart into the account
//! cart on login and keeps local and remote state consistent afterwards.
//!
//! [`Storefront`] wires everything together:
//!
//! ```rust,ignore
//! use shopfront_storefront::{Storefront, StorefrontConfig};
//!
//! let config = StorefrontConfig::from_env()?;
//! let mut storefront = Storefront::from_config(&config)?;
//! storefront.initialize().await?;
//! storefront.cart_mut().add_to_cart(&product_id, quantity, size).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use config::StorefrontConfig;
pub use error::{StorefrontError, ValidationError};
pub use state::Storefront;
