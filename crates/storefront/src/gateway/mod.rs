//! Remote catalog/order gateway.
//!
//! # Architecture
//!
//! - [`Gateway`] is the seam every service talks through; [`RestGateway`] is
//!   the production implementation over `reqwest`
//! - The gateway is the source of truth for products, authenticated carts,
//!   and orders - there is no local sync
//! - Every response is a single typed [`Envelope`] whose `data` payload is
//!   required; shape problems surface as [`GatewayError`] at this boundary
//! - Products are cached in memory via `moka` (5 minute TTL by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::gateway::{Gateway, RestGateway};
//!
//! let gateway = RestGateway::new(&config.gateway, &config.product_cache, store)?;
//! let product = gateway.get_product(&ProductId::new("p1")).await?;
//! ```

mod cache;
mod client;
mod conversions;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::RestGateway;
pub use types::{AddToCartRequest, AuthGrant, Envelope, LoginRequest, Pagination, RegisterRequest};

use async_trait::async_trait;
use thiserror::Error;

use shopfront_core::{CartLineId, OrderId, ProductId, Quantity};

use crate::models::{Cart, Order, Product, ProductPage, ProductQuery, User};

/// Errors that can occur when talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection refused, DNS, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request was rejected because the bearer credential is missing or invalid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Gateway refused the request (4xx other than 401/404/429).
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the response envelope.
        message: String,
    },

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Gateway failed (5xx or an unexpected status).
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the response envelope, or a body excerpt.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response envelope had no `data` payload.
    #[error("Response from {0} has no data")]
    MissingData(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GatewayError {
    /// Whether the gateway rejected the caller's input or credentials, as
    /// opposed to failing on its own.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::NotFound(_) | Self::Rejected { .. }
        )
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg) | Self::NotFound(msg) | Self::Rejected { message: msg, .. }
                if !msg.is_empty() =>
            {
                msg.clone()
            }
            Self::RateLimited(secs) => format!("Too many requests, try again in {secs}s"),
            _ => "The store is unavailable right now, please try again".to_string(),
        }
    }
}

/// Operations the storefront needs from the remote gateway.
///
/// Authenticated endpoints rely on the implementation attaching the current
/// bearer credential; callers never pass tokens explicitly.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /auth/register`
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthGrant, GatewayError>;

    /// `POST /auth/login`
    async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthGrant, GatewayError>;

    /// `GET /auth/me`
    async fn current_user(&self) -> Result<User, GatewayError>;

    /// `GET /products`
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, GatewayError>;

    /// `GET /products/:id`
    async fn get_product(&self, id: &ProductId) -> Result<Product, GatewayError>;

    /// `POST /products/seed`
    async fn seed_products(&self) -> Result<(), GatewayError>;

    /// `GET /cart`
    async fn get_cart(&self) -> Result<Cart, GatewayError>;

    /// `POST /cart`
    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Cart, GatewayError>;

    /// `PUT /cart/:itemId`
    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<Cart, GatewayError>;

    /// `DELETE /cart/:itemId`
    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<Cart, GatewayError>;

    /// `DELETE /cart`
    async fn clear_cart(&self) -> Result<(), GatewayError>;

    /// `POST /orders`
    async fn create_order(&self) -> Result<Order, GatewayError>;

    /// `GET /orders`
    async fn list_orders(&self) -> Result<Vec<Order>, GatewayError>;

    /// `GET /orders/:id`
    async fn get_order(&self, id: &OrderId) -> Result<Order, GatewayError>;
}
