//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error enum; [`StorefrontError`] unifies them for
//! callers that drive the whole storefront. Gateway and store failures are
//! captured to Sentry before being reported, and [`StorefrontError::user_message`]
//! never exposes internal detail.

use thiserror::Error;

use shopfront_core::{EmailError, Price, ProductId, QuantityError, Size, SizeError};

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::store::StoreError;

/// Client-side validation failures. Nothing was sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("password is required")]
    MissingPassword,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("{0}")]
    Size(#[from] SizeError),

    #[error("size {size} is not available for product {product_id}")]
    SizeNotOffered { product_id: ProductId, size: Size },

    #[error("{0}")]
    Quantity(#[from] QuantityError),

    #[error("cart is empty")]
    EmptyCart,

    #[error("minimum price {min} is greater than maximum price {max}")]
    PriceRange { min: Price, max: Price },

    #[error("page and limit must be at least 1")]
    Paging,
}

/// Top-level error for storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Session operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkout or order lookup failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Gateway operation failed outside a service.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Local store failed outside a service.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl StorefrontError {
    /// The gateway failure at the root of this error, if any.
    #[must_use]
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Auth(AuthError::Gateway(e))
            | Self::Catalog(CatalogError::Gateway(e))
            | Self::Checkout(CheckoutError::Gateway(e))
            | Self::Gateway(e) => Some(e),
            Self::Cart(e) | Self::Checkout(CheckoutError::Cart(e)) => e.gateway_error(),
            _ => None,
        }
    }

    /// Whether this is an internal failure worth reporting, as opposed to
    /// something the shopper can fix.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Store(_)
            | Self::Auth(AuthError::Store(_))
            | Self::Cart(CartError::Store(_))
            | Self::Checkout(CheckoutError::Store(_) | CheckoutError::Cart(CartError::Store(_))) => {
                true
            }
            _ => self.gateway_error().is_some_and(|e| !e.is_client_error()),
        }
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(AuthError::Validation(e))
            | Self::Cart(CartError::Validation(e))
            | Self::Catalog(CatalogError::Validation(e))
            | Self::Checkout(CheckoutError::Validation(e)) => capitalize(&e.to_string()),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_string(),
            Self::Checkout(CheckoutError::Unauthenticated) => "Please log in to continue".to_string(),
            Self::Cart(CartError::ProductLookup { .. }) => {
                "Failed to fetch product details".to_string()
            }
            Self::Cart(CartError::Reconciliation(e))
            | Self::Checkout(CheckoutError::Cart(CartError::Reconciliation(e))) => format!(
                "Only {} of {} saved cart items could be added to your account; the rest are kept for later",
                e.merged, e.total
            ),
            _ if self.is_internal() && self.gateway_error().is_none() => {
                "Something went wrong on this device, please try again".to_string()
            }
            _ => self
                .gateway_error()
                .map_or_else(|| "Something went wrong, please try again".to_string(), GatewayError::public_message),
        }
    }

    /// Capture internal failures to Sentry and log them. Returns the error
    /// unchanged so it can be used inline.
    #[must_use]
    pub fn capture(self) -> Self {
        if self.is_internal() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
        self
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cart::ReconciliationError;

    #[test]
    fn test_validation_message_is_shown() {
        let err = StorefrontError::from(CheckoutError::Validation(ValidationError::EmptyCart));
        assert_eq!(err.user_message(), "Cart is empty");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_server_detail_is_hidden() {
        let err = StorefrontError::from(CatalogError::Gateway(GatewayError::Server {
            status: 500,
            message: "stack trace".to_string(),
        }));
        assert!(err.is_internal());
        assert!(!err.user_message().contains("stack trace"));
    }

    #[test]
    fn test_reconciliation_message_reports_progress() {
        let err = StorefrontError::from(CartError::Reconciliation(ReconciliationError {
            merged: 1,
            total: 3,
            source: GatewayError::Rejected {
                status: 400,
                message: "Insufficient stock".to_string(),
            },
        }));
        assert!(err.user_message().starts_with("Only 1 of 3"));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_login_prompt_comes_from_checkout() {
        let err = StorefrontError::from(CheckoutError::Unauthenticated);
        assert_eq!(err.user_message(), "Please log in to continue");

        let err = StorefrontError::from(AuthError::InvalidCredentials);
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_checkout_cart_sync_failure_maps_like_cart_error() {
        let err = StorefrontError::from(CheckoutError::Cart(CartError::Reconciliation(
            ReconciliationError {
                merged: 0,
                total: 2,
                source: GatewayError::Server {
                    status: 503,
                    message: "down".to_string(),
                },
            },
        )));
        assert!(err.user_message().starts_with("Only 0 of 2"));
        assert!(err.gateway_error().is_some());
        assert!(err.is_internal());

        let err = StorefrontError::from(CheckoutError::Cart(CartError::Store(
            StoreError::InvalidKey("guest_cart".to_string()),
        )));
        assert!(err.is_internal());
        assert!(err.gateway_error().is_none());
    }
}
