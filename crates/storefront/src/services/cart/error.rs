//! Cart error types.

use thiserror::Error;

use shopfront_core::ProductId;

use crate::error::ValidationError;
use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Input failed client-side validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Guest add could not resolve the product; the cart is unchanged.
    #[error("failed to fetch product {product_id}: {source}")]
    ProductLookup {
        product_id: ProductId,
        source: GatewayError,
    },

    /// Guest cart was only partly merged into the account cart.
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    /// Gateway request failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Guest cart could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CartError {
    /// The gateway failure behind this error, if any.
    #[must_use]
    pub const fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(e) | Self::ProductLookup { source: e, .. } => Some(e),
            Self::Reconciliation(e) => Some(&e.source),
            Self::Validation(_) | Self::Store(_) => None,
        }
    }
}

/// A guest-to-account merge stopped at the first failed add.
///
/// Lines before the failure stay in the account cart; the persisted guest
/// cart is left untouched so the merge can be retried.
#[derive(Debug, Error)]
#[error("merged {merged} of {total} guest cart lines: {source}")]
pub struct ReconciliationError {
    /// Lines added before the failure.
    pub merged: usize,
    /// Lines in the guest cart.
    pub total: usize,
    pub source: GatewayError,
}
