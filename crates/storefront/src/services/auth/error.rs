//! Session error types.

use thiserror::Error;

use crate::error::ValidationError;
use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Input failed client-side validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Gateway request failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Persisting or clearing the credential failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
