//! Wire types for the gateway's JSON API.
//!
//! Request bodies borrow from the caller; response payloads are parsed into
//! these shapes first and then converted into validated [`crate::models`].

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shopfront_core::{ProductId, Quantity, Size, UserId};

use crate::models::User;

use super::GatewayError;

// =============================================================================
// Response Envelope
// =============================================================================

/// The single response envelope every gateway endpoint uses.
///
/// `data` is the payload; an envelope without it is a gateway error, never a
/// silently empty result.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Gateway's own success flag, when it sends one.
    #[serde(default)]
    pub success: Option<bool>,
    /// Human-readable status or error message.
    #[serde(default)]
    pub message: Option<String>,
    /// The payload.
    pub data: Option<T>,
    /// Paging metadata (listing endpoints only).
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    /// Take the payload, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::MissingData` naming `endpoint` if `data` was
    /// missing or null.
    pub fn into_data(self, endpoint: &str) -> Result<T, GatewayError> {
        self.data
            .ok_or_else(|| GatewayError::MissingData(endpoint.to_string()))
    }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best available message.
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

/// Paging metadata for listing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pages: Option<u32>,
}

// =============================================================================
// Auth
// =============================================================================

/// `POST /auth/register` body.
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for RegisterRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `POST /auth/login` body.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Auth response payload: the token alongside the user's fields.
#[derive(Deserialize)]
pub struct AuthData {
    pub token: String,
    #[serde(flatten)]
    pub user: User,
}

/// A bearer credential and the user it was issued to.
pub struct AuthGrant {
    pub token: SecretString,
    pub user: User,
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGrant")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// `POST /cart` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub size: Size,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// `PUT /cart/:itemId` body.
#[derive(Debug, Serialize)]
pub struct UpdateCartLineRequest {
    pub quantity: Quantity,
}

/// A cart line as the gateway returns it.
///
/// `product` is usually the populated product document but may be a bare id,
/// so it is kept as raw JSON until conversion.
#[derive(Debug, Deserialize)]
pub struct CartLineData {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub product: serde_json::Value,
    pub size: String,
    pub quantity: i64,
}
