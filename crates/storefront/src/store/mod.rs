//! Durable key-value storage for client state.
//!
//! Two entries are kept: the bearer token under [`keys::TOKEN`] and the guest
//! cart under [`keys::GUEST_CART`]. Values are opaque strings; typed access
//! goes through [`load_json`] and [`save_json`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known store keys.
pub mod keys {
    /// Bearer credential for the gateway.
    pub const TOKEN: &str = "token";
    /// JSON array of guest cart entries.
    pub const GUEST_CART: &str = "guestCart";
}

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("Store I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be (de)serialized.
    #[error("Store value for key {key} is malformed: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key contains characters that cannot name a storage entry.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// Synchronous, durable string storage keyed by name.
///
/// Writes are visible to subsequent reads from any handle sharing the same
/// backing storage. Removing an absent key is not an error.
pub trait LocalStore: Send + Sync {
    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and deserialize the JSON value under `key`.
///
/// # Errors
///
/// Returns an error if the store fails or the value is not valid JSON for `T`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// Serialize `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}
