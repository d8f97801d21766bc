//! User and credential types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId};

/// The signed-in shopper as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "userId", alias = "id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// Login form input.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Registration form input.
///
/// `confirm_password` mirrors the second password box on the form; when it
/// is `Some`, it must match `password` before anything is sent.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: Option<SecretString>,
}
