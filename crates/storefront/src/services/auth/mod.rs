//! Session state.
//!
//! Owns the signed-in user and bearer credential. The credential is persisted
//! in the local store under [`keys::TOKEN`], where the gateway client picks it
//! up for every request. Status changes are broadcast over a `watch` channel
//! so the cart engine can follow logins and logouts without owning the
//! session.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use shopfront_core::Email;

use crate::error::{ValidationError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::gateway::{AuthGrant, Gateway, GatewayError, LoginRequest, RegisterRequest};
use crate::models::{Credentials, Registration, User};
use crate::store::{LocalStore, keys};

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// A persisted credential is being resolved.
    Loading,
    /// No one is signed in.
    Anonymous,
    /// Signed in as this user.
    Authenticated(User),
}

impl SessionStatus {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Loading | Self::Anonymous => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Session state service.
///
/// Starts in [`SessionStatus::Loading`]; call [`SessionState::initialize`]
/// once at start-up to resolve any persisted credential.
pub struct SessionState {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn LocalStore>,
    status: watch::Sender<SessionStatus>,
    token: Option<SecretString>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("status", &*self.status.borrow())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl SessionState {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, store: Arc<dyn LocalStore>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Loading);
        Self {
            gateway,
            store,
            status,
            token: None,
        }
    }

    /// Observe session status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.status.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(*self.status.borrow(), SessionStatus::Loading)
    }

    /// Bearer credential of the signed-in user.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Resolve a persisted credential into a session.
    ///
    /// Without a stored token the session becomes anonymous. If the gateway
    /// rejects the token (or cannot be reached) the session is logged out,
    /// which also removes the stored token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the store cannot be read or cleared.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<Option<User>, AuthError> {
        self.status.send_replace(SessionStatus::Loading);

        let Some(token) = self.store.get(keys::TOKEN)?.filter(|t| !t.is_empty()) else {
            debug!("No persisted credential");
            self.status.send_replace(SessionStatus::Anonymous);
            return Ok(None);
        };

        match self.gateway.current_user().await {
            Ok(user) => {
                debug!(user_id = %user.id, "Resolved persisted credential");
                self.establish(SecretString::from(token), user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve persisted credential, logging out");
                self.logout()?;
                Ok(None)
            }
        }
    }

    /// Register a new account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank name, malformed email,
    /// blank password, or mismatched confirmation, without contacting the
    /// gateway. Returns `AuthError::Gateway` if registration is refused.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&mut self, registration: &Registration) -> Result<User, AuthError> {
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }
        let email = Email::parse(&registration.email).map_err(ValidationError::from)?;
        let password = registration.password.expose_secret();
        if password.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }
        if let Some(confirm) = &registration.confirm_password
            && confirm.expose_secret() != password
        {
            return Err(ValidationError::PasswordMismatch.into());
        }

        let grant = self
            .gateway
            .register(&RegisterRequest {
                name,
                email: email.as_str(),
                password,
            })
            .await?;

        info!(user_id = %grant.user.id, "Registered");
        self.sign_in(grant)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the gateway rejects the
    /// credentials, `AuthError::Validation` if they are malformed.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&mut self, credentials: &Credentials) -> Result<User, AuthError> {
        let email = Email::parse(&credentials.email).map_err(ValidationError::from)?;
        let password = credentials.password.expose_secret();
        if password.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }

        let grant = self
            .gateway
            .login(&LoginRequest {
                email: email.as_str(),
                password,
            })
            .await
            .map_err(|e| match e {
                GatewayError::Unauthorized(_) | GatewayError::Rejected { status: 400, .. } => {
                    AuthError::InvalidCredentials
                }
                other => AuthError::Gateway(other),
            })?;

        info!(user_id = %grant.user.id, "Logged in");
        self.sign_in(grant)
    }

    /// Sign out. The in-memory session is always cleared; only the store
    /// removal can fail.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the persisted token could not be removed.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        let was_authenticated = self.is_authenticated();
        self.token = None;
        self.status.send_replace(SessionStatus::Anonymous);
        clear_sentry_user();
        if was_authenticated {
            add_breadcrumb("auth", "Logged out", None);
            info!("Logged out");
        }
        self.store.remove(keys::TOKEN)?;
        Ok(())
    }

    fn sign_in(&mut self, grant: AuthGrant) -> Result<User, AuthError> {
        self.store.set(keys::TOKEN, grant.token.expose_secret())?;
        let user = grant.user;
        self.establish(grant.token, user.clone());
        Ok(user)
    }

    fn establish(&mut self, token: SecretString, user: User) {
        set_sentry_user(&user.id, Some(user.email.as_str()));
        add_breadcrumb("auth", "Signed in", Some(&[("user_id", user.id.as_str())]));
        self.token = Some(token);
        self.status.send_replace(SessionStatus::Authenticated(user));
    }
}
