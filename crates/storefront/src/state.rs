//! Composition root for the storefront services.

use std::sync::Arc;

use tracing::instrument;

use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::gateway::{Gateway, RestGateway};
use crate::models::{Credentials, Order, Registration, User};
use crate::services::{CartEngine, Catalog, Checkout, SessionState};
use crate::store::{FileStore, LocalStore};

/// The storefront: session, cart, catalog, and checkout wired together.
///
/// Services are built explicitly here and handed out by reference. The cart
/// engine follows the session through a `watch` channel; the methods on this
/// type that change the session also bring the cart along in the same call.
pub struct Storefront {
    session: SessionState,
    cart: CartEngine,
    catalog: Catalog,
    checkout: Checkout,
}

impl Storefront {
    /// Build a storefront talking to the configured gateway, persisting state
    /// under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::new(config.data_dir.clone()));
        let gateway = RestGateway::new(&config.gateway, &config.product_cache, store.clone())?;
        Ok(Self::new(Arc::new(gateway), store))
    }

    /// Build a storefront from an explicit gateway and store.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, store: Arc<dyn LocalStore>) -> Self {
        let session = SessionState::new(gateway.clone(), store.clone());
        let cart = CartEngine::new(gateway.clone(), store, session.subscribe());
        Self {
            session,
            cart,
            catalog: Catalog::new(gateway.clone()),
            checkout: Checkout::new(gateway),
        }
    }

    /// Resolve any persisted credential and load the matching cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the cart cannot be loaded or
    /// merged. The session is settled either way.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<Option<User>> {
        let user = self.session.initialize().await?;
        self.cart.sync_with_session().await?;
        Ok(user)
    }

    /// Sign in and merge the guest cart into the account cart.
    ///
    /// # Errors
    ///
    /// Returns an auth error if sign-in fails. A cart error means sign-in
    /// succeeded but the merge did not complete.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<User> {
        let user = self.session.login(credentials).await?;
        self.cart.sync_with_session().await?;
        Ok(user)
    }

    /// Register, sign in, and merge the guest cart.
    ///
    /// # Errors
    ///
    /// Same as [`Storefront::login`].
    pub async fn register(&mut self, registration: &Registration) -> Result<User> {
        let user = self.session.register(registration).await?;
        self.cart.sync_with_session().await?;
        Ok(user)
    }

    /// Sign out and switch the cart back to the guest cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be updated.
    pub async fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        self.cart.sync_with_session().await?;
        Ok(())
    }

    /// Place an order from the current cart.
    ///
    /// # Errors
    ///
    /// See [`Checkout::checkout`].
    pub async fn checkout(&mut self) -> Result<Order> {
        Ok(self.checkout.checkout(&self.session, &mut self.cart).await?)
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub const fn cart(&self) -> &CartEngine {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartEngine {
        &mut self.cart
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn orders(&self) -> &Checkout {
        &self.checkout
    }
}
