//! Cart reconciliation engine.
//!
//! The engine owns the shopper's cart and picks a storage strategy from the
//! session it observes:
//!
//! - **Guest**: the in-memory cart is the source of truth and is written
//!   through to the local store after every mutation.
//! - **Authenticated**: the gateway is the source of truth; every mutation
//!   response replaces the in-memory cart.
//!
//! On `Guest -> Authenticated` the persisted guest cart is merged into the
//! account cart one line at a time. On logout the account cart is dropped and
//! the guest cart reloaded.

mod error;

pub use error::{CartError, ReconciliationError};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use shopfront_core::{Price, ProductId, Quantity, Size, UserId};

use crate::error::{ValidationError, add_breadcrumb};
use crate::gateway::{AddToCartRequest, Gateway};
use crate::models::{Cart, CartLine, GuestCartEntry};
use crate::services::auth::SessionStatus;
use crate::store::{LocalStore, StoreError, keys, load_json, save_json};

/// Storage strategy currently in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMode {
    Guest,
    Authenticated(UserId),
}

/// Owns the cart and keeps local and remote state consistent.
pub struct CartEngine {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn LocalStore>,
    session: watch::Receiver<SessionStatus>,
    mode: CartMode,
    cart: Cart,
    synced: bool,
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("mode", &self.mode)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Create an engine following `session`. Nothing is loaded until the
    /// first sync, which every mutation performs on demand.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn LocalStore>,
        session: watch::Receiver<SessionStatus>,
    ) -> Self {
        Self {
            gateway,
            store,
            session,
            mode: CartMode::Guest,
            cart: Cart::empty(),
            synced: false,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> &CartMode {
        &self.mode
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Sum of `quantity * price` over all lines.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        self.cart.total()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.cart.item_count()
    }

    // =========================================================================
    // Session Transitions
    // =========================================================================

    /// Bring the storage mode in line with the observed session.
    ///
    /// Entering authenticated mode reconciles the guest cart; leaving it
    /// discards the account cart and reloads the guest cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Reconciliation` if the merge stopped partway, or a
    /// gateway/store error if the cart could not be loaded.
    #[instrument(skip(self))]
    pub async fn sync_with_session(&mut self) -> Result<(), CartError> {
        let status = self.session.borrow_and_update().clone();
        self.synced = true;

        match status {
            SessionStatus::Loading if matches!(self.mode, CartMode::Authenticated(_)) => {
                debug!("Session reloading, keeping account cart");
                Ok(())
            }
            SessionStatus::Loading | SessionStatus::Anonymous => {
                if matches!(self.mode, CartMode::Authenticated(_)) {
                    info!("Session ended, discarding account cart");
                }
                self.mode = CartMode::Guest;
                self.cart = self.load_guest_cart()?;
                Ok(())
            }
            SessionStatus::Authenticated(user) => {
                if matches!(&self.mode, CartMode::Authenticated(id) if *id == user.id) {
                    return Ok(());
                }
                self.mode = CartMode::Authenticated(user.id.clone());
                self.cart = Cart::empty();
                self.reconcile(&user.id).await
            }
        }
    }

    /// Re-run the guest cart merge after a partial failure.
    ///
    /// Lines merged by the failed attempt are added again. Does nothing in
    /// guest mode.
    ///
    /// # Errors
    ///
    /// Same as [`CartEngine::sync_with_session`].
    pub async fn retry_reconciliation(&mut self) -> Result<(), CartError> {
        match self.mode.clone() {
            CartMode::Authenticated(user_id) => self.reconcile(&user_id).await,
            CartMode::Guest => Ok(()),
        }
    }

    /// Catch up with the session if it changed since the last sync.
    pub(crate) async fn follow_session(&mut self) -> Result<(), CartError> {
        if !self.synced || self.session.has_changed().unwrap_or(false) {
            self.sync_with_session().await?;
        }
        Ok(())
    }

    /// Merge the persisted guest cart into the account cart.
    async fn reconcile(&mut self, user_id: &UserId) -> Result<(), CartError> {
        let entries = self.read_guest_entries()?;

        if entries.is_empty() {
            debug!("No guest cart to merge, adopting account cart");
            self.cart = self.gateway.get_cart().await?;
            return Ok(());
        }

        let total = entries.len();
        info!(lines = total, "Merging guest cart into account cart");

        // Strictly sequential: each add must finish before the next is sent.
        for (merged, entry) in entries.into_iter().enumerate() {
            let request = AddToCartRequest {
                product_id: entry.product.id,
                quantity: entry.quantity,
                size: entry.size,
                user_id: Some(user_id.clone()),
            };

            match self.gateway.add_to_cart(&request).await {
                Ok(cart) => self.cart = cart,
                Err(source) => {
                    warn!(
                        merged,
                        total,
                        product_id = %request.product_id,
                        error = %source,
                        "Guest cart merge aborted"
                    );
                    add_breadcrumb("cart", "Guest cart merge aborted", None);
                    self.adopt_remote_best_effort().await;
                    return Err(ReconciliationError {
                        merged,
                        total,
                        source,
                    }
                    .into());
                }
            }
        }

        self.store.remove(keys::GUEST_CART)?;
        self.cart = self.gateway.get_cart().await?;
        add_breadcrumb("cart", "Guest cart merged", None);
        Ok(())
    }

    async fn adopt_remote_best_effort(&mut self) {
        match self.gateway.get_cart().await {
            Ok(cart) => self.cart = cart,
            Err(e) => warn!(error = %e, "Failed to fetch account cart after merge failure"),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of `product_id` in `size`.
    ///
    /// # Errors
    ///
    /// In guest mode, returns `CartError::ProductLookup` if the product cannot
    /// be fetched, `CartError::Validation` if it is not offered in `size` and
    /// `CartError::Store` if the guest cart cannot be written; the cart is
    /// unchanged in all three cases. In authenticated mode, returns
    /// `CartError::Gateway` if the gateway refuses the add.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size, quantity = %quantity))]
    pub async fn add_to_cart(
        &mut self,
        product_id: &ProductId,
        quantity: Quantity,
        size: Size,
    ) -> Result<&Cart, CartError> {
        self.follow_session().await?;

        match &self.mode {
            CartMode::Authenticated(user_id) => {
                let request = AddToCartRequest {
                    product_id: product_id.clone(),
                    quantity,
                    size,
                    user_id: Some(user_id.clone()),
                };
                self.cart = self.gateway.add_to_cart(&request).await?;
            }
            CartMode::Guest => {
                let mut cart = self.cart.clone();
                if !cart.increment(product_id, &size, quantity) {
                    let product = self.gateway.get_product(product_id).await.map_err(|source| {
                        CartError::ProductLookup {
                            product_id: product_id.clone(),
                            source,
                        }
                    })?;
                    if !product.sizes.is_empty() && !product.offers_size(&size) {
                        return Err(ValidationError::SizeNotOffered {
                            product_id: product_id.clone(),
                            size,
                        }
                        .into());
                    }
                    cart.merge_line(CartLine::guest(product, size, quantity));
                }
                self.commit_guest(cart)?;
            }
        }

        add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
        Ok(&self.cart)
    }

    /// Set the quantity of the `(product_id, size)` line. Does nothing if the
    /// line is absent.
    ///
    /// # Errors
    ///
    /// Returns a gateway error in authenticated mode, a store error in guest
    /// mode.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size, quantity = %quantity))]
    pub async fn update_item_quantity(
        &mut self,
        product_id: &ProductId,
        size: &Size,
        quantity: Quantity,
    ) -> Result<&Cart, CartError> {
        self.follow_session().await?;

        match &self.mode {
            CartMode::Authenticated(_) => {
                let remote = self.gateway.get_cart().await?;
                match remote.find(product_id, size).and_then(|l| l.line_id.clone()) {
                    Some(line_id) => {
                        self.cart = self.gateway.update_cart_line(&line_id, quantity).await?;
                    }
                    None => {
                        debug!("No matching account cart line");
                        self.cart = remote;
                    }
                }
            }
            CartMode::Guest => {
                let mut cart = self.cart.clone();
                if cart.set_quantity(product_id, size, quantity) {
                    self.commit_guest(cart)?;
                }
            }
        }

        Ok(&self.cart)
    }

    /// Remove the `(product_id, size)` line. Does nothing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns a gateway error in authenticated mode, a store error in guest
    /// mode.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn remove_item(
        &mut self,
        product_id: &ProductId,
        size: &Size,
    ) -> Result<&Cart, CartError> {
        self.follow_session().await?;

        match &self.mode {
            CartMode::Authenticated(_) => {
                let remote = self.gateway.get_cart().await?;
                match remote.find(product_id, size).and_then(|l| l.line_id.clone()) {
                    Some(line_id) => {
                        self.cart = self.gateway.remove_cart_line(&line_id).await?;
                    }
                    None => {
                        debug!("No matching account cart line");
                        self.cart = remote;
                    }
                }
            }
            CartMode::Guest => {
                let mut cart = self.cart.clone();
                if cart.remove(product_id, size) {
                    self.commit_guest(cart)?;
                }
            }
        }

        add_breadcrumb("cart", "Removed item", Some(&[("product_id", product_id.as_str())]));
        Ok(&self.cart)
    }

    /// Empty the cart, including the account cart when signed in.
    ///
    /// # Errors
    ///
    /// Returns a gateway error if the account cart could not be cleared; the
    /// local cart is then left as it was.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        self.follow_session().await?;

        if matches!(self.mode, CartMode::Authenticated(_)) {
            self.gateway.clear_cart().await?;
        }
        self.discard_local()?;
        add_breadcrumb("cart", "Cleared cart", None);
        Ok(())
    }

    /// Reload the cart from its source of truth.
    ///
    /// # Errors
    ///
    /// Returns a gateway error in authenticated mode, a store error in guest
    /// mode.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<&Cart, CartError> {
        self.follow_session().await?;

        self.cart = match &self.mode {
            CartMode::Authenticated(_) => self.gateway.get_cart().await?,
            CartMode::Guest => self.load_guest_cart()?,
        };
        Ok(&self.cart)
    }

    /// Drop the in-memory cart and the persisted guest copy without touching
    /// the gateway. Used once the gateway has consumed the cart into an order.
    pub(crate) fn discard_local(&mut self) -> Result<(), StoreError> {
        self.cart.clear();
        self.store.remove(keys::GUEST_CART)
    }

    // =========================================================================
    // Guest Persistence
    // =========================================================================

    fn read_guest_entries(&self) -> Result<Vec<GuestCartEntry>, StoreError> {
        match load_json::<Vec<GuestCartEntry>>(self.store.as_ref(), keys::GUEST_CART) {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(StoreError::Serialization { source, .. }) => {
                warn!(error = %source, "Ignoring unreadable guest cart");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn load_guest_cart(&self) -> Result<Cart, StoreError> {
        Ok(Cart::from_lines(
            self.read_guest_entries()?.into_iter().map(CartLine::from),
        ))
    }

    /// Write `cart` through to the store, then make it the current cart. On a
    /// store failure the current cart is left as it was.
    fn commit_guest(&mut self, cart: Cart) -> Result<(), StoreError> {
        save_json(
            self.store.as_ref(),
            keys::GUEST_CART,
            &cart.to_guest_entries(),
        )?;
        self.cart = cart;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::gateway::GatewayError;
    use crate::gateway::fake::{self, Call, FakeGateway};
    use crate::store::MemoryStore;

    struct Harness {
        engine: CartEngine,
        gateway: Arc<FakeGateway>,
        store: MemoryStore,
        session: watch::Sender<SessionStatus>,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(FakeGateway::with_products([
            fake::product("p1", 1500, &["M", "L"]),
            fake::product("p2", 999, &["S", "M"]),
            fake::product("p3", 250, &["One"]),
        ]));
        harness_with(gateway, MemoryStore::new())
    }

    fn harness_with(gateway: Arc<FakeGateway>, store: MemoryStore) -> Harness {
        let (session, rx) = watch::channel(SessionStatus::Anonymous);
        let engine = CartEngine::new(gateway.clone(), Arc::new(store.clone()), rx);
        Harness {
            engine,
            gateway,
            store,
            session,
        }
    }

    fn id(s: &str) -> ProductId {
        ProductId::new(s)
    }

    fn size(s: &str) -> Size {
        Size::parse(s).unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn login(h: &Harness) {
        h.session
            .send_replace(SessionStatus::Authenticated(fake::shopper()));
    }

    fn persisted_guest_cart(store: &MemoryStore) -> Option<Vec<GuestCartEntry>> {
        load_json(store, keys::GUEST_CART).unwrap()
    }

    /// Memory-backed store whose writes can be made to fail.
    #[derive(Clone, Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl FailingStore {
        fn write_error(&self, key: &str) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    impl LocalStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.write_error(key)?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.write_error(key)?;
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn test_guest_same_key_sums_quantities() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(2), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p1"), qty(3), size("M")).await.unwrap();

        assert_eq!(h.engine.lines().len(), 1);
        assert_eq!(h.engine.cart_count(), 5);
        // The second add increments in place without a lookup
        assert_eq!(h.gateway.calls(), vec![Call::GetProduct(id("p1"))]);
    }

    #[tokio::test]
    async fn test_guest_sizes_are_separate_lines() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(2), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p1"), qty(1), size("L")).await.unwrap();

        assert_eq!(h.engine.lines().len(), 2);
        assert_eq!(h.engine.cart_count(), 3);
        assert_eq!(h.engine.cart_total(), Price::from_cents(4500).unwrap());
    }

    #[tokio::test]
    async fn test_guest_lookup_failure_leaves_cart_unchanged() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();

        let err = h
            .engine
            .add_to_cart(&id("missing"), qty(1), size("M"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::ProductLookup { source: GatewayError::NotFound(_), .. }
        ));
        assert_eq!(h.engine.lines().len(), 1);
        assert_eq!(persisted_guest_cart(&h.store).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guest_rejects_size_not_offered() {
        let mut h = harness();
        let err = h
            .engine
            .add_to_cart(&id("p3"), qty(1), size("XL"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::Validation(ValidationError::SizeNotOffered { .. })
        ));
        assert!(h.engine.is_empty());
    }

    #[tokio::test]
    async fn test_guest_cart_is_written_through_and_rehydrated() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(2), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p2"), qty(1), size("S")).await.unwrap();
        h.engine
            .update_item_quantity(&id("p1"), &size("M"), qty(4))
            .await
            .unwrap();
        h.engine.remove_item(&id("p2"), &size("S")).await.unwrap();

        let mut restarted = harness_with(h.gateway.clone(), h.store.clone());
        let cart = restarted.engine.refresh().await.unwrap();

        assert_eq!(cart, h.engine.cart());
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.total(), Price::from_cents(6000).unwrap());
    }

    #[tokio::test]
    async fn test_guest_store_failure_leaves_cart_unchanged() {
        let gateway = Arc::new(FakeGateway::with_products([fake::product(
            "p1",
            1500,
            &["M", "L"],
        )]));
        let store = FailingStore::default();
        let (_session, rx) = watch::channel(SessionStatus::Anonymous);
        let mut engine = CartEngine::new(gateway, Arc::new(store.clone()), rx);
        engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        let before = engine.cart().clone();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = engine.add_to_cart(&id("p1"), qty(2), size("M")).await.unwrap_err();
        assert!(matches!(err, CartError::Store(StoreError::Io { .. })));
        let err = engine.add_to_cart(&id("p1"), qty(1), size("L")).await.unwrap_err();
        assert!(matches!(err, CartError::Store(_)));
        assert!(engine
            .update_item_quantity(&id("p1"), &size("M"), qty(5))
            .await
            .is_err());
        assert!(engine.remove_item(&id("p1"), &size("M")).await.is_err());

        assert_eq!(engine.cart(), &before);
        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(engine.refresh().await.unwrap(), &before);
    }

    #[tokio::test]
    async fn test_guest_update_and_remove_absent_line_is_noop() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();

        h.engine
            .update_item_quantity(&id("p1"), &size("L"), qty(9))
            .await
            .unwrap();
        h.engine.remove_item(&id("p2"), &size("M")).await.unwrap();

        assert_eq!(h.engine.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_empty_guest_cart_fetches_once() {
        let mut h = harness();
        h.gateway.seed_remote_line("p2", "S", 2);
        h.engine.sync_with_session().await.unwrap();
        h.gateway.clear_calls();

        login(&h);
        h.engine.sync_with_session().await.unwrap();

        assert_eq!(h.gateway.calls(), vec![Call::GetCart]);
        assert_eq!(h.engine.cart(), &h.gateway.remote_cart());
        assert_eq!(h.engine.mode(), &CartMode::Authenticated(fake::shopper().id));
    }

    #[tokio::test]
    async fn test_reconcile_adds_each_line_in_order() {
        let mut h = harness();
        h.gateway.seed_remote_line("p3", "One", 1);
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p2"), qty(2), size("S")).await.unwrap();
        h.engine.add_to_cart(&id("p1"), qty(3), size("L")).await.unwrap();
        h.gateway.clear_calls();

        login(&h);
        h.engine.sync_with_session().await.unwrap();

        let adds = h.gateway.adds();
        let keys: Vec<_> = adds
            .iter()
            .map(|a| (a.product_id.as_str(), a.size.as_str(), a.quantity.get()))
            .collect();
        assert_eq!(keys, vec![("p1", "M", 1), ("p2", "S", 2), ("p1", "L", 3)]);
        assert!(adds.iter().all(|a| a.user_id == Some(fake::shopper().id)));
        assert_eq!(h.gateway.calls().last(), Some(&Call::GetCart));

        assert!(persisted_guest_cart(&h.store).is_none());
        assert_eq!(h.engine.cart(), &h.gateway.remote_cart());
        assert_eq!(h.engine.cart_count(), 7);
    }

    #[tokio::test]
    async fn test_partial_reconciliation_keeps_guest_cart() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p2"), qty(1), size("S")).await.unwrap();
        h.engine.add_to_cart(&id("p3"), qty(1), size("One")).await.unwrap();
        h.gateway.accept_adds(1);

        login(&h);
        let err = h.engine.sync_with_session().await.unwrap_err();

        let CartError::Reconciliation(err) = err else {
            panic!("expected reconciliation error, got {err:?}");
        };
        assert_eq!((err.merged, err.total), (1, 3));
        // The merge stops at the first failure
        assert_eq!(h.gateway.adds().len(), 2);
        assert_eq!(persisted_guest_cart(&h.store).unwrap().len(), 3);
        assert_eq!(h.engine.cart(), &h.gateway.remote_cart());
        assert_eq!(h.engine.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_logout_then_login_restores_account_cart() {
        let mut h = harness();
        login(&h);
        h.engine.add_to_cart(&id("p1"), qty(2), size("M")).await.unwrap();
        let account_cart = h.gateway.remote_cart();

        h.session.send_replace(SessionStatus::Anonymous);
        h.engine.sync_with_session().await.unwrap();
        assert!(h.engine.is_empty());
        assert_eq!(h.engine.mode(), &CartMode::Guest);

        login(&h);
        h.engine.sync_with_session().await.unwrap();
        assert_eq!(h.engine.cart(), &account_cart);
    }

    #[tokio::test]
    async fn test_mutations_follow_session_changes() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();

        login(&h);
        // No explicit sync: the add notices the login, merges, then adds
        h.engine.add_to_cart(&id("p2"), qty(1), size("S")).await.unwrap();

        assert_eq!(h.gateway.adds().len(), 2);
        assert_eq!(h.engine.cart_count(), 2);
        assert!(persisted_guest_cart(&h.store).is_none());
    }

    #[tokio::test]
    async fn test_authenticated_update_and_remove_match_by_key() {
        let mut h = harness();
        login(&h);
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.engine.add_to_cart(&id("p2"), qty(1), size("S")).await.unwrap();
        h.gateway.clear_calls();

        h.engine
            .update_item_quantity(&id("p1"), &size("M"), qty(5))
            .await
            .unwrap();
        let line_id = h.gateway.remote_cart().lines()[0].line_id.clone().unwrap();
        assert_eq!(
            h.gateway.calls(),
            vec![Call::GetCart, Call::UpdateCartLine(line_id, qty(5))]
        );
        assert_eq!(h.engine.cart_count(), 6);
        assert_eq!(
            h.engine.cart_total(),
            Price::from_cents(5 * 1500 + 999).unwrap()
        );

        h.gateway.clear_calls();
        h.engine.remove_item(&id("p2"), &size("M")).await.unwrap();
        assert_eq!(h.gateway.calls(), vec![Call::GetCart]);

        h.engine.remove_item(&id("p2"), &size("S")).await.unwrap();
        assert_eq!(h.engine.lines().len(), 1);
        assert_eq!(h.engine.cart(), &h.gateway.remote_cart());
    }

    #[tokio::test]
    async fn test_clear_cart_in_both_modes() {
        let mut h = harness();
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.engine.clear_cart().await.unwrap();
        assert!(h.engine.is_empty());
        assert!(persisted_guest_cart(&h.store).is_none());
        assert!(!h.gateway.calls().contains(&Call::ClearCart));

        login(&h);
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.engine.clear_cart().await.unwrap();
        assert!(h.engine.is_empty());
        assert!(h.gateway.remote_cart().is_empty());
        assert!(h.gateway.calls().contains(&Call::ClearCart));
    }

    #[tokio::test]
    async fn test_authenticated_add_failure_keeps_cart() {
        let mut h = harness();
        login(&h);
        h.engine.add_to_cart(&id("p1"), qty(1), size("M")).await.unwrap();
        h.gateway.set_unavailable(true);

        let err = h
            .engine
            .add_to_cart(&id("p2"), qty(1), size("S"))
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Gateway(GatewayError::Server { .. })));
        assert_eq!(h.engine.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_guest_cart_is_ignored() {
        let h = harness();
        h.store.set(keys::GUEST_CART, "not json").unwrap();
        let mut h = harness_with(h.gateway, h.store);

        assert!(h.engine.refresh().await.unwrap().is_empty());
    }
}
