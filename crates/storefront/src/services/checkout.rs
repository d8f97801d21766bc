//! Checkout and order history.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use shopfront_core::OrderId;

use crate::error::{ValidationError, add_breadcrumb};
use crate::gateway::{Gateway, GatewayError};
use crate::models::Order;
use crate::services::auth::SessionState;
use crate::services::cart::{CartEngine, CartError};
use crate::store::StoreError;

/// Errors that can occur during checkout and order lookups.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Checkout needs a signed-in user.
    #[error("not authenticated")]
    Unauthenticated,

    /// Bringing the cart up to date with the session failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The order was placed but the local cart copy could not be cleared.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Places orders from the account cart and reads order history.
#[derive(Clone)]
pub struct Checkout {
    gateway: Arc<dyn Gateway>,
}

impl Checkout {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Turn the account cart into an order.
    ///
    /// The cart first catches up with the session, so a guest cart merged
    /// at login counts. An empty cart is rejected before anything is sent.
    /// On success the local cart is emptied; the gateway empties the account
    /// cart itself.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for an empty cart,
    /// `CheckoutError::Unauthenticated` without a session,
    /// `CheckoutError::Cart` if the cart cannot be synced, and
    /// `CheckoutError::Gateway` if the gateway refuses the order.
    #[instrument(skip_all)]
    pub async fn checkout(
        &self,
        session: &SessionState,
        cart: &mut CartEngine,
    ) -> Result<Order, CheckoutError> {
        cart.follow_session().await?;
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        if !session.is_authenticated() {
            return Err(CheckoutError::Unauthenticated);
        }

        let order = self.gateway.create_order().await?;
        info!(order_id = %order.id, total = %order.total_price, "Order placed");
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));

        cart.discard_local()?;
        Ok(order)
    }

    /// All orders of the signed-in user, as the gateway orders them.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Gateway` if the request fails.
    pub async fn list_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.gateway.list_orders().await?)
    }

    /// A single order of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Gateway` if the order does not exist or the
    /// request fails.
    pub async fn get_order(&self, id: &OrderId) -> Result<Order, CheckoutError> {
        Ok(self.gateway.get_order(id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use shopfront_core::{Price, ProductId, Quantity, Size};

    use super::*;
    use crate::gateway::fake::{self, Call, FakeGateway};
    use crate::models::Credentials;
    use crate::store::{MemoryStore, keys};

    struct Harness {
        checkout: Checkout,
        session: SessionState,
        cart: CartEngine,
        gateway: Arc<FakeGateway>,
        store: MemoryStore,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(FakeGateway::with_products([fake::product(
            "p1",
            1250,
            &["M"],
        )]));
        let store = MemoryStore::new();
        let session = SessionState::new(gateway.clone(), Arc::new(store.clone()));
        let cart = CartEngine::new(gateway.clone(), Arc::new(store.clone()), session.subscribe());
        Harness {
            checkout: Checkout::new(gateway.clone()),
            session,
            cart,
            gateway,
            store,
        }
    }

    async fn login(h: &mut Harness) {
        h.session
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: SecretString::from(fake::PASSWORD),
            })
            .await
            .unwrap();
        h.cart.sync_with_session().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_without_gateway_call() {
        let mut h = harness();
        login(&mut h).await;
        h.gateway.clear_calls();

        let err = h.checkout.checkout(&h.session, &mut h.cart).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::EmptyCart)
        ));
        assert!(h.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_guest_checkout_requires_login() {
        let mut h = harness();
        h.session.initialize().await.unwrap();
        h.cart
            .add_to_cart(&ProductId::new("p1"), Quantity::ONE, Size::parse("M").unwrap())
            .await
            .unwrap();

        let err = h.checkout.checkout(&h.session, &mut h.cart).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Unauthenticated));
        assert!(!h.gateway.calls().contains(&Call::CreateOrder));
        assert!(!h.cart.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_merges_guest_cart_after_login() {
        let mut h = harness();
        h.cart
            .add_to_cart(
                &ProductId::new("p1"),
                Quantity::new(2).unwrap(),
                Size::parse("M").unwrap(),
            )
            .await
            .unwrap();
        h.session
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: SecretString::from(fake::PASSWORD),
            })
            .await
            .unwrap();

        let order = h.checkout.checkout(&h.session, &mut h.cart).await.unwrap();

        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_price, Price::from_cents(2500).unwrap());
        assert!(h.cart.is_empty());
        assert!(!h.store.contains(keys::GUEST_CART));
    }

    #[tokio::test]
    async fn test_checkout_sees_account_cart_before_first_sync() {
        let mut h = harness();
        h.gateway.seed_remote_line("p1", "M", 1);
        h.session
            .login(&Credentials {
                email: "ada@example.com".to_string(),
                password: SecretString::from(fake::PASSWORD),
            })
            .await
            .unwrap();

        let order = h.checkout.checkout(&h.session, &mut h.cart).await.unwrap();

        assert_eq!(order.item_count(), 1);
        assert!(h.gateway.calls().contains(&Call::CreateOrder));
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_clears_cart() {
        let mut h = harness();
        login(&mut h).await;
        h.cart
            .add_to_cart(
                &ProductId::new("p1"),
                Quantity::new(2).unwrap(),
                Size::parse("M").unwrap(),
            )
            .await
            .unwrap();

        let order = h.checkout.checkout(&h.session, &mut h.cart).await.unwrap();

        assert_eq!(order.total_price, Price::from_cents(2500).unwrap());
        assert_eq!(order.item_count(), 2);
        assert!(h.cart.is_empty());
        assert!(!h.store.contains(keys::GUEST_CART));

        let orders = h.checkout.list_orders().await.unwrap();
        assert_eq!(orders, vec![order.clone()]);
        assert_eq!(h.checkout.get_order(&order.id).await.unwrap(), order);
    }
}
