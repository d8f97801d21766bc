//! Guest cart reconciliation against the fake gateway over HTTP.
//!
//! Each test spawns its own gateway and data directory, builds a cart as a
//! guest through the real REST client, signs in, and checks what the gateway
//! received.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;

use shopfront_core::{ProductId, Quantity, Size};
use shopfront_integration_tests::FakeGateway;
use shopfront_storefront::models::Credentials;
use shopfront_storefront::services::{CartError, CartMode};
use shopfront_storefront::store::{FileStore, LocalStore, keys};
use shopfront_storefront::{Storefront, StorefrontConfig, StorefrontError};

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "lovelace-1815";

async fn gateway() -> FakeGateway {
    let gateway = FakeGateway::spawn().await.unwrap();
    gateway.add_product("tee", "Classic Tee", 20.0, "Men", &["S", "M", "L"]);
    gateway.add_product("dress", "Summer Dress", 45.5, "Women", &["S", "M"]);
    gateway.add_product("cap", "Cap", 12.0, "Accessories", &[]);
    gateway
}

async fn storefront(gateway: &FakeGateway, dir: &TempDir) -> Storefront {
    let config = StorefrontConfig::for_gateway(&gateway.base_url(), dir.path()).unwrap();
    let mut storefront = Storefront::from_config(&config).unwrap();
    storefront.initialize().await.unwrap();
    storefront
}

fn credentials() -> Credentials {
    Credentials {
        email: EMAIL.to_string(),
        password: SecretString::from(PASSWORD),
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

async fn add_guest_lines(storefront: &mut Storefront) {
    let cart = storefront.cart_mut();
    cart.add_to_cart(&id("tee"), qty(2), size("M")).await.unwrap();
    cart.add_to_cart(&id("dress"), qty(1), size("S")).await.unwrap();
    cart.add_to_cart(&id("cap"), qty(3), size("One Size")).await.unwrap();
}

// ============================================================================
// Full Merge
// ============================================================================

#[tokio::test]
async fn test_guest_lines_are_sent_in_order_then_cleared() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    add_guest_lines(&mut storefront).await;
    assert!(gateway.recorded_adds().is_empty());

    storefront.login(&credentials()).await.unwrap();

    let adds = gateway.recorded_adds();
    assert_eq!(adds.len(), 3);
    assert_eq!(
        adds[0],
        json!({ "productId": "tee", "quantity": 2, "size": "M", "userId": user_id })
    );
    assert_eq!(adds[1]["productId"], "dress");
    assert_eq!(adds[2]["productId"], "cap");
    assert_eq!(adds[2]["size"], "One Size");

    assert_eq!(storefront.cart().mode(), &CartMode::Authenticated(user_id.as_str().into()));
    assert_eq!(storefront.cart().cart_count(), 6);
    assert_eq!(storefront.cart().cart_total().to_string(), "$121.50");

    let store = FileStore::new(dir.path());
    assert_eq!(store.get(keys::GUEST_CART).unwrap(), None);
}

#[tokio::test]
async fn test_merge_adds_to_existing_account_lines() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    gateway.put_cart_line(&user_id, "tee", "M", 1);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    storefront
        .cart_mut()
        .add_to_cart(&id("tee"), qty(2), size("M"))
        .await
        .unwrap();
    storefront.login(&credentials()).await.unwrap();

    assert_eq!(gateway.cart_of(&user_id), vec![("tee".to_string(), "M".to_string(), 3)]);
    assert_eq!(storefront.cart().lines().len(), 1);
    assert_eq!(storefront.cart().cart_count(), 3);
}

#[tokio::test]
async fn test_empty_guest_cart_adopts_account_cart() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    gateway.put_cart_line(&user_id, "dress", "M", 2);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    storefront.login(&credentials()).await.unwrap();

    assert!(gateway.recorded_adds().is_empty());
    assert_eq!(storefront.cart().cart_count(), 2);
    let line = &storefront.cart().lines()[0];
    assert_eq!(line.product.snapshot().unwrap().name, "Summer Dress");
    assert_eq!(line.line_id.as_ref().unwrap().as_str(), "line-2");
}

// ============================================================================
// Partial Failure
// ============================================================================

#[tokio::test]
async fn test_failed_add_stops_merge_and_keeps_guest_cart() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    add_guest_lines(&mut storefront).await;
    gateway.accept_adds(1);

    let err = storefront.login(&credentials()).await.unwrap_err();
    let StorefrontError::Cart(CartError::Reconciliation(failure)) = &err else {
        panic!("expected reconciliation failure, got {err:?}");
    };
    assert_eq!((failure.merged, failure.total), (1, 3));
    assert!(err.user_message().starts_with("Only 1 of 3"));

    // No add after the failing one was attempted
    assert_eq!(gateway.recorded_adds().len(), 2);
    assert_eq!(gateway.cart_of(&user_id).len(), 1);

    // Signed in, showing what did merge
    assert!(storefront.session().is_authenticated());
    assert_eq!(storefront.cart().cart_count(), 2);

    // Guest cart kept for a retry
    let store = FileStore::new(dir.path());
    assert!(store.get(keys::GUEST_CART).unwrap().is_some());
}

#[tokio::test]
async fn test_retry_resends_every_guest_line() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    add_guest_lines(&mut storefront).await;
    gateway.accept_adds(1);
    assert!(storefront.login(&credentials()).await.is_err());

    gateway.accept_all_adds();
    storefront.cart_mut().retry_reconciliation().await.unwrap();

    // 2 from the first attempt, 3 from the retry
    assert_eq!(gateway.recorded_adds().len(), 5);
    let cart = gateway.cart_of(&user_id);
    assert_eq!(cart.len(), 3);
    assert_eq!(cart[0], ("tee".to_string(), "M".to_string(), 4));
    assert_eq!(storefront.cart().cart_count(), 8);

    let store = FileStore::new(dir.path());
    assert_eq!(store.get(keys::GUEST_CART).unwrap(), None);
}

#[tokio::test]
async fn test_stock_rejection_on_first_line_merges_nothing() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    gateway.set_stock("tee", 1);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    add_guest_lines(&mut storefront).await;
    let err = storefront.login(&credentials()).await.unwrap_err();

    let StorefrontError::Cart(CartError::Reconciliation(failure)) = &err else {
        panic!("expected reconciliation failure, got {err:?}");
    };
    assert_eq!(failure.merged, 0);
    assert_eq!(gateway.recorded_adds().len(), 1);
    assert!(gateway.cart_of(&user_id).is_empty());
    assert!(storefront.cart().is_empty());
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_returns_to_empty_guest_cart() {
    let gateway = gateway().await;
    let user_id = gateway.add_user("Ada", EMAIL, PASSWORD);
    let dir = TempDir::new().unwrap();
    let mut storefront = storefront(&gateway, &dir).await;

    add_guest_lines(&mut storefront).await;
    storefront.login(&credentials()).await.unwrap();
    storefront.logout().await.unwrap();

    assert_eq!(storefront.cart().mode(), &CartMode::Guest);
    assert!(storefront.cart().is_empty());
    // The account cart itself is untouched
    assert_eq!(gateway.cart_of(&user_id).len(), 3);
}
