//! Cart commands.

use shopfront_core::{ProductId, Quantity, Size};
use shopfront_storefront::Storefront;
use shopfront_storefront::StorefrontError;
use shopfront_storefront::models::{Cart, ProductRef};
use shopfront_storefront::services::CartMode;

use crate::CliError;

/// Print the current cart.
pub fn show(storefront: &Storefront) {
    let engine = storefront.cart();
    if matches!(engine.mode(), CartMode::Guest) && !engine.is_empty() {
        println!("(guest cart - log in to save it to your account)");
    }
    print_cart(engine.cart());
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the product cannot be found, the size is not offered,
/// or the gateway refuses the add.
pub async fn add(
    storefront: &mut Storefront,
    product_id: &ProductId,
    size: Size,
    quantity: Quantity,
) -> Result<(), CliError> {
    let cart = storefront
        .cart_mut()
        .add_to_cart(product_id, quantity, size)
        .await
        .map_err(StorefrontError::from)?;
    println!("Added to cart!");
    print_cart(cart);
    Ok(())
}

/// Change the quantity of a line.
///
/// # Errors
///
/// Returns an error if the cart cannot be updated.
pub async fn update(
    storefront: &mut Storefront,
    product_id: &ProductId,
    size: &Size,
    quantity: Quantity,
) -> Result<(), CliError> {
    let cart = storefront
        .cart_mut()
        .update_item_quantity(product_id, size, quantity)
        .await
        .map_err(StorefrontError::from)?;
    print_cart(cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the cart cannot be updated.
pub async fn remove(
    storefront: &mut Storefront,
    product_id: &ProductId,
    size: &Size,
) -> Result<(), CliError> {
    let cart = storefront
        .cart_mut()
        .remove_item(product_id, size)
        .await
        .map_err(StorefrontError::from)?;
    print_cart(cart);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the account cart cannot be cleared.
pub async fn clear(storefront: &mut Storefront) -> Result<(), CliError> {
    storefront
        .cart_mut()
        .clear_cart()
        .await
        .map_err(StorefrontError::from)?;
    println!("Cart cleared.");
    Ok(())
}

pub fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.lines() {
        let name = match &line.product {
            ProductRef::Snapshot(product) => product.name.clone(),
            ProductRef::Reference(id) => id.to_string(),
        };
        println!(
            "{:<32} {:<6} x{:<4} {:>10}",
            name,
            line.size.to_string(),
            line.quantity.get(),
            line.line_total().to_string()
        );
    }
    println!("\n{} items, total {}", cart.item_count(), cart.total());
}
