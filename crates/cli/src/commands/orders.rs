//! Checkout and order history commands.

use shopfront_core::OrderId;
use shopfront_storefront::Storefront;
use shopfront_storefront::StorefrontError;
use shopfront_storefront::models::Order;

use crate::CliError;

/// Place an order from the cart.
///
/// # Errors
///
/// Returns an error if the cart is empty, no one is logged in, or the
/// gateway refuses the order.
pub async fn checkout(storefront: &mut Storefront) -> Result<(), CliError> {
    let order = storefront.checkout().await?;
    println!("Order placed successfully!");
    print_order(&order);
    Ok(())
}

/// List all orders.
///
/// # Errors
///
/// Returns an error if the gateway request fails.
pub async fn list(storefront: &Storefront) -> Result<(), CliError> {
    let orders = storefront
        .orders()
        .list_orders()
        .await
        .map_err(StorefrontError::from)?;

    if orders.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }

    for order in &orders {
        println!(
            "{:<26} {}  {:<10} {:>3} items {:>10}",
            order.id,
            order.order_date.format("%Y-%m-%d"),
            order.status.to_string(),
            order.item_count(),
            order.total_price.to_string()
        );
    }
    Ok(())
}

/// Show one order.
///
/// # Errors
///
/// Returns an error if the order does not exist or the request fails.
pub async fn show(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    let order = storefront
        .orders()
        .get_order(id)
        .await
        .map_err(StorefrontError::from)?;
    print_order(&order);
    Ok(())
}

fn print_order(order: &Order) {
    println!("Order {} ({})", order.id, order.status);
    println!("  Placed: {}", order.order_date.format("%Y-%m-%d %H:%M UTC"));
    for item in &order.items {
        println!(
            "  {:<32} {:<6} x{:<4} {:>10}",
            item.name,
            item.size.to_string(),
            item.quantity.get(),
            item.price.to_string()
        );
    }
    println!("  Total: {}", order.total_price);
}
