//! Catalog commands.

use shopfront_core::ProductId;
use shopfront_storefront::Storefront;
use shopfront_storefront::models::{Product, ProductQuery};

use crate::CliError;

/// Print one page of products.
///
/// # Errors
///
/// Returns an error if the query is invalid or the gateway request fails.
pub async fn list(storefront: &Storefront, query: &ProductQuery) -> Result<(), CliError> {
    let page = storefront
        .catalog()
        .list_products(query)
        .await
        .map_err(shopfront_storefront::StorefrontError::from)?;

    if page.items.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    for product in &page.items {
        println!(
            "{:<26} {:<32} {:>10}  {}",
            product.id,
            product.name,
            product.price.to_string(),
            sizes(product)
        );
    }
    println!(
        "\nPage {} of {} ({} products)",
        page.page, page.pages, page.total
    );
    Ok(())
}

/// Print one product in detail.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
pub async fn show(storefront: &Storefront, id: &ProductId) -> Result<(), CliError> {
    let product = storefront
        .catalog()
        .get_product(id)
        .await
        .map_err(shopfront_storefront::StorefrontError::from)?;

    println!("{}", product.name);
    println!("  ID:       {}", product.id);
    println!("  Price:    {}", product.price);
    if !product.category.is_empty() {
        println!("  Category: {}", product.category);
    }
    println!("  Sizes:    {}", sizes(&product));
    if product.in_stock() {
        println!("  Stock:    {}", product.stock);
    } else {
        println!("  Stock:    out of stock");
    }
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }
    Ok(())
}

/// Load the sample catalog.
///
/// # Errors
///
/// Returns an error if the gateway request fails.
pub async fn seed(storefront: &Storefront) -> Result<(), CliError> {
    storefront
        .catalog()
        .seed_products()
        .await
        .map_err(shopfront_storefront::StorefrontError::from)?;
    println!("Sample products loaded.");
    Ok(())
}

fn sizes(product: &Product) -> String {
    product
        .sizes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
