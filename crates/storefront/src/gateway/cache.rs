//! Cache types for catalog responses.

use shopfront_core::ProductId;

use crate::models::{Product, ProductPage};

/// Cache key for products and unfiltered listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products { page: u32, limit: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
}
