//! Product catalog.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use shopfront_core::ProductId;

use crate::error::ValidationError;
use crate::gateway::{Gateway, GatewayError};
use crate::models::{Product, ProductPage, ProductQuery};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Read-only access to products.
#[derive(Clone)]
pub struct Catalog {
    gateway: Arc<dyn Gateway>,
}

impl Catalog {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// List one page of products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the price range is inverted or
    /// paging is zero, without contacting the gateway.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price)
            && min > max
        {
            return Err(ValidationError::PriceRange { min, max }.into());
        }
        if query.page == 0 || query.limit == 0 {
            return Err(ValidationError::Paging.into());
        }
        Ok(self.gateway.list_products(query).await?)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Gateway` if the product does not exist or the
    /// request fails.
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        Ok(self.gateway.get_product(id).await?)
    }

    /// Ask the gateway to load its sample catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Gateway` if the request fails.
    pub async fn seed_products(&self) -> Result<(), CatalogError> {
        Ok(self.gateway.seed_products().await?)
    }
}
