//! Catalog product types.

use serde::{Deserialize, Serialize};

use shopfront_core::{Price, ProductId, Size};

/// Default page size used by the catalog listing.
pub const DEFAULT_PAGE_LIMIT: u32 = 12;

/// A catalog product.
///
/// Products are read-only on the client. The serialized form uses the
/// gateway's field names (`_id`, `imageUrl`) so a persisted guest cart
/// snapshot looks exactly like the product the gateway returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    /// Sizes this product is offered in, in display order, without duplicates.
    #[serde(default)]
    pub sizes: Vec<Size>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether `size` is one of the sizes this product is offered in.
    #[must_use]
    pub fn offers_size(&self, size: &Size) -> bool {
        self.sizes.iter().any(|s| s == size)
    }

    /// Whether any stock is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Filters and paging for the catalog listing.
///
/// Unset filters are omitted from the request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub size: Option<Size>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            size: None,
            min_price: None,
            max_price: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ProductQuery {
    /// Query parameters in the gateway's naming, skipping unset filters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(7);
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.trim().to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("category", category.trim().to_string()));
        }
        if let Some(size) = &self.size {
            params.push(("size", size.to_string()));
        }
        if let Some(min) = self.min_price {
            params.push(("minPrice", min.amount().to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("maxPrice", max.amount().to_string()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("limit", self.limit.to_string()));
        params
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    /// Total number of pages; at least 1 even for an empty catalog.
    pub pages: u32,
}

impl ProductPage {
    /// Whether a page after this one exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}
