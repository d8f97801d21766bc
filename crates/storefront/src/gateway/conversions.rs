//! Conversions from wire payloads into validated models.
//!
//! Malformed cart lines are dropped with a warning instead of failing the
//! whole cart, so one stale product reference cannot lock a shopper out.

use secrecy::SecretString;
use tracing::warn;

use shopfront_core::{CartLineId, ProductId, Quantity, Size};

use crate::models::{Cart, CartLine, Product, ProductPage, ProductQuery, ProductRef};

use super::types::{AuthData, AuthGrant, CartLineData, Pagination};

pub fn convert_auth(data: AuthData) -> AuthGrant {
    AuthGrant {
        token: SecretString::from(data.token),
        user: data.user,
    }
}

pub fn convert_cart(lines: Vec<CartLineData>) -> Cart {
    Cart::from_lines(lines.into_iter().filter_map(convert_cart_line))
}

fn convert_cart_line(data: CartLineData) -> Option<CartLine> {
    let product = match data.product {
        serde_json::Value::String(id) if !id.is_empty() => ProductRef::Reference(ProductId::new(id)),
        value @ serde_json::Value::Object(_) => match serde_json::from_value::<Product>(value) {
            Ok(product) => ProductRef::Snapshot(product),
            Err(e) => {
                warn!(line_id = ?data.id, error = %e, "Skipping cart line with invalid product");
                return None;
            }
        },
        other => {
            warn!(line_id = ?data.id, product = %other, "Skipping cart line without product");
            return None;
        }
    };

    let size = match Size::parse(&data.size) {
        Ok(size) => size,
        Err(e) => {
            warn!(line_id = ?data.id, error = %e, "Skipping cart line with invalid size");
            return None;
        }
    };

    let quantity = match Quantity::new(data.quantity) {
        Ok(quantity) => quantity,
        Err(e) => {
            warn!(line_id = ?data.id, error = %e, "Skipping cart line with invalid quantity");
            return None;
        }
    };

    Some(CartLine {
        line_id: data.id.map(CartLineId::new),
        product,
        size,
        quantity,
    })
}

/// Assemble a listing page, falling back to the query's paging when the
/// gateway omits pagination metadata.
pub fn convert_product_page(
    items: Vec<Product>,
    pagination: Option<Pagination>,
    query: &ProductQuery,
) -> ProductPage {
    let pagination = pagination.unwrap_or_default();
    let total = pagination.total.unwrap_or(items.len() as u64);
    ProductPage {
        page: pagination.page.unwrap_or(query.page),
        limit: pagination.limit.unwrap_or(query.limit),
        total,
        pages: pagination.pages.unwrap_or(1).max(1),
        items,
    }
}
