//! Order history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, OrderStatus, Price, Quantity, Size};

/// An order created server-side at checkout.
///
/// Orders are snapshots: prices and names are as they were at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total_price: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(alias = "createdAt")]
    pub order_date: DateTime<Utc>,
}

/// One purchased line within an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub size: Size,
    pub quantity: Quantity,
    /// Unit price at purchase time.
    pub price: Price,
}

impl Order {
    /// Total number of units in the order.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.get())).sum()
    }
}
