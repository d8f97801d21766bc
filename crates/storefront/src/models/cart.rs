//! Cart and cart line types.
//!
//! A [`Cart`] is an ordered list of lines keyed by `(product id, size)`. The
//! collection operations here are pure: they never touch storage or the
//! network, so the cart engine can apply them in guest mode and persist the
//! result afterwards.

use serde::{Deserialize, Serialize};

use shopfront_core::{CartLineId, Price, ProductId, Quantity, Size};

use super::Product;

/// What a cart line knows about its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    /// Full product embedded in the line (guest carts, populated remote lines).
    Snapshot(Product),
    /// Bare identifier; the gateway resolves it server-side.
    Reference(ProductId),
}

impl ProductRef {
    /// Identifier of the referenced product.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Snapshot(product) => &product.id,
            Self::Reference(id) => id,
        }
    }

    /// Unit price, when the product details are known.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Snapshot(product) => Some(product.price),
            Self::Reference(_) => None,
        }
    }

    /// Embedded product details, if any.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Product> {
        match self {
            Self::Snapshot(product) => Some(product),
            Self::Reference(_) => None,
        }
    }
}

/// A single (product, size) entry with its quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Server-assigned line identifier. Guest lines have none.
    pub line_id: Option<CartLineId>,
    pub product: ProductRef,
    pub size: Size,
    pub quantity: Quantity,
}

impl CartLine {
    /// A guest line embedding a product snapshot.
    #[must_use]
    pub const fn guest(product: Product, size: Size, quantity: Quantity) -> Self {
        Self {
            line_id: None,
            product: ProductRef::Snapshot(product),
            size,
            quantity,
        }
    }

    /// Identifier of the product on this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        self.product.id()
    }

    /// Whether this line is the `(product_id, size)` line.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, size: &Size) -> bool {
        self.product_id() == product_id && &self.size == size
    }

    /// Quantity times unit price. Lines without a known price count as zero.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product
            .price()
            .map_or(Price::ZERO, |price| price.times(self.quantity))
    }
}

/// An ordered collection of cart lines, unique per `(product id, size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, folding duplicate `(product id, size)` keys
    /// into the first occurrence so the uniqueness invariant always holds.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::empty();
        for line in lines {
            cart.merge_line(line);
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// Sum of `quantity * price` across all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// The `(product_id, size)` line, if present.
    #[must_use]
    pub fn find(&self, product_id: &ProductId, size: &Size) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(product_id, size))
    }

    /// Increase the quantity of an existing `(product_id, size)` line.
    ///
    /// Returns `false` (and changes nothing) when no such line exists.
    pub fn increment(&mut self, product_id: &ProductId, size: &Size, by: Quantity) -> bool {
        match self.lines.iter_mut().find(|l| l.matches(product_id, size)) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(by);
                true
            }
            None => false,
        }
    }

    /// Add a line, merging it into an existing line with the same key.
    pub fn merge_line(&mut self, line: CartLine) {
        if !self.increment(line.product_id(), &line.size, line.quantity) {
            self.lines.push(line);
        }
    }

    /// Replace the quantity of the `(product_id, size)` line.
    ///
    /// Returns `false` when the line is absent.
    pub fn set_quantity(&mut self, product_id: &ProductId, size: &Size, quantity: Quantity) -> bool {
        match self.lines.iter_mut().find(|l| l.matches(product_id, size)) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the `(product_id, size)` line. Returns `false` when absent.
    pub fn remove(&mut self, product_id: &ProductId, size: &Size) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, size));
        self.lines.len() != before
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Persisted shape of one guest cart line: `{product, size, quantity}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestCartEntry {
    pub product: Product,
    pub size: Size,
    pub quantity: Quantity,
}

impl From<GuestCartEntry> for CartLine {
    fn from(entry: GuestCartEntry) -> Self {
        Self::guest(entry.product, entry.size, entry.quantity)
    }
}

impl Cart {
    /// Guest entries for persistence. Lines without a product snapshot cannot
    /// be rehydrated and are skipped.
    #[must_use]
    pub fn to_guest_entries(&self) -> Vec<GuestCartEntry> {
        self.lines
            .iter()
            .filter_map(|line| {
                line.product.snapshot().map(|product| GuestCartEntry {
                    product: product.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                })
            })
            .collect()
    }
}
