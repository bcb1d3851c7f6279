//! Cart and line item types.
//!
//! A [`Cart`] is an immutable snapshot: every change produces a new `Cart`
//! built from the previous one, so a reader holding a snapshot never sees a
//! half-applied mutation.

use rocketshoes_core::{Price, Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One product-and-quantity entry in the cart.
///
/// Display fields are copied from the catalog when the product is first
/// added and are not refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Product display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Unit price at the time the product was added.
    pub price: Price,
    /// Product image URL.
    pub image: String,
    /// Quantity, always at least 1.
    pub amount: u32,
}

impl LineItem {
    /// Create a line item holding a single unit of `product`.
    #[must_use]
    pub fn from_product(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            image: product.image,
            amount: 1,
        }
    }

    /// Price of this line (unit price times amount).
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.amount)
    }
}

/// The ordered collection of line items for the current shopper.
///
/// Order is the order in which products were first added and is stable
/// across quantity updates. Serializes as a plain JSON array of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from previously persisted items.
    ///
    /// Items that would break the cart invariants are dropped: a repeated
    /// product id keeps only its first occurrence, and zero amounts are
    /// discarded.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut kept: Vec<LineItem> = Vec::with_capacity(items.len());
        for item in items {
            if item.amount == 0 {
                warn!(product_id = %item.id, "Dropping persisted line item with zero amount");
                continue;
            }
            if kept.iter().any(|k| k.id == item.id) {
                warn!(product_id = %item.id, "Dropping duplicate persisted line item");
                continue;
            }
            kept.push(item);
        }
        Self { items: kept }
    }

    /// Line items in cart order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Get the line item for a product.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == product_id)
    }

    /// Check if the cart holds a product.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.amount)).sum()
    }

    /// Sum of all line subtotals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// A new cart with `item` appended at the end.
    ///
    /// If the product is already present its existing line is replaced in
    /// place instead, so a product never appears twice.
    #[must_use]
    pub fn with_item_appended(&self, item: LineItem) -> Self {
        if self.contains(item.id) {
            return Self {
                items: self
                    .items
                    .iter()
                    .map(|i| if i.id == item.id { item.clone() } else { i.clone() })
                    .collect(),
            };
        }

        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.push(item);
        Self { items }
    }

    /// A new cart with the amount of `product_id` set to `amount`.
    ///
    /// Position is preserved. Returns an equal cart if the product is absent.
    #[must_use]
    pub fn with_amount(&self, product_id: ProductId, amount: u32) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|i| {
                    if i.id == product_id {
                        LineItem {
                            amount,
                            ..i.clone()
                        }
                    } else {
                        i.clone()
                    }
                })
                .collect(),
        }
    }

    /// A new cart without `product_id`. Remaining order is preserved.
    #[must_use]
    pub fn without(&self, product_id: ProductId) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|i| i.id != product_id)
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
