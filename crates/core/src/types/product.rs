//! Catalog and stock records as served by the catalog service.

use serde::{Deserialize, Serialize};

use crate::{Price, ProductId};

/// Product metadata from `GET products/{id}`.
///
/// Fields the cart does not use are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Image URL.
    pub image: String,
}

/// Available quantity from `GET stock/{id}`.
///
/// `amount` is signed: a service may report zero or negative stock for
/// oversold products, and either means nothing can be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Product identifier.
    pub id: ProductId,
    /// Units available.
    pub amount: i64,
}

impl Stock {
    /// Whether `quantity` units can be held in a cart at once.
    #[must_use]
    pub fn covers(&self, quantity: i64) -> bool {
        quantity <= self.amount
    }
}
