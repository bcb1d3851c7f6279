//! Catalog and stock lookups.
//!
//! # Architecture
//!
//! - [`Catalog`] is the seam the cart store depends on
//! - [`CatalogClient`] talks to the catalog HTTP service with `reqwest`
//! - Product metadata is cached via `moka`; stock is always fetched fresh
//!
//! # Endpoints
//!
//! - `GET stock/{id}` -> `{ "id": 1, "amount": 3 }`
//! - `GET products/{id}` -> `{ "id": 1, "name": "...", "price": 179.9, "image": "..." }`

mod client;

pub use client::CatalogClient;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, Stock};
use thiserror::Error;

/// Errors that can occur when querying the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Product unknown to the service.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Service returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not decode.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Read-only product and stock lookups, keyed by product id.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Current available stock for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or the product is unknown.
    async fn stock(&self, product_id: ProductId) -> Result<Stock, CatalogError>;

    /// Product display metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or the product is unknown.
    async fn product(&self, product_id: ProductId) -> Result<Product, CatalogError>;
}

#[async_trait]
impl<C: Catalog + ?Sized> Catalog for std::sync::Arc<C> {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, CatalogError> {
        (**self).stock(product_id).await
    }

    async fn product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        (**self).product(product_id).await
    }
}
