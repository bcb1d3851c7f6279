//! Cart operation errors.
//!
//! Every [`CartError`] is user-recoverable: the store reports it through the
//! notifier and the shopper re-triggers the action. Nothing here is fatal.

use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::notify::Notice;
use crate::storage::StorageError;

/// Failure of a collaborator the store depends on.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Catalog or stock lookup failed.
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// Writing the cart snapshot failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

/// Errors returned by cart store operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity exceeds the current stock. Cart unchanged.
    #[error("Product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Adding a product failed.
    #[error("Failed to add product {product_id}: {source}")]
    AddFailed {
        product_id: ProductId,
        #[source]
        source: BackendError,
    },

    /// Persisting after a removal failed. The removal itself is applied.
    #[error("Failed to remove product {product_id}: {source}")]
    RemoveFailed {
        product_id: ProductId,
        #[source]
        source: StorageError,
    },

    /// Changing a product quantity failed.
    #[error("Failed to update amount of product {product_id}: {source}")]
    UpdateFailed {
        product_id: ProductId,
        #[source]
        source: BackendError,
    },
}

impl CartError {
    /// The user-facing notice for this error.
    #[must_use]
    pub const fn notice(&self) -> Notice {
        match self {
            Self::OutOfStock { .. } => Notice::OutOfStock,
            Self::AddFailed { .. } => Notice::AddFailed,
            Self::RemoveFailed { .. } => Notice::RemoveFailed,
            Self::UpdateFailed { .. } => Notice::UpdateFailed,
        }
    }

    /// The product the failed operation targeted.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match self {
            Self::OutOfStock { product_id, .. }
            | Self::AddFailed { product_id, .. }
            | Self::RemoveFailed { product_id, .. }
            | Self::UpdateFailed { product_id, .. } => *product_id,
        }
    }

    /// Whether the cart was changed despite the error.
    ///
    /// True only when the mutation was applied but could not be persisted.
    #[must_use]
    pub const fn mutation_applied(&self) -> bool {
        matches!(
            self,
            Self::RemoveFailed { .. }
                | Self::AddFailed {
                    source: BackendError::Storage(_),
                    ..
                }
                | Self::UpdateFailed {
                    source: BackendError::Storage(_),
                    ..
                }
        )
    }
}
