//! RocketShoes cart store.
//!
//! Tracks which products a shopper has selected and how many of each,
//! validates quantities against remote stock, and persists the cart across
//! sessions.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the cart and is the only writer. It is constructed
//!   explicitly and handed to whatever UI shell embeds it.
//! - [`Catalog`] is the remote product/stock lookup seam; [`CatalogClient`]
//!   is the HTTP implementation.
//! - [`DurableStore`] is the synchronous key-value persistence seam;
//!   [`FileStore`] and [`MemoryStore`] implement it.
//! - [`Notifier`] receives user-facing failure notices.
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_cart::{CartConfig, CartStore, CatalogClient, FileStore, LogNotifier};
//!
//! let config = CartConfig::from_env()?;
//! let catalog = CatalogClient::new(&config.catalog)?;
//! let storage = FileStore::open(&config.storage_dir)?;
//! let store = CartStore::open(catalog, storage, LogNotifier, &config.storage_key);
//!
//! store.add_product(ProductId::new(1)).await?;
//! for item in store.cart().items() {
//!     println!("{} x{}", item.name, item.amount);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;

pub use cart::{Cart, LineItem};
pub use catalog::{Catalog, CatalogClient, CatalogError};
pub use config::{CartConfig, CatalogConfig, ConfigError};
pub use error::{BackendError, CartError};
pub use notify::{ChannelNotifier, LogNotifier, Notice, Notifier};
pub use storage::{DurableStore, FileStore, MemoryStore, StorageError};
pub use store::{CartStore, UpdateProductAmount};

pub use rocketshoes_core::{Price, Product, ProductId, Stock};
