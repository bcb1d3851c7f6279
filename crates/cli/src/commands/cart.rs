//! Cart commands.
//!
//! Each command opens the cart store from environment configuration, runs
//! one operation, and prints the resulting cart. Failure notices are
//! emitted as warnings through the tracing subscriber on stderr.
//!
//! # Environment Variables
//!
//! - `ROCKETSHOES_API_URL` - Catalog/stock service base URL (required)
//! - `ROCKETSHOES_CART_DIR` - Directory holding the persisted cart

use std::fmt::Write as _;

use rocketshoes_cart::{
    Cart, CartConfig, CartError, CartStore, CatalogClient, CatalogError, ConfigError, FileStore,
    LogNotifier, StorageError, UpdateProductAmount,
};
use rocketshoes_core::ProductId;
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog client could not be built.
    #[error("Catalog client error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart directory could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// A single cart mutation.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    Add(ProductId),
    Remove(ProductId),
    Update(UpdateProductAmount),
}

type Store = CartStore<CatalogClient, FileStore, LogNotifier>;

fn open_store() -> Result<Store, CommandError> {
    let config = CartConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let catalog = CatalogClient::new(&config.catalog)?;
    let storage = FileStore::open(&config.storage_dir)?;
    Ok(CartStore::open(
        catalog,
        storage,
        LogNotifier,
        config.storage_key,
    ))
}

/// Print the current cart.
///
/// # Errors
///
/// Returns error if configuration is invalid or the store cannot be opened.
pub fn show() -> Result<(), CommandError> {
    let store = open_store()?;
    print_cart(&store.cart());
    Ok(())
}

/// Apply `action` and print the resulting cart.
///
/// The cart is printed even when the operation fails, since some failures
/// leave the mutation applied.
///
/// # Errors
///
/// Returns error if the store cannot be opened or the operation fails.
pub async fn apply(action: Action) -> Result<(), CommandError> {
    let store = open_store()?;

    let result = match action {
        Action::Add(product_id) => store.add_product(product_id).await,
        Action::Remove(product_id) => store.remove_product(product_id).await,
        Action::Update(update) => store.update_product_amount(update).await,
    };

    print_cart(&store.cart());
    result?;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    print!("{}", render(cart));
}

/// Render `cart` as a plain-text table.
#[must_use]
pub fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<32} {:>5} {:>12} {:>12}",
        "ID", "PRODUCT", "QTY", "PRICE", "SUBTOTAL"
    );
    for item in cart {
        let name: String = item.name.chars().take(32).collect();
        let _ = writeln!(
            out,
            "{:<6} {:<32} {:>5} {:>12} {:>12}",
            item.id,
            name,
            item.amount,
            item.price.display(),
            item.subtotal().display()
        );
    }
    let _ = writeln!(
        out,
        "{} item(s), total {}",
        cart.item_count(),
        cart.subtotal().display()
    );
    out
}
