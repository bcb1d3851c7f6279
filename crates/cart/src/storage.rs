//! Durable key-value persistence for cart snapshots.
//!
//! The whole cart lives under a single key as a JSON array of line items
//! (`[{id, name, price, image, amount}, ...]`). It is read once when the
//! store opens and rewritten in full after every mutation.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cart::{Cart, LineItem};

/// Errors that can occur reading or writing the durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cart could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Store-specific failure.
    #[error("Store error: {0}")]
    Backend(String),
}

/// Synchronous string key-value store.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store that keeps one file per key inside a directory.
///
/// Each write goes to a uniquely named temporary file in the same directory,
/// is synced, and is then renamed over the target. A crash mid-write leaves
/// the previous snapshot intact, and concurrent writers never share a
/// temporary file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// File path used for `key`.
    ///
    /// The key is percent-encoded, so distinct keys always map to distinct
    /// files and no key can name a path outside the store directory.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let temp_path = temp.path().to_path_buf();
        let io_err = |source: io::Error| StorageError::Io {
            path: temp_path.clone(),
            source,
        };
        temp.write_all(value.as_bytes()).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;

        temp.persist(&path).map_err(|e| StorageError::Io {
            path,
            source: e.error,
        })?;
        Ok(())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Process-local store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().insert(key.into(), value.into());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Entries are plain strings, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// =============================================================================
// Cart codec
// =============================================================================

/// Load the cart snapshot stored under `key`.
///
/// A missing key yields an empty cart. So does an unreadable store or a
/// value that does not decode; in that case the stored value is left as is
/// and will be overwritten by the next successful mutation.
pub fn load_cart<S: DurableStore + ?Sized>(store: &S, key: &str) -> Cart {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No persisted cart, starting empty");
            return Cart::new();
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted cart, starting empty");
            return Cart::new();
        }
    };

    match serde_json::from_str::<Option<Vec<LineItem>>>(&raw) {
        Ok(items) => {
            let cart = Cart::from_items(items.unwrap_or_default());
            debug!(key, items = cart.len(), "Loaded persisted cart");
            cart
        }
        Err(e) => {
            warn!(key, error = %e, "Persisted cart is not valid, starting empty");
            Cart::new()
        }
    }
}

/// Write `cart` under `key`, replacing any previous snapshot.
///
/// # Errors
///
/// Returns an error if the cart cannot be encoded or the store rejects the
/// write.
pub fn save_cart<S: DurableStore + ?Sized>(
    store: &S,
    key: &str,
    cart: &Cart,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(cart)?;
    store.set(key, &raw)?;
    debug!(key, items = cart.len(), "Persisted cart");
    Ok(())
}
