//! The cart store: single owner and writer of the shopper's cart.
//!
//! Mutations are serialized through one async lock that is held across the
//! stock lookup, so two back-to-back operations on the same product always
//! see each other's result. Readers never take that lock; they read the last
//! committed snapshot from a `watch` channel.

use rocketshoes_core::ProductId;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::cart::{Cart, LineItem};
use crate::catalog::{Catalog, CatalogError};
use crate::error::{BackendError, CartError};
use crate::notify::Notifier;
use crate::storage::{DurableStore, StorageError, load_cart, save_cart};

/// Arguments for [`CartStore::update_product_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    /// Product whose quantity changes.
    pub product_id: ProductId,
    /// Requested quantity. Values of zero or less remove the product.
    pub amount: i64,
}

/// Cart state manager.
///
/// Constructed explicitly with its collaborators and handed to whatever
/// embeds it. Every failed operation is returned to the caller and also
/// reported through the notifier.
pub struct CartStore<C, S, N> {
    catalog: C,
    storage: S,
    notifier: N,
    key: String,
    writer: Mutex<()>,
    snapshots: watch::Sender<Cart>,
}

impl<C, S, N> CartStore<C, S, N>
where
    C: Catalog,
    S: DurableStore,
    N: Notifier,
{
    /// Open a store, loading any cart previously persisted under `key`.
    #[must_use]
    pub fn open(catalog: C, storage: S, notifier: N, key: impl Into<String>) -> Self {
        let key = key.into();
        let cart = load_cart(&storage, &key);
        info!(key = %key, items = cart.len(), "Cart store opened");

        let (snapshots, _) = watch::channel(cart);
        Self {
            catalog,
            storage,
            notifier,
            key,
            writer: Mutex::new(()),
            snapshots,
        }
    }

    /// Current cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.snapshots.borrow().clone()
    }

    /// Watch committed cart snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.snapshots.subscribe()
    }

    /// Key the cart is persisted under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart has its amount incremented; a new one
    /// is appended with amount 1 and its catalog metadata. Either way the
    /// resulting amount must be covered by current stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if stock does not cover the new amount
    /// - [`CartError::AddFailed`] if a catalog lookup fails (cart unchanged)
    ///   or the new cart cannot be persisted (cart changed)
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let result = self.try_add(product_id).await;
        self.report(result)
    }

    /// Remove a product. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RemoveFailed`] if the new cart cannot be
    /// persisted. The removal is applied regardless.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let _writer = self.writer.lock().await;
        let result = self
            .remove_locked(product_id)
            .map_err(|source| CartError::RemoveFailed { product_id, source });
        self.report(result)
    }

    /// Set the amount of a product already in the cart.
    ///
    /// An amount of zero or less removes the product without a stock
    /// lookup. Updating a product that is not in the cart changes nothing.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if stock does not cover `amount`
    /// - [`CartError::UpdateFailed`] if the stock lookup fails (cart
    ///   unchanged) or the new cart cannot be persisted (cart changed)
    #[instrument(skip(self), fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(
        &self,
        update: UpdateProductAmount,
    ) -> Result<Cart, CartError> {
        let result = self.try_update(update).await;
        self.report(result)
    }

    async fn try_add(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let add_failed = |e: CatalogError| {
            error!(error = %e, "Catalog lookup failed");
            CartError::AddFailed {
                product_id,
                source: e.into(),
            }
        };

        let _writer = self.writer.lock().await;
        let stock = self.catalog.stock(product_id).await.map_err(add_failed)?;
        let current = self.cart();

        let next = if let Some(existing) = current.get(product_id) {
            let requested = i64::from(existing.amount) + 1;
            let new_amount = existing
                .amount
                .checked_add(1)
                .filter(|_| stock.covers(requested))
                .ok_or_else(|| out_of_stock(product_id, requested, stock.amount))?;
            current.with_amount(product_id, new_amount)
        } else {
            if !stock.covers(1) {
                return Err(out_of_stock(product_id, 1, stock.amount));
            }
            let product = self.catalog.product(product_id).await.map_err(add_failed)?;
            current.with_item_appended(LineItem {
                id: product_id,
                ..LineItem::from_product(product)
            })
        };

        self.commit(next).map_err(|source| CartError::AddFailed {
            product_id,
            source: source.into(),
        })
    }

    async fn try_update(&self, update: UpdateProductAmount) -> Result<Cart, CartError> {
        let UpdateProductAmount { product_id, amount } = update;
        let update_failed = |source: BackendError| CartError::UpdateFailed {
            product_id,
            source,
        };

        let _writer = self.writer.lock().await;

        if amount <= 0 {
            debug!("Non-positive amount, removing product");
            return self
                .remove_locked(product_id)
                .map_err(|e| update_failed(e.into()));
        }

        let stock = self.catalog.stock(product_id).await.map_err(|e| {
            error!(error = %e, "Stock lookup failed");
            update_failed(e.into())
        })?;
        let new_amount = u32::try_from(amount)
            .ok()
            .filter(|_| stock.covers(amount))
            .ok_or_else(|| out_of_stock(product_id, amount, stock.amount))?;

        let current = self.cart();
        if !current.contains(product_id) {
            debug!("Product not in cart, nothing to update");
        }
        self.commit(current.with_amount(product_id, new_amount))
            .map_err(|e| update_failed(e.into()))
    }

    /// Remove `product_id` and commit. Caller holds the writer lock.
    fn remove_locked(&self, product_id: ProductId) -> Result<Cart, StorageError> {
        self.commit(self.cart().without(product_id))
    }

    /// Publish `next` to readers, then persist it.
    ///
    /// The snapshot is published even if persisting fails.
    fn commit(&self, next: Cart) -> Result<Cart, StorageError> {
        self.snapshots.send_replace(next.clone());
        save_cart(&self.storage, &self.key, &next).map_err(|e| {
            error!(key = %self.key, error = %e, "Failed to persist cart");
            e
        })?;
        Ok(next)
    }

    fn report(&self, result: Result<Cart, CartError>) -> Result<Cart, CartError> {
        if let Err(e) = &result {
            self.notifier.notify(e.notice());
        }
        result
    }
}

fn out_of_stock(product_id: ProductId, requested: i64, available: i64) -> CartError {
    warn!(requested, available, "Requested quantity exceeds stock");
    CartError::OutOfStock {
        product_id,
        requested,
        available,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use rocketshoes_core::{Price, Product, Stock};

    use super::*;
    use crate::notify::Notice;
    use crate::storage::MemoryStore;

    const KEY: &str = "@RocketShoes:cart";

    #[derive(Default)]
    struct FakeCatalog {
        stock: StdMutex<HashMap<ProductId, i64>>,
        unknown_products: HashSet<ProductId>,
        failing: AtomicBool,
        delay: Option<Duration>,
        stock_calls: AtomicUsize,
        product_calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn with_stock(levels: &[(i64, i64)]) -> Self {
            Self {
                stock: StdMutex::new(
                    levels
                        .iter()
                        .map(|&(id, amount)| (ProductId::new(id), amount))
                        .collect(),
                ),
                ..Self::default()
            }
        }

        fn set_stock(&self, id: i64, amount: i64) {
            self.stock
                .lock()
                .unwrap()
                .insert(ProductId::new(id), amount);
        }
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn stock(&self, product_id: ProductId) -> Result<Stock, CatalogError> {
            self.stock_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(CatalogError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let amount = self.stock.lock().unwrap().get(&product_id).copied();
            amount
                .map(|amount| Stock {
                    id: product_id,
                    amount,
                })
                .ok_or(CatalogError::NotFound(product_id))
        }

        async fn product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            if self.unknown_products.contains(&product_id) {
                return Err(CatalogError::NotFound(product_id));
            }
            Ok(product(product_id.as_i64()))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: StdMutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    /// Store that reads fine but rejects every write.
    struct ReadOnlyStore(MemoryStore);

    impl DurableStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("quota exceeded".to_string()))
        }
    }

    type TestStore<S> = CartStore<Arc<FakeCatalog>, Arc<S>, Arc<RecordingNotifier>>;

    struct Harness<S = MemoryStore> {
        catalog: Arc<FakeCatalog>,
        storage: Arc<S>,
        notifier: Arc<RecordingNotifier>,
        store: TestStore<S>,
    }

    fn harness_with<S: DurableStore>(catalog: FakeCatalog, storage: S) -> Harness<S> {
        let catalog = Arc::new(catalog);
        let storage = Arc::new(storage);
        let notifier = Arc::new(RecordingNotifier::default());
        let store = CartStore::open(
            Arc::clone(&catalog),
            Arc::clone(&storage),
            Arc::clone(&notifier),
            KEY,
        );
        Harness {
            catalog,
            storage,
            notifier,
            store,
        }
    }

    fn harness(stock: &[(i64, i64)], seed: &[LineItem]) -> Harness {
        harness_with(FakeCatalog::with_stock(stock), seeded(seed))
    }

    fn seeded(items: &[LineItem]) -> MemoryStore {
        let raw = serde_json::to_string(&Cart::from_items(items.to_vec())).unwrap();
        MemoryStore::with_entry(KEY, raw)
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Shoe {id}"),
            price: Price::from_cents(17_990),
            image: format!("https://example.com/{id}.jpg"),
        }
    }

    fn item(id: i64, amount: u32) -> LineItem {
        LineItem {
            amount,
            ..LineItem::from_product(product(id))
        }
    }

    fn ids(cart: &Cart) -> Vec<i64> {
        cart.items().iter().map(|i| i.id.as_i64()).collect()
    }

    fn amount(cart: &Cart, id: i64) -> Option<u32> {
        cart.get(ProductId::new(id)).map(|i| i.amount)
    }

    fn persisted<S: DurableStore>(storage: &S) -> Cart {
        load_cart(storage, KEY)
    }

    #[test]
    fn test_empty_on_first_run() {
        let h = harness_with(FakeCatalog::default(), MemoryStore::new());
        assert!(h.store.cart().is_empty());
        assert!(h.storage.get(KEY).unwrap().is_none());
    }

    #[test]
    fn test_open_loads_persisted_cart() {
        let h = harness(&[], &[item(2, 1), item(1, 3)]);
        assert_eq!(ids(&h.store.cart()), vec![2, 1]);
        assert_eq!(amount(&h.store.cart(), 1), Some(3));
    }

    #[tokio::test]
    async fn test_add_new_product_appends_with_metadata() {
        let h = harness(&[(1, 5), (2, 5)], &[item(2, 1)]);

        let cart = h.store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(ids(&cart), vec![2, 1]);
        let added = cart.get(ProductId::new(1)).unwrap();
        assert_eq!(added.amount, 1);
        assert_eq!(added.name, "Shoe 1");
        assert_eq!(added.price, Price::from_cents(17_990));
        assert_eq!(persisted(&*h.storage), cart);
        assert_eq!(h.catalog.product_calls.load(Ordering::SeqCst), 1);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let h = harness(&[(1, 5)], &[item(1, 2), item(2, 4)]);

        let cart = h.store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amount(&cart, 1), Some(3));
        assert_eq!(cart.items()[1], item(2, 4));
        assert_eq!(ids(&cart), vec![1, 2]);
        assert_eq!(h.catalog.product_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_blocked_by_stock() {
        let h = harness(&[(1, 5)], &[item(1, 5)]);
        let before = h.storage.get(KEY).unwrap();

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
        assert_eq!(amount(&h.store.cart(), 1), Some(5));
        assert_eq!(h.storage.get(KEY).unwrap(), before);
        assert_eq!(h.notifier.notices(), vec![Notice::OutOfStock]);
    }

    #[tokio::test]
    async fn test_add_new_product_without_stock() {
        let h = harness(&[(1, 0)], &[]);

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 1,
                available: 0,
                ..
            }
        ));
        assert!(h.store.cart().is_empty());
        assert_eq!(h.catalog.product_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.notifier.notices(), vec![Notice::OutOfStock]);
    }

    #[tokio::test]
    async fn test_add_stock_failure_leaves_cart_unchanged() {
        let h = harness(&[(1, 5)], &[item(1, 1)]);
        h.catalog.failing.store(true, Ordering::SeqCst);

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AddFailed {
                source: BackendError::Catalog(CatalogError::Api { status: 503, .. }),
                ..
            }
        ));
        assert!(!err.mutation_applied());
        assert_eq!(amount(&h.store.cart(), 1), Some(1));
        assert_eq!(h.notifier.notices(), vec![Notice::AddFailed]);
    }

    #[tokio::test]
    async fn test_add_unknown_product_fails() {
        let mut catalog = FakeCatalog::with_stock(&[(7, 3)]);
        catalog.unknown_products.insert(ProductId::new(7));
        let h = harness_with(catalog, MemoryStore::new());

        let err = h.store.add_product(ProductId::new(7)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AddFailed {
                source: BackendError::Catalog(CatalogError::NotFound(_)),
                ..
            }
        ));
        assert!(h.store.cart().is_empty());
        assert!(h.storage.get(KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_adds_keep_products_unique() {
        let h = harness(&[(1, 3), (2, 2), (3, 10)], &[]);

        for id in [1, 2, 1, 3, 2, 1, 2, 1, 3] {
            let _ = h.store.add_product(ProductId::new(id)).await;
        }

        let cart = h.store.cart();
        assert_eq!(ids(&cart), vec![1, 2, 3]);
        assert_eq!(amount(&cart, 1), Some(3));
        assert_eq!(amount(&cart, 2), Some(2));
        assert_eq!(amount(&cart, 3), Some(2));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::OutOfStock, Notice::OutOfStock]
        );
    }

    #[tokio::test]
    async fn test_remove_preserves_order() {
        let h = harness(&[], &[item(1, 1), item(2, 2), item(3, 3)]);

        let cart = h.store.remove_product(ProductId::new(2)).await.unwrap();

        assert_eq!(ids(&cart), vec![1, 3]);
        assert_eq!(persisted(&*h.storage), cart);
        assert_eq!(h.catalog.stock_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remove_absent_product_is_idempotent() {
        let h = harness(&[], &[item(1, 1), item(2, 2)]);
        let before = h.store.cart();

        let cart = h.store.remove_product(ProductId::new(9)).await.unwrap();

        assert_eq!(cart, before);
        assert_eq!(persisted(&*h.storage), before);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_update_within_stock_keeps_position() {
        let h = harness(&[(1, 10)], &[item(2, 1), item(1, 2), item(3, 1)]);

        let cart = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 7,
            })
            .await
            .unwrap();

        assert_eq!(ids(&cart), vec![2, 1, 3]);
        assert_eq!(amount(&cart, 1), Some(7));
        assert_eq!(persisted(&*h.storage), cart);
    }

    #[tokio::test]
    async fn test_update_over_stock_rejected() {
        let h = harness(&[(1, 3)], &[item(1, 2)]);

        let err = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 4,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(amount(&h.store.cart(), 1), Some(2));
        assert_eq!(h.notifier.notices(), vec![Notice::OutOfStock]);
    }

    #[tokio::test]
    async fn test_update_non_positive_amount_removes() {
        let h = harness(&[(1, 3)], &[item(1, 2), item(2, 1)]);

        for requested in [0, -4] {
            let cart = h
                .store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(1),
                    amount: requested,
                })
                .await
                .unwrap();
            assert_eq!(ids(&cart), vec![2]);
        }

        assert_eq!(h.catalog.stock_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ids(&persisted(&*h.storage)), vec![2]);
    }

    #[tokio::test]
    async fn test_update_absent_product_is_noop() {
        let h = harness(&[(5, 10)], &[item(1, 2)]);
        let before = h.store.cart();

        let cart = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(5),
                amount: 3,
            })
            .await
            .unwrap();

        assert_eq!(cart, before);
        assert!(!cart.contains(ProductId::new(5)));
        assert_eq!(h.catalog.stock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_stock_failure() {
        let h = harness(&[(1, 10)], &[item(1, 2)]);
        h.catalog.failing.store(true, Ordering::SeqCst);

        let err = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 3,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::UpdateFailed { .. }));
        assert!(!err.mutation_applied());
        assert_eq!(amount(&h.store.cart(), 1), Some(2));
        assert_eq!(h.notifier.notices(), vec![Notice::UpdateFailed]);
    }

    #[tokio::test]
    async fn test_stock_is_checked_on_every_call() {
        let h = harness(&[(1, 5)], &[item(1, 1)]);

        h.store.add_product(ProductId::new(1)).await.unwrap();
        h.catalog.set_stock(1, 2);
        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::OutOfStock { available: 2, .. }));
        assert_eq!(h.catalog.stock_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_with_failing_storage_is_still_applied() {
        let storage = ReadOnlyStore(seeded(&[item(1, 1), item(2, 1)]));
        let h = harness_with(FakeCatalog::default(), storage);

        let err = h.store.remove_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, CartError::RemoveFailed { .. }));
        assert!(err.mutation_applied());
        assert_eq!(ids(&h.store.cart()), vec![2]);
        assert_eq!(h.notifier.notices(), vec![Notice::RemoveFailed]);
    }

    #[tokio::test]
    async fn test_add_with_failing_storage_is_still_applied() {
        let h = harness_with(
            FakeCatalog::with_stock(&[(1, 5)]),
            ReadOnlyStore(MemoryStore::new()),
        );

        let err = h.store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AddFailed {
                source: BackendError::Storage(_),
                ..
            }
        ));
        assert!(err.mutation_applied());
        assert_eq!(amount(&h.store.cart(), 1), Some(1));
        assert_eq!(h.notifier.notices(), vec![Notice::AddFailed]);
    }

    #[tokio::test]
    async fn test_update_with_failing_storage_is_still_applied() {
        let h = harness_with(
            FakeCatalog::with_stock(&[(1, 10)]),
            ReadOnlyStore(seeded(&[item(1, 2), item(2, 1)])),
        );

        let err = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 5,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::UpdateFailed {
                source: BackendError::Storage(_),
                ..
            }
        ));
        assert!(err.mutation_applied());
        assert_eq!(amount(&h.store.cart(), 1), Some(5));
        assert_eq!(ids(&h.store.cart()), vec![1, 2]);
        assert_eq!(h.notifier.notices(), vec![Notice::UpdateFailed]);
    }

    #[tokio::test]
    async fn test_update_to_zero_with_failing_storage_still_removes() {
        let h = harness_with(
            FakeCatalog::default(),
            ReadOnlyStore(seeded(&[item(1, 2), item(2, 1)])),
        );

        let err = h
            .store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::UpdateFailed {
                source: BackendError::Storage(_),
                ..
            }
        ));
        assert!(err.mutation_applied());
        assert_eq!(ids(&h.store.cart()), vec![2]);
        assert_eq!(h.notifier.notices(), vec![Notice::UpdateFailed]);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let h = harness(&[(1, 5), (2, 5), (3, 5)], &[]);
        for id in [3, 1, 3, 2] {
            h.store.add_product(ProductId::new(id)).await.unwrap();
        }
        let expected = h.store.cart();

        let reopened = CartStore::open(
            Arc::clone(&h.catalog),
            Arc::clone(&h.storage),
            Arc::new(RecordingNotifier::default()),
            KEY,
        );

        assert_eq!(reopened.cart(), expected);
        assert_eq!(ids(&reopened.cart()), vec![3, 1, 2]);
        assert_eq!(amount(&reopened.cart(), 3), Some(2));
    }

    #[tokio::test]
    async fn test_subscribers_observe_commits() {
        let h = harness(&[(1, 5)], &[]);
        let mut rx = h.store.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        h.store.add_product(ProductId::new(1)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(amount(&rx.borrow_and_update(), 1), Some(1));

        // Rejected mutations publish nothing
        h.catalog.set_stock(1, 1);
        let _ = h.store.add_product(ProductId::new(1)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let catalog = FakeCatalog {
            delay: Some(Duration::from_millis(20)),
            ..FakeCatalog::with_stock(&[(1, 10)])
        };
        let h = harness_with(catalog, seeded(&[item(1, 1)]));
        let id = ProductId::new(1);

        let (a, b, c) = tokio::join!(
            h.store.add_product(id),
            h.store.add_product(id),
            h.store.add_product(id)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        assert_eq!(amount(&h.store.cart(), 1), Some(4));
        assert_eq!(amount(&persisted(&*h.storage), 1), Some(4));
    }
}
