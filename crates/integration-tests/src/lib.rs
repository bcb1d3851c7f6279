//! Integration test support for the RocketShoes cart store.
//!
//! [`MockCatalog`] serves the catalog/stock endpoints from in-memory maps on
//! an ephemeral localhost port, counts requests, and can be told to fail.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let mock = MockCatalog::start().await;
//! mock.add_product(1, "Tênis de Caminhada", 179.9, 3);
//!
//! let client = CatalogClient::new(&mock.config())?;
//! assert_eq!(client.stock(ProductId::new(1)).await?.amount, 3);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use rocketshoes_cart::CatalogConfig;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// How the mock answers while a failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Respond with this HTTP status and a plain-text body.
    Status(u16),
    /// Respond 200 with a body that is not JSON.
    Malformed,
}

#[derive(Default)]
struct MockState {
    stock: Mutex<HashMap<i64, i64>>,
    products: Mutex<HashMap<i64, Value>>,
    failure: Mutex<Option<Failure>>,
    last_authorization: Mutex<Option<String>>,
    stock_requests: AtomicUsize,
    product_requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    fn record(&self, headers: &HeaderMap) -> Option<Response> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        *lock(&self.last_authorization) = auth;

        match *lock(&self.failure) {
            Some(Failure::Status(code)) => {
                let status =
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Some((status, "catalog unavailable").into_response())
            }
            Some(Failure::Malformed) => Some("<html>not json</html>".into_response()),
            None => None,
        }
    }
}

/// In-process mock of the catalog/stock service.
///
/// The server task is aborted when the mock is dropped.
pub struct MockCatalog {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockCatalog {
    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/stock/{id}", get(stock))
            .route("/products/{id}", get(product))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock catalog listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock catalog address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "Mock catalog server stopped");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the mock service.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL host.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Mock address is a valid URL")
    }

    /// Catalog client configuration pointing at this mock.
    #[must_use]
    pub fn config(&self) -> CatalogConfig {
        CatalogConfig::new(self.url())
    }

    /// Register a product with its metadata and stock level.
    pub fn add_product(&self, id: i64, title: &str, price: f64, stock: i64) {
        lock(&self.state.products).insert(
            id,
            json!({
                "id": id,
                "title": title,
                "price": price,
                "image": format!("https://rocketseat-cdn.s3.amazonaws.com/shoes/{id}.jpg"),
            }),
        );
        self.set_stock(id, stock);
    }

    /// Set (or create) the stock level of a product.
    pub fn set_stock(&self, id: i64, amount: i64) {
        lock(&self.state.stock).insert(id, amount);
    }

    /// Make every request fail until [`MockCatalog::recover`] is called.
    pub fn fail_with(&self, failure: Failure) {
        *lock(&self.state.failure) = Some(failure);
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *lock(&self.state.failure) = None;
    }

    /// Number of `GET stock/{id}` requests served.
    #[must_use]
    pub fn stock_requests(&self) -> usize {
        self.state.stock_requests.load(Ordering::SeqCst)
    }

    /// Number of `GET products/{id}` requests served.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.product_requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        lock(&self.state.last_authorization).clone()
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn stock(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    state.stock_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = state.record(&headers) {
        return failure;
    }

    let amount = lock(&state.stock).get(&id).copied();
    match amount {
        Some(amount) => Json(json!({ "id": id, "amount": amount })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = state.record(&headers) {
        return failure;
    }

    let product = lock(&state.products).get(&id).cloned();
    match product {
        Some(product) => Json(product).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
