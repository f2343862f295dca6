//! Integration test support for Pharmacart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pharmacart-integration-tests
//! ```
//!
//! # Test Doubles
//!
//! - [`FakeRemote`] - in-memory account cart that records every call and can
//!   be told to fail or stall
//! - [`BrokenStore`] - guest cart storage whose every operation fails
//!
//! The HTTP client itself is exercised against an in-process `axum` backend
//! in `tests/http_cart_service.rs`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pharmacart_core::{AccessToken, Cart, CartLine, ProductId, ProductSnapshot};
use pharmacart_storefront::local::{LocalStore, MemoryStore, StorageError};
use pharmacart_storefront::remote::{RemoteCartService, RemoteError};
use pharmacart_storefront::{CartSynchronizer, SyncConfig};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// A call received by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch,
    Add { product_id: ProductId, quantity: u32 },
    Update { product_id: ProductId, quantity: u32 },
    Remove { product_id: ProductId },
    Clear,
}

impl RemoteCall {
    /// Whether the call changes the account cart.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetch)
    }
}

#[derive(Debug, Default)]
struct FakeState {
    cart: Cart,
    catalog: HashMap<ProductId, ProductSnapshot>,
    calls: Vec<RemoteCall>,
    rejected: HashSet<ProductId>,
    offline: bool,
    delay: Option<Duration>,
}

/// In-memory stand-in for the backend cart API.
#[derive(Debug, Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `product` known to the backend.
    pub async fn stock(&self, product: ProductSnapshot) {
        self.state
            .lock()
            .await
            .catalog
            .insert(product.id.clone(), product);
    }

    /// Put a line directly into the account cart without recording a call.
    pub async fn seed(&self, product: ProductSnapshot, quantity: u32) {
        let mut state = self.state.lock().await;
        state.catalog.insert(product.id.clone(), product.clone());
        state.cart.add(product, quantity);
    }

    /// Reject every mutation of `product_id` with a validation error.
    pub async fn reject(&self, product_id: impl Into<ProductId>) {
        self.state.lock().await.rejected.insert(product_id.into());
    }

    /// Fail every call with a network error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Stall every call by `delay` before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// Current account cart.
    pub async fn cart(&self) -> Cart {
        self.state.lock().await.cart.clone()
    }

    /// Quantity of `product_id` in the account cart.
    pub async fn quantity(&self, product_id: &str) -> Option<u32> {
        self.state
            .lock()
            .await
            .cart
            .line(&ProductId::new(product_id))
            .map(|line| line.quantity)
    }

    /// Every call received so far.
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that changed (or tried to change) the account cart.
    pub async fn mutations(&self) -> Vec<RemoteCall> {
        self.calls()
            .await
            .into_iter()
            .filter(RemoteCall::is_mutation)
            .collect()
    }

    /// Record `call` and apply the configured delay and failures.
    async fn receive(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(call.clone());
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().await;
        if state.offline {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        let product_id = match &call {
            RemoteCall::Add { product_id, .. }
            | RemoteCall::Update { product_id, .. }
            | RemoteCall::Remove { product_id } => Some(product_id),
            RemoteCall::Fetch | RemoteCall::Clear => None,
        };
        if let Some(product_id) = product_id
            && state.rejected.contains(product_id)
        {
            return Err(RemoteError::Validation("Insufficient stock".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCartService for FakeRemote {
    async fn fetch_cart(&self, _token: &AccessToken) -> Result<Vec<CartLine>, RemoteError> {
        self.receive(RemoteCall::Fetch).await?;
        let state = self.state.lock().await;
        Ok(state
            .cart
            .lines()
            .iter()
            .map(|line| CartLine {
                subtotal: Some(line.line_total()),
                ..line.clone()
            })
            .collect())
    }

    async fn add_line(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        self.receive(RemoteCall::Add {
            product_id: product_id.clone(),
            quantity,
        })
        .await?;

        let mut state = self.state.lock().await;
        let product = state
            .catalog
            .get(product_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("Product {product_id}")))?;
        state.cart.add(product, quantity);
        Ok(())
    }

    async fn update_line(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        self.receive(RemoteCall::Update {
            product_id: product_id.clone(),
            quantity,
        })
        .await?;

        if self.state.lock().await.cart.set_quantity(product_id, quantity) {
            Ok(())
        } else {
            Err(RemoteError::NotFound(format!("Cart item {product_id}")))
        }
    }

    async fn remove_line(
        &self,
        _token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<(), RemoteError> {
        self.receive(RemoteCall::Remove {
            product_id: product_id.clone(),
        })
        .await?;

        if self.state.lock().await.cart.remove(product_id) {
            Ok(())
        } else {
            Err(RemoteError::NotFound(format!("Cart item {product_id}")))
        }
    }

    async fn clear_cart(&self, _token: &AccessToken) -> Result<(), RemoteError> {
        self.receive(RemoteCall::Clear).await?;
        self.state.lock().await.cart.clear();
        Ok(())
    }
}

/// Guest cart storage that fails every operation.
#[derive(Debug, Default)]
pub struct BrokenStore;

impl BrokenStore {
    fn error() -> StorageError {
        StorageError::Io(std::io::Error::other("disk full"))
    }
}

#[async_trait]
impl LocalStore for BrokenStore {
    async fn read_cart(&self) -> Result<Option<Cart>, StorageError> {
        Err(Self::error())
    }

    async fn write_cart(&self, _cart: &Cart) -> Result<(), StorageError> {
        Err(Self::error())
    }

    async fn remove_cart(&self) -> Result<(), StorageError> {
        Err(Self::error())
    }
}

/// A synchronizer wired to doubles, with handles kept for inspection.
pub struct Harness {
    pub sync: CartSynchronizer,
    pub remote: Arc<FakeRemote>,
    pub local: Arc<MemoryStore>,
}

impl Harness {
    /// Fresh backend, empty guest cart, default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with(FakeRemote::new(), MemoryStore::new(), SyncConfig::default())
    }

    #[must_use]
    pub fn with(remote: FakeRemote, local: MemoryStore, config: SyncConfig) -> Self {
        let remote = Arc::new(remote);
        let local = Arc::new(local);
        let sync = CartSynchronizer::new(remote.clone(), local.clone(), config);
        Self {
            sync,
            remote,
            local,
        }
    }

    /// Quantity of `product_id` in the synchronizer's current cart.
    #[must_use]
    pub fn quantity(&self, product_id: &str) -> Option<u32> {
        self.sync
            .state()
            .cart
            .line(&ProductId::new(product_id))
            .map(|line| line.quantity)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Product snapshot with a price in whole rupees.
#[must_use]
pub fn product(id: &str, rupees: i64) -> ProductSnapshot {
    ProductSnapshot::new(id, format!("Product {id}"), Decimal::from(rupees))
}

/// Guest cart built from `(id, quantity)` pairs, priced at ₹10 per unit.
#[must_use]
pub fn guest_cart(lines: &[(&str, u32)]) -> Cart {
    let mut cart = Cart::new();
    for &(id, quantity) in lines {
        cart.add(product(id, 10), quantity);
    }
    cart
}
