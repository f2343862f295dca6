//! In-process implementation of [`LocalStore`].

use async_trait::async_trait;
use pharmacart_core::Cart;
use tokio::sync::RwLock;

use super::{LocalStore, StorageError};

/// Guest cart kept in memory; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cart: RwLock<Option<Cart>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `cart`.
    #[must_use]
    pub fn with_cart(cart: Cart) -> Self {
        Self {
            cart: RwLock::new(Some(cart)),
        }
    }

    /// Current contents, for inspection.
    pub async fn snapshot(&self) -> Option<Cart> {
        self.cart.read().await.clone()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn read_cart(&self) -> Result<Option<Cart>, StorageError> {
        Ok(self.cart.read().await.clone())
    }

    async fn write_cart(&self, cart: &Cart) -> Result<(), StorageError> {
        *self.cart.write().await = Some(cart.clone());
        Ok(())
    }

    async fn remove_cart(&self) -> Result<(), StorageError> {
        *self.cart.write().await = None;
        Ok(())
    }
}
