//! Guest cart persistence.
//!
//! A signed-out customer's cart lives on the device only. The synchronizer
//! treats storage failures as non-fatal: they are logged and the in-memory
//! cart stays authoritative until the next successful write.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use pharmacart_core::Cart;
use thiserror::Error;

/// Errors that can occur while reading or writing the guest cart.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored cart could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage for the guest cart.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the persisted cart, or `None` if nothing has been stored.
    async fn read_cart(&self) -> Result<Option<Cart>, StorageError>;

    /// Replace the persisted cart.
    async fn write_cart(&self, cart: &Cart) -> Result<(), StorageError>;

    /// Delete the persisted cart entirely.
    async fn remove_cart(&self) -> Result<(), StorageError>;
}
