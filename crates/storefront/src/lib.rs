//! Pharmacart storefront library.
//!
//! Owns the customer's cart across guest and signed-in sessions: local
//! persistence for guests, the account cart on the backend for signed-in
//! customers, and the merge between the two at login.
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let sync = CartSynchronizer::new(
//!     Arc::new(HttpCartService::new(&config.api)?),
//!     Arc::new(FileStore::new(&config.cart_path)),
//!     config.sync,
//! );
//! sync.initialize(AuthState::guest()).await;
//! sync.add_item(ProductSnapshot::new("p1", "Cetirizine", price), 1).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod error;
pub mod local;
pub mod remote;
pub mod sync;

pub use config::StorefrontConfig;
pub use error::{CartError, Result};
pub use sync::{CartState, CartSynchronizer, MigrationHandle, MigrationPolicy, MigrationReport, SyncConfig};
