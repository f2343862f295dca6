//! Unified cart error type with Sentry breadcrumbs.
//!
//! Every foreground cart command returns `Result<T, CartError>`. Failures are
//! reported to the caller unchanged; presenting them is the UI's job.

use std::time::Duration;

use thiserror::Error;

use crate::local::StorageError;
use crate::remote::RemoteError;

/// Error returned by [`CartSynchronizer`](crate::sync::CartSynchronizer) commands.
#[derive(Debug, Error)]
pub enum CartError {
    /// The remote cart service rejected or failed the request.
    #[error("Remote cart error: {0}")]
    Remote(#[from] RemoteError),

    /// A remote call did not finish within its time budget.
    #[error("Remote cart request timed out after {0:?}")]
    Timeout(Duration),

    /// Quantity outside the accepted range (e.g., adding zero units).
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Local persistence failed.
    #[error("Local cart storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CartError {
    /// Transient connectivity problem (transport failure or timeout).
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Remote(RemoteError::Network(_))
        )
    }

    /// The credential was rejected; the caller should re-authenticate.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Remote(RemoteError::Auth(_)))
    }

    /// The request was understood but refused (e.g., out of stock).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity(_) | Self::Remote(RemoteError::Validation(_))
        )
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error. Without an initialized Sentry client this
/// is a no-op.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
