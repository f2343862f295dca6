//! Account cart backed by the storefront REST API.
//!
//! # Architecture
//!
//! - [`RemoteCartService`] is the seam the synchronizer talks to; it is
//!   scoped per call to the bearer token of the signed-in customer
//! - [`HttpCartService`] implements it over `reqwest`
//! - The backend is the source of truth for merged quantities, pricing and
//!   stock, so mutations return only an acknowledgement and callers re-fetch
//!
//! # Example
//!
//! ```rust,ignore
//! use pharmacart_storefront::remote::{HttpCartService, RemoteCartService};
//!
//! let service = HttpCartService::new(&config.api)?;
//! service.add_line(&token, &ProductId::new("p1"), 2).await?;
//! let lines = service.fetch_cart(&token).await?;
//! ```

mod http;
pub mod types;

pub use http::HttpCartService;

use async_trait::async_trait;
use pharmacart_core::{AccessToken, CartLine, ProductId};
use thiserror::Error;

/// Errors that can occur when talking to the remote cart service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport failure (connection refused, reset, DNS, client timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The credential was missing, expired or rejected.
    #[error("Auth error: {0}")]
    Auth(String),

    /// The backend refused the request (e.g., insufficient stock).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The cart or line does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Server-side cart scoped to an authenticated customer.
#[async_trait]
pub trait RemoteCartService: Send + Sync {
    /// Fetch every line of the customer's cart.
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Vec<CartLine>, RemoteError>;

    /// Add `quantity` units of a product (the backend accumulates).
    async fn add_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError>;

    /// Set the quantity of an existing line.
    async fn update_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError>;

    /// Remove a line.
    async fn remove_line(&self, token: &AccessToken, product_id: &ProductId)
    -> Result<(), RemoteError>;

    /// Remove every line.
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), RemoteError>;
}
