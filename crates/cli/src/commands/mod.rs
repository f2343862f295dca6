//! Command implementations.

pub mod cart;
pub mod checkout;

use std::sync::Arc;

use pharmacart_core::{AccessToken, AuthState};
use pharmacart_storefront::checkout::CheckoutError;
use pharmacart_storefront::local::FileStore;
use pharmacart_storefront::remote::{HttpCartService, RemoteError};
use pharmacart_storefront::{CartError, CartSynchronizer, StorefrontConfig};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to create cart API client: {0}")]
    Client(#[from] RemoteError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Checkout failed: {0}")]
    Checkout(#[from] CheckoutError),
}

/// A synchronizer initialized for the current auth state.
pub struct Session {
    pub sync: CartSynchronizer,
    pub auth: AuthState,
}

impl Session {
    /// Build the synchronizer and load the cart.
    ///
    /// A login-triggered merge is awaited here so the process never exits
    /// with a merge half done.
    #[allow(clippy::print_stdout)]
    pub async fn start(
        config: &StorefrontConfig,
        token: Option<String>,
    ) -> Result<Self, CommandError> {
        let remote = HttpCartService::new(&config.api)?;
        let local = FileStore::new(&config.cart_path);
        tracing::debug!(path = %local.path().display(), "Using guest cart file");
        let sync = CartSynchronizer::new(Arc::new(remote), Arc::new(local), config.sync);

        let auth = token
            .map(AccessToken::new)
            .or_else(|| config.api.access_token())
            .map_or_else(AuthState::guest, AuthState::signed_in);

        if let Some(migration) = sync.initialize(auth.clone()).await
            && let Some(report) = migration.join().await
            && !report.skipped
        {
            println!(
                "Merged {} guest cart line(s) into your account",
                report.merged.len()
            );
            if !report.is_complete() {
                println!(
                    "Could not merge {} line(s): {}",
                    report.failed.len(),
                    report
                        .failed
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        if let Some(error) = sync.state().last_error {
            tracing::warn!(error = %error, "Cart could not be loaded");
        }

        Ok(Self { sync, auth })
    }
}
