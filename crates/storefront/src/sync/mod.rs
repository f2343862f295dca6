//! Cart state and synchronization.
//!
//! [`CartSynchronizer`] owns the in-memory cart and decides where each
//! command goes:
//!
//! - Signed out: the cart lives in the [`LocalStore`] and every mutation is
//!   applied in memory first, then persisted
//! - Signed in: the backend is authoritative; every mutation is sent to the
//!   [`RemoteCartService`] and followed by a full reload
//! - Guest to signed-in: the guest cart is merged into the account cart by a
//!   background task (see [`MigrationHandle`])
//!
//! State changes are published over a `tokio::sync::watch` channel so any
//! number of views can observe the cart without polling.

mod migration;
mod state;

pub use migration::{MergeAction, MergeStep, MigrationHandle, MigrationReport, plan_merge};
pub use state::{CartState, MigrationPolicy, SyncConfig};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pharmacart_core::{AccessToken, AuthState, Cart, CartLine, ProductId, ProductSnapshot};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, instrument, warn};

use crate::error::{CartError, Result, add_breadcrumb};
use crate::local::LocalStore;
use crate::remote::{RemoteCartService, RemoteError};

/// Run a remote call with an upper bound on its duration.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = std::result::Result<T, RemoteError>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(CartError::from),
        Err(_) => Err(CartError::Timeout(limit)),
    }
}

/// Auth bookkeeping shared by the foreground and the merge task.
#[derive(Debug, Default)]
struct Session {
    /// Auth pair seen by the last `initialize`. `None` until the first call.
    observed: Option<AuthState>,
    /// Bumped on every auth transition; stale loads are dropped.
    generation: u64,
}

struct Inner {
    remote: Arc<dyn RemoteCartService>,
    local: Arc<dyn LocalStore>,
    config: SyncConfig,
    state: watch::Sender<CartState>,
    session: Mutex<Session>,
    /// Held across a guest mutation and its write so writes land in order.
    guest_writes: Mutex<()>,
}

/// The single owner of cart state for one customer session.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartSynchronizer {
    inner: Arc<Inner>,
}

impl CartSynchronizer {
    /// Create a synchronizer with an empty cart. Call
    /// [`initialize`](Self::initialize) before issuing commands.
    pub fn new(
        remote: Arc<dyn RemoteCartService>,
        local: Arc<dyn LocalStore>,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(Inner {
                remote,
                local,
                config,
                state,
                session: Mutex::new(Session::default()),
                guest_writes: Mutex::new(()),
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Current cart lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.state.borrow().cart.lines().to_vec()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.inner.state.borrow().cart.total_item_count()
    }

    /// Sum of unit price times quantity across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.inner.state.borrow().cart.total_price()
    }

    /// React to the current auth state.
    ///
    /// Does nothing when `auth` equals the state seen by the previous call.
    /// Otherwise loads the cart from the matching source and, when the
    /// customer has just signed in, starts merging the guest cart in the
    /// background. The returned handle can be awaited for the merge outcome;
    /// dropping it lets the merge run detached.
    ///
    /// Load failures are not returned: they leave an empty cart and set
    /// `last_error`.
    #[instrument(skip_all, fields(authenticated = auth.is_authenticated))]
    pub async fn initialize(&self, auth: AuthState) -> Option<MigrationHandle> {
        let generation = {
            let mut session = self.inner.session.lock().await;
            if session.observed.as_ref() == Some(&auth) {
                debug!("Auth state unchanged, skipping cart load");
                return None;
            }
            session.observed = Some(auth.clone());
            session.generation += 1;
            session.generation
        };

        self.inner.state.send_modify(|state| {
            state.is_busy = true;
            state.last_error = None;
        });

        let (loaded_tx, loaded_rx) = oneshot::channel();
        let migration = auth.account_token().map(|token| {
            add_breadcrumb("auth", "Signed in, merging guest cart", None);
            self.spawn_migration(token.clone(), generation, loaded_rx)
        });

        let loaded = self.load(auth.account_token()).await;
        self.apply_load(generation, loaded).await;
        let _ = loaded_tx.send(());

        migration
    }

    /// Reload the cart from the source matching the current auth state.
    ///
    /// Failures leave an empty cart and set `last_error`.
    #[instrument(skip(self))]
    pub async fn reload(&self) {
        let (generation, token) = {
            let session = self.inner.session.lock().await;
            let token = session
                .observed
                .as_ref()
                .and_then(AuthState::account_token)
                .cloned();
            (session.generation, token)
        };

        self.inner.state.send_modify(|state| {
            state.is_busy = true;
            state.last_error = None;
        });
        let loaded = self.load(token.as_ref()).await;
        self.apply_load(generation, loaded).await;
    }

    /// Add `quantity` units of `product`, accumulating onto an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for zero, or the remote error
    /// when signed in. Lines are unchanged on error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: ProductSnapshot, quantity: u32) -> Result<()> {
        self.begin_command();
        if quantity == 0 {
            return Err(self.record(CartError::InvalidQuantity(0)));
        }
        add_breadcrumb(
            "cart",
            "Add item",
            Some(&[("product_id", product.id.as_str())]),
        );

        match self.account_token().await {
            Some(token) => {
                let result = bounded(
                    self.inner.config.request_timeout,
                    self.inner.remote.add_line(&token, &product.id, quantity),
                )
                .await;
                self.settle_remote(&token, result).await
            }
            None => {
                self.mutate_guest(|cart| cart.add(product, quantity)).await;
                Ok(())
            }
        }
    }

    /// Remove the line for `product_id`. Unknown IDs are a no-op for guests.
    ///
    /// # Errors
    ///
    /// Returns the remote error when signed in; lines are unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<()> {
        self.begin_command();
        add_breadcrumb(
            "cart",
            "Remove item",
            Some(&[("product_id", product_id.as_str())]),
        );

        match self.account_token().await {
            Some(token) => {
                let result = bounded(
                    self.inner.config.request_timeout,
                    self.inner.remote.remove_line(&token, product_id),
                )
                .await;
                self.settle_remote(&token, result).await
            }
            None => {
                self.mutate_guest(|cart| {
                    cart.remove(product_id);
                })
                .await;
                Ok(())
            }
        }
    }

    /// Set the quantity of a line. Zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for values above `u32::MAX`, or
    /// the remote error when signed in.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return self.remove_item(product_id).await;
        }
        self.begin_command();
        let Ok(quantity) = u32::try_from(quantity) else {
            return Err(self.record(CartError::InvalidQuantity(quantity)));
        };

        match self.account_token().await {
            Some(token) => {
                let result = bounded(
                    self.inner.config.request_timeout,
                    self.inner.remote.update_line(&token, product_id, quantity),
                )
                .await;
                self.settle_remote(&token, result).await
            }
            None => {
                self.mutate_guest(|cart| {
                    cart.set_quantity(product_id, quantity);
                })
                .await;
                Ok(())
            }
        }
    }

    /// Add one unit to an existing line. Unknown IDs are a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`update_quantity`](Self::update_quantity).
    pub async fn increment(&self, product_id: &ProductId) -> Result<()> {
        match self.quantity_of(product_id) {
            Some(current) => {
                self.update_quantity(product_id, i64::from(current) + 1)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Remove one unit from an existing line, never going below one.
    ///
    /// # Errors
    ///
    /// Same as [`update_quantity`](Self::update_quantity).
    pub async fn decrement(&self, product_id: &ProductId) -> Result<()> {
        match self.quantity_of(product_id) {
            Some(current) if current > 1 => {
                self.update_quantity(product_id, i64::from(current) - 1)
                    .await
            }
            _ => Ok(()),
        }
    }

    /// Empty the cart.
    ///
    /// The in-memory and guest carts are emptied before anything else; when
    /// signed in the backend is cleared afterwards.
    ///
    /// # Errors
    ///
    /// Returns the remote error. The local reset has already been applied.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.begin_command();
        add_breadcrumb("cart", "Clear cart", None);

        let token = self.account_token().await;

        self.inner.state.send_modify(|state| state.cart.clear());
        self.persist(&Cart::new()).await;

        let Some(token) = token else {
            return Ok(());
        };
        bounded(
            self.inner.config.request_timeout,
            self.inner.remote.clear_cart(&token),
        )
        .await
        .map_err(|e| self.record(e))
    }

    async fn account_token(&self) -> Option<AccessToken> {
        self.inner
            .session
            .lock()
            .await
            .observed
            .as_ref()
            .and_then(AuthState::account_token)
            .cloned()
    }

    fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.inner
            .state
            .borrow()
            .cart
            .line(product_id)
            .map(|line| line.quantity)
    }

    fn begin_command(&self) {
        self.inner.state.send_if_modified(|state| {
            let had_error = state.last_error.is_some();
            state.last_error = None;
            had_error
        });
    }

    /// Publish `err` as the last error and hand it back.
    fn record(&self, err: CartError) -> CartError {
        warn!(error = %err, "Cart command failed");
        let message = err.to_string();
        self.inner
            .state
            .send_modify(|state| state.last_error = Some(message));
        err
    }

    async fn load(&self, token: Option<&AccessToken>) -> Result<Cart> {
        match token {
            Some(token) => {
                let lines = bounded(
                    self.inner.config.request_timeout,
                    self.inner.remote.fetch_cart(token),
                )
                .await?;
                Ok(Cart::from(lines))
            }
            None => Ok(self.inner.local.read_cart().await?.unwrap_or_default()),
        }
    }

    /// Publish a load result unless `generation` has been superseded.
    ///
    /// Returns whether the result was applied.
    async fn apply_load(&self, generation: u64, loaded: Result<Cart>) -> bool {
        let session = self.inner.session.lock().await;
        if session.generation != generation {
            debug!(
                generation,
                current = session.generation,
                "Discarding cart load from a previous auth state"
            );
            return false;
        }

        let (cart, last_error) = match loaded {
            Ok(cart) => (cart, None),
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                (Cart::new(), Some(e.to_string()))
            }
        };
        self.inner.state.send_modify(|state| {
            state.cart = cart;
            state.is_busy = false;
            state.last_error = last_error;
        });
        drop(session);
        true
    }

    /// Finish a signed-in mutation: reload on success, record on failure.
    async fn settle_remote(&self, token: &AccessToken, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            return Err(self.record(e));
        }

        let generation = self.inner.session.lock().await.generation;
        let loaded = self.load(Some(token)).await;
        self.apply_load(generation, loaded).await;
        Ok(())
    }

    /// Apply `apply` to the published cart and persist the result.
    async fn mutate_guest(&self, apply: impl FnOnce(&mut Cart)) {
        let _writing = self.inner.guest_writes.lock().await;
        let mut snapshot = Cart::new();
        self.inner.state.send_modify(|state| {
            apply(&mut state.cart);
            snapshot = state.cart.clone();
        });
        self.write_guest(&snapshot).await;
    }

    async fn persist(&self, cart: &Cart) {
        let _writing = self.inner.guest_writes.lock().await;
        self.write_guest(cart).await;
    }

    async fn write_guest(&self, cart: &Cart) {
        if let Err(e) = self.inner.local.write_cart(cart).await {
            warn!(error = %e, "Failed to persist guest cart");
        }
    }
}
