//! Integration tests for foreground cart commands.
//!
//! Guest sessions run against a `MemoryStore`; signed-in sessions run
//! against the recording `FakeRemote`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pharmacart_core::{AccessToken, AuthState, ProductId};
use pharmacart_integration_tests::{BrokenStore, FakeRemote, Harness, RemoteCall, product};
use pharmacart_storefront::local::{FileStore, LocalStore, MemoryStore};
use pharmacart_storefront::{CartError, CartSynchronizer, SyncConfig};
use rust_decimal::Decimal;

fn signed_in() -> AuthState {
    AuthState::signed_in(AccessToken::new("customer-token"))
}

fn id(value: &str) -> ProductId {
    ProductId::new(value)
}

// =============================================================================
// Guest Cart Tests
// =============================================================================

#[tokio::test]
async fn test_repeated_add_accumulates_into_one_line() {
    let h = Harness::new();
    h.sync.initialize(AuthState::guest()).await;

    h.sync.add_item(product("a", 100), 2).await.unwrap();
    h.sync.add_item(product("a", 100), 3).await.unwrap();

    let state = h.sync.state();
    assert_eq!(state.lines().len(), 1);
    assert_eq!(h.quantity("a"), Some(5));
    assert!(h.remote.calls().await.is_empty());
}

#[tokio::test]
async fn test_update_to_zero_or_negative_removes_line() {
    for quantity in [0, -1] {
        let h = Harness::new();
        h.sync.initialize(AuthState::guest()).await;
        h.sync.add_item(product("a", 10), 2).await.unwrap();
        h.sync.add_item(product("b", 10), 1).await.unwrap();

        h.sync.update_quantity(&id("a"), quantity).await.unwrap();

        assert_eq!(h.quantity("a"), None, "quantity {quantity}");
        assert_eq!(h.quantity("b"), Some(1));
        assert!(!h.local.snapshot().await.unwrap().contains(&id("a")));
    }
}

#[tokio::test]
async fn test_totals_follow_every_mutation() {
    let h = Harness::new();
    h.sync.initialize(AuthState::guest()).await;

    h.sync
        .add_item(
            pharmacart_core::ProductSnapshot::new("a", "Syrup", Decimal::new(1999, 2)),
            2,
        )
        .await
        .unwrap();
    h.sync.add_item(product("b", 5), 3).await.unwrap();
    assert_eq!(h.sync.total_item_count(), 5);
    assert_eq!(h.sync.total_price(), Decimal::new(5498, 2));

    h.sync.decrement(&id("b")).await.unwrap();
    assert_eq!(h.sync.total_item_count(), 4);
    assert_eq!(h.sync.total_price(), Decimal::new(4998, 2));

    h.sync.remove_item(&id("a")).await.unwrap();
    assert_eq!(h.sync.total_item_count(), 2);
    assert_eq!(h.sync.total_price(), Decimal::from(10));
}

#[tokio::test]
async fn test_increment_and_decrement() {
    let h = Harness::new();
    h.sync.initialize(AuthState::guest()).await;
    h.sync.add_item(product("a", 10), 1).await.unwrap();

    h.sync.increment(&id("a")).await.unwrap();
    assert_eq!(h.quantity("a"), Some(2));

    h.sync.decrement(&id("a")).await.unwrap();
    h.sync.decrement(&id("a")).await.unwrap();
    assert_eq!(h.quantity("a"), Some(1), "decrement never goes below one");

    // Unknown products are ignored
    h.sync.increment(&id("zzz")).await.unwrap();
    h.sync.decrement(&id("zzz")).await.unwrap();
    assert_eq!(h.sync.state().lines().len(), 1);
}

#[tokio::test]
async fn test_guest_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart.json");

    let first = CartSynchronizer::new(
        Arc::new(FakeRemote::new()),
        Arc::new(FileStore::new(&path)),
        SyncConfig::default(),
    );
    first.initialize(AuthState::guest()).await;
    first.add_item(product("a", 25), 2).await.unwrap();
    first.add_item(product("b", 40), 1).await.unwrap();
    let before = first.state().cart;
    drop(first);

    let second = CartSynchronizer::new(
        Arc::new(FakeRemote::new()),
        Arc::new(FileStore::new(&path)),
        SyncConfig::default(),
    );
    second.initialize(AuthState::guest()).await;

    assert_eq!(second.state().cart, before);
    assert_eq!(second.total_price(), Decimal::from(90));
}

#[tokio::test]
async fn test_zero_quantity_add_is_rejected() {
    let h = Harness::new();
    h.sync.initialize(AuthState::guest()).await;

    let err = h.sync.add_item(product("a", 10), 0).await.unwrap_err();

    assert!(err.is_validation());
    assert!(h.sync.state().lines().is_empty());
    assert!(h.local.snapshot().await.is_none());
}

#[tokio::test]
async fn test_storage_failure_keeps_in_memory_cart() {
    let sync = CartSynchronizer::new(
        Arc::new(FakeRemote::new()),
        Arc::new(BrokenStore),
        SyncConfig::default(),
    );

    // Unreadable storage loads as an empty cart with an error
    sync.initialize(AuthState::guest()).await;
    assert!(sync.state().last_error.is_some());

    sync.add_item(product("a", 10), 2).await.unwrap();

    let state = sync.state();
    assert_eq!(state.lines().len(), 1);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_initialize_is_idempotent_for_same_auth() {
    let h = Harness::with(
        FakeRemote::new(),
        MemoryStore::with_cart(pharmacart_integration_tests::guest_cart(&[("a", 1)])),
        SyncConfig::default(),
    );

    assert!(h.sync.initialize(AuthState::guest()).await.is_none());
    assert_eq!(h.quantity("a"), Some(1));

    // A change made behind the synchronizer's back is not picked up
    h.local.remove_cart().await.unwrap();
    assert!(h.sync.initialize(AuthState::guest()).await.is_none());
    assert_eq!(h.quantity("a"), Some(1));

    // reload() forces it
    h.sync.reload().await;
    assert!(h.sync.state().lines().is_empty());
}

#[tokio::test]
async fn test_guest_clear_empties_memory_and_storage() {
    let h = Harness::new();
    h.sync.initialize(AuthState::guest()).await;
    h.sync.add_item(product("a", 10), 3).await.unwrap();

    h.sync.clear().await.unwrap();

    assert!(h.sync.state().lines().is_empty());
    assert!(h.local.snapshot().await.unwrap().is_empty());
}

// =============================================================================
// Signed-In Cart Tests
// =============================================================================

#[tokio::test]
async fn test_signed_in_add_goes_to_remote_and_reloads() {
    let h = Harness::new();
    h.remote.stock(product("a", 30)).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;

    h.sync.add_item(product("a", 30), 2).await.unwrap();

    assert_eq!(h.remote.quantity("a").await, Some(2));
    assert_eq!(h.quantity("a"), Some(2));
    assert_eq!(
        h.sync.state().lines()[0].subtotal,
        Some(Decimal::from(60)),
        "lines come from the backend reload"
    );
    assert!(h.local.snapshot().await.is_none(), "guest storage untouched");
}

#[tokio::test]
async fn test_signed_in_update_and_remove() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 1).await;
    h.remote.seed(product("b", 10), 4).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;

    h.sync.increment(&id("a")).await.unwrap();
    h.sync.update_quantity(&id("b"), -3).await.unwrap();

    assert_eq!(h.remote.quantity("a").await, Some(2));
    assert_eq!(h.remote.quantity("b").await, None);
    assert_eq!(
        h.remote.mutations().await,
        vec![
            RemoteCall::Update {
                product_id: id("a"),
                quantity: 2
            },
            RemoteCall::Remove { product_id: id("b") },
        ]
    );
    assert_eq!(h.sync.total_item_count(), 2);
}

#[tokio::test]
async fn test_failed_remote_remove_leaves_lines_unchanged() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 2).await;
    h.remote.seed(product("b", 10), 1).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;
    let before = h.sync.state().cart;

    h.remote.reject("a").await;
    let err = h.sync.remove_item(&id("a")).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "Remote cart error: Validation error: Insufficient stock"
    );
    let state = h.sync.state();
    assert_eq!(state.cart, before);
    assert_eq!(state.last_error.as_deref(), Some(err.to_string().as_str()));
}

#[tokio::test]
async fn test_last_error_cleared_by_next_command() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 1).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;

    h.remote.set_offline(true).await;
    let err = h.sync.increment(&id("a")).await.unwrap_err();
    assert!(err.is_network());
    assert!(h.sync.state().last_error.is_some());

    h.remote.set_offline(false).await;
    h.sync.increment(&id("a")).await.unwrap();
    assert!(h.sync.state().last_error.is_none());
    assert_eq!(h.quantity("a"), Some(2));
}

#[tokio::test]
async fn test_clear_empties_even_when_remote_fails() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 2).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;
    assert_eq!(h.sync.total_item_count(), 2);

    h.remote.set_offline(true).await;
    let err = h.sync.clear().await.unwrap_err();

    assert!(err.is_network());
    assert!(h.sync.state().lines().is_empty());
    assert!(h.local.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_resets_locally_before_remote_answers() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 2).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;
    assert_eq!(h.sync.total_item_count(), 2);

    h.remote.set_delay(Some(Duration::from_millis(500))).await;
    let mut rx = h.sync.subscribe();
    let sync = h.sync.clone();
    let clearing = tokio::spawn(async move { sync.clear().await });

    tokio::time::timeout(
        Duration::from_millis(200),
        rx.wait_for(|state| state.cart.is_empty()),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!clearing.is_finished(), "remote clear still in flight");
    assert!(h.local.snapshot().await.unwrap().is_empty());

    clearing.await.unwrap().unwrap();
    assert!(h.remote.cart().await.is_empty());
}

#[tokio::test]
async fn test_slow_remote_times_out() {
    let config = SyncConfig {
        request_timeout: Duration::from_millis(50),
        ..SyncConfig::default()
    };
    let h = Harness::with(FakeRemote::new(), MemoryStore::new(), config);
    h.remote.stock(product("a", 10)).await;
    h.sync.initialize(signed_in()).await.unwrap().join().await;

    h.remote.set_delay(Some(Duration::from_millis(500))).await;
    let err = h.sync.add_item(product("a", 10), 1).await.unwrap_err();

    assert!(matches!(err, CartError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(err.is_network());
    assert!(h.sync.state().lines().is_empty());
}

#[tokio::test]
async fn test_signed_in_load_failure_leaves_empty_cart() {
    let h = Harness::new();
    h.remote.seed(product("a", 10), 2).await;
    h.remote.set_offline(true).await;

    h.sync.initialize(signed_in()).await.unwrap().join().await;

    let state = h.sync.state();
    assert!(state.lines().is_empty());
    assert!(!state.is_busy);
    assert!(state.last_error.unwrap().contains("connection refused"));
}

// =============================================================================
// State Subscription Tests
// =============================================================================

#[tokio::test]
async fn test_subscribers_see_changes() {
    let h = Harness::new();
    let mut rx = h.sync.subscribe();
    h.sync.initialize(AuthState::guest()).await;
    rx.borrow_and_update();

    h.sync.add_item(product("a", 10), 2).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.lines().len(), 1);
    assert_eq!(state.lines()[0].quantity, 2);
    assert!(!state.is_busy);
}

#[tokio::test]
async fn test_busy_while_loading() {
    let h = Harness::new();
    h.remote.set_delay(Some(Duration::from_millis(100))).await;

    let sync = h.sync.clone();
    let task = tokio::spawn(async move { sync.initialize(signed_in()).await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.sync.state().is_busy);

    task.await.unwrap().unwrap().join().await;
    assert!(!h.sync.state().is_busy);
}
