//! Background merge of the guest cart into the account cart.
//!
//! Triggered by a guest to signed-in transition. Runs detached from the
//! foreground load and never surfaces errors to the caller; per-line
//! failures are logged and reported through [`MigrationReport`].

use std::collections::HashMap;

use futures::future::join_all;
use pharmacart_core::{AccessToken, Cart, ProductId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CartSynchronizer, MigrationPolicy, bounded};
use crate::error::{self, add_breadcrumb};

/// One request needed to fold a guest line into the account cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStep {
    pub product_id: ProductId,
    pub action: MergeAction,
}

/// Remote call issued for a [`MergeStep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// The account already has the product: set its quantity to the sum.
    Update { quantity: u32 },
    /// The account lacks the product: add the guest quantity.
    Add { quantity: u32 },
}

/// Plan the requests that merge `guest` into `account`.
///
/// Quantities are summed for products present on both sides. Steps follow
/// guest cart order.
#[must_use]
pub fn plan_merge(guest: &Cart, account: &Cart) -> Vec<MergeStep> {
    let existing: HashMap<&ProductId, u32> = account
        .lines()
        .iter()
        .map(|line| (line.id(), line.quantity))
        .collect();

    guest
        .lines()
        .iter()
        .map(|line| {
            let action = match existing.get(line.id()) {
                Some(&remote) => MergeAction::Update {
                    quantity: remote.saturating_add(line.quantity),
                },
                None => MergeAction::Add {
                    quantity: line.quantity,
                },
            };
            MergeStep {
                product_id: line.id().clone(),
                action,
            }
        })
        .collect()
}

/// Outcome of a guest cart merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Products the backend accepted.
    pub merged: Vec<ProductId>,
    /// Products whose merge request failed or timed out.
    pub failed: Vec<ProductId>,
    /// There was no guest cart, so nothing was sent.
    pub skipped: bool,
    /// Auth changed before the merge finished; its reload was discarded.
    pub superseded: bool,
}

impl MigrationReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Every merge request succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handle to a running merge.
///
/// Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct MigrationHandle {
    task: JoinHandle<MigrationReport>,
}

impl MigrationHandle {
    /// Wait for the merge to finish.
    ///
    /// Returns `None` if the task panicked or was cancelled by runtime shutdown.
    pub async fn join(self) -> Option<MigrationReport> {
        match self.task.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Cart migration task did not complete");
                None
            }
        }
    }

    /// Whether the merge has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl CartSynchronizer {
    pub(super) fn spawn_migration(
        &self,
        token: AccessToken,
        generation: u64,
        foreground_loaded: oneshot::Receiver<()>,
    ) -> MigrationHandle {
        let this = self.clone();
        let task = tokio::spawn(async move {
            this.migrate(&token, generation, foreground_loaded).await
        });
        MigrationHandle { task }
    }

    #[tracing::instrument(name = "cart_migration", skip_all, fields(generation = generation))]
    async fn migrate(
        &self,
        token: &AccessToken,
        generation: u64,
        foreground_loaded: oneshot::Receiver<()>,
    ) -> MigrationReport {
        let guest = match self.inner.local.read_cart().await {
            Ok(Some(cart)) if !cart.is_empty() => cart,
            Ok(_) => {
                debug!("No guest cart to migrate");
                return MigrationReport::skipped();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart for migration");
                return MigrationReport::skipped();
            }
        };

        let limit = self.inner.config.migration_timeout;
        info!(lines = guest.len(), "Merging guest cart into account cart");
        add_breadcrumb("cart", "Guest cart migration started", None);

        // An unreadable account cart is merged into as if it were empty.
        let account = match bounded(limit, self.inner.remote.fetch_cart(token)).await {
            Ok(lines) => Cart::from(lines),
            Err(e) => {
                warn!(error = %e, "Failed to fetch account cart before merge");
                Cart::new()
            }
        };

        let steps = plan_merge(&guest, &account);
        let outcomes = join_all(steps.into_iter().map(|step| async move {
            let result = self.apply_step(token, &step).await;
            (step.product_id, result)
        }))
        .await;

        let mut report = MigrationReport::default();
        for (product_id, result) in outcomes {
            match result {
                Ok(()) => report.merged.push(product_id),
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "Failed to merge guest cart line");
                    add_breadcrumb(
                        "cart",
                        "Guest cart line merge failed",
                        Some(&[("product_id", product_id.as_str())]),
                    );
                    report.failed.push(product_id);
                }
            }
        }

        self.discard_guest_cart(&report).await;

        // The foreground load of the same login must land first, or its
        // pre-merge snapshot would overwrite the merged cart.
        let _ = foreground_loaded.await;

        let reloaded = bounded(
            self.inner.config.request_timeout,
            self.inner.remote.fetch_cart(token),
        )
        .await
        .map(Cart::from);
        report.superseded = !self.apply_load(generation, reloaded).await;

        info!(
            merged = report.merged.len(),
            failed = report.failed.len(),
            superseded = report.superseded,
            "Guest cart migration finished"
        );
        report
    }

    async fn apply_step(&self, token: &AccessToken, step: &MergeStep) -> error::Result<()> {
        let limit = self.inner.config.migration_timeout;
        let remote = &self.inner.remote;
        match step.action {
            MergeAction::Update { quantity } => {
                bounded(limit, remote.update_line(token, &step.product_id, quantity)).await
            }
            MergeAction::Add { quantity } => {
                bounded(limit, remote.add_line(token, &step.product_id, quantity)).await
            }
        }
    }

    async fn discard_guest_cart(&self, report: &MigrationReport) {
        let local = &self.inner.local;
        let result = match self.inner.config.migration_policy {
            MigrationPolicy::RetainFailed if !report.failed.is_empty() => {
                match local.read_cart().await {
                    Ok(Some(mut cart)) => {
                        for product_id in &report.merged {
                            cart.remove(product_id);
                        }
                        if cart.is_empty() {
                            local.remove_cart().await
                        } else {
                            local.write_cart(&cart).await
                        }
                    }
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MigrationPolicy::ClearAll | MigrationPolicy::RetainFailed => {
                local.remove_cart().await
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to clear guest cart after merge");
        }
    }
}

#[cfg(test)]
mod tests {
    use pharmacart_core::ProductSnapshot;
    use rust_decimal::Decimal;

    use super::*;

    fn cart(lines: &[(&str, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(id, quantity) in lines {
            cart.add(ProductSnapshot::new(id, id, Decimal::ONE), quantity);
        }
        cart
    }

    #[test]
    fn test_plan_merge_sums_shared_and_adds_new() {
        let guest = cart(&[("a", 2), ("b", 1)]);
        let account = cart(&[("a", 3), ("c", 4)]);

        assert_eq!(
            plan_merge(&guest, &account),
            vec![
                MergeStep {
                    product_id: ProductId::new("a"),
                    action: MergeAction::Update { quantity: 5 },
                },
                MergeStep {
                    product_id: ProductId::new("b"),
                    action: MergeAction::Add { quantity: 1 },
                },
            ]
        );
    }

    #[test]
    fn test_plan_merge_into_empty_account_adds_everything() {
        let steps = plan_merge(&cart(&[("x", 7)]), &Cart::new());
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, MergeAction::Add { quantity: 7 });
    }

    #[test]
    fn test_plan_merge_saturates() {
        let steps = plan_merge(&cart(&[("a", u32::MAX)]), &cart(&[("a", 5)]));
        assert_eq!(steps[0].action, MergeAction::Update { quantity: u32::MAX });
    }

    #[test]
    fn test_plan_merge_empty_guest() {
        assert!(plan_merge(&Cart::new(), &cart(&[("a", 1)])).is_empty());
    }
}
