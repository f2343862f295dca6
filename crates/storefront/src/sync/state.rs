//! Read model and tuning knobs for the cart synchronizer.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pharmacart_core::{Cart, CartLine};

/// Snapshot of the synchronizer's state, published to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// The current cart (guest or account, depending on auth state).
    pub cart: Cart,
    /// A load or merge is in flight. Drives loading indicators only.
    pub is_busy: bool,
    /// Message of the last failed operation, cleared when a new one starts.
    pub last_error: Option<String>,
}

impl CartState {
    /// The cart lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }
}

/// What happens to the guest cart after a login-triggered merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationPolicy {
    /// Delete the guest cart once every merge request has settled, even if
    /// some of them failed. Failed lines are lost.
    #[default]
    ClearAll,
    /// Delete only the lines the backend confirmed; failed lines stay in the
    /// guest cart and are merged again on the next login.
    RetainFailed,
}

impl MigrationPolicy {
    /// Configuration spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClearAll => "clear-all",
            Self::RetainFailed => "retain-failed",
        }
    }
}

impl fmt::Display for MigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear-all" | "clear_all" => Ok(Self::ClearAll),
            "retain-failed" | "retain_failed" => Ok(Self::RetainFailed),
            other => Err(format!(
                "unknown migration policy '{other}' (expected clear-all or retain-failed)"
            )),
        }
    }
}

/// Synchronizer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound for foreground remote calls and reloads.
    pub request_timeout: Duration,
    /// Upper bound for each call made by the background merge.
    pub migration_timeout: Duration,
    /// Guest cart cleanup after a merge.
    pub migration_policy: MigrationPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(8),
            migration_timeout: Duration::from_secs(5),
            migration_policy: MigrationPolicy::ClearAll,
        }
    }
}
