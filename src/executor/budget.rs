//! Shared wait budget
//!
//! The budget starts at the configured timeout and collapses to a token grace
//! period after the first wait that runs out. It never grows back within a run.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Wait applied to every handle once the budget has collapsed
pub const GRACE_PERIOD: Duration = Duration::from_millis(1);

/// Wait budget for harvesting pending results in submission order
#[derive(Clone, Debug)]
pub struct WaitBudget {
    current: Duration,
    collapsed: bool,
}

impl WaitBudget {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: timeout,
            collapsed: false,
        }
    }

    /// Time the next wait is allowed to take
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Drop to the grace period for all remaining waits
    pub fn collapse(&mut self) {
        self.current = GRACE_PERIOD;
        self.collapsed = true;
    }

    /// Wait for `fut` within the current budget
    ///
    /// Returns `None` and collapses the budget when the wait runs out. An
    /// already-resolved future is always observed, even with the grace period.
    pub async fn wait<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        match timeout(self.current, fut).await {
            Ok(output) => Some(output),
            Err(_) => {
                self.collapse();
                None
            }
        }
    }
}
