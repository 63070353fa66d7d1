//! Parallel task runner
//!
//! Fans a batch of inputs out over a bounded worker pool with a shared,
//! fail-fast timeout budget, and reports one outcome per input in input order.
//!
//! Tasks that are still running when the budget runs out are not interrupted;
//! they are detached and may finish in the background after the run returns.
//! Tasks still queued for a worker at that point never start.

mod args;
mod budget;
mod config;
mod outcome;
mod parallel;
mod pool;

pub use args::{Args, ArgsError};
pub use budget::{WaitBudget, GRACE_PERIOD};
pub use config::{RunConfig, UnpackMode, DEFAULT_TIMEOUT};
pub use outcome::{aggregate, AggregateFailure, FailedInput, RunError, RunSummary, TaskError, TaskOutcome};
pub use parallel::ParallelExecutor;
pub use pool::{TaskHandle, TaskPool};
