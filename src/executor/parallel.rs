//! Parallel batch execution
//!
//! Fans a batch of inputs out over a bounded [`TaskPool`], harvests results
//! in input order under a shared [`WaitBudget`], and applies the error policy.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::args::Args;
use super::budget::WaitBudget;
use super::config::RunConfig;
use super::outcome::{aggregate, RunError, TaskError, TaskOutcome};
use super::pool::{join_error, TaskPool};

/// Parallel executor for one run configuration
pub struct ParallelExecutor {
    config: RunConfig,
}

impl ParallelExecutor {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run an async operation over every input and return all outcomes
    ///
    /// Never fails as a whole: timeouts and operation errors are recorded
    /// per input. The operation is only called inside its pool task once a
    /// worker is free, so everything it does counts against the worker cap
    /// and the budget, and a panic fails that input alone.
    pub async fn run_all<F, Fut, T>(&self, operation: F) -> Vec<TaskOutcome<'_, T>>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let operation = Arc::new(operation);
        self.execute(|args| {
            let operation = operation.clone();
            async move { (*operation)(args).await }.boxed()
        })
        .await
    }

    /// Run an async operation and fail the batch if any input failed
    ///
    /// Returns the unwrapped values in input order. Any timeout yields
    /// [`RunError::Timeout`]; otherwise any failure yields
    /// [`RunError::Aggregate`].
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<Vec<T>, RunError>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        aggregate(self.run_all(operation).await)
    }

    /// Like [`run_all`](Self::run_all) for operations that block a thread
    pub async fn run_blocking_all<F, T>(&self, operation: F) -> Vec<TaskOutcome<'_, T>>
    where
        F: Fn(Args) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let operation = Arc::new(operation);
        self.execute(|args| {
            let operation = operation.clone();
            async move {
                match tokio::task::spawn_blocking(move || (*operation)(args)).await {
                    Ok(result) => result,
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    Err(err) => Err(anyhow::Error::new(err)),
                }
            }
            .boxed()
        })
        .await
    }

    /// Like [`run`](Self::run) for operations that block a thread
    pub async fn run_blocking<F, T>(&self, operation: F) -> Result<Vec<T>, RunError>
    where
        F: Fn(Args) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        aggregate(self.run_blocking_all(operation).await)
    }

    async fn execute<T, W>(&self, mut work: W) -> Vec<TaskOutcome<'_, T>>
    where
        T: Send + 'static,
        W: FnMut(Args) -> BoxFuture<'static, anyhow::Result<T>>,
    {
        let config = &self.config;
        let inputs = config.inputs();
        let logging = config.logging();

        let pool = TaskPool::new(config.worker_count())
            .with_label(config.label())
            .with_logging(logging);

        if logging {
            info!(
                "Executing in parallel: '{}' on {} input(s) ({} workers, timeout {}ms)",
                config.label(),
                inputs.len(),
                pool.workers(),
                config.timeout().as_millis()
            );
        }

        let handles: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let args = Args::adapt(input, config.unpack_mode());
                let describe = if logging {
                    args.to_string()
                } else {
                    String::new()
                };
                pool.submit(index, describe, work(args))
            })
            .collect();

        let mut budget = WaitBudget::new(config.timeout());
        let mut outcomes = Vec::with_capacity(handles.len());

        for (index, (input, mut handle)) in inputs.iter().zip(handles).enumerate() {
            let waited = budget.current();
            let result = match budget.wait(&mut handle).await {
                Some(Ok(result)) => result,
                Some(Err(err)) => Err(join_error(err)),
                None => {
                    if logging {
                        warn!(
                            "'{}' on {} timed out after {}ms",
                            config.label(),
                            input,
                            waited.as_millis()
                        );
                    }
                    Err(TaskError::Timeout { waited })
                }
            };
            outcomes.push(TaskOutcome {
                index,
                input,
                result,
            });
            // Dropping an unresolved handle detaches the task
        }

        pool.close();

        if logging {
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            debug!(
                "'{}' finished: {}/{} succeeded",
                config.label(),
                outcomes.len() - failed,
                outcomes.len()
            );
        }

        outcomes
    }
}
