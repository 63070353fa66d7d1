//! Bounded task pool
//!
//! Every submission is spawned right away and waits for a semaphore permit
//! before running, so submitting never blocks the caller. Closing the pool
//! stops queued tasks from ever starting; running tasks are left alone.

use futures::future::BoxFuture;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use super::outcome::TaskError;

/// Handle to a scheduled task
pub type TaskHandle<T> = JoinHandle<Result<T, TaskError>>;

/// Worker set private to one run
pub struct TaskPool {
    permits: Arc<Semaphore>,
    workers: usize,
    label: Arc<str>,
    logging: bool,
}

impl TaskPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            label: Arc::from("task"),
            logging: true,
        }
    }

    pub fn with_label(mut self, label: impl AsRef<str>) -> Self {
        self.label = Arc::from(label.as_ref());
        self
    }

    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Schedule `work` onto the pool
    ///
    /// `describe` is the rendered argument list used in log events.
    pub fn submit<T>(
        &self,
        index: usize,
        describe: String,
        work: BoxFuture<'static, anyhow::Result<T>>,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        let label = self.label.clone();
        let logging = self.logging;

        tokio::spawn(async move {
            // A closed pool means the run has already returned
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TaskError::Cancelled)?;

            if logging {
                debug!("[worker {}] {}{}", index, label, describe);
            }

            let result = work.await.map_err(TaskError::Failed);

            if logging {
                debug!("[worker {}] Done.", index);
            }

            result
        })
    }

    /// Stop scheduling: queued tasks will never run
    ///
    /// Tasks that already hold a permit keep running detached from the caller.
    pub fn close(&self) {
        self.permits.close();
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.permits.close();
    }
}

/// Map a join failure onto a task error
pub fn join_error(err: JoinError) -> TaskError {
    if err.is_panic() {
        TaskError::Panicked(panic_message(err.into_panic()))
    } else {
        TaskError::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
