//! Task outcomes and batch failures
//!
//! Per-task results are always captured into a [`TaskOutcome`] first; only the
//! aggregator turns them into a batch-level [`RunError`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single task
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("timed out after {}ms", .waited.as_millis())]
    Timeout { waited: Duration },

    #[error("{0:#}")]
    Failed(anyhow::Error),

    #[error("operation panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled before completion")]
    Cancelled,
}

impl TaskError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout { .. })
    }
}

/// Resolved result for one input of a batch
#[derive(Debug)]
pub struct TaskOutcome<'a, T> {
    pub index: usize,
    pub input: &'a Value,
    pub result: Result<T, TaskError>,
}

impl<'a, T> TaskOutcome<'a, T> {
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.result.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_timeout(&self) -> bool {
        self.error().is_some_and(TaskError::is_timeout)
    }

    pub fn into_result(self) -> Result<T, TaskError> {
        self.result
    }
}

/// A failing input paired with its error
#[derive(Debug)]
pub struct FailedInput {
    pub index: usize,
    pub input: Value,
    pub error: TaskError,
}

impl fmt::Display for FailedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.input, self.error)
    }
}

/// Every operation failure of a batch that had no timeouts
#[derive(Debug)]
pub struct AggregateFailure {
    pub failures: Vec<FailedInput>,
}

impl AggregateFailure {
    pub fn inputs(&self) -> Vec<&Value> {
        self.failures.iter().map(|f| &f.input).collect()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task(s) failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

/// Batch-level failure raised by strict runs
#[derive(Error, Debug)]
pub enum RunError {
    #[error("timed out when running on: {}", format_inputs(.inputs))]
    Timeout { inputs: Vec<Value> },

    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),
}

impl RunError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::Timeout { .. })
    }
}

fn format_inputs(inputs: &[Value]) -> String {
    let items: Vec<String> = inputs.iter().map(Value::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Apply the strict error policy to harvested outcomes
///
/// Timeouts take precedence over operation failures, so callers can tell
/// "targets did not respond" apart from "operations raised errors".
pub fn aggregate<T>(outcomes: Vec<TaskOutcome<'_, T>>) -> Result<Vec<T>, RunError> {
    let timed_out: Vec<Value> = outcomes
        .iter()
        .filter(|o| o.is_timeout())
        .map(|o| o.input.clone())
        .collect();
    if !timed_out.is_empty() {
        return Err(RunError::Timeout { inputs: timed_out });
    }

    let mut values = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for outcome in outcomes {
        let (index, input) = (outcome.index, outcome.input);
        match outcome.into_result() {
            Ok(value) => values.push(value),
            Err(error) => failures.push(FailedInput {
                index,
                input: input.clone(),
                error,
            }),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(AggregateFailure { failures }.into())
    }
}

/// Counts and timing of a finished batch
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_outcomes<T>(
        label: impl Into<String>,
        outcomes: &[TaskOutcome<'_, T>],
        duration: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let total = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        let timed_out = outcomes.iter().filter(|o| o.is_timeout()).count();

        Self {
            label: label.into(),
            total,
            succeeded,
            failed: total - succeeded - timed_out,
            timed_out,
            duration_ms: duration.as_millis() as u64,
            started_at,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome<'a>(index: usize, input: &'a Value, result: Result<u32, TaskError>) -> TaskOutcome<'a, u32> {
        TaskOutcome { index, input, result }
    }

    #[test]
    fn test_aggregate_all_ok() {
        let inputs = [json!(1), json!(2)];
        let outcomes = vec![outcome(0, &inputs[0], Ok(10)), outcome(1, &inputs[1], Ok(20))];
        assert_eq!(aggregate(outcomes).unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_aggregate_names_only_failing_inputs() {
        let inputs = [json!(1), json!("boom"), json!(3)];
        let outcomes = vec![
            outcome(0, &inputs[0], Ok(1)),
            outcome(1, &inputs[1], Err(TaskError::Failed(anyhow::anyhow!("exploded")))),
            outcome(2, &inputs[2], Ok(3)),
        ];

        let err = aggregate(outcomes).unwrap_err();
        let RunError::Aggregate(failure) = &err else {
            panic!("expected aggregate failure, got {err:?}");
        };
        assert_eq!(failure.failures.len(), 1);
        assert_eq!(failure.failures[0].index, 1);
        assert_eq!(err.to_string(), r#"1 task(s) failed: "boom": exploded"#);
    }

    #[test]
    fn test_aggregate_prefers_timeouts() {
        let inputs = [json!("us-east-1"), json!("eu-west-1"), json!("ap-south-1")];
        let outcomes = vec![
            outcome(0, &inputs[0], Err(TaskError::Failed(anyhow::anyhow!("denied")))),
            outcome(
                1,
                &inputs[1],
                Err(TaskError::Timeout {
                    waited: Duration::from_millis(5),
                }),
            ),
            outcome(2, &inputs[2], Ok(0)),
        ];

        let err = aggregate(outcomes).unwrap_err();
        assert!(err.is_timeout());
        let message = err.to_string();
        assert!(message.contains("eu-west-1"));
        assert!(!message.contains("us-east-1"));
        assert!(!message.contains("ap-south-1"));
    }

    #[test]
    fn test_summary_counts() {
        let inputs = [json!(1), json!(2), json!(3), json!(4)];
        let outcomes = vec![
            outcome(0, &inputs[0], Ok(1)),
            outcome(1, &inputs[1], Err(TaskError::Panicked("bad".into()))),
            outcome(
                2,
                &inputs[2],
                Err(TaskError::Timeout {
                    waited: Duration::from_secs(1),
                }),
            ),
            outcome(3, &inputs[3], Ok(4)),
        ];

        let summary =
            RunSummary::from_outcomes("probe", &outcomes, Duration::from_millis(1500), Utc::now());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.duration_ms, 1500);
        assert_eq!(summary.success_rate(), 50.0);
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError::Timeout {
            waited: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "timed out after 250ms");
        assert!(err.is_timeout());
    }
}
