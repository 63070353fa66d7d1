//! Run configuration
//!
//! Immutable description of a single batch invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Default shared timeout for a batch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

/// How a composite input is spread into the operation's arguments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnpackMode {
    /// Pass every input as a single argument
    #[default]
    None,
    /// Spread array inputs as positional arguments
    Positional,
    /// Spread object inputs as named arguments
    Keyword,
}

impl UnpackMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "single" => Some(UnpackMode::None),
            "positional" | "args" => Some(UnpackMode::Positional),
            "keyword" | "kwargs" => Some(UnpackMode::Keyword),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnpackMode::None => "none",
            UnpackMode::Positional => "positional",
            UnpackMode::Keyword => "keyword",
        }
    }
}

impl fmt::Display for UnpackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration of one parallel run
#[derive(Clone, Debug)]
pub struct RunConfig {
    inputs: Vec<Value>,
    timeout: Duration,
    max_workers: Option<usize>,
    unpack_mode: UnpackMode,
    label: String,
    logging: bool,
}

impl RunConfig {
    /// Create a configuration for the given inputs and shared timeout
    pub fn new<I>(inputs: impl IntoIterator<Item = I>, timeout: Duration) -> Self
    where
        I: Into<Value>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            timeout,
            max_workers: None,
            unpack_mode: UnpackMode::None,
            label: "task".to_string(),
            logging: true,
        }
    }

    /// Cap the number of concurrently running operations
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers.max(1));
        self
    }

    pub fn with_unpack_mode(mut self, mode: UnpackMode) -> Self {
        self.unpack_mode = mode;
        self
    }

    /// Name used for the operation in log events
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Disable per-task log events
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_workers(&self) -> Option<usize> {
        self.max_workers
    }

    pub fn unpack_mode(&self) -> UnpackMode {
        self.unpack_mode
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    /// Number of workers the pool will run with (one per input when uncapped)
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or(self.inputs.len()).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new(["us-east-1", "eu-west-1"], DEFAULT_TIMEOUT);
        assert_eq!(config.inputs().len(), 2);
        assert_eq!(config.timeout(), Duration::from_secs(6));
        assert_eq!(config.max_workers(), None);
        assert_eq!(config.unpack_mode(), UnpackMode::None);
        assert!(config.logging());
        assert_eq!(config.worker_count(), 2);
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new(vec![json!([1, 2]), json!([3, 4])], Duration::from_secs(1))
            .with_max_workers(1)
            .with_unpack_mode(UnpackMode::Positional)
            .with_label("add")
            .without_logging();

        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.unpack_mode(), UnpackMode::Positional);
        assert_eq!(config.label(), "add");
        assert!(!config.logging());
    }

    #[test]
    fn test_worker_count_is_never_zero() {
        let empty = RunConfig::new(Vec::<Value>::new(), DEFAULT_TIMEOUT);
        assert_eq!(empty.worker_count(), 1);

        let clamped = RunConfig::new([1, 2, 3], DEFAULT_TIMEOUT).with_max_workers(0);
        assert_eq!(clamped.max_workers(), Some(1));
    }

    #[test]
    fn test_unpack_mode_from_str() {
        assert_eq!(UnpackMode::from_str("none"), Some(UnpackMode::None));
        assert_eq!(UnpackMode::from_str("Positional"), Some(UnpackMode::Positional));
        assert_eq!(UnpackMode::from_str("kwargs"), Some(UnpackMode::Keyword));
        assert_eq!(UnpackMode::from_str("spread"), None);
    }
}
