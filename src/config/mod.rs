//! Configuration module
//!
//! Defaults for runs started from the command line, loaded from a config
//! file and overridden by `FANOUT_*` environment variables.

mod env;
mod file;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard};
pub use file::{ConfigFile, TargetGroup};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::executor::UnpackMode;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared timeout for a batch in seconds
    pub timeout_secs: u64,

    /// Maximum concurrent operations (unbounded when unset)
    pub max_workers: Option<usize>,

    /// Default argument unpacking
    pub unpack: UnpackMode,

    /// Output format (table, json, json-pretty, csv, summary)
    pub format: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Probe connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Port probed when a target names only a host
    pub default_port: u16,

    /// Shell used by `exec`
    pub shell: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 6,
            max_workers: None,
            unpack: UnpackMode::None,
            format: "table".to_string(),
            log_level: "info".to_string(),
            connect_timeout_ms: 1000,
            default_port: 22,
            shell: "sh".to_string(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(6));
        assert_eq!(config.max_workers, None);
        assert_eq!(config.unpack, UnpackMode::None);
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("timeout_secs: 30\nunpack: keyword\n").unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.unpack, UnpackMode::Keyword);
        assert_eq!(config.format, "table");
    }
}
