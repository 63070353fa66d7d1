//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::AppConfig;
use crate::executor::UnpackMode;

/// Environment variable prefix
const ENV_PREFIX: &str = "FANOUT";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Timeout from FANOUT_TIMEOUT
    pub timeout: Option<u64>,
    /// Worker cap from FANOUT_WORKERS
    pub workers: Option<usize>,
    /// Unpack mode from FANOUT_UNPACK
    pub unpack: Option<UnpackMode>,
    /// Output format from FANOUT_FORMAT
    pub format: Option<String>,
    /// Log level from FANOUT_LOG
    pub log_level: Option<String>,
    /// Default probe port from FANOUT_PORT
    pub port: Option<u16>,
    /// Config file from FANOUT_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            timeout: get_env_parse("TIMEOUT"),
            workers: get_env_parse("WORKERS"),
            unpack: get_env("UNPACK").and_then(|v| UnpackMode::from_str(&v)),
            format: get_env("FORMAT"),
            log_level: get_env("LOG"),
            port: get_env_parse("PORT"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.workers.is_some()
            || self.unpack.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.port.is_some()
            || self.config_file.is_some()
    }

    /// Override `config` with every variable that is set
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if let Some(unpack) = self.unpack {
            config.unpack = unpack;
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(port) = self.port {
            config.default_port = port;
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TIMEOUT:  {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_WORKERS:  {:?}", ENV_PREFIX, self.workers);
        println!("  {}_UNPACK:   {:?}", ENV_PREFIX, self.unpack);
        println!("  {}_FORMAT:   {:?}", ENV_PREFIX, self.format);
        println!("  {}_LOG:      {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_PORT:     {:?}", ENV_PREFIX, self.port);
        println!("  {}_CONFIG:   {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_TIMEOUT"), timeout.to_string()));
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_WORKERS"), workers.to_string()));
        self
    }

    pub fn unpack(mut self, unpack: UnpackMode) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_UNPACK"), unpack.to_string()));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_FORMAT"), format.into()));
        self
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all FANOUT environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_TIMEOUT   Shared batch timeout in seconds");
    println!("  {ENV_PREFIX}_WORKERS   Maximum concurrent operations");
    println!("  {ENV_PREFIX}_UNPACK    Argument unpacking (none, positional, keyword)");
    println!("  {ENV_PREFIX}_FORMAT    Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_LOG       Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_PORT      Default port for probe targets");
    println!("  {ENV_PREFIX}_CONFIG    Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_WORKERS=8");
    println!("  fanout probe 10.0.0.1 10.0.0.2:9042");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.timeout.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_builder_overrides_config() {
        let _guard = EnvBuilder::new()
            .timeout(60)
            .workers(3)
            .unpack(UnpackMode::Positional)
            .format("json")
            .apply_scoped();

        let env_config = EnvConfig::load();
        assert!(env_config.has_any());
        assert_eq!(env_config.timeout, Some(60));

        let mut config = AppConfig::default();
        env_config.apply_to(&mut config);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_workers, Some(3));
        assert_eq!(config.unpack, UnpackMode::Positional);
        assert_eq!(config.format, "json");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_apply_without_vars_keeps_config() {
        let mut config = AppConfig::default();
        EnvConfig::default().apply_to(&mut config);
        assert_eq!(config, AppConfig::default());
    }
}
