//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::AppConfig;
use crate::executor::UnpackMode;
use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./fanout.yaml",
    "./fanout.yml",
    "./.fanout.yaml",
    "~/.config/fanout/config.yaml",
    "~/.fanout.yaml",
];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Named target lists
    #[serde(default)]
    pub groups: Vec<TargetGroup>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            groups: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from `path`, or the first standard location, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::find() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if self.app.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.app.max_workers == Some(0) {
            anyhow::bail!("max_workers must be greater than zero when set");
        }
        if OutputFormat::from_str(&self.app.format).is_none() {
            anyhow::bail!("Unknown output format: {}", self.app.format);
        }
        if LogLevel::from_str(&self.app.log_level).is_none() {
            anyhow::bail!("Unknown log level: {}", self.app.log_level);
        }

        for group in &self.groups {
            if group.targets.is_empty() {
                anyhow::bail!("Target group '{}' has no targets", group.name);
            }
            if self.groups.iter().filter(|g| g.name == group.name).count() > 1 {
                anyhow::bail!("Duplicate target group '{}'", group.name);
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: default_version(),
            app: AppConfig {
                timeout_secs: 30,
                max_workers: Some(8),
                ..AppConfig::default()
            },
            groups: vec![
                TargetGroup::new(
                    "aws-regions",
                    ["us-east-1", "us-west-2", "eu-west-1", "eu-north-1"],
                ),
                TargetGroup::new(
                    "builders",
                    [
                        serde_json::json!({"host": "builder-1.example.com", "port": 22}),
                        serde_json::json!({"host": "builder-2.example.com", "port": 22}),
                    ],
                )
                .with_unpack(UnpackMode::Keyword),
            ],
        }
    }

    /// Get target group by name
    pub fn group(&self, name: &str) -> Option<&TargetGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Named list of task inputs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub name: String,
    pub targets: Vec<Value>,
    /// Unpacking that suits the targets' shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpack: Option<UnpackMode>,
}

impl TargetGroup {
    pub fn new<I: Into<Value>>(name: impl Into<String>, targets: impl IntoIterator<Item = I>) -> Self {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            unpack: None,
        }
    }

    pub fn with_unpack(mut self, unpack: UnpackMode) -> Self {
        self.unpack = Some(unpack);
        self
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fanout.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app, config.app);
        assert_eq!(loaded.groups, config.groups);
    }

    #[test]
    fn test_config_file_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fanout.json");

        ConfigFile::example().save(&path).unwrap();
        let loaded = ConfigFile::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.app.max_workers, Some(8));
    }

    #[test]
    fn test_group_lookup() {
        let config = ConfigFile::example();
        let builders = config.group("builders").unwrap();
        assert_eq!(builders.targets.len(), 2);
        assert_eq!(builders.unpack, Some(UnpackMode::Keyword));
        assert!(config.group("gce-zones").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ConfigFile::default();
        config.app.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.groups.push(TargetGroup::new("empty", Vec::<Value>::new()));
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.version = "2.0".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
