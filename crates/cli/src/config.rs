//! Configuration loading from permbench.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use policy::{Permission, PermissionSet};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Report storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Runner configuration.
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Time budget per case body, in milliseconds. `0` disables the budget.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Permissions any case may be granted.
    ///
    /// Empty by default, so no body of the permission family is entered.
    #[serde(default)]
    pub ceiling: Vec<Permission>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            ceiling: Vec::new(),
        }
    }
}

/// Report storage configuration.
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Database path. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    harness::DEFAULT_TIMEOUT.as_millis() as u64
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl RunnerConfig {
    pub fn ceiling(&self) -> PermissionSet {
        PermissionSet::from_overrides(self.ceiling.iter().map(|p| (*p, true)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.runner.timeout(), Some(harness::DEFAULT_TIMEOUT));
        assert!(config.runner.ceiling().is_empty());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_parse_runner_section() {
        let toml = r#"
[runner]
timeout_ms = 0
ceiling = ["read", "hrtime"]

[storage]
path = "/tmp/permbench.db"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.runner.timeout(), None);
        let ceiling = config.runner.ceiling();
        assert!(ceiling.is_granted(Permission::Read));
        assert!(ceiling.is_granted(Permission::Hrtime));
        assert!(!ceiling.is_granted(Permission::Net));
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("/tmp/permbench.db"))
        );
    }

    #[test]
    fn test_unknown_permission_in_ceiling() {
        let err = Config::parse("[runner]\nceiling = [\"sys\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
