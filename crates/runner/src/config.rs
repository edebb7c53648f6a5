//! Runner configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Immutable settings for one [`TestRunner`](crate::TestRunner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Per-step timeout when a step has no `timeout` of its own
    pub default_timeout_ms: u64,

    /// Capture a screenshot when a case or flow fails
    pub screenshot_on_failure: bool,

    /// Where failure, checkpoint and unnamed screenshots go
    pub screenshot_dir: PathBuf,

    /// Platform the run targets (`web`, `ios`, `android`, ...)
    pub platform: String,

    /// Fixed delay after the application reports idle, before a screen test
    pub settle_delay_ms: u64,

    /// Probe interval of `waitForAny`
    pub poll_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5000,
            screenshot_on_failure: true,
            screenshot_dir: PathBuf::from("./screenshots"),
            platform: "web".to_string(),
            settle_delay_ms: 500,
            poll_interval_ms: 100,
        }
    }
}

impl RunnerConfig {
    /// Load from a TOML file, or defaults when the file does not exist
    pub fn load(path: &Path) -> RunnerResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.platform.is_empty() {
            return Err(RunnerError::InvalidConfig("platform must not be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(RunnerError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RunnerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.default_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(&path, "platform = \"ios\"\nsettle_delay_ms = 0\n").unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.platform, "ios");
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.poll_interval_ms, 100);
        assert!(config.screenshot_on_failure);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runner.toml");

        std::fs::write(&path, "poll_interval_ms = 0\n").unwrap();
        assert!(matches!(RunnerConfig::load(&path), Err(RunnerError::InvalidConfig(_))));

        std::fs::write(&path, "platform = [1, 2]\n").unwrap();
        assert!(matches!(RunnerConfig::load(&path), Err(RunnerError::Toml(_))));
    }
}
