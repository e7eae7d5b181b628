//! Harness configuration: device locations and scenario time budgets.
//!
//! Loaded from YAML or JSON chosen by file extension. Every field has a
//! default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::store::DEFAULT_SYSFS_ROOT;
use crate::stream::DEFAULT_DEVICE_PATH;

/// Time budgets the scenarios run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioBudgets {
    /// Overall budget for observing a threshold crossing.
    pub read_budget_ms: u64,
    /// Bound on each individual read inside the threshold budget.
    pub per_read_ms: u64,
    /// Bound on the readiness wait in the poll scenario.
    pub poll_timeout_ms: u64,
    /// Optional bound on the basic single-record read. Unbounded when absent.
    pub basic_read_timeout_ms: Option<u64>,
}

impl Default for ScenarioBudgets {
    fn default() -> Self {
        Self {
            read_budget_ms: 5_000,
            per_read_ms: 250,
            poll_timeout_ms: 10_000,
            basic_read_timeout_ms: None,
        }
    }
}

impl ScenarioBudgets {
    /// [`read_budget_ms`](Self::read_budget_ms) as a duration.
    pub fn read_budget(&self) -> Duration {
        Duration::from_millis(self.read_budget_ms)
    }

    /// [`per_read_ms`](Self::per_read_ms) as a duration.
    pub fn per_read(&self) -> Duration {
        Duration::from_millis(self.per_read_ms)
    }

    /// [`poll_timeout_ms`](Self::poll_timeout_ms) as a duration.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// [`basic_read_timeout_ms`](Self::basic_read_timeout_ms) as a duration.
    pub fn basic_read_timeout(&self) -> Option<Duration> {
        self.basic_read_timeout_ms.map(Duration::from_millis)
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Telemetry device node.
    pub device_path: PathBuf,
    /// Parameter namespace root.
    pub sysfs_root: PathBuf,
    /// Scenario time budgets.
    pub budgets: ScenarioBudgets,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            budgets: ScenarioBudgets::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from `path`; `.yaml`/`.yml` parse as YAML, `.json` as JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedFormat`] for other extensions, otherwise
    /// read or parse failures.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let format = match extension.as_deref() {
            Some("yaml" | "yml") => Format::Yaml,
            Some("json") => Format::Json,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        debug!(path = %path.display(), "harness config loaded");
        Ok(config)
    }

    fn parse(content: &str, format: Format) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        match format {
            Format::Yaml => Ok(serde_yaml::from_str(content)?),
            Format::Json => Ok(serde_json::from_str(content)?),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Yaml,
    Json,
}
