//! Error types for simtempctl

use simtemp_harness::{ConfigError, ErrorSeverity, HarnessError, OpenError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Device not found: {0}. Is the module loaded?")]
    DeviceNotFound(String),

    #[error("Parameter namespace not found: {0}. Is the module loaded?")]
    NamespaceNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{failed} of {total} parameter writes failed")]
    ApplyFailed { failed: usize, total: usize },

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Map an open failure to the actionable variant.
    pub fn from_open(err: OpenError) -> Self {
        match err {
            OpenError::NotFound(path) => CliError::DeviceNotFound(path.display().to_string()),
            OpenError::PermissionDenied(path) => {
                CliError::PermissionDenied(path.display().to_string())
            }
            other => CliError::Harness(other.into()),
        }
    }

    /// Severity reported in the JSON error document.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CliError::Harness(e) => e.severity(),
            CliError::DeviceNotFound(_)
            | CliError::NamespaceNotFound(_)
            | CliError::PermissionDenied(_) => ErrorSeverity::Critical,
            CliError::ScenariosFailed { .. } | CliError::ApplyFailed { .. } => {
                ErrorSeverity::Warning
            }
            CliError::InvalidInput(_) | CliError::Config(_) | CliError::JsonError(_) => {
                ErrorSeverity::Error
            }
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::DeviceNotFound(_) | CliError::NamespaceNotFound(_) => 2,
            CliError::InvalidInput(_) | CliError::Config(_) | CliError::JsonError(_) => 4,
            CliError::PermissionDenied(_) => 6,
            CliError::ScenariosFailed { .. } => 7,
            CliError::Harness(e) if e.is_not_found() => 2,
            CliError::Harness(e) if e.is_permission_denied() => 6,
            CliError::Harness(HarnessError::Validation(_) | HarnessError::Config(_)) => 4,
            CliError::Harness(_) | CliError::ApplyFailed { .. } => 1,
        }
    }
}
