//! Error taxonomy for the harness.
//!
//! Every component returns its own typed error. [`HarnessError`] wraps all of
//! them for callers (the CLI) that only need to classify and report.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use simtemp_protocol::{FramingError, Parameter};

/// Parameter store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The attribute does not exist (module not loaded, or unknown name).
    #[error("parameter path not found: {0}")]
    NotFound(String),

    /// The caller may not write the attribute.
    #[error("permission denied for parameter: {0}")]
    PermissionDenied(String),

    /// Any other failure, including the device rejecting the value.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Classify an I/O error raised while touching `path`.
    pub(crate) fn from_io(path: &std::path::Path, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                StoreError::PermissionDenied(path.display().to_string())
            }
            _ => StoreError::Other(format!("{}: {err}", path.display())),
        }
    }
}

/// Failures opening the telemetry channel.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The device node does not exist.
    #[error("device not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The device node exists but may not be opened.
    #[error("permission denied opening device: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Any other open failure.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        /// Device path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl OpenError {
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => OpenError::NotFound(path),
            io::ErrorKind::PermissionDenied => OpenError::PermissionDenied(path),
            _ => OpenError::Io { path, source },
        }
    }
}

/// Failures reading one record.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The deadline passed before a record became available.
    #[error("read deadline expired before a record arrived")]
    Timeout,

    /// The read did not return exactly one record.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// OS-level read failure.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Failures waiting for readiness.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// No requested signal was asserted within the timeout.
    #[error("no readiness signal within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The channel reported hang-up or an error condition.
    #[error("telemetry channel hung up or reported an error")]
    Disconnected,

    /// OS-level poll failure.
    #[error("poll failed: {0}")]
    Io(#[from] io::Error),
}

/// A typed device configuration that the device would refuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Value outside the device's accepted range.
    #[error("{param} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Offending parameter.
        param: Parameter,
        /// Requested value.
        value: i64,
        /// Lowest accepted value.
        min: i64,
        /// Highest accepted value.
        max: i64,
    },

    /// `ramp_min` above `ramp_max`.
    #[error("ramp_min ({min}) must not exceed ramp_max ({max})")]
    InvertedRamp {
        /// Requested lower bound.
        min: i32,
        /// Requested upper bound.
        max: i32,
    },

    /// `threshold_mC - hysteresis_mC` leaves the temperature range.
    #[error(
        "threshold_mC ({threshold}) minus hysteresis_mC ({hysteresis}) leaves the temperature range"
    )]
    HysteresisBand {
        /// Requested threshold.
        threshold: i32,
        /// Requested hysteresis.
        hysteresis: u32,
    },
}

/// Harness configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// YAML syntax or schema error.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax or schema error.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Extension is neither YAML nor JSON.
    #[error("unsupported config format: {} (expected .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// How bad an error is for the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Transient; retrying may succeed.
    Warning,
    /// The operation failed.
    Error,
    /// The device is absent or inaccessible; nothing further can succeed.
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Top-level error wrapping every harness sub-error.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Parameter store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Telemetry open errors
    #[error("Open error: {0}")]
    Open(#[from] OpenError),

    /// Record read errors
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Readiness wait errors
    #[error("Wait error: {0}")]
    Wait(#[from] WaitError),

    /// Device configuration validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Harness configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl HarnessError {
    /// True when the device or its parameter namespace is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HarnessError::Store(StoreError::NotFound(_)) | HarnessError::Open(OpenError::NotFound(_))
        )
    }

    /// True when the caller lacks permission on the device or namespace.
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            HarnessError::Store(StoreError::PermissionDenied(_))
                | HarnessError::Open(OpenError::PermissionDenied(_))
        )
    }

    /// Severity classification.
    pub fn severity(&self) -> ErrorSeverity {
        if self.is_not_found() || self.is_permission_denied() {
            ErrorSeverity::Critical
        } else if self.is_retryable() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }

    /// True when retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarnessError::Read(ReadError::Timeout) | HarnessError::Wait(WaitError::Timeout(_))
        )
    }
}
