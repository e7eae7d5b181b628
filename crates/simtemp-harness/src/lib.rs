//! Verification harness for the simtemp simulated temperature device.
//!
//! The device exposes two surfaces:
//!
//! - a parameter namespace (one sysfs attribute per setting), driven through
//!   [`ParameterStore`] and [`ConfigurationPlan`];
//! - a telemetry character device yielding 16-byte sample records, read with
//!   [`TelemetryStream`] and waited on with [`waiter::wait`].
//!
//! [`ScenarioRunner`] combines both into the built-in end-to-end checks.
//!
//! Everything here is blocking; callers that need cancellation run the
//! harness on a worker thread and use the cancel flag accepted by
//! [`TelemetryStream::read_until`].

pub mod config;
pub mod device_config;
pub mod error;
pub mod plan;
pub mod scenario;
pub mod store;
pub mod stream;
pub mod waiter;
pub mod waveform;

pub use config::{HarnessConfig, ScenarioBudgets};
pub use device_config::DeviceConfig;
pub use error::{
    ConfigError, ErrorSeverity, HarnessError, OpenError, ReadError, StoreError, ValidationError,
    WaitError,
};
pub use plan::{
    ApplyReport, ConfigurationPlan, MalformedAssignment, Mismatch, ParamOutcome, apply,
};
pub use scenario::{
    CheckOutcome, RunReport, ScenarioKind, ScenarioResult, ScenarioRunner, UnknownScenario,
};
pub use store::{DEFAULT_SYSFS_ROOT, ParameterStore, SysfsStore};
pub use stream::{
    DEFAULT_DEVICE_PATH, DevicePath, LoopEnd, LoopSummary, TelemetrySource, TelemetryStream,
};
pub use waiter::Signals;
pub use waveform::{RampModel, Simulation, SimulatedReading, ThresholdTracker, first_crossing_ms};

/// Re-export of the wire protocol crate.
pub use simtemp_protocol as protocol;
