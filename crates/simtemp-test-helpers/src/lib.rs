//! Shared test utilities for the simtemp harness.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with `#[track_caller]`
//! - [`store`] - In-memory [`ParameterStore`](simtemp_harness::ParameterStore)
//! - [`device`] - Socket-pair backed fake telemetry device
//! - [`prelude`] - Convenience re-exports
//!
//! Add it as a dev-dependency and import the prelude:
//!
//! ```rust,ignore
//! use simtemp_test_helpers::prelude::*;
//! ```

pub mod device;
pub mod must;
pub mod prelude;
pub mod store;

pub use device::FakeDevice;
pub use must::*;
pub use store::MemoryStore;
