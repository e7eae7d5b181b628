//! Convenience re-exports.

pub use crate::device::FakeDevice;
pub use crate::must::{must, must_err, must_some};
pub use crate::store::MemoryStore;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
