//! simtemp telemetry protocol: sample records, flag bits, and the parameter vocabulary.
//!
//! This crate is intentionally I/O-free and allocation-free. It provides pure
//! functions and types that can be tested and fuzzed without the kernel module
//! loaded.
//!
//! ## Wire format
//!
//! The character device yields fixed 16-byte records, little-endian:
//!
//! | Offset | Size | Field                 |
//! |--------|------|-----------------------|
//! | 0      | 8    | `timestamp` (u64, ns) |
//! | 8      | 4    | `temperature_milli_c` (i32, m°C) |
//! | 12     | 4    | `flags` (u32 bitfield) |
//!
//! Bit 0 of `flags` is `THRESHOLD_CROSSED`. Any read that is not exactly 16
//! bytes is a framing error.
//!
//! ## Configuration namespace
//!
//! [`Parameter`] enumerates the sysfs attributes the device exposes and
//! [`limits`] carries the ranges the device enforces on writes.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod flags;
pub mod params;
pub mod sample;

pub use flags::SampleFlags;
pub use params::{Mode, Parameter, UnknownMode, UnknownParameter, defaults, limits};
pub use sample::{FramingError, SAMPLE_SIZE, Sample, decode, encode};
