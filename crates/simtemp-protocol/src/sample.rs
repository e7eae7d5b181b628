//! Fixed-size sample record codec.
//!
//! All functions are pure and allocation-free.

use core::fmt;

use crate::flags::SampleFlags;

/// Size of one telemetry record on the wire.
pub const SAMPLE_SIZE: usize = 16;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
const MILLI_PER_UNIT: f64 = 1000.0;

/// A record whose length is not [`SAMPLE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sample record must be {expected} bytes, got {actual}")]
pub struct FramingError {
    /// Always [`SAMPLE_SIZE`].
    pub expected: usize,
    /// Length actually received.
    pub actual: usize,
}

impl FramingError {
    /// Framing error for a record of `actual` bytes.
    #[must_use]
    pub const fn new(actual: usize) -> Self {
        Self {
            expected: SAMPLE_SIZE,
            actual,
        }
    }
}

/// One decoded telemetry record.
///
/// Samples are produced by the device; the harness never mutates one after
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Nanoseconds since an unspecified epoch, non-decreasing within a stream.
    pub timestamp: u64,
    /// Temperature in milli-degrees Celsius.
    pub temperature_milli_c: i32,
    /// Raw flags word, see [`SampleFlags`].
    pub flags: u32,
}

impl Sample {
    /// Build a sample from its three fields.
    #[must_use]
    pub const fn new(timestamp: u64, temperature_milli_c: i32, flags: u32) -> Self {
        Self {
            timestamp,
            temperature_milli_c,
            flags,
        }
    }

    /// Decode a record from an exact 16-byte array (little-endian).
    #[must_use]
    pub const fn from_bytes(bytes: &[u8; SAMPLE_SIZE]) -> Self {
        let [t0, t1, t2, t3, t4, t5, t6, t7, c0, c1, c2, c3, f0, f1, f2, f3] = *bytes;
        Self {
            timestamp: u64::from_le_bytes([t0, t1, t2, t3, t4, t5, t6, t7]),
            temperature_milli_c: i32::from_le_bytes([c0, c1, c2, c3]),
            flags: u32::from_le_bytes([f0, f1, f2, f3]),
        }
    }

    /// Encode the record into its 16-byte wire form (little-endian).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SAMPLE_SIZE] {
        let mut out = [0u8; SAMPLE_SIZE];
        let fields = self
            .timestamp
            .to_le_bytes()
            .into_iter()
            .chain(self.temperature_milli_c.to_le_bytes())
            .chain(self.flags.to_le_bytes());
        for (dst, src) in out.iter_mut().zip(fields) {
            *dst = src;
        }
        out
    }

    /// Temperature in degrees Celsius.
    #[must_use]
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature_milli_c) / MILLI_PER_UNIT
    }

    /// Timestamp converted to seconds.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "display-only conversion; sub-microsecond precision loss is acceptable"
    )]
    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp as f64 / NANOS_PER_SECOND
    }

    /// Typed view of the flags word.
    #[must_use]
    pub const fn flag_set(&self) -> SampleFlags {
        SampleFlags::from_raw(self.flags)
    }

    /// True when bit 0 (`THRESHOLD_CROSSED`) is set.
    #[must_use]
    pub const fn is_threshold_crossed(&self) -> bool {
        self.flag_set().threshold_crossed()
    }
}

/// One line per sample, as printed by continuous-read mode.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}] | Temp: {:6.3} C | Flags: 0x{:04x}",
            self.timestamp_seconds(),
            self.temperature_celsius(),
            self.flags
        )?;
        if self.is_threshold_crossed() {
            write!(f, " **ALERT**")?;
        }
        Ok(())
    }
}

/// Decode one record.
///
/// # Errors
///
/// Returns [`FramingError`] unless `bytes` is exactly [`SAMPLE_SIZE`] long.
/// Every 16-byte input decodes; no field value is invalid.
pub fn decode(bytes: &[u8]) -> Result<Sample, FramingError> {
    let Ok(record) = <&[u8; SAMPLE_SIZE]>::try_from(bytes) else {
        return Err(FramingError::new(bytes.len()));
    };
    Ok(Sample::from_bytes(record))
}

/// Encode one record. Exact inverse of [`decode`].
#[must_use]
pub fn encode(sample: &Sample) -> [u8; SAMPLE_SIZE] {
    sample.to_bytes()
}
