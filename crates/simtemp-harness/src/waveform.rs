//! Host-side model of the ramp generator and threshold latch.
//!
//! Lets scenarios predict whether (and roughly when) a configured ramp will
//! raise `THRESHOLD_CROSSED`, and gives test doubles a realistic waveform.

use simtemp_protocol::{Sample, SampleFlags};

use crate::error::ValidationError;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Triangular wave between `min` and `max`.
///
/// Starts at `min`, rises linearly to `max` over the first half of the period
/// and falls back over the second half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampModel {
    min: i32,
    max: i32,
    period_ms: u32,
}

impl RampModel {
    /// Build a ramp.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvertedRamp`] when `min > max`, and
    /// [`ValidationError::OutOfRange`] for a zero period.
    pub fn new(min: i32, max: i32, period_ms: u32) -> Result<Self, ValidationError> {
        if min > max {
            return Err(ValidationError::InvertedRamp { min, max });
        }
        if period_ms == 0 {
            return Err(ValidationError::OutOfRange {
                param: simtemp_protocol::Parameter::RampPeriodMs,
                value: 0,
                min: 1,
                max: i64::from(u32::MAX),
            });
        }
        Ok(Self {
            min,
            max,
            period_ms,
        })
    }

    /// Lower bound in m°C.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Upper bound in m°C.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Full cycle in milliseconds.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Temperature at `elapsed_ms` after the start of the ramp.
    pub fn value_at(&self, elapsed_ms: u64) -> i32 {
        let period = u64::from(self.period_ms);
        let rise = period / 2;
        let fall = period - rise;
        let phase = elapsed_ms % period;
        let span = i64::from(self.max) - i64::from(self.min);

        let value = if phase < rise {
            i64::from(self.min) + scale(span, phase, rise)
        } else {
            i64::from(self.max) - scale(span, phase - rise, fall)
        };
        let clamped = value.clamp(i64::from(self.min), i64::from(self.max));
        i32::try_from(clamped).unwrap_or(self.max)
    }
}

/// `span * num / den` in i128 so large spans and long phases cannot overflow.
fn scale(span: i64, num: u64, den: u64) -> i64 {
    if den == 0 {
        return 0;
    }
    let scaled = i128::from(span) * i128::from(num) / i128::from(den);
    i64::try_from(scaled).unwrap_or(span)
}

/// Threshold latch with hysteresis.
///
/// Latches when a reading reaches `threshold`; stays latched until a reading
/// drops to `threshold - hysteresis` or below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdTracker {
    threshold: i32,
    hysteresis: u32,
    latched: bool,
}

impl ThresholdTracker {
    /// Unlatched tracker.
    pub fn new(threshold: i32, hysteresis: u32) -> Self {
        Self {
            threshold,
            hysteresis,
            latched: false,
        }
    }

    /// Feed one reading; returns whether `THRESHOLD_CROSSED` would be set.
    pub fn observe(&mut self, temp_mc: i32) -> bool {
        if temp_mc >= self.threshold {
            self.latched = true;
        }
        if self.latched {
            let release = i64::from(self.threshold) - i64::from(self.hysteresis);
            if i64::from(temp_mc) <= release {
                self.latched = false;
            }
        }
        self.latched
    }

    /// Current latch state.
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

/// One simulated reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedReading {
    /// Milliseconds since the start of the ramp.
    pub elapsed_ms: u64,
    /// Temperature in m°C.
    pub temperature_milli_c: i32,
    /// Latch state after this reading.
    pub threshold_crossed: bool,
}

impl SimulatedReading {
    /// Wire sample for this reading, stamped `base_ns + elapsed`.
    pub fn to_sample(&self, base_ns: u64) -> Sample {
        let flags = if self.threshold_crossed {
            SampleFlags::THRESHOLD_CROSSED
        } else {
            SampleFlags::empty()
        };
        let offset = self.elapsed_ms.saturating_mul(NANOS_PER_MILLI);
        Sample::new(
            base_ns.saturating_add(offset),
            self.temperature_milli_c,
            flags.bits(),
        )
    }
}

/// Endless stream of readings taken every `sampling_ms`, starting at t = 0.
#[derive(Debug, Clone)]
pub struct Simulation {
    ramp: RampModel,
    tracker: ThresholdTracker,
    sampling_ms: u64,
    next_ms: u64,
}

impl Simulation {
    /// Simulate `ramp` feeding `tracker`. A zero interval is treated as 1 ms.
    pub fn new(ramp: RampModel, tracker: ThresholdTracker, sampling_ms: u32) -> Self {
        Self {
            ramp,
            tracker,
            sampling_ms: u64::from(sampling_ms.max(1)),
            next_ms: 0,
        }
    }
}

impl Iterator for Simulation {
    type Item = SimulatedReading;

    fn next(&mut self) -> Option<Self::Item> {
        let elapsed_ms = self.next_ms;
        self.next_ms = self.next_ms.checked_add(self.sampling_ms)?;
        let temperature_milli_c = self.ramp.value_at(elapsed_ms);
        let threshold_crossed = self.tracker.observe(temperature_milli_c);
        Some(SimulatedReading {
            elapsed_ms,
            temperature_milli_c,
            threshold_crossed,
        })
    }
}

/// First sample time (ms after ramp start) at which the flag is set, looking
/// no further than `horizon_ms`.
pub fn first_crossing_ms(
    ramp: RampModel,
    threshold: i32,
    hysteresis: u32,
    sampling_ms: u32,
    horizon_ms: u64,
) -> Option<u64> {
    Simulation::new(ramp, ThresholdTracker::new(threshold, hysteresis), sampling_ms)
        .take_while(|r| r.elapsed_ms <= horizon_ms)
        .find(|r| r.threshold_crossed)
        .map(|r| r.elapsed_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_ramp_shape() -> TestResult {
        let ramp = RampModel::new(-50_000, 50_000, 2_000)?;
        assert_eq!(ramp.value_at(0), -50_000);
        assert_eq!(ramp.value_at(500), 0);
        assert_eq!(ramp.value_at(1_000), 50_000);
        assert_eq!(ramp.value_at(1_500), 0);
        assert_eq!(ramp.value_at(2_000), -50_000);
        Ok(())
    }

    #[test]
    fn test_ramp_degenerate_period() -> TestResult {
        let ramp = RampModel::new(10, 20, 1)?;
        assert_eq!(ramp.value_at(0), 20);
        assert_eq!(ramp.value_at(7), 20);

        let flat = RampModel::new(5, 5, 100)?;
        assert_eq!(flat.value_at(33), 5);
        Ok(())
    }

    #[test]
    fn test_ramp_rejects_invalid() {
        assert!(RampModel::new(10, 0, 100).is_err());
        assert!(RampModel::new(0, 10, 0).is_err());
    }

    #[test]
    fn test_tracker_hysteresis() {
        let mut tracker = ThresholdTracker::new(10_000, 5_000);
        assert!(!tracker.observe(9_999));
        assert!(tracker.observe(10_000));
        assert!(tracker.observe(6_000));
        assert!(!tracker.observe(5_000));
        assert!(!tracker.observe(9_000));
    }

    #[test]
    fn test_tracker_zero_hysteresis_at_threshold() {
        let mut tracker = ThresholdTracker::new(10_000, 0);
        assert!(!tracker.observe(10_000));
        assert!(tracker.observe(10_001));
        assert!(tracker.is_latched());
    }

    #[test]
    fn test_first_crossing_threshold_scenario() -> TestResult {
        let ramp = RampModel::new(-50_000, 50_000, 2_000)?;
        assert_eq!(first_crossing_ms(ramp, 10_000, 5_000, 100, 5_000), Some(600));
        Ok(())
    }

    #[test]
    fn test_first_crossing_poll_scenario_is_immediate() -> TestResult {
        let ramp = RampModel::new(11_000, 30_000, 2_000)?;
        assert_eq!(first_crossing_ms(ramp, 10_000, 5_000, 100, 10_000), Some(0));
        Ok(())
    }

    #[test]
    fn test_first_crossing_unreachable() -> TestResult {
        let ramp = RampModel::new(0, 9_000, 1_000)?;
        assert_eq!(first_crossing_ms(ramp, 10_000, 0, 100, 60_000), None);
        Ok(())
    }

    #[test]
    fn test_reading_to_sample() {
        let reading = SimulatedReading {
            elapsed_ms: 250,
            temperature_milli_c: 12_000,
            threshold_crossed: true,
        };
        let sample = reading.to_sample(1_000);
        assert_eq!(sample.timestamp, 250_001_000);
        assert_eq!(sample.temperature_milli_c, 12_000);
        assert!(sample.is_threshold_crossed());
    }
}
