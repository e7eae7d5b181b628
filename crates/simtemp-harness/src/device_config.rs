//! Typed device configuration.
//!
//! [`DeviceConfig`] is the strongly typed counterpart of a
//! [`ConfigurationPlan`]: every field is optional, `None` leaves the device's
//! current value untouched.

use serde::{Deserialize, Serialize};
use simtemp_protocol::{Mode, Parameter, limits};

use crate::error::ValidationError;
use crate::plan::ConfigurationPlan;
use crate::store::ParameterStore;

/// Optional settings for every known device parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Generator mode.
    pub mode: Option<Mode>,
    /// Threshold in m°C.
    #[serde(rename = "threshold_mC")]
    pub threshold_mc: Option<i32>,
    /// Hysteresis in m°C.
    #[serde(rename = "hysteresis_mC")]
    pub hysteresis_mc: Option<u32>,
    /// Ramp upper bound in m°C.
    pub ramp_max: Option<i32>,
    /// Ramp lower bound in m°C.
    pub ramp_min: Option<i32>,
    /// Ramp period in milliseconds.
    pub ramp_period_ms: Option<u32>,
    /// Sampling interval in milliseconds.
    pub sampling_ms: Option<u32>,
}

impl DeviceConfig {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generator mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set threshold and hysteresis together.
    #[must_use]
    pub fn threshold(mut self, threshold_mc: i32, hysteresis_mc: u32) -> Self {
        self.threshold_mc = Some(threshold_mc);
        self.hysteresis_mc = Some(hysteresis_mc);
        self
    }

    /// Set the ramp waveform.
    #[must_use]
    pub fn ramp(mut self, min_mc: i32, max_mc: i32, period_ms: u32) -> Self {
        self.ramp_min = Some(min_mc);
        self.ramp_max = Some(max_mc);
        self.ramp_period_ms = Some(period_ms);
        self
    }

    /// Set the sampling interval.
    #[must_use]
    pub fn sampling(mut self, sampling_ms: u32) -> Self {
        self.sampling_ms = Some(sampling_ms);
        self
    }

    /// Overlay `other` on `self`: fields set in `other` win.
    #[must_use]
    pub fn merged(self, other: &DeviceConfig) -> Self {
        Self {
            mode: other.mode.or(self.mode),
            threshold_mc: other.threshold_mc.or(self.threshold_mc),
            hysteresis_mc: other.hysteresis_mc.or(self.hysteresis_mc),
            ramp_max: other.ramp_max.or(self.ramp_max),
            ramp_min: other.ramp_min.or(self.ramp_min),
            ramp_period_ms: other.ramp_period_ms.or(self.ramp_period_ms),
            sampling_ms: other.sampling_ms.or(self.sampling_ms),
        }
    }

    /// Check the set fields against the ranges the device enforces.
    ///
    /// Only fields present in `self` are checked; cross-field rules apply
    /// when both fields are set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let temp = |param, value: Option<i32>| match value {
            Some(v) if !(limits::MIN_TEMP_MC..=limits::MAX_TEMP_MC).contains(&v) => {
                Err(ValidationError::OutOfRange {
                    param,
                    value: i64::from(v),
                    min: i64::from(limits::MIN_TEMP_MC),
                    max: i64::from(limits::MAX_TEMP_MC),
                })
            }
            _ => Ok(()),
        };
        let at_least = |param, value: Option<u32>, min: u32, max: u32| match value {
            Some(v) if v < min || v > max => Err(ValidationError::OutOfRange {
                param,
                value: i64::from(v),
                min: i64::from(min),
                max: i64::from(max),
            }),
            _ => Ok(()),
        };

        temp(Parameter::ThresholdMc, self.threshold_mc)?;
        temp(Parameter::RampMax, self.ramp_max)?;
        temp(Parameter::RampMin, self.ramp_min)?;
        at_least(
            Parameter::HysteresisMc,
            self.hysteresis_mc,
            0,
            limits::MAX_HYSTERESIS_MC,
        )?;
        at_least(
            Parameter::RampPeriodMs,
            self.ramp_period_ms,
            limits::MIN_RAMP_PERIOD_MS,
            u32::MAX,
        )?;
        at_least(
            Parameter::SamplingMs,
            self.sampling_ms,
            limits::MIN_SAMPLING_MS,
            u32::MAX,
        )?;

        if let (Some(min), Some(max)) = (self.ramp_min, self.ramp_max)
            && min > max
        {
            return Err(ValidationError::InvertedRamp { min, max });
        }

        if let (Some(threshold), Some(hysteresis)) = (self.threshold_mc, self.hysteresis_mc) {
            let floor = i64::from(threshold) - i64::from(hysteresis);
            if floor < i64::from(limits::MIN_TEMP_MC) {
                return Err(ValidationError::HysteresisBand {
                    threshold,
                    hysteresis,
                });
            }
        }

        Ok(())
    }

    /// Convert to a plan.
    ///
    /// Entry order is fixed: mode, threshold, hysteresis, ramp bounds (max
    /// first), ramp period, sampling interval.
    pub fn to_plan(&self) -> ConfigurationPlan {
        let mut plan = ConfigurationPlan::new();
        if let Some(mode) = self.mode {
            plan.insert(Parameter::Mode.name(), mode);
        }
        if let Some(v) = self.threshold_mc {
            plan.insert(Parameter::ThresholdMc.name(), v);
        }
        if let Some(v) = self.hysteresis_mc {
            plan.insert(Parameter::HysteresisMc.name(), v);
        }
        if let Some(v) = self.ramp_max {
            plan.insert(Parameter::RampMax.name(), v);
        }
        if let Some(v) = self.ramp_min {
            plan.insert(Parameter::RampMin.name(), v);
        }
        if let Some(v) = self.ramp_period_ms {
            plan.insert(Parameter::RampPeriodMs.name(), v);
        }
        if let Some(v) = self.sampling_ms {
            plan.insert(Parameter::SamplingMs.name(), v);
        }
        plan
    }

    /// Typed view of a raw plan. Unknown names and unparsable values are
    /// ignored, so the result only covers what can be validated.
    pub fn from_plan(plan: &ConfigurationPlan) -> Self {
        let read = |param: Parameter| plan.get(param.name()).map(str::to_string);
        Self::from_reader(read)
    }

    /// Snapshot the device's current values. Unreadable or unparsable
    /// attributes stay `None`.
    pub fn read_from(store: &dyn ParameterStore) -> Self {
        Self::from_reader(|param: Parameter| store.get(param.name()))
    }

    fn from_reader(read: impl Fn(Parameter) -> Option<String>) -> Self {
        Self {
            mode: read(Parameter::Mode).and_then(|v| v.parse().ok()),
            threshold_mc: read(Parameter::ThresholdMc).and_then(|v| v.parse().ok()),
            hysteresis_mc: read(Parameter::HysteresisMc).and_then(|v| v.parse().ok()),
            ramp_max: read(Parameter::RampMax).and_then(|v| v.parse().ok()),
            ramp_min: read(Parameter::RampMin).and_then(|v| v.parse().ok()),
            ramp_period_ms: read(Parameter::RampPeriodMs).and_then(|v| v.parse().ok()),
            sampling_ms: read(Parameter::SamplingMs).and_then(|v| v.parse().ok()),
        }
    }
}
