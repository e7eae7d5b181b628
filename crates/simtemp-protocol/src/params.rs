//! Configuration vocabulary exposed by the device under its sysfs class directory.

use core::fmt;
use core::str::FromStr;

/// Known device parameters.
///
/// The namespace is extensible: names outside this set are still accepted
/// by the store client and passed through verbatim. This enum only covers the
/// attributes the current module publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parameter {
    /// Generator mode (`normal`, `noisy`, `ramp`).
    #[cfg_attr(feature = "serde", serde(rename = "mode"))]
    Mode,
    /// Threshold in m°C.
    #[cfg_attr(feature = "serde", serde(rename = "threshold_mC"))]
    ThresholdMc,
    /// Hysteresis band below the threshold, in m°C.
    #[cfg_attr(feature = "serde", serde(rename = "hysteresis_mC"))]
    HysteresisMc,
    /// Ramp upper bound in m°C.
    #[cfg_attr(feature = "serde", serde(rename = "ramp_max"))]
    RampMax,
    /// Ramp lower bound in m°C.
    #[cfg_attr(feature = "serde", serde(rename = "ramp_min"))]
    RampMin,
    /// Full ramp cycle length in milliseconds.
    #[cfg_attr(feature = "serde", serde(rename = "ramp_period_ms"))]
    RampPeriodMs,
    /// Interval between generated samples in milliseconds.
    #[cfg_attr(feature = "serde", serde(rename = "sampling_ms"))]
    SamplingMs,
}

impl Parameter {
    /// Every known parameter, in the order the device lists its attributes.
    pub const ALL: [Parameter; 7] = [
        Parameter::Mode,
        Parameter::SamplingMs,
        Parameter::RampMin,
        Parameter::RampMax,
        Parameter::RampPeriodMs,
        Parameter::ThresholdMc,
        Parameter::HysteresisMc,
    ];

    /// Attribute file name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Parameter::Mode => "mode",
            Parameter::ThresholdMc => "threshold_mC",
            Parameter::HysteresisMc => "hysteresis_mC",
            Parameter::RampMax => "ramp_max",
            Parameter::RampMin => "ramp_min",
            Parameter::RampPeriodMs => "ramp_period_ms",
            Parameter::SamplingMs => "sampling_ms",
        }
    }

    /// Look a parameter up by its exact attribute name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.name() == name)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A name that is not one of the known [`Parameter`]s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

/// Waveform generator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Steady temperature.
    #[default]
    Normal,
    /// Steady temperature with noise.
    Noisy,
    /// Triangular ramp between `ramp_min` and `ramp_max`.
    Ramp,
}

impl Mode {
    /// String written to and read back from the `mode` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Noisy => "noisy",
            Mode::Ramp => "ramp",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `mode` value the device does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}', expected one of: normal, noisy, ramp")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Case-sensitive; trailing whitespace (the attribute's newline) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end() {
            "normal" => Ok(Mode::Normal),
            "noisy" => Ok(Mode::Noisy),
            "ramp" => Ok(Mode::Ramp),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Ranges the device enforces when an attribute is written.
pub mod limits {
    /// Lowest temperature the device accepts, in m°C.
    pub const MIN_TEMP_MC: i32 = -50_000;
    /// Highest temperature the device accepts, in m°C.
    pub const MAX_TEMP_MC: i32 = 120_000;
    /// Widest hysteresis band (`MAX_TEMP_MC - MIN_TEMP_MC`).
    pub const MAX_HYSTERESIS_MC: u32 = 170_000;
    /// Shortest ramp period in milliseconds.
    pub const MIN_RAMP_PERIOD_MS: u32 = 1;
    /// Shortest sampling interval in milliseconds.
    pub const MIN_SAMPLING_MS: u32 = 1;
}

/// Values the module starts with after load.
pub mod defaults {
    use super::Mode;

    /// Generator mode.
    pub const MODE: Mode = Mode::Normal;
    /// Sampling interval.
    pub const SAMPLING_MS: u32 = 100;
    /// Ramp lower bound.
    pub const RAMP_MIN_MC: i32 = 0;
    /// Ramp upper bound.
    pub const RAMP_MAX_MC: i32 = 100_000;
    /// Ramp period.
    pub const RAMP_PERIOD_MS: u32 = 1000;
    /// Threshold.
    pub const THRESHOLD_MC: i32 = 50_000;
    /// Hysteresis.
    pub const HYSTERESIS_MC: u32 = 10_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parameter_names_round_trip() -> TestResult {
        for param in Parameter::ALL {
            let parsed: Parameter = param.name().parse()?;
            assert_eq!(parsed, param);
        }
        Ok(())
    }

    #[test]
    fn test_parameter_names_are_case_sensitive() {
        assert!(Parameter::from_name("threshold_mC").is_some());
        assert!(Parameter::from_name("threshold_mc").is_none());
        assert!(Parameter::from_name("THRESHOLD_MC").is_none());
    }

    #[test]
    fn test_unknown_parameter_message() {
        let err = "bogus".parse::<Parameter>().err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("unknown parameter 'bogus'")
        );
    }

    #[test]
    fn test_mode_parses_attribute_output() -> TestResult {
        assert_eq!("ramp\n".parse::<Mode>()?, Mode::Ramp);
        assert_eq!("normal".parse::<Mode>()?, Mode::Normal);
        assert_eq!("noisy".parse::<Mode>()?, Mode::Noisy);
        assert!("Ramp".parse::<Mode>().is_err());
        Ok(())
    }

    #[test]
    fn test_hysteresis_limit_spans_temperature_range() {
        let span = i64::from(limits::MAX_TEMP_MC) - i64::from(limits::MIN_TEMP_MC);
        assert_eq!(span, i64::from(limits::MAX_HYSTERESIS_MC));
    }
}
