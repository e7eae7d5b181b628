//! End-to-end verification scenarios.
//!
//! Each scenario drives the store and the telemetry channel, records one
//! [`CheckOutcome`] per assertion and never aborts the run: failures are
//! captured as failed checks. Scenarios run strictly one after another.

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use simtemp_protocol::{Mode, Parameter, defaults};
use tracing::{info, warn};

use crate::config::ScenarioBudgets;
use crate::device_config::DeviceConfig;
use crate::plan::{ApplyReport, apply};
use crate::store::ParameterStore;
use crate::stream::{LoopEnd, TelemetrySource, TelemetryStream};
use crate::waiter::Signals;
use crate::waveform::{RampModel, first_crossing_ms};

/// The built-in scenarios, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Parameter writes read back as written.
    Config,
    /// One whole record can be read.
    Read,
    /// A ramp crossing the threshold produces a flagged sample.
    Threshold,
    /// A threshold event raises the urgent readiness signal.
    Poll,
}

impl ScenarioKind {
    /// Every scenario in run order.
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Config,
        ScenarioKind::Read,
        ScenarioKind::Threshold,
        ScenarioKind::Poll,
    ];

    /// Short name used on the command line and in reports.
    pub const fn name(self) -> &'static str {
        match self {
            ScenarioKind::Config => "config",
            ScenarioKind::Read => "read",
            ScenarioKind::Threshold => "threshold",
            ScenarioKind::Poll => "poll",
        }
    }

    /// One-line description.
    pub const fn title(self) -> &'static str {
        match self {
            ScenarioKind::Config => "configuration round-trip",
            ScenarioKind::Read => "basic read",
            ScenarioKind::Threshold => "threshold crossing",
            ScenarioKind::Poll => "urgent readiness",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scenario name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario '{0}', expected one of: config, read, threshold, poll")]
pub struct UnknownScenario(pub String);

impl FromStr for ScenarioKind {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// One verified assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// What was checked.
    pub description: String,
    /// Whether it held.
    pub passed: bool,
    /// What was actually observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured: Option<String>,
}

/// Checks recorded by one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    name: String,
    title: String,
    passed: bool,
    checks: Vec<CheckOutcome>,
}

impl ScenarioResult {
    /// Result for `kind` from its recorded checks.
    pub fn new(kind: ScenarioKind, checks: Vec<CheckOutcome>) -> Self {
        Self {
            name: kind.name().to_string(),
            title: kind.title().to_string(),
            passed: checks.iter().all(|c| c.passed),
            checks,
        }
    }

    /// Scenario name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scenario description.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// True iff every check passed.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Checks in the order they were made.
    pub fn checks(&self) -> &[CheckOutcome] {
        &self.checks
    }
}

/// Results of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    scenarios: Vec<ScenarioResult>,
    passed: usize,
    failed: usize,
}

impl RunReport {
    fn push(&mut self, result: ScenarioResult) {
        if result.passed() {
            self.passed = self.passed.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
        self.scenarios.push(result);
    }

    /// Per-scenario results in run order.
    pub fn scenarios(&self) -> &[ScenarioResult] {
        &self.scenarios
    }

    /// Scenarios that passed.
    pub fn passed_count(&self) -> usize {
        self.passed
    }

    /// Scenarios that failed.
    pub fn failed_count(&self) -> usize {
        self.failed
    }

    /// True when every scenario passed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Device settings for the configuration round-trip.
pub fn configuration_profile() -> DeviceConfig {
    DeviceConfig::new()
        .mode(Mode::Ramp)
        .ramp(-40_000, 100_000, 5_000)
}

/// Device settings for the threshold-crossing scenario: a full-range ramp
/// through a 10 °C threshold.
pub fn threshold_profile() -> DeviceConfig {
    DeviceConfig::new()
        .mode(Mode::Ramp)
        .threshold(10_000, 5_000)
        .ramp(-50_000, 50_000, 2_000)
}

/// Device settings for the urgent-readiness scenario: the threshold profile
/// with a ramp that never drops below the threshold, so the flag is set
/// almost immediately.
pub fn poll_profile() -> DeviceConfig {
    threshold_profile().merged(&DeviceConfig::new().ramp(11_000, 30_000, 2_000).sampling(100))
}

struct Recorder {
    kind: ScenarioKind,
    checks: Vec<CheckOutcome>,
}

impl Recorder {
    fn new(kind: ScenarioKind) -> Self {
        info!(scenario = kind.name(), "scenario started");
        Self {
            kind,
            checks: Vec::new(),
        }
    }

    fn check(&mut self, description: impl Into<String>, passed: bool, measured: Option<String>) {
        let description = description.into();
        if passed {
            info!(scenario = self.kind.name(), check = %description, measured = ?measured, "check passed");
        } else {
            warn!(scenario = self.kind.name(), check = %description, measured = ?measured, "check failed");
        }
        self.checks.push(CheckOutcome {
            description,
            passed,
            measured,
        });
    }

    fn pass(&mut self, description: impl Into<String>, measured: Option<String>) {
        self.check(description, true, measured);
    }

    fn fail(&mut self, description: impl Into<String>, measured: Option<String>) {
        self.check(description, false, measured);
    }

    /// Informational entry; never affects the verdict.
    fn note(&mut self, description: impl Into<String>, measured: String) {
        let description = description.into();
        info!(scenario = self.kind.name(), note = %description, %measured, "note");
        self.checks.push(CheckOutcome {
            description,
            passed: true,
            measured: Some(measured),
        });
    }

    fn record_apply(&mut self, report: &ApplyReport) {
        for outcome in report.outcomes() {
            let description = format!("set {}={}", outcome.name, outcome.value);
            match &outcome.result {
                Ok(()) => self.pass(description, None),
                Err(e) => self.fail(description, Some(e.to_string())),
            }
        }
    }

    fn finish(self) -> ScenarioResult {
        let result = ScenarioResult::new(self.kind, self.checks);
        info!(
            scenario = self.kind.name(),
            passed = result.passed(),
            checks = result.checks().len(),
            "scenario finished"
        );
        result
    }
}

/// Runs the built-in scenarios against one store and one telemetry source.
pub struct ScenarioRunner<'a, T: TelemetrySource> {
    store: &'a dyn ParameterStore,
    source: &'a T,
    budgets: ScenarioBudgets,
}

impl<'a, T: TelemetrySource> ScenarioRunner<'a, T> {
    /// Runner with default budgets.
    pub fn new(store: &'a dyn ParameterStore, source: &'a T) -> Self {
        Self {
            store,
            source,
            budgets: ScenarioBudgets::default(),
        }
    }

    /// Replace the time budgets.
    #[must_use]
    pub fn with_budgets(mut self, budgets: ScenarioBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Budgets in effect.
    pub fn budgets(&self) -> &ScenarioBudgets {
        &self.budgets
    }

    /// Run every scenario in order.
    pub fn run_all(&self) -> RunReport {
        self.run_selected(&ScenarioKind::ALL)
    }

    /// Run the named scenarios, in canonical order, each at most once.
    pub fn run_selected(&self, kinds: &[ScenarioKind]) -> RunReport {
        let mut report = RunReport::default();
        for kind in ScenarioKind::ALL.into_iter().filter(|k| kinds.contains(k)) {
            report.push(self.run(kind));
        }
        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "run finished"
        );
        report
    }

    /// Run a single scenario.
    pub fn run(&self, kind: ScenarioKind) -> ScenarioResult {
        match kind {
            ScenarioKind::Config => self.configuration_check(),
            ScenarioKind::Read => self.basic_read_check(),
            ScenarioKind::Threshold => self.threshold_check(),
            ScenarioKind::Poll => self.poll_check(),
        }
    }

    /// Write the configuration profile and read every value back.
    pub fn configuration_check(&self) -> ScenarioResult {
        let mut rec = Recorder::new(ScenarioKind::Config);
        let report = apply(self.store, &configuration_profile().to_plan());
        rec.record_apply(&report);

        for outcome in report.outcomes().iter().filter(|o| o.result.is_ok()) {
            let observed = self.store.get(&outcome.name);
            let matches = observed.as_deref() == Some(outcome.value.as_str());
            rec.check(
                format!("{} reads back {}", outcome.name, outcome.value),
                matches,
                Some(observed.unwrap_or_else(|| "<unreadable>".to_string())),
            );
        }
        rec.finish()
    }

    /// Read exactly one record.
    pub fn basic_read_check(&self) -> ScenarioResult {
        let mut rec = Recorder::new(ScenarioKind::Read);
        let Some(mut stream) = self.open(&mut rec) else {
            return rec.finish();
        };

        let deadline = self
            .budgets
            .basic_read_timeout()
            .map(|t| Instant::now() + t);
        match stream.read_one(deadline) {
            Ok(sample) => rec.pass("read one 16-byte sample", Some(sample.to_string())),
            Err(e) => rec.fail("read one 16-byte sample", Some(e.to_string())),
        }
        stream.close();
        rec.finish()
    }

    /// Configure a ramp through the threshold and wait for a flagged sample.
    pub fn threshold_check(&self) -> ScenarioResult {
        let mut rec = Recorder::new(ScenarioKind::Threshold);
        rec.record_apply(&apply(self.store, &threshold_profile().to_plan()));
        self.waveform_check(&mut rec);

        let Some(mut stream) = self.open(&mut rec) else {
            return rec.finish();
        };

        let budget = self.budgets.read_budget();
        let description = format!("THRESHOLD_CROSSED observed within {} ms", budget.as_millis());
        let never = AtomicBool::new(false);
        let outcome = stream.read_until(
            Some(Instant::now() + budget),
            self.budgets.per_read(),
            &never,
            |sample| {
                if sample.is_threshold_crossed() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );

        match outcome {
            Ok(summary) => match summary.end {
                LoopEnd::Stopped(sample) => rec.pass(
                    description,
                    Some(format!(
                        "{:.3} C after {} samples in {} ms",
                        sample.temperature_celsius(),
                        summary.samples_seen,
                        summary.elapsed.as_millis()
                    )),
                ),
                LoopEnd::DeadlineExpired | LoopEnd::Cancelled => rec.fail(
                    description,
                    Some(format!("no flagged sample in {} samples", summary.samples_seen)),
                ),
            },
            Err(e) => rec.fail(description, Some(e.to_string())),
        }
        stream.close();
        rec.finish()
    }

    /// Configure an always-above-threshold ramp and wait for urgent readiness.
    pub fn poll_check(&self) -> ScenarioResult {
        let mut rec = Recorder::new(ScenarioKind::Poll);
        rec.record_apply(&apply(self.store, &poll_profile().to_plan()));
        self.waveform_check(&mut rec);

        let Some(mut stream) = self.open(&mut rec) else {
            return rec.finish();
        };

        let timeout = self.budgets.poll_timeout();
        match stream.wait(Signals::DATA_READY | Signals::URGENT, timeout) {
            Ok(observed) => {
                let measured = Some(format!("signals: {observed}"));
                rec.check(
                    "urgent signal asserted",
                    observed.contains(Signals::URGENT),
                    measured.clone(),
                );
                rec.check(
                    "data-ready signal asserted",
                    observed.contains(Signals::DATA_READY),
                    measured,
                );
                match stream.read_one(Some(Instant::now() + timeout)) {
                    Ok(sample) => rec.check(
                        "sample after wake-up has THRESHOLD_CROSSED",
                        sample.is_threshold_crossed(),
                        Some(sample.to_string()),
                    ),
                    Err(e) => rec.fail(
                        "sample after wake-up has THRESHOLD_CROSSED",
                        Some(e.to_string()),
                    ),
                }
            }
            Err(e) => rec.fail(
                format!("device signalled within {} ms", timeout.as_millis()),
                Some(e.to_string()),
            ),
        }
        stream.close();
        rec.finish()
    }

    fn open(&self, rec: &mut Recorder) -> Option<TelemetryStream<T::Reader>> {
        match self.source.open() {
            Ok(stream) => Some(stream),
            Err(e) => {
                rec.fail(
                    format!("open telemetry stream {}", self.source.describe()),
                    Some(e.to_string()),
                );
                None
            }
        }
    }

    /// Predict from the device's current settings when the ramp first sets
    /// the flag. Recorded as a note; only the device's samples decide.
    fn waveform_check(&self, rec: &mut Recorder) {
        let current = DeviceConfig::read_from(self.store);
        let min = current.ramp_min.unwrap_or(defaults::RAMP_MIN_MC);
        let max = current.ramp_max.unwrap_or(defaults::RAMP_MAX_MC);
        let period = current.ramp_period_ms.unwrap_or(defaults::RAMP_PERIOD_MS);
        let threshold = current.threshold_mc.unwrap_or(defaults::THRESHOLD_MC);
        let hysteresis = current.hysteresis_mc.unwrap_or(defaults::HYSTERESIS_MC);
        let sampling = current.sampling_ms.unwrap_or(defaults::SAMPLING_MS);

        let measured = match RampModel::new(min, max, period) {
            Ok(ramp) => {
                match first_crossing_ms(ramp, threshold, hysteresis, sampling, u64::from(period)) {
                    Some(t) => format!("first crossing predicted {t} ms after ramp start"),
                    None => format!(
                        "no crossing predicted: ramp peaks at {max} m°C, {} is {threshold} m°C",
                        Parameter::ThresholdMc
                    ),
                }
            }
            Err(e) => format!("no prediction: {e}"),
        };
        rec.note("waveform prediction", measured);
    }
}
