//! Scenario runner against the in-memory store and the fake device.

use std::time::{Duration, Instant};

use simtemp_harness::scenario::{poll_profile, threshold_profile};
use simtemp_harness::{ParameterStore, ScenarioBudgets, ScenarioKind, ScenarioRunner};
use simtemp_protocol::Sample;
use simtemp_test_helpers::prelude::*;

fn short_budgets() -> ScenarioBudgets {
    ScenarioBudgets {
        read_budget_ms: 300,
        per_read_ms: 50,
        poll_timeout_ms: 150,
        basic_read_timeout_ms: Some(300),
    }
}

fn descriptions(result: &simtemp_harness::ScenarioResult) -> Vec<&str> {
    result
        .checks()
        .iter()
        .map(|c| c.description.as_str())
        .collect()
}

#[test]
fn test_configuration_round_trip_passes() -> TestResult {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::silent();
    let runner = ScenarioRunner::new(&store, &device);

    let result = runner.configuration_check();

    assert!(result.passed());
    insta::assert_snapshot!(
        serde_json::to_string(&result)?,
        @r#"{"name":"config","title":"configuration round-trip","passed":true,"checks":[{"description":"set mode=ramp","passed":true},{"description":"set ramp_max=100000","passed":true},{"description":"set ramp_min=-40000","passed":true},{"description":"set ramp_period_ms=5000","passed":true},{"description":"mode reads back ramp","passed":true,"measured":"ramp"},{"description":"ramp_max reads back 100000","passed":true,"measured":"100000"},{"description":"ramp_min reads back -40000","passed":true,"measured":"-40000"},{"description":"ramp_period_ms reads back 5000","passed":true,"measured":"5000"}]}"#
    );
    assert_eq!(device.open_count(), 0);
    Ok(())
}

#[test]
fn test_configuration_fails_when_namespace_missing() {
    let store = MemoryStore::with_known(Vec::<String>::new());
    let device = FakeDevice::silent();
    let result = ScenarioRunner::new(&store, &device).configuration_check();

    assert!(!result.passed());
    assert_eq!(result.checks().len(), 4);
    assert!(result.checks().iter().all(|c| !c.passed));
    assert!(
        result
            .checks()
            .iter()
            .all(|c| c.measured.as_deref().is_some_and(|m| m.contains("not found")))
    );
}

#[test]
fn test_configuration_records_permission_denied() {
    let store = MemoryStore::simtemp_defaults().read_only("ramp_max");
    let device = FakeDevice::silent();
    let result = ScenarioRunner::new(&store, &device).configuration_check();

    assert!(!result.passed());
    let failed: Vec<_> = result
        .checks()
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.description.as_str())
        .collect();
    assert_eq!(failed, vec!["set ramp_max=100000"]);
    // Other keys are still written and verified.
    assert_eq!(store.get("ramp_min").as_deref(), Some("-40000"));
}

#[test]
fn test_basic_read_passes_with_one_record() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::samples([Sample::new(1_000_000_000, 25_000, 0)]);
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .basic_read_check();

    assert!(result.passed());
    let measured = result.checks().first().and_then(|c| c.measured.clone());
    assert_eq!(
        measured.as_deref(),
        Some("[1.000000] | Temp: 25.000 C | Flags: 0x0000")
    );
}

#[test]
fn test_basic_read_reports_missing_device() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::missing();
    let result = ScenarioRunner::new(&store, &device).basic_read_check();

    assert!(!result.passed());
    assert_eq!(
        descriptions(&result),
        vec!["open telemetry stream /dev/fake-simtemp"]
    );
}

#[test]
fn test_basic_read_reports_framing_error() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::raw(vec![0u8; 10]);
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .basic_read_check();

    assert!(!result.passed());
    let measured = result.checks().first().and_then(|c| c.measured.clone());
    assert_eq!(
        measured.as_deref(),
        Some("sample record must be 16 bytes, got 10")
    );
}

#[test]
fn test_threshold_scenario_sees_flag() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::for_config(&threshold_profile(), 40);
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(ScenarioBudgets {
            read_budget_ms: 2_000,
            ..short_budgets()
        })
        .threshold_check();

    assert!(result.passed(), "{result:?}");
    let descriptions = descriptions(&result);
    assert!(descriptions.contains(&"waveform prediction"));
    assert!(descriptions.contains(&"THRESHOLD_CROSSED observed within 2000 ms"));
}

#[test]
fn test_threshold_scenario_fails_within_budget_on_silent_device() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::silent();
    let started = Instant::now();
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .threshold_check();

    assert!(!result.passed());
    assert!(started.elapsed() < Duration::from_secs(2));
    let last = result.checks().last().map(|c| c.description.clone());
    assert_eq!(
        last.as_deref(),
        Some("THRESHOLD_CROSSED observed within 300 ms")
    );
}

#[test]
fn test_waveform_prediction_is_informational() {
    // Writes to the ramp bounds are refused, so the device keeps a ramp that
    // tops out below the threshold.
    let store = MemoryStore::simtemp_defaults()
        .read_only("ramp_max")
        .read_only("ramp_min");
    store.seed("ramp_max", "5000");
    let device = FakeDevice::for_config(&threshold_profile(), 40);
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(ScenarioBudgets {
            read_budget_ms: 2_000,
            ..short_budgets()
        })
        .threshold_check();

    let prediction = must_some(
        result
            .checks()
            .iter()
            .find(|c| c.description == "waveform prediction"),
        "prediction recorded",
    );
    assert!(prediction.passed);
    assert!(
        prediction
            .measured
            .as_deref()
            .is_some_and(|m| m.starts_with("no crossing predicted"))
    );

    // The verdict comes from the refused writes and the samples, not the
    // prediction.
    let failed: Vec<&str> = result
        .checks()
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.description.as_str())
        .collect();
    assert_eq!(failed, vec!["set ramp_max=50000", "set ramp_min=-50000"]);
    let observed = result
        .checks()
        .iter()
        .find(|c| c.description == "THRESHOLD_CROSSED observed within 2000 ms");
    assert!(observed.is_some_and(|c| c.passed));
}

fn poll_status(result: &simtemp_harness::ScenarioResult) -> Vec<(&str, bool)> {
    result
        .checks()
        .iter()
        .filter(|c| !c.description.starts_with("set "))
        .map(|c| (c.description.as_str(), c.passed))
        .collect()
}

#[test]
fn test_poll_scenario_passes_on_urgent_device() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::for_config(&poll_profile(), 20).urgent();
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .poll_check();

    assert!(result.passed(), "{result:?}");
    assert_eq!(
        poll_status(&result),
        vec![
            ("waveform prediction", true),
            ("urgent signal asserted", true),
            ("data-ready signal asserted", true),
            ("sample after wake-up has THRESHOLD_CROSSED", true),
        ]
    );
    let urgent = must_some(
        result
            .checks()
            .iter()
            .find(|c| c.description == "urgent signal asserted"),
        "urgent check recorded",
    );
    assert_eq!(urgent.measured.as_deref(), Some("signals: data-ready+urgent"));
}

#[test]
fn test_poll_scenario_fails_without_urgent_signal() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::for_config(&poll_profile(), 20);
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .poll_check();

    assert!(!result.passed());
    assert_eq!(
        poll_status(&result),
        vec![
            ("waveform prediction", true),
            ("urgent signal asserted", false),
            ("data-ready signal asserted", true),
            ("sample after wake-up has THRESHOLD_CROSSED", true),
        ]
    );
}

#[test]
fn test_poll_scenario_times_out() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::silent();
    let result = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .poll_check();

    assert!(!result.passed());
    let last = result.checks().last().cloned();
    assert_eq!(
        last.map(|c| (c.description, c.measured)),
        Some((
            "device signalled within 150 ms".to_string(),
            Some("no readiness signal within 150ms".to_string())
        ))
    );
}

#[test]
fn test_run_all_continues_past_failures() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::missing();
    let report = ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .run_all();

    let names: Vec<_> = report.scenarios().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["config", "read", "threshold", "poll"]);
    assert_eq!(report.passed_count(), 1);
    assert_eq!(report.failed_count(), 3);
    assert!(!report.all_passed());
    assert_eq!(device.open_count(), 3);
}

#[test]
fn test_run_selected_uses_canonical_order() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::missing();
    let report = ScenarioRunner::new(&store, &device).run_selected(&[
        ScenarioKind::Poll,
        ScenarioKind::Config,
        ScenarioKind::Poll,
    ]);

    let names: Vec<_> = report.scenarios().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["config", "poll"]);
}

#[test]
fn test_scenarios_leave_device_configured_for_poll() {
    let store = MemoryStore::simtemp_defaults();
    let device = FakeDevice::missing();
    ScenarioRunner::new(&store, &device)
        .with_budgets(short_budgets())
        .run_all();

    let writes = store.writes();
    let last_ramp_min = writes
        .iter()
        .rev()
        .find(|(name, _)| name == "ramp_min")
        .map(|(_, v)| v.as_str());
    assert_eq!(last_ramp_min, Some("11000"));
}
