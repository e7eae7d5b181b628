//! Telemetry stream over real file handles and the fake device.

use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use simtemp_harness::{
    DevicePath, LoopEnd, OpenError, ReadError, Signals, TelemetrySource, TelemetryStream,
};
use simtemp_protocol::{Sample, encode};
use simtemp_test_helpers::prelude::*;

fn soon() -> Option<Instant> {
    Some(Instant::now() + Duration::from_secs(1))
}

#[test]
fn test_device_path_reads_records_from_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("simtemp");
    let mut bytes = encode(&Sample::new(1, 100, 0)).to_vec();
    bytes.extend_from_slice(&encode(&Sample::new(2, 200, 1)));
    std::fs::write(&path, bytes)?;

    let source = DevicePath::new(&path);
    let mut stream = source.open()?;
    assert_eq!(stream.label(), path.display().to_string());
    assert_eq!(stream.read_one(soon())?, Sample::new(1, 100, 0));
    assert_eq!(stream.read_one(soon())?, Sample::new(2, 200, 1));
    assert!(matches!(
        stream.read_one(soon()),
        Err(ReadError::Framing(e)) if e.actual == 0
    ));
    assert_eq!(stream.samples_read(), 2);
    stream.close();
    Ok(())
}

#[test]
fn test_device_path_missing_node() {
    let source = DevicePath::new("/nonexistent/dev/simtemp");
    assert!(matches!(source.open(), Err(OpenError::NotFound(_))));
    assert_eq!(source.describe(), "/nonexistent/dev/simtemp");
}

#[test]
fn test_each_open_is_independent() {
    let device = FakeDevice::samples([Sample::new(5, 0, 0)]);
    let mut first = must(device.open());
    let mut second = must(device.open());
    assert_eq!(first.label(), device.describe());
    assert_eq!(must(first.read_one(soon())), Sample::new(5, 0, 0));
    assert_eq!(must(second.read_one(soon())), Sample::new(5, 0, 0));
    assert_eq!(device.open_count(), 2);
}

#[test]
fn test_urgent_wait_then_read_flagged_record() {
    let device = FakeDevice::samples([Sample::new(9, 12_000, 1)]).urgent();
    let mut stream = must(device.open());
    let observed = must(stream.wait(Signals::DATA_READY | Signals::URGENT, Duration::from_secs(1)));
    assert!(observed.contains(Signals::URGENT));
    let sample = must(stream.read_one(soon()));
    assert!(sample.is_threshold_crossed());
    let err = must_err(stream.read_one(Some(Instant::now())));
    assert!(matches!(err, ReadError::Timeout));
}

#[test]
fn test_read_until_counts_samples_until_flag() -> TestResult {
    let device = FakeDevice::samples(
        (0..8u64).map(|i| Sample::new(i, 0, u32::from(i == 5))),
    );
    let mut stream = device.open()?;
    let cancel = AtomicBool::new(false);
    let summary = stream.read_until(soon(), Duration::from_millis(50), &cancel, |s| {
        if s.is_threshold_crossed() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    assert_eq!(summary.end, LoopEnd::Stopped(Sample::new(5, 0, 1)));
    assert_eq!(summary.samples_seen, 6);
    Ok(())
}

#[test]
fn test_wait_on_fake_device_reports_data_ready() -> TestResult {
    let device = FakeDevice::samples([Sample::default()]);
    let stream: TelemetryStream<_> = device.open()?;
    let observed = stream.wait(Signals::DATA_READY | Signals::URGENT, Duration::from_secs(1))?;
    assert!(observed.contains(Signals::DATA_READY));
    assert!(!observed.contains(Signals::URGENT));
    Ok(())
}
