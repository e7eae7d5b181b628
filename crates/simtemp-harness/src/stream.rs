//! Telemetry channel reader.
//!
//! [`TelemetryStream`] owns one open handle to the device and yields whole
//! [`Sample`]s. It is generic over the underlying reader so tests can drive it
//! through a socket pair; production code uses [`DevicePath`].

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use simtemp_protocol::{SAMPLE_SIZE, Sample, decode};
use tracing::{debug, trace};

use crate::error::{OpenError, ReadError, WaitError};
use crate::waiter::{self, Signals};

/// Default telemetry device node.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/simtemp";

/// Something that can open a telemetry channel.
pub trait TelemetrySource {
    /// Reader type behind the opened stream.
    type Reader: Read + AsFd;

    /// Open a fresh channel.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`] when the channel cannot be opened.
    fn open(&self) -> Result<TelemetryStream<Self::Reader>, OpenError>;

    /// Human-readable name for logs and reports.
    fn describe(&self) -> String;
}

/// The device node on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePath(PathBuf);

impl DevicePath {
    /// Source for the node at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Node path.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Default for DevicePath {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PATH)
    }
}

impl TelemetrySource for DevicePath {
    type Reader = File;

    fn open(&self) -> Result<TelemetryStream<File>, OpenError> {
        TelemetryStream::open(&self.0)
    }

    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// How a [`TelemetryStream::read_until`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// The visitor asked to stop after this sample.
    Stopped(Sample),
    /// The overall deadline passed.
    DeadlineExpired,
    /// The cancel flag was raised.
    Cancelled,
}

/// Summary of a [`TelemetryStream::read_until`] loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    /// Why the loop ended.
    pub end: LoopEnd,
    /// Records decoded during the loop.
    pub samples_seen: u64,
    /// Wall time spent in the loop.
    pub elapsed: Duration,
}

/// An open telemetry channel.
///
/// The handle is released when the stream is dropped.
#[derive(Debug)]
pub struct TelemetryStream<R: Read + AsFd = File> {
    reader: R,
    label: String,
    samples_read: u64,
}

impl TelemetryStream<File> {
    /// Open the device node at `path` read-only.
    ///
    /// # Errors
    ///
    /// [`OpenError::NotFound`] / [`OpenError::PermissionDenied`] for the
    /// matching OS conditions, [`OpenError::Io`] otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OpenError::from_io(path.to_path_buf(), e))?;
        debug!(device = %path.display(), "telemetry stream opened");
        Ok(Self::from_reader(file, path.display().to_string()))
    }
}

impl<R: Read + AsFd> TelemetryStream<R> {
    /// Wrap an already-open reader.
    pub fn from_reader(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
            samples_read: 0,
        }
    }

    /// Name given at open time.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Records decoded so far on this handle.
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Read exactly one record.
    ///
    /// With a deadline, waits for data no longer than the time remaining and
    /// returns [`ReadError::Timeout`] without reading if the deadline has
    /// already passed. Without one, blocks until the device returns.
    ///
    /// # Errors
    ///
    /// [`ReadError::Timeout`] on deadline expiry, [`ReadError::Framing`] when
    /// the read returns anything other than one whole record (end of stream
    /// included), [`ReadError::Io`] on OS failure.
    pub fn read_one(&mut self, deadline: Option<Instant>) -> Result<Sample, ReadError> {
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ReadError::Timeout);
            }
            match waiter::wait(self.reader.as_fd(), Signals::DATA_READY, remaining) {
                // A hang-up surfaces on the read below as a zero-length record.
                Ok(_) | Err(WaitError::Disconnected) => {}
                Err(WaitError::Timeout(_)) => return Err(ReadError::Timeout),
                Err(WaitError::Io(e)) => return Err(ReadError::Io(e)),
            }
        }

        let mut buf = [0u8; SAMPLE_SIZE];
        let n = loop {
            match self.reader.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::Io(e)),
            }
        };

        let sample = decode(buf.get(..n).unwrap_or_default())?;
        self.samples_read = self.samples_read.saturating_add(1);
        trace!(
            device = %self.label,
            timestamp = sample.timestamp,
            temp_mc = sample.temperature_milli_c,
            flags = sample.flags,
            "sample read"
        );
        Ok(sample)
    }

    /// Read records until `visit` breaks, `deadline` passes, or `cancel` is
    /// raised.
    ///
    /// Each individual read is bounded by `per_read` (and by the overall
    /// deadline when one is given), so cancellation is noticed at least that
    /// often. Per-read timeouts are not errors.
    ///
    /// # Errors
    ///
    /// Any [`ReadError`] other than a per-read timeout ends the loop.
    pub fn read_until<F>(
        &mut self,
        deadline: Option<Instant>,
        per_read: Duration,
        cancel: &AtomicBool,
        mut visit: F,
    ) -> Result<LoopSummary, ReadError>
    where
        F: FnMut(&Sample) -> std::ops::ControlFlow<()>,
    {
        let started = Instant::now();
        let mut samples_seen = 0u64;
        let summary = |end, samples_seen| LoopSummary {
            end,
            samples_seen,
            elapsed: started.elapsed(),
        };

        loop {
            if cancel.load(Ordering::Relaxed) {
                return Ok(summary(LoopEnd::Cancelled, samples_seen));
            }
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return Ok(summary(LoopEnd::DeadlineExpired, samples_seen));
            }

            let slice_end = now + per_read;
            let read_deadline = deadline.map_or(slice_end, |d| d.min(slice_end));

            match self.read_one(Some(read_deadline)) {
                Ok(sample) => {
                    samples_seen = samples_seen.saturating_add(1);
                    if visit(&sample).is_break() {
                        return Ok(summary(LoopEnd::Stopped(sample), samples_seen));
                    }
                }
                Err(ReadError::Timeout) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for readiness on this channel. See [`waiter::wait`].
    ///
    /// # Errors
    ///
    /// Propagates [`WaitError`].
    pub fn wait(&self, signals: Signals, timeout: Duration) -> Result<Signals, WaitError> {
        waiter::wait(self.reader.as_fd(), signals, timeout)
    }

    /// Release the handle.
    pub fn close(self) {
        drop(self);
    }
}

impl<R: Read + AsFd> Drop for TelemetryStream<R> {
    fn drop(&mut self) {
        debug!(
            device = %self.label,
            samples = self.samples_read,
            "telemetry stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::ops::ControlFlow;
    use std::os::unix::net::UnixStream;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn pair() -> Result<(TelemetryStream<UnixStream>, UnixStream), io::Error> {
        let (reader, writer) = UnixStream::pair()?;
        Ok((TelemetryStream::from_reader(reader, "pair"), writer))
    }

    #[test]
    fn test_open_missing_device_is_not_found() {
        let result = TelemetryStream::open("/nonexistent/simtemp");
        assert!(matches!(result, Err(OpenError::NotFound(_))));
    }

    #[test]
    fn test_read_one_decodes_record() -> TestResult {
        let (mut stream, mut writer) = pair()?;
        writer.write_all(&Sample::new(7, 21_000, 1).to_bytes())?;

        let sample = stream.read_one(Some(Instant::now() + Duration::from_secs(1)))?;
        assert_eq!(sample, Sample::new(7, 21_000, 1));
        assert_eq!(stream.samples_read(), 1);
        Ok(())
    }

    #[test]
    fn test_read_one_past_deadline_times_out_without_reading() -> TestResult {
        let (mut stream, mut writer) = pair()?;
        writer.write_all(&Sample::default().to_bytes())?;

        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(stream.read_one(Some(past)), Err(ReadError::Timeout)));

        // Record is still there for the next read.
        assert!(stream.read_one(Some(Instant::now() + Duration::from_secs(1))).is_ok());
        Ok(())
    }

    #[test]
    fn test_read_one_idle_channel_times_out() -> TestResult {
        let (mut stream, _writer) = pair()?;
        let result = stream.read_one(Some(Instant::now() + Duration::from_millis(30)));
        assert!(matches!(result, Err(ReadError::Timeout)));
        Ok(())
    }

    #[test]
    fn test_read_one_short_record_is_framing_error() -> TestResult {
        let (mut stream, mut writer) = pair()?;
        writer.write_all(&[0u8; 10])?;
        drop(writer);

        let result = stream.read_one(Some(Instant::now() + Duration::from_secs(1)));
        match result {
            Err(ReadError::Framing(e)) => assert_eq!(e.actual, 10),
            other => return Err(format!("expected framing error, got {other:?}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_read_one_end_of_stream_is_framing_error() -> TestResult {
        let (mut stream, writer) = pair()?;
        drop(writer);

        let result = stream.read_one(None);
        assert!(matches!(result, Err(ReadError::Framing(e)) if e.actual == 0));
        Ok(())
    }

    #[test]
    fn test_read_until_stops_on_visitor_break() -> TestResult {
        let (mut stream, mut writer) = pair()?;
        for (i, flags) in [0u32, 0, 1, 0].into_iter().enumerate() {
            let ts = u64::try_from(i)?;
            writer.write_all(&Sample::new(ts, 0, flags).to_bytes())?;
        }

        let cancel = AtomicBool::new(false);
        let summary = stream.read_until(
            Some(Instant::now() + Duration::from_secs(2)),
            Duration::from_millis(100),
            &cancel,
            |s| {
                if s.is_threshold_crossed() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )?;

        assert_eq!(summary.end, LoopEnd::Stopped(Sample::new(2, 0, 1)));
        assert_eq!(summary.samples_seen, 3);
        Ok(())
    }

    #[test]
    fn test_read_until_deadline_expires() -> TestResult {
        let (mut stream, _writer) = pair()?;
        let cancel = AtomicBool::new(false);
        let summary = stream.read_until(
            Some(Instant::now() + Duration::from_millis(60)),
            Duration::from_millis(20),
            &cancel,
            |_| ControlFlow::Continue(()),
        )?;
        assert_eq!(summary.end, LoopEnd::DeadlineExpired);
        assert_eq!(summary.samples_seen, 0);
        Ok(())
    }

    #[test]
    fn test_read_until_honours_cancel() -> TestResult {
        let (mut stream, _writer) = pair()?;
        let cancel = AtomicBool::new(true);
        let summary = stream.read_until(None, Duration::from_millis(20), &cancel, |_| {
            ControlFlow::Continue(())
        })?;
        assert_eq!(summary.end, LoopEnd::Cancelled);
        Ok(())
    }

    #[test]
    fn test_read_until_propagates_framing_error() -> TestResult {
        let (mut stream, mut writer) = pair()?;
        writer.write_all(&[1, 2, 3])?;
        drop(writer);
        let cancel = AtomicBool::new(false);
        let result = stream.read_until(None, Duration::from_millis(100), &cancel, |_| {
            ControlFlow::Continue(())
        });
        assert!(matches!(result, Err(ReadError::Framing(_))));
        Ok(())
    }
}
