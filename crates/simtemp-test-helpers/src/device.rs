//! Fake telemetry device.
//!
//! Each [`FakeDevice::open`](simtemp_harness::TelemetrySource::open) creates a
//! Unix socket pair: the harness reads one end, a writer thread feeds the
//! other with records and then holds it open for a configurable linger time,
//! or until the harness closes its end.
//!
//! The first record is queued before `open` returns. With
//! [`FakeDevice::urgent`], every flagged record is followed by one
//! out-of-band byte, which the reader sees as `POLLPRI`.

use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use nix::sys::socket::{MsgFlags, send};
use simtemp_harness::waiter::wait;
use simtemp_harness::{
    DeviceConfig, OpenError, RampModel, Signals, Simulation, TelemetrySource, TelemetryStream,
    ThresholdTracker,
};
use simtemp_protocol::{Sample, decode, defaults, encode};

#[derive(Debug, Clone)]
enum Feed {
    Chunks(Vec<Vec<u8>>),
    Missing,
    Denied,
}

/// Scripted telemetry source.
#[derive(Debug)]
pub struct FakeDevice {
    feed: Feed,
    interval: Duration,
    linger: Duration,
    urgent: bool,
    opens: AtomicUsize,
    feeders: Arc<AtomicUsize>,
}

impl FakeDevice {
    fn with_feed(feed: Feed) -> Self {
        Self {
            feed,
            interval: Duration::from_millis(1),
            linger: Duration::from_secs(30),
            urgent: false,
            opens: AtomicUsize::new(0),
            feeders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Emit `samples` in order.
    pub fn samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self::with_feed(Feed::Chunks(
            samples.into_iter().map(|s| encode(&s).to_vec()).collect(),
        ))
    }

    /// Emit `count` samples of a ramp feeding a threshold latch, as the
    /// device would with the given settings.
    pub fn ramp(
        ramp: RampModel,
        threshold: i32,
        hysteresis: u32,
        sampling_ms: u32,
        count: usize,
    ) -> Self {
        let sim = Simulation::new(ramp, ThresholdTracker::new(threshold, hysteresis), sampling_ms);
        Self::samples(sim.take(count).map(|r| r.to_sample(0)))
    }

    /// Emit the samples the device would produce for `config`, falling back
    /// to module defaults for unset fields. Panics if the ramp bounds are
    /// inverted.
    pub fn for_config(config: &DeviceConfig, count: usize) -> Self {
        let ramp = RampModel::new(
            config.ramp_min.unwrap_or(defaults::RAMP_MIN_MC),
            config.ramp_max.unwrap_or(defaults::RAMP_MAX_MC),
            config.ramp_period_ms.unwrap_or(defaults::RAMP_PERIOD_MS),
        )
        .unwrap();
        Self::ramp(
            ramp,
            config.threshold_mc.unwrap_or(defaults::THRESHOLD_MC),
            config.hysteresis_mc.unwrap_or(defaults::HYSTERESIS_MC),
            config.sampling_ms.unwrap_or(defaults::SAMPLING_MS),
            count,
        )
    }

    /// Emit `bytes` as a single write, then hang up.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_feed(Feed::Chunks(vec![bytes.into()])).linger(Duration::ZERO)
    }

    /// Never emit anything; stay connected for the linger time.
    pub fn silent() -> Self {
        Self::with_feed(Feed::Chunks(Vec::new()))
    }

    /// Opening fails with [`OpenError::NotFound`].
    pub fn missing() -> Self {
        Self::with_feed(Feed::Missing)
    }

    /// Opening fails with [`OpenError::PermissionDenied`].
    pub fn denied() -> Self {
        Self::with_feed(Feed::Denied)
    }

    /// Delay between records.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// How long to keep the channel open after the last record.
    #[must_use]
    pub fn linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Raise urgent readiness after every flagged record.
    #[must_use]
    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    /// Number of times the device has been opened.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Writer threads still running.
    pub fn active_feeders(&self) -> usize {
        self.feeders.load(Ordering::SeqCst)
    }

    fn path(&self) -> PathBuf {
        PathBuf::from("/dev/fake-simtemp")
    }
}

impl TelemetrySource for FakeDevice {
    type Reader = UnixStream;

    fn open(&self) -> Result<TelemetryStream<UnixStream>, OpenError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let chunks = match &self.feed {
            Feed::Chunks(chunks) => chunks.clone(),
            Feed::Missing => return Err(OpenError::NotFound(self.path())),
            Feed::Denied => return Err(OpenError::PermissionDenied(self.path())),
        };

        let io_error = |source| OpenError::Io {
            path: self.path(),
            source,
        };
        let (reader, mut writer) = UnixStream::pair().map_err(io_error)?;
        let mut chunks = chunks.into_iter();
        if let Some(first) = chunks.next() {
            emit(&mut writer, &first, self.urgent).map_err(io_error)?;
        }
        let rest: Vec<Vec<u8>> = chunks.collect();
        let (interval, linger, urgent) = (self.interval, self.linger, self.urgent);
        let feeders = Arc::clone(&self.feeders);
        feeders.fetch_add(1, Ordering::SeqCst);
        thread::spawn(move || {
            feed(writer, rest, interval, linger, urgent);
            feeders.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(TelemetryStream::from_reader(reader, self.describe()))
    }

    fn describe(&self) -> String {
        self.path().display().to_string()
    }
}

fn emit(writer: &mut UnixStream, chunk: &[u8], urgent: bool) -> io::Result<()> {
    writer.write_all(chunk)?;
    if urgent && decode(chunk).is_ok_and(|s| s.is_threshold_crossed()) {
        send(writer.as_raw_fd(), &[1], MsgFlags::MSG_OOB)?;
    }
    Ok(())
}

fn feed(
    mut writer: UnixStream,
    chunks: Vec<Vec<u8>>,
    interval: Duration,
    linger: Duration,
    urgent: bool,
) {
    let result: io::Result<()> = chunks.iter().try_for_each(|chunk| {
        thread::sleep(interval);
        emit(&mut writer, chunk, urgent)
    });
    if result.is_ok() {
        // Ends early once the reader hangs up.
        let _ = wait(writer.as_fd(), Signals::empty(), linger);
    }
}
