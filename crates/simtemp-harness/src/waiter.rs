//! Bounded readiness waits on the telemetry channel.

use std::fmt;
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::trace;

use crate::error::WaitError;

bitflags! {
    /// Readiness conditions the device can assert.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Signals: u8 {
        /// At least one record can be read without blocking.
        const DATA_READY = 0b01;
        /// A threshold event is pending.
        const URGENT = 0b10;
    }
}

impl Signals {
    fn to_poll_flags(self) -> PollFlags {
        let mut flags = PollFlags::empty();
        if self.contains(Signals::DATA_READY) {
            flags |= PollFlags::POLLIN;
        }
        if self.contains(Signals::URGENT) {
            flags |= PollFlags::POLLPRI;
        }
        flags
    }

    fn from_poll_flags(revents: PollFlags) -> Self {
        let mut signals = Signals::empty();
        if revents.contains(PollFlags::POLLIN) {
            signals |= Signals::DATA_READY;
        }
        if revents.contains(PollFlags::POLLPRI) {
            signals |= Signals::URGENT;
        }
        signals
    }
}

impl fmt::Display for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut names = Vec::with_capacity(2);
        if self.contains(Signals::DATA_READY) {
            names.push("data-ready");
        }
        if self.contains(Signals::URGENT) {
            names.push("urgent");
        }
        f.write_str(&names.join("+"))
    }
}

/// Block until any of `signals` is asserted on `fd` or `timeout` elapses.
///
/// Returns the subset of `signals` observed; several may be reported at once.
/// Interrupted polls are retried against the remaining time.
///
/// # Errors
///
/// [`WaitError::Timeout`] when nothing requested was asserted in time,
/// [`WaitError::Disconnected`] on hang-up or error conditions, and
/// [`WaitError::Io`] when poll itself fails.
pub fn wait(fd: BorrowedFd<'_>, signals: Signals, timeout: Duration) -> Result<Signals, WaitError> {
    let started = Instant::now();
    let events = signals.to_poll_flags();

    loop {
        let remaining = timeout.saturating_sub(started.elapsed());
        let mut fds = [PollFd::new(fd, events)];
        let poll_timeout = PollTimeout::try_from(remaining).unwrap_or(PollTimeout::MAX);

        match poll(&mut fds, poll_timeout) {
            Ok(0) => return Err(WaitError::Timeout(timeout)),
            Ok(_) => {
                let revents = fds
                    .first()
                    .and_then(PollFd::revents)
                    .unwrap_or_else(PollFlags::empty);
                let observed = Signals::from_poll_flags(revents) & signals;
                trace!(?revents, %observed, "poll returned");
                if !observed.is_empty() {
                    return Ok(observed);
                }
                if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
                    return Err(WaitError::Disconnected);
                }
            }
            Err(Errno::EINTR) => trace!("poll interrupted, retrying"),
            Err(errno) => return Err(WaitError::Io(errno.into())),
        }

        if started.elapsed() >= timeout {
            return Err(WaitError::Timeout(timeout));
        }
    }
}
