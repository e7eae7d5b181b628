//! Continuous read: optional configuration, then print samples until a
//! timeout, a sample count, or Ctrl+C.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use simtemp_harness::{HarnessError, TelemetrySource, apply};
use tracing::{debug, info};

use super::{Context, parse_assignments};
use crate::error::CliError;
use crate::output;

/// How often the read loop checks for Ctrl+C when no data arrives.
const CANCEL_POLL: Duration = Duration::from_millis(200);

pub async fn execute(
    ctx: &Context,
    assignments: &[String],
    timeout_ms: Option<u64>,
    count: Option<u64>,
) -> Result<()> {
    let plan = parse_assignments(assignments);
    if !plan.is_empty() {
        let report = apply(&ctx.store(), &plan);
        for (name, err) in report.failures() {
            output::print_warning(&format!("failed to set {name}: {err}"));
        }
    }

    let device = ctx.device();
    let mut stream = device.open().map_err(CliError::from_open)?;
    info!(device = stream.label(), "reading samples");

    let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    let cancel = Arc::new(AtomicBool::new(false));
    let json = ctx.json;

    let flag = Arc::clone(&cancel);
    let mut reader = tokio::task::spawn_blocking(move || {
        let mut printed = 0u64;
        stream.read_until(deadline, CANCEL_POLL, &flag, |sample| {
            output::print_sample(sample, json);
            printed = printed.saturating_add(1);
            if count.is_some_and(|n| printed >= n) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    });

    let joined = tokio::select! {
        joined = &mut reader => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            debug!("interrupt received, stopping reader");
            cancel.store(true, Ordering::Relaxed);
            reader.await
        }
    };

    let summary = joined
        .context("reader task failed")?
        .map_err(|e| CliError::Harness(HarnessError::from(e)))?;
    output::print_read_summary(&summary, json);
    Ok(())
}
