//! Apply `KEY=VALUE` assignments to the parameter namespace.

use anyhow::Result;
use simtemp_harness::{DeviceConfig, StoreError, apply};

use super::{Context, parse_assignments};
use crate::error::CliError;
use crate::output;

pub fn execute(ctx: &Context, assignments: &[String], verify: bool) -> Result<()> {
    let plan = parse_assignments(assignments);
    if plan.is_empty() {
        return Err(CliError::InvalidInput("no valid KEY=VALUE assignments given".into()).into());
    }

    // Advisory only: the device has the final word.
    if let Err(e) = DeviceConfig::from_plan(&plan).validate() {
        output::print_warning(&format!("device will likely reject this plan: {e}"));
    }

    let store = ctx.present_store()?;
    let report = apply(&store, &plan);
    let mismatches = if verify {
        report.verify(&store)
    } else {
        Vec::new()
    };
    output::print_apply_report(&report, &mismatches, ctx.json);

    let failures: Vec<_> = report.failures().collect();
    if failures.is_empty() {
        return Ok(());
    }
    if failures
        .iter()
        .all(|(_, e)| matches!(e, StoreError::PermissionDenied(_)))
    {
        return Err(CliError::PermissionDenied(format!(
            "cannot write {} (try running as root)",
            store.root().display()
        ))
        .into());
    }
    Err(CliError::ApplyFailed {
        failed: failures.len(),
        total: report.outcomes().len(),
    }
    .into())
}
