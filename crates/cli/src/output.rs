//! Output formatting for CLI responses
//!
//! Human output goes to stdout with colour; warnings and errors go to
//! stderr so that `--json` stdout stays machine-parseable.

use anyhow::Error;
use colored::Colorize;
use serde_json::{Value, json};
use simtemp_harness::{ApplyReport, ErrorSeverity, LoopEnd, LoopSummary, Mismatch, RunReport};
use simtemp_protocol::{Parameter, Sample};

use crate::error::CliError;

fn print_json(value: &Value, what: &str) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {what} as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    print_json(
        &json!({
            "success": false,
            "error": {
                "message": error.to_string(),
                "type": error_type_name(error),
                "severity": severity_label(error),
            }
        }),
        "error",
    );
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

/// One sample: the canonical line for humans, one JSON object per line
/// otherwise.
pub fn print_sample(sample: &Sample, json: bool) {
    if json {
        let line = json!({
            "timestamp_ns": sample.timestamp,
            "temperature_mC": sample.temperature_milli_c,
            "flags": sample.flags,
            "threshold_crossed": sample.is_threshold_crossed(),
        });
        println!("{line}");
    } else if sample.is_threshold_crossed() {
        println!("{}", sample.to_string().yellow());
    } else {
        println!("{sample}");
    }
}

fn loop_end_label(end: &LoopEnd) -> &'static str {
    match end {
        LoopEnd::Stopped(_) => "count reached",
        LoopEnd::DeadlineExpired => "timeout",
        LoopEnd::Cancelled => "interrupted",
    }
}

pub fn print_read_summary(summary: &LoopSummary, json: bool) {
    let reason = loop_end_label(&summary.end);
    let elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX);
    if json {
        let line = json!({
            "success": true,
            "samples": summary.samples_seen,
            "elapsed_ms": elapsed_ms,
            "stopped_by": reason,
        });
        println!("{line}");
    } else {
        eprintln!(
            "{} {} samples in {} ms ({})",
            "✓".green(),
            summary.samples_seen,
            elapsed_ms,
            reason
        );
    }
}

pub fn print_apply_report(report: &ApplyReport, mismatches: &[Mismatch], json: bool) {
    if json {
        let outcomes: Vec<Value> = report
            .outcomes()
            .iter()
            .map(|o| match &o.result {
                Ok(()) => json!({ "name": o.name, "value": o.value, "ok": true }),
                Err(e) => json!({
                    "name": o.name,
                    "value": o.value,
                    "ok": false,
                    "error": e.to_string(),
                }),
            })
            .collect();
        print_json(
            &json!({
                "success": report.all_ok() && mismatches.is_empty(),
                "writes": outcomes,
                "mismatches": mismatches,
            }),
            "apply report",
        );
        return;
    }

    for outcome in report.outcomes() {
        match &outcome.result {
            Ok(()) => println!("{} {} = {}", "✓".green(), outcome.name, outcome.value),
            Err(e) => println!(
                "{} {} = {}: {}",
                "✗".red(),
                outcome.name,
                outcome.value,
                e.to_string().red()
            ),
        }
    }
    for m in mismatches {
        let observed = m.observed.as_deref().unwrap_or("<unreadable>");
        println!(
            "{} {} reads back {} (wrote {})",
            "⚠".yellow(),
            m.name,
            observed.yellow(),
            m.expected
        );
    }
}

pub fn print_run_report(report: &RunReport, json: bool) {
    if json {
        print_json(
            &json!({
                "success": report.all_passed(),
                "passed": report.passed_count(),
                "failed": report.failed_count(),
                "scenarios": report.scenarios(),
            }),
            "scenario report",
        );
        return;
    }

    for scenario in report.scenarios() {
        let verdict = if scenario.passed() {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("{} {} ({})", verdict, scenario.title().bold(), scenario.name());
        for check in scenario.checks() {
            let mark = if check.passed { "✓".green() } else { "✗".red() };
            match &check.measured {
                Some(measured) => {
                    println!("    {} {} [{}]", mark, check.description, measured.dimmed());
                }
                None => println!("    {} {}", mark, check.description),
            }
        }
    }
    let summary = format!(
        "{} passed, {} failed",
        report.passed_count(),
        report.failed_count()
    );
    if report.all_passed() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

pub fn print_params(source: &str, rows: &[(Parameter, Option<String>)], json: bool) {
    if json {
        let values: serde_json::Map<String, Value> = rows
            .iter()
            .map(|(param, value)| (param.name().to_string(), json!(value)))
            .collect();
        print_json(
            &json!({
                "success": true,
                "source": source,
                "parameters": values,
            }),
            "parameters",
        );
        return;
    }

    println!("{} {}", "Parameters:".bold(), source.dimmed());
    let width = rows
        .iter()
        .map(|(param, _)| param.name().len())
        .max()
        .unwrap_or(0);
    for (param, value) in rows {
        match value {
            Some(v) => println!("  {:width$}  {}", param.name(), v),
            None => println!("  {:width$}  {}", param.name(), "unavailable".yellow()),
        }
    }
}

fn severity_label(error: &Error) -> String {
    error
        .downcast_ref::<CliError>()
        .map_or(ErrorSeverity::Error, CliError::severity)
        .to_string()
}

/// Get error type name for JSON output
fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::DeviceNotFound(_)) => "DeviceNotFound",
        Some(CliError::NamespaceNotFound(_)) => "NamespaceNotFound",
        Some(CliError::PermissionDenied(_)) => "PermissionDenied",
        Some(CliError::InvalidInput(_)) => "InvalidInput",
        Some(CliError::ApplyFailed { .. }) => "ApplyFailed",
        Some(CliError::ScenariosFailed { .. }) => "ScenariosFailed",
        Some(CliError::Harness(_)) => "Harness",
        Some(CliError::Config(_)) => "Config",
        Some(CliError::JsonError(_)) => "Json",
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_name_uses_variant() {
        let err = Error::new(CliError::InvalidInput("x".into()));
        assert_eq!(error_type_name(&err), "InvalidInput");
        assert_eq!(error_type_name(&anyhow::anyhow!("plain")), "Unknown");
    }

    #[test]
    fn test_severity_label() {
        let missing = Error::new(CliError::DeviceNotFound("/dev/simtemp".into()));
        assert_eq!(severity_label(&missing), "CRITICAL");
        assert_eq!(severity_label(&anyhow::anyhow!("plain")), "ERROR");
    }

    #[test]
    fn test_loop_end_labels() {
        assert_eq!(loop_end_label(&LoopEnd::DeadlineExpired), "timeout");
        assert_eq!(loop_end_label(&LoopEnd::Cancelled), "interrupted");
        assert_eq!(
            loop_end_label(&LoopEnd::Stopped(Sample::new(0, 0, 0))),
            "count reached"
        );
    }
}
