use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use stackcheck_core::config::{load_captures, load_suite};
use stackcheck_core::registry::RangeRegistry;
use stackcheck_core::report::{describe, range_table};
use stackcheck_core::scenario::{run_suite, CaptureSet, ProbeOutcome, ScenarioSuite, SuiteReport};
use stackcheck_core::validate::ValidationFailure;

use crate::commands::{load_registry, RangeSource};

/// Suite report plus run metadata, as emitted by `check --json`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub checked_at: String,
    pub ranges_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_hash: Option<String>,
    pub passed: bool,
    #[serde(flatten)]
    pub report: SuiteReport,
}

/// Load the suite file, or fall back to the built-in uretprobe suite.
pub fn resolve_suite(suite: Option<&str>) -> Result<ScenarioSuite> {
    match suite {
        Some(path) => load_suite(Path::new(path)),
        None => Ok(ScenarioSuite::uretprobe_stack()),
    }
}

/// Run a suite against a captures file without printing anything.
pub fn check_report(
    source: &RangeSource,
    suite: Option<&str>,
    captures: &str,
) -> Result<CheckReport> {
    run_check(source, suite, captures).map(|(check, _, _)| check)
}

fn run_check(
    source: &RangeSource,
    suite: Option<&str>,
    captures: &str,
) -> Result<(CheckReport, RangeRegistry, CaptureSet)> {
    let loaded = load_registry(source)?;
    let suite = resolve_suite(suite)?;
    let captures = load_captures(Path::new(captures))?;
    let report = run_suite(&loaded.registry, &suite, &captures)
        .with_context(|| format!("Suite '{}' cannot run against these ranges", suite.name))?;
    let check = CheckReport {
        checked_at: Utc::now().to_rfc3339(),
        ranges_source: loaded.source,
        binary_hash: loaded.binary_hash,
        passed: report.passed(),
        report,
    };
    Ok((check, loaded.registry, captures))
}

/// Validate captured stacks for every probe of a suite; fails if any probe fails.
pub fn check_command(
    source: &RangeSource,
    suite: Option<&str>,
    captures: &str,
    verbose: bool,
    json: bool,
) -> Result<()> {
    let (check, registry, capture_set) = run_check(source, suite, captures)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else {
        print_report(&check, &registry, &capture_set, verbose);
    }

    if check.passed {
        Ok(())
    } else {
        Err(anyhow!(
            "Suite '{}' failed: {} of {} probe(s) did not pass",
            check.report.suite,
            check.report.fail_count(),
            check.report.results.len()
        ))
    }
}

fn print_report(
    check: &CheckReport,
    registry: &RangeRegistry,
    captures: &CaptureSet,
    verbose: bool,
) {
    let report = &check.report;
    println!("Suite: {}", report.suite);
    println!("Ranges: {}", check.ranges_source);

    if verbose {
        for line in range_table(registry) {
            println!("{line}");
        }
    }

    for result in &report.results {
        let status = if result.passed() { "PASS" } else { "FAIL" };
        println!("[{status}] {} ({}): {}", result.probe, result.kind, result.chain);

        match &result.outcome {
            ProbeOutcome::MissingCapture => println!("    no capture supplied"),
            ProbeOutcome::Checked { verdict } => {
                if let Some(failure) = verdict.failure() {
                    println!("    {failure}");
                    if let ValidationFailure::Mismatch { mismatches } = failure {
                        for m in mismatches {
                            let actual = m
                                .actual_range(registry)
                                .map(|r| format!("in {}", r.name()))
                                .unwrap_or_else(|| "unknown".to_string());
                            println!("    {m} (actual: {actual})");
                        }
                    }
                }
            }
        }

        if verbose {
            if let Some(capture) = captures.captures.iter().find(|c| c.probe == result.probe) {
                let stack = capture.stack();
                for label in describe(registry, &stack) {
                    println!("    {label}");
                }
            }
        }
    }

    if !report.unexpected.is_empty() {
        println!("Captures for unknown probes: {}", report.unexpected.join(", "));
    }
    println!("Passed: {}  Failed: {}", report.pass_count(), report.fail_count());
}
