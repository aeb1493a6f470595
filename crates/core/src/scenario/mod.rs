//! Probe scenarios: which chain each probe is expected to capture.
//!
//! A suite names every probe of a test run (entry probes, return probes and
//! the final marker) and the call chain it should observe, written in call
//! order using range names from the registry. [`run_suite`] pairs the suite
//! with the captures delivered by the instrumentation side.

use std::collections::HashSet;
use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{address_serde, Address, CapturedStack, ADDRESS_SIZE};
use crate::registry::{RangeRegistry, CALLER_KEYWORD};
use crate::validate::{validate, ExpectedChain, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("Probe '{probe}' references unknown range '{name}'")]
    UnknownRange { probe: String, name: String },
    #[error("Probe '{0}' is declared more than once")]
    DuplicateProbe(String),
    #[error("More than one capture supplied for probe '{0}'")]
    DuplicateCapture(String),
}

/// Where in a function's life the stack was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Function entry (uprobe).
    Entry,
    /// Function return (uretprobe).
    Exit,
    /// User-defined trace point (USDT).
    Marker,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeKind::Entry => "entry",
            ProbeKind::Exit => "exit",
            ProbeKind::Marker => "marker",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeExpectation {
    pub probe: String,
    pub kind: ProbeKind,
    /// Range names in call order, outermost first.
    pub chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProbeExpectation {
    pub fn new(probe: impl Into<String>, kind: ProbeKind, chain: &[&str]) -> Self {
        Self {
            probe: probe.into(),
            kind,
            chain: chain.iter().map(|s| s.to_string()).collect(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSuite {
    pub name: String,
    pub probes: Vec<ProbeExpectation>,
}

/// A probe expectation with its chain resolved against a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProbe {
    pub probe: String,
    pub kind: ProbeKind,
    pub chain: ExpectedChain,
}

impl ScenarioSuite {
    /// The uretprobe stack scenario: `caller -> target_1 -> target_1 ->
    /// target_2 -> target_3 -> target_4 -> marker`, with entry probes on all
    /// four targets and return probes on target_1 and target_4 only.
    pub fn uretprobe_stack() -> Self {
        use ProbeKind::*;
        const C: &str = CALLER_KEYWORD;
        let probes = vec![
            ProbeExpectation::new("entry_1", Entry, &[C, "target_1"])
                .with_description("target_1 entered from the caller"),
            ProbeExpectation::new("entry_1_recur", Entry, &[C, "target_1", "target_1"])
                .with_description("target_1 entered again by recursion"),
            ProbeExpectation::new("entry_2", Entry, &[C, "target_1", "target_1", "target_2"]),
            ProbeExpectation::new(
                "entry_3",
                Entry,
                &[C, "target_1", "target_1", "target_2", "target_3"],
            ),
            ProbeExpectation::new(
                "entry_4",
                Entry,
                &[C, "target_1", "target_1", "target_2", "target_3", "target_4"],
            ),
            ProbeExpectation::new(
                "usdt",
                Marker,
                &[C, "target_1", "target_1", "target_2", "target_3", "target_4"],
            )
            .with_description("full chain seen from the marker inside target_4"),
            ProbeExpectation::new(
                "exit_4",
                Exit,
                &[C, "target_1", "target_1", "target_2", "target_3"],
            )
            .with_description("returning from target_4, which is no longer on the stack"),
            ProbeExpectation::new("exit_1_recur", Exit, &[C, "target_1"])
                .with_description("inner target_1 returning into the outer one"),
            ProbeExpectation::new("exit_1", Exit, &[C])
                .with_description("outer target_1 returning into the caller"),
        ];
        Self { name: "uretprobe_stack".into(), probes }
    }

    /// Resolve every chain against `registry`. Fails on the first unknown
    /// range name or repeated probe name.
    pub fn resolve(&self, registry: &RangeRegistry) -> Result<Vec<ResolvedProbe>, ScenarioError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            if !seen.insert(probe.probe.as_str()) {
                return Err(ScenarioError::DuplicateProbe(probe.probe.clone()));
            }
            let mut builder = ExpectedChain::builder();
            for name in &probe.chain {
                let range = registry.lookup(name).ok_or_else(|| ScenarioError::UnknownRange {
                    probe: probe.probe.clone(),
                    name: name.clone(),
                })?;
                builder = builder.call(range.range);
            }
            resolved.push(ResolvedProbe {
                probe: probe.probe.clone(),
                kind: probe.kind,
                chain: builder.build(),
            });
        }
        Ok(resolved)
    }
}

/// A stack captured when `probe` fired, in its on-disk form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCapture {
    pub probe: String,
    /// Reported length in bytes. Defaults to the full address list.
    #[serde(default, rename = "len", skip_serializing_if = "Option::is_none")]
    pub length_in_bytes: Option<i64>,
    #[serde(with = "address_serde::vec")]
    pub addresses: Vec<Address>,
}

impl ProbeCapture {
    pub fn new(probe: impl Into<String>, stack: CapturedStack) -> Self {
        Self {
            probe: probe.into(),
            length_in_bytes: Some(stack.length_in_bytes),
            addresses: stack.addresses,
        }
    }

    pub fn stack(&self) -> CapturedStack {
        let length = self
            .length_in_bytes
            .unwrap_or_else(|| (self.addresses.len() * ADDRESS_SIZE) as i64);
        CapturedStack::new(self.addresses.clone(), length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureSet {
    #[serde(default)]
    pub captures: Vec<ProbeCapture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Checked { verdict: Verdict },
    MissingCapture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe: String,
    pub kind: ProbeKind,
    /// Expected chain in call order, for display.
    pub chain: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, ProbeOutcome::Checked { verdict } if verdict.is_pass())
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.outcome {
            ProbeOutcome::Checked { verdict } => Some(verdict),
            ProbeOutcome::MissingCapture => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub results: Vec<ProbeResult>,
    /// Captures whose probe is not part of the suite.
    #[serde(default)]
    pub unexpected: Vec<String>,
}

impl SuiteReport {
    /// True when every probe was captured and validated. Unexpected captures
    /// do not fail a suite.
    pub fn passed(&self) -> bool {
        self.results.iter().all(ProbeResult::passed)
    }

    pub fn pass_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.results.len() - self.pass_count()
    }

    pub fn result(&self, probe: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.probe == probe)
    }
}

/// Validate each probe of `suite` against its capture in `captures`.
pub fn run_suite(
    registry: &RangeRegistry,
    suite: &ScenarioSuite,
    captures: &CaptureSet,
) -> Result<SuiteReport, ScenarioError> {
    let resolved = suite.resolve(registry)?;

    let mut seen = HashSet::new();
    for capture in &captures.captures {
        if !seen.insert(capture.probe.as_str()) {
            return Err(ScenarioError::DuplicateCapture(capture.probe.clone()));
        }
    }

    let mut results = Vec::with_capacity(resolved.len());
    for probe in resolved {
        let capture = captures.captures.iter().find(|c| c.probe == probe.probe);
        let outcome = match capture {
            Some(capture) => {
                let verdict = validate(&capture.stack(), &probe.chain);
                if !verdict.is_pass() {
                    warn!("Probe '{}' ({}) failed: {verdict}", probe.probe, probe.kind);
                }
                ProbeOutcome::Checked { verdict }
            }
            None => {
                warn!("No capture supplied for probe '{}'", probe.probe);
                ProbeOutcome::MissingCapture
            }
        };
        results.push(ProbeResult {
            probe: probe.probe,
            kind: probe.kind,
            chain: probe.chain.to_string(),
            outcome,
        });
    }

    let unexpected: Vec<String> = captures
        .captures
        .iter()
        .filter(|c| !suite.probes.iter().any(|p| p.probe == c.probe))
        .map(|c| c.probe.clone())
        .collect();

    let report = SuiteReport { suite: suite.name.clone(), results, unexpected };
    info!(
        "Suite '{}': {} passed, {} failed",
        report.suite,
        report.pass_count(),
        report.fail_count()
    );
    Ok(report)
}
