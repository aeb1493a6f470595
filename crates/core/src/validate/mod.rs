//! Expected call chains and the stack validator.
//!
//! An [`ExpectedChain`] is stored most recent frame first, which is the order
//! a captured stack comes in: `expected[0]` is checked against
//! `captured.addresses[0]`. Recursion is nothing special, just the same range
//! appearing several times in a row.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Address, CapturedStack, NamedRange};
use crate::registry::{RangeRef, RangeRegistry};

/// Ordered expectation for the top of a captured stack, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpectedChain {
    frames: Vec<NamedRange>,
}

impl ExpectedChain {
    /// Chain from frames already ordered most recent first.
    pub fn most_recent_first(frames: Vec<NamedRange>) -> Self {
        Self { frames }
    }

    /// Chain from frames listed in call order (outermost caller first).
    pub fn from_call_order(mut frames: Vec<NamedRange>) -> Self {
        frames.reverse();
        Self { frames }
    }

    pub fn builder() -> ExpectedChainBuilder {
        ExpectedChainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame expected at `position` of the captured stack.
    pub fn get(&self, position: usize) -> Option<&NamedRange> {
        self.frames.get(position)
    }

    pub fn frames(&self) -> &[NamedRange] {
        &self.frames
    }
}

impl fmt::Display for ExpectedChain {
    /// Renders in call order, e.g. `caller -> target_1 -> target_2`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.frames.iter().rev().map(|r| r.name.as_str()).collect();
        f.write_str(&names.join(" -> "))
    }
}

/// Builds a chain the way a call happens: start at the caller and add each
/// callee as it is entered.
#[derive(Debug, Clone, Default)]
pub struct ExpectedChainBuilder {
    call_order: Vec<NamedRange>,
}

impl ExpectedChainBuilder {
    /// Append the next (deeper) frame.
    pub fn call(mut self, range: &NamedRange) -> Self {
        self.call_order.push(range.clone());
        self
    }

    /// Append `range` `depth` times in a row (a self-recursive function).
    pub fn recurse(mut self, range: &NamedRange, depth: usize) -> Self {
        self.call_order.extend(std::iter::repeat(range.clone()).take(depth));
        self
    }

    pub fn build(self) -> ExpectedChain {
        ExpectedChain::from_call_order(self.call_order)
    }
}

/// One captured entry that fell outside its expected range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMismatch {
    pub position: usize,
    pub expected: String,
    pub actual: Address,
    pub expected_start: Address,
    pub expected_stop: Address,
}

impl PositionMismatch {
    /// Which registry range, if any, the offending address actually falls in.
    pub fn actual_range<'a>(&self, registry: &'a RangeRegistry) -> Option<RangeRef<'a>> {
        registry.classify(self.actual)
    }
}

impl fmt::Display for PositionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry #{}: {:#x} not in {} [{:#x}, {:#x})",
            self.position, self.actual, self.expected, self.expected_start, self.expected_stop
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("Captured stack is empty")]
    EmptyStack,
    #[error("Captured stack has {have} entries, expected at least {need}")]
    InsufficientDepth { have: usize, need: usize },
    #[error("{} position(s) outside their expected range", .mismatches.len())]
    Mismatch { mismatches: Vec<PositionMismatch> },
}

/// Outcome of validating one captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail { failure: ValidationFailure },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail { failure } => Some(failure),
        }
    }

    /// Per-position mismatches; empty for a pass or a length failure.
    pub fn mismatches(&self) -> &[PositionMismatch] {
        match self.failure() {
            Some(ValidationFailure::Mismatch { mismatches }) => mismatches,
            _ => &[],
        }
    }

    fn fail(failure: ValidationFailure) -> Self {
        Verdict::Fail { failure }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail { failure } => write!(f, "FAIL: {failure}"),
        }
    }
}

/// Check that the top of `captured` matches `expected` frame by frame.
///
/// The capture may be deeper than the expectation; older frames beyond the
/// chain are not inspected. Every position is checked even after a mismatch.
pub fn validate(captured: &CapturedStack, expected: &ExpectedChain) -> Verdict {
    if captured.length_in_bytes <= 0 {
        debug!("Rejecting capture with length {}", captured.length_in_bytes);
        return Verdict::fail(ValidationFailure::EmptyStack);
    }

    let have = captured.entry_count();
    let need = expected.len();
    if have < need {
        debug!("Capture too shallow: {have} < {need}");
        return Verdict::fail(ValidationFailure::InsufficientDepth { have, need });
    }

    let mut mismatches = Vec::new();
    for position in (0..need).rev() {
        let range = &expected.frames[position];
        let actual = captured.addresses[position];
        if !range.contains(actual) {
            mismatches.push(PositionMismatch {
                position,
                expected: range.name.clone(),
                actual,
                expected_start: range.start,
                expected_stop: range.stop,
            });
        }
    }

    if mismatches.is_empty() {
        Verdict::Pass
    } else {
        mismatches.reverse();
        Verdict::fail(ValidationFailure::Mismatch { mismatches })
    }
}
