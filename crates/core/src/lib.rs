//! stackcheck-core
//!
//! Verification engine for call stacks captured by dynamic instrumentation
//! (entry probes, return probes, user-defined markers).
//!
//! The crate holds the data model, the address-range registry and classifier,
//! the stack validator, diagnostics, and probe scenario suites. It never
//! unwinds stacks or attaches probes itself; captured address lists are
//! inputs.

pub mod config;
pub mod model;
pub mod providers;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod validate;

pub use model::{Address, CapturedStack, NamedRange, ADDRESS_SIZE};
pub use registry::{RangeRegistry, RangeSlot};
pub use validate::{validate, ExpectedChain, Verdict};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
