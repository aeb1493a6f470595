//! Range providers: how the registry learns where each function lives.
//!
//! A provider is any source of `(name, start, stop)` triples. Two ship with
//! the crate:
//! - [`RangeSet`]: ranges spelled out by hand (tests, config files)
//! - `ElfSectionProvider`: linker-generated `__start_<sec>`/`__stop_<sec>`
//!   symbols read from an ELF image (feature `elf-provider`)

#[cfg(feature = "elf-provider")]
pub mod elf;

#[cfg(feature = "elf-provider")]
pub use elf::ElfSectionProvider;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::NamedRange;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to read object file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse object file: {0}")]
    Parse(String),
    #[error("Unsupported object format: {0}")]
    UnsupportedFormat(String),
    #[error("Missing boundary symbol '{0}'")]
    MissingSymbol(String),
    #[error("No target sections found with prefix '{0}'")]
    NoTargets(String),
}

/// The caller range plus the ordered target ranges, as handed to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSet {
    pub caller: NamedRange,
    #[serde(default)]
    pub targets: Vec<NamedRange>,
}

impl RangeSet {
    pub fn new(caller: NamedRange) -> Self {
        Self { caller, targets: Vec::new() }
    }

    pub fn with_target(mut self, target: NamedRange) -> Self {
        self.targets.push(target);
        self
    }
}

/// Capability that yields the ranges a registry is built from.
pub trait RangeProvider: Send + Sync {
    /// Human-readable provider name, used in errors and logs.
    fn name(&self) -> &str;

    fn ranges(&self) -> Result<RangeSet, ProviderError>;
}

impl RangeProvider for RangeSet {
    fn name(&self) -> &str {
        "static"
    }

    fn ranges(&self) -> Result<RangeSet, ProviderError> {
        Ok(self.clone())
    }
}
