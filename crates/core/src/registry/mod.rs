//! Address-range registry and classifier.
//!
//! The registry holds one caller range plus an ordered list of target ranges.
//! Targets are referred to 1-based ("target 1" is the first entry) so that a
//! missing match is never confused with the first real range.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Address, NamedRange};
use crate::providers::{ProviderError, RangeProvider, RangeSet};

/// Keyword that always resolves to the caller range in [`RangeRegistry::lookup`].
pub const CALLER_KEYWORD: &str = "caller";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Range '{name}' has start {start:#x} past stop {stop:#x}")]
    InvalidRange { name: String, start: Address, stop: Address },
    #[error("Range name '{0}' is declared more than once")]
    DuplicateName(String),
    #[error("Target name 'caller' is reserved for the caller range")]
    ReservedName,
    #[error("Range provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Position of a range inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSlot {
    /// 1-based target index.
    Target(usize),
    Caller,
}

impl fmt::Display for RangeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSlot::Target(n) => write!(f, "target #{n}"),
            RangeSlot::Caller => f.write_str(CALLER_KEYWORD),
        }
    }
}

/// A range borrowed from the registry together with its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRef<'a> {
    pub slot: RangeSlot,
    pub range: &'a NamedRange,
}

impl RangeRef<'_> {
    pub fn name(&self) -> &str {
        &self.range.name
    }
}

/// Immutable set of named code ranges, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRegistry {
    caller: NamedRange,
    targets: Vec<NamedRange>,
}

impl RangeRegistry {
    /// Build a registry, rejecting inverted ranges, duplicate names and a
    /// target named [`CALLER_KEYWORD`].
    pub fn new(caller: NamedRange, targets: Vec<NamedRange>) -> Result<Self, RegistryError> {
        if targets.iter().any(|t| t.name == CALLER_KEYWORD) {
            return Err(RegistryError::ReservedName);
        }
        let mut seen = HashSet::new();
        for range in std::iter::once(&caller).chain(targets.iter()) {
            if !range.is_well_formed() {
                return Err(RegistryError::InvalidRange {
                    name: range.name.clone(),
                    start: range.start,
                    stop: range.stop,
                });
            }
            if !seen.insert(range.name.as_str()) {
                return Err(RegistryError::DuplicateName(range.name.clone()));
            }
        }
        info!("Range registry built: caller '{}' and {} target(s)", caller.name, targets.len());
        Ok(Self { caller, targets })
    }

    pub fn from_range_set(set: RangeSet) -> Result<Self, RegistryError> {
        Self::new(set.caller, set.targets)
    }

    /// Populate the registry from an injected provider.
    pub fn from_provider(provider: &dyn RangeProvider) -> Result<Self, RegistryError> {
        let set = provider.ranges().map_err(|source| RegistryError::Provider {
            provider: provider.name().to_string(),
            source,
        })?;
        debug!("Provider '{}' yielded {} target range(s)", provider.name(), set.targets.len());
        Self::from_range_set(set)
    }

    pub fn caller(&self) -> &NamedRange {
        &self.caller
    }

    /// All target ranges in registry order; `targets()[0]` is target 1.
    pub fn targets(&self) -> &[NamedRange] {
        &self.targets
    }

    /// 1-based target lookup. `target(0)` is always `None`.
    pub fn target(&self, n: usize) -> Option<&NamedRange> {
        n.checked_sub(1).and_then(|idx| self.targets.get(idx))
    }

    pub fn range(&self, slot: RangeSlot) -> Option<&NamedRange> {
        match slot {
            RangeSlot::Caller => Some(&self.caller),
            RangeSlot::Target(n) => self.target(n),
        }
    }

    /// Resolve a range by name. `"caller"` (or the caller's own name) maps to
    /// the caller range; anything else must name a target.
    pub fn lookup(&self, name: &str) -> Option<RangeRef<'_>> {
        if name == CALLER_KEYWORD || name == self.caller.name {
            return Some(RangeRef { slot: RangeSlot::Caller, range: &self.caller });
        }
        self.targets
            .iter()
            .position(|r| r.name == name)
            .map(|idx| RangeRef { slot: RangeSlot::Target(idx + 1), range: &self.targets[idx] })
    }

    /// Every range in classification order: targets first, then the caller.
    pub fn iter(&self) -> impl Iterator<Item = RangeRef<'_>> + '_ {
        self.targets
            .iter()
            .enumerate()
            .map(|(idx, range)| RangeRef { slot: RangeSlot::Target(idx + 1), range })
            .chain(std::iter::once(RangeRef { slot: RangeSlot::Caller, range: &self.caller }))
    }

    /// Map an address to the first range containing it, scanning targets in
    /// order and then the caller. Overlapping ranges resolve to the earliest.
    pub fn classify(&self, address: Address) -> Option<RangeRef<'_>> {
        let hit = self.iter().find(|r| r.range.contains(address));
        match &hit {
            Some(r) => debug!("{address:#x} classified as {} ({})", r.name(), r.slot),
            None => debug!("{address:#x} not in any known range"),
        }
        hit
    }

    pub fn to_range_set(&self) -> RangeSet {
        RangeSet { caller: self.caller.clone(), targets: self.targets.clone() }
    }
}
