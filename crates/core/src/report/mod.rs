//! Human-readable diagnostics for captured stacks.
//!
//! Nothing here influences a verdict; it only labels addresses so a failing
//! capture can be read by eye.

use std::fmt;

use crate::model::{Address, CapturedStack};
use crate::registry::{RangeRef, RangeRegistry};

/// One captured entry annotated with the range it falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLabel<'a> {
    pub position: usize,
    pub address: Address,
    pub range: Option<RangeRef<'a>>,
}

impl fmt::Display for EntryLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(r) => write!(f, "ENTRY #{}: {:#x} (in {})", self.position, self.address, r.name()),
            None => write!(f, "ENTRY #{}: {:#x}", self.position, self.address),
        }
    }
}

/// Lazy walk over the usable entries of a capture. Call [`describe`] again
/// (or clone before iterating) to restart.
#[derive(Debug, Clone)]
pub struct Describe<'a> {
    registry: &'a RangeRegistry,
    entries: &'a [Address],
    next: usize,
}

impl<'a> Iterator for Describe<'a> {
    type Item = EntryLabel<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let address = *self.entries.get(self.next)?;
        let position = self.next;
        self.next += 1;
        Some(EntryLabel { position, address, range: self.registry.classify(address) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Describe<'_> {}

/// Label every usable entry of `captured`.
pub fn describe<'a>(registry: &'a RangeRegistry, captured: &'a CapturedStack) -> Describe<'a> {
    Describe { registry, entries: captured.entries(), next: 0 }
}

/// Header lines listing the caller and every target range.
pub fn range_table(registry: &RangeRegistry) -> Vec<String> {
    let caller = registry.caller();
    let mut lines = vec![format!("caller: {:#x} - {:#x}", caller.start, caller.stop)];
    lines.extend(registry.targets().iter().map(ToString::to_string));
    lines
}
