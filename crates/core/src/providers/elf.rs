use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use goblin::{elf, Object};
use log::{debug, info};

use crate::model::{Address, NamedRange};
use crate::providers::{ProviderError, RangeProvider, RangeSet};

pub const DEFAULT_CALLER_SECTION: &str = "uretprobe_stack_sec";
pub const DEFAULT_TARGET_PREFIX: &str = "uprobe__";

const START_PREFIX: &str = "__start_";
const STOP_PREFIX: &str = "__stop_";

/// Reads function ranges from the boundary symbols the linker synthesizes for
/// custom sections (`__start_<sec>` / `__stop_<sec>`).
///
/// Each traced function lives in its own section named `<prefix><function>`;
/// the driving routine lives in the caller section.
#[derive(Debug, Clone)]
pub struct ElfSectionProvider {
    pub path: PathBuf,
    pub caller_section: String,
    pub target_prefix: String,
    /// Explicit target sections in registry order. Empty means "every
    /// section carrying the prefix", ordered by name.
    pub target_sections: Vec<String>,
    /// Added to every symbol value (runtime base of a PIE image).
    pub load_bias: Address,
}

impl ElfSectionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            caller_section: DEFAULT_CALLER_SECTION.to_string(),
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            target_sections: Vec::new(),
            load_bias: 0,
        }
    }

    pub fn with_caller_section(mut self, section: impl Into<String>) -> Self {
        self.caller_section = section.into();
        self
    }

    pub fn with_target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = prefix.into();
        self
    }

    pub fn with_target_sections(mut self, sections: Vec<String>) -> Self {
        self.target_sections = sections;
        self
    }

    pub fn with_load_bias(mut self, bias: Address) -> Self {
        self.load_bias = bias;
        self
    }

    /// Build the range set from an in-memory image.
    pub fn ranges_from_bytes(&self, bytes: &[u8]) -> Result<RangeSet, ProviderError> {
        let elf = match Object::parse(bytes) {
            Ok(Object::Elf(elf)) => elf,
            Ok(_) => return Err(ProviderError::UnsupportedFormat("not an ELF image".into())),
            Err(e) => return Err(ProviderError::Parse(e.to_string())),
        };
        let bounds = boundary_symbols(&elf);
        debug!("Found {} boundary-delimited section(s)", bounds.len());

        let caller = self.section_range(&bounds, &self.caller_section, &self.caller_section)?;

        let sections: Vec<String> = if self.target_sections.is_empty() {
            let mut discovered: Vec<String> = bounds
                .keys()
                .filter(|name| {
                    name.starts_with(&self.target_prefix) && **name != self.caller_section
                })
                .cloned()
                .collect();
            discovered.sort_by(|a, b| natural_cmp(a, b));
            if discovered.is_empty() {
                return Err(ProviderError::NoTargets(self.target_prefix.clone()));
            }
            discovered
        } else {
            self.target_sections.clone()
        };

        let mut targets = Vec::with_capacity(sections.len());
        for section in &sections {
            let name = section.strip_prefix(&self.target_prefix).unwrap_or(section);
            targets.push(self.section_range(&bounds, section, name)?);
        }

        info!(
            "Loaded {} target range(s) and caller '{}' from ELF image",
            targets.len(),
            caller.name
        );
        Ok(RangeSet { caller, targets })
    }

    fn section_range(
        &self,
        bounds: &HashMap<String, SectionBounds>,
        section: &str,
        name: &str,
    ) -> Result<NamedRange, ProviderError> {
        let entry = bounds.get(section);
        let start = entry
            .and_then(|b| b.start)
            .ok_or_else(|| ProviderError::MissingSymbol(format!("{START_PREFIX}{section}")))?;
        let stop = entry
            .and_then(|b| b.stop)
            .ok_or_else(|| ProviderError::MissingSymbol(format!("{STOP_PREFIX}{section}")))?;
        Ok(NamedRange::new(
            name,
            start.wrapping_add(self.load_bias),
            stop.wrapping_add(self.load_bias),
        ))
    }
}

impl RangeProvider for ElfSectionProvider {
    fn name(&self) -> &str {
        "elf-sections"
    }

    fn ranges(&self) -> Result<RangeSet, ProviderError> {
        let bytes = read_image(&self.path)?;
        self.ranges_from_bytes(&bytes)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SectionBounds {
    start: Option<Address>,
    stop: Option<Address>,
}

fn read_image(path: &Path) -> Result<Vec<u8>, ProviderError> {
    fs::read(path).map_err(|source| ProviderError::Io { path: path.to_path_buf(), source })
}

/// Collect `__start_*`/`__stop_*` symbols from both the static and dynamic
/// symbol tables, keyed by section name.
fn boundary_symbols(elf: &elf::Elf) -> HashMap<String, SectionBounds> {
    let mut bounds: HashMap<String, SectionBounds> = HashMap::new();
    let tables = [(&elf.syms, &elf.strtab), (&elf.dynsyms, &elf.dynstrtab)];
    for (syms, strtab) in tables {
        for sym in syms.iter() {
            let Some(name) = strtab.get_at(sym.st_name) else { continue };
            if let Some(section) = name.strip_prefix(START_PREFIX) {
                bounds.entry(section.to_string()).or_default().start.get_or_insert(sym.st_value);
            } else if let Some(section) = name.strip_prefix(STOP_PREFIX) {
                bounds.entry(section.to_string()).or_default().stop.get_or_insert(sym.st_value);
            }
        }
    }
    bounds
}

/// Compare names so that embedded numbers order numerically
/// (`target_2` before `target_10`).
fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (head, tail) = s.split_at(s.len() - digits);
        (head, tail.parse().ok())
    }
    let (ha, na) = split(a);
    let (hb, nb) = split(b);
    ha.cmp(hb).then(na.cmp(&nb)).then(a.cmp(b))
}
