use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use log::debug;
use stackcheck_core::config::load_range_set;
use stackcheck_core::model::parse_address;
use stackcheck_core::providers::elf::{DEFAULT_CALLER_SECTION, DEFAULT_TARGET_PREFIX};
use stackcheck_core::providers::ElfSectionProvider;
use stackcheck_core::RangeRegistry;

use crate::sha256_hex;

/// Where the address ranges come from: a ranges file or an ELF image.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeSource {
    /// YAML/JSON file declaring the caller and target ranges.
    #[arg(long, conflicts_with = "elf")]
    pub ranges: Option<String>,

    /// ELF image carrying `__start_<sec>`/`__stop_<sec>` boundary symbols.
    #[arg(long)]
    pub elf: Option<String>,

    /// Section holding the calling routine (ELF source only).
    #[arg(long, default_value = DEFAULT_CALLER_SECTION)]
    pub caller_section: String,

    /// Prefix shared by the per-function target sections (ELF source only).
    #[arg(long, default_value = DEFAULT_TARGET_PREFIX)]
    pub target_prefix: String,

    /// Explicit target section, repeatable; fixes the target order.
    #[arg(long = "target-section")]
    pub target_sections: Vec<String>,

    /// Runtime load bias added to every ELF symbol (e.g. 0x555555554000).
    #[arg(long)]
    pub load_bias: Option<String>,
}

impl RangeSource {
    pub fn from_ranges_file(path: impl Into<String>) -> Self {
        Self {
            ranges: Some(path.into()),
            caller_section: DEFAULT_CALLER_SECTION.to_string(),
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            ..Self::default()
        }
    }

    pub fn from_elf(path: impl Into<String>) -> Self {
        Self {
            elf: Some(path.into()),
            caller_section: DEFAULT_CALLER_SECTION.to_string(),
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            ..Self::default()
        }
    }
}

/// A registry plus a note on where it came from.
#[derive(Debug)]
pub struct LoadedRanges {
    pub registry: RangeRegistry,
    pub source: String,
    /// SHA-256 of the ELF image when ranges were read from one.
    pub binary_hash: Option<String>,
}

/// Build the registry described by `source`.
pub fn load_registry(source: &RangeSource) -> Result<LoadedRanges> {
    match (&source.ranges, &source.elf) {
        (Some(path), None) => {
            let set = load_range_set(Path::new(path))?;
            let registry = RangeRegistry::from_provider(&set)
                .with_context(|| format!("Invalid ranges in {path}"))?;
            debug!("Ranges loaded from file {path}");
            Ok(LoadedRanges { registry, source: path.clone(), binary_hash: None })
        }
        (None, Some(path)) => {
            let load_bias = match &source.load_bias {
                Some(text) => parse_address(text).map_err(|e| anyhow!("Invalid --load-bias: {e}"))?,
                None => 0,
            };
            let provider = ElfSectionProvider::new(PathBuf::from(path))
                .with_caller_section(&source.caller_section)
                .with_target_prefix(&source.target_prefix)
                .with_target_sections(source.target_sections.clone())
                .with_load_bias(load_bias);
            // Ranges and hash come from a single read of the image.
            let image =
                fs::read(path).with_context(|| format!("Failed to read ELF image {path}"))?;
            let set = provider
                .ranges_from_bytes(&image)
                .with_context(|| format!("Failed to load ranges from ELF image {path}"))?;
            let registry = RangeRegistry::from_provider(&set)
                .with_context(|| format!("Invalid ranges in ELF image {path}"))?;
            let binary_hash = sha256_hex(&image);
            debug!("Ranges loaded from ELF image {path} (sha256 {binary_hash})");
            Ok(LoadedRanges { registry, source: path.clone(), binary_hash: Some(binary_hash) })
        }
        (Some(_), Some(_)) => Err(anyhow!("Use either --ranges or --elf, not both")),
        (None, None) => Err(anyhow!("A range source is required: pass --ranges or --elf")),
    }
}
