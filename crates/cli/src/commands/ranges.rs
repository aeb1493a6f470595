use anyhow::Result;
use serde::Serialize;
use stackcheck_core::model::{address_serde, Address};
use stackcheck_core::report::range_table;

use crate::commands::{load_registry, RangeSource};

#[derive(Debug, Serialize)]
pub struct RangeInfo {
    pub slot: String,
    pub name: String,
    #[serde(with = "address_serde")]
    pub start: Address,
    #[serde(with = "address_serde")]
    pub stop: Address,
}

/// Collect registry entries in classification order (targets, then caller).
pub fn range_infos(source: &RangeSource) -> Result<Vec<RangeInfo>> {
    let loaded = load_registry(source)?;
    Ok(loaded
        .registry
        .iter()
        .map(|r| RangeInfo {
            slot: r.slot.to_string(),
            name: r.range.name.clone(),
            start: r.range.start,
            stop: r.range.stop,
        })
        .collect())
}

/// Print the caller and target ranges known to the registry.
pub fn ranges_command(source: &RangeSource, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&range_infos(source)?)?);
        return Ok(());
    }

    let loaded = load_registry(source)?;
    println!("Ranges from {}:", loaded.source);
    for line in range_table(&loaded.registry) {
        println!("  {line}");
    }
    if let Some(hash) = &loaded.binary_hash {
        println!("  sha256: {hash}");
    }
    Ok(())
}
