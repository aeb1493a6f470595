use anyhow::Result;
use serde::Serialize;
use stackcheck_core::model::{address_serde, Address};
use stackcheck_core::report::describe;
use stackcheck_core::CapturedStack;

use crate::commands::{load_registry, RangeSource};
use crate::parse_address_list;

/// Build a capture from a CLI address list. Without `len` the whole list is usable.
pub fn capture_from_args(addresses: &str, len: Option<i64>) -> Result<CapturedStack> {
    let addresses = parse_address_list(addresses)?;
    Ok(match len {
        Some(len) => CapturedStack::new(addresses, len),
        None => CapturedStack::from_addresses(addresses),
    })
}

#[derive(Debug, Serialize)]
pub struct EntryInfo {
    pub position: usize,
    #[serde(with = "address_serde")]
    pub address: Address,
    pub range: Option<String>,
}

/// Label each address of a capture with the range it falls in.
pub fn describe_entries(
    source: &RangeSource,
    addresses: &str,
    len: Option<i64>,
) -> Result<Vec<EntryInfo>> {
    let loaded = load_registry(source)?;
    let captured = capture_from_args(addresses, len)?;
    Ok(describe(&loaded.registry, &captured)
        .map(|label| EntryInfo {
            position: label.position,
            address: label.address,
            range: label.range.map(|r| r.name().to_string()),
        })
        .collect())
}

/// Diagnostic dump of one captured address list.
pub fn describe_command(
    source: &RangeSource,
    addresses: &str,
    len: Option<i64>,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&describe_entries(source, addresses, len)?)?);
        return Ok(());
    }

    let loaded = load_registry(source)?;
    let captured = capture_from_args(addresses, len)?;
    let labels = describe(&loaded.registry, &captured);
    if labels.len() == 0 {
        println!("(no usable entries; length {})", captured.length_in_bytes);
        return Ok(());
    }
    for label in labels {
        println!("{label}");
    }
    Ok(())
}
