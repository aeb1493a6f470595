pub mod commands;

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use stackcheck_core::model::{parse_address, Address};

/// SHA-256 of an in-memory image as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Parse a comma- or whitespace-separated list of addresses (`0x401000,0x401020`).
pub fn parse_address_list(text: &str) -> Result<Vec<Address>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| parse_address(s).map_err(|e| anyhow!("{e}")))
        .collect()
}
