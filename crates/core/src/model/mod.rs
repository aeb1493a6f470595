//! Core data model: addresses, named code ranges, and captured stacks.
//!
//! Everything here is a plain value type. Ranges come from a
//! [`RangeProvider`](crate::providers::RangeProvider) and captured stacks from
//! whatever instrumentation delivered them; neither is mutated by validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw user-space instruction address.
pub type Address = u64;

/// Size in bytes of one captured stack entry.
pub const ADDRESS_SIZE: usize = std::mem::size_of::<Address>();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAddressError {
    #[error("Address string is empty")]
    Empty,
    #[error("Invalid address '{0}'")]
    Invalid(String),
}

/// Parse an address written either as hex (`0x401000`) or as decimal.
pub fn parse_address(text: &str) -> Result<Address, ParseAddressError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseAddressError::Empty);
    }
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => Address::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.replace('_', "").parse::<Address>(),
    };
    parsed.map_err(|_| ParseAddressError::Invalid(trimmed.to_string()))
}

/// Contiguous half-open code range `[start, stop)` attributed to one function
/// or to the calling context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedRange {
    pub name: String,
    #[serde(with = "address_serde")]
    pub start: Address,
    #[serde(with = "address_serde")]
    pub stop: Address,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, start: Address, stop: Address) -> Self {
        Self { name: name.into(), start, stop }
    }

    /// True when `address` lies in `[start, stop)`.
    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.stop
    }

    pub fn is_well_formed(&self) -> bool {
        self.start <= self.stop
    }

    pub fn len(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for NamedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#x} - {:#x}", self.name, self.start, self.stop)
    }
}

/// One stack snapshot delivered by a probe, most recent frame first.
///
/// `length_in_bytes` is what the capture reported, which may be zero or a
/// negative error code. Only `length_in_bytes / ADDRESS_SIZE` entries are
/// meaningful; the buffer may hold stale entries past that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedStack {
    pub addresses: Vec<Address>,
    pub length_in_bytes: i64,
}

impl CapturedStack {
    pub fn new(addresses: Vec<Address>, length_in_bytes: i64) -> Self {
        Self { addresses, length_in_bytes }
    }

    /// Build a capture whose reported length covers exactly `addresses`.
    pub fn from_addresses(addresses: Vec<Address>) -> Self {
        let length_in_bytes = (addresses.len() * ADDRESS_SIZE) as i64;
        Self { addresses, length_in_bytes }
    }

    /// Decode a raw native-endian buffer of addresses as written by the
    /// instrumentation side. Trailing bytes that do not form a full entry
    /// are ignored.
    pub fn from_raw(buffer: &[u8], length_in_bytes: i64) -> Self {
        let addresses = buffer
            .chunks_exact(ADDRESS_SIZE)
            .map(|chunk| {
                let mut word = [0u8; ADDRESS_SIZE];
                word.copy_from_slice(chunk);
                Address::from_ne_bytes(word)
            })
            .collect();
        Self { addresses, length_in_bytes }
    }

    /// Number of usable entries. Zero when the reported length is not positive;
    /// never more than the buffer actually holds.
    pub fn entry_count(&self) -> usize {
        if self.length_in_bytes <= 0 {
            return 0;
        }
        let reported = (self.length_in_bytes as u64 / ADDRESS_SIZE as u64) as usize;
        reported.min(self.addresses.len())
    }

    pub fn is_empty(&self) -> bool {
        self.length_in_bytes <= 0
    }

    /// The usable entries, most recent first.
    pub fn entries(&self) -> &[Address] {
        &self.addresses[..self.entry_count()]
    }
}

/// Serde adapter accepting addresses as integers or hex/decimal strings, and
/// writing them back as `0x`-prefixed hex.
pub mod address_serde {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    use super::{parse_address, Address};

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        deserializer.deserialize_any(AddressVisitor)
    }

    struct AddressVisitor;

    impl<'de> Visitor<'de> for AddressVisitor {
        type Value = Address;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an address as an unsigned integer or a hex string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Address, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Address, E> {
            u64::try_from(value).map_err(|_| E::custom(format!("negative address {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Address, E> {
            parse_address(value).map_err(E::custom)
        }
    }

    /// Same adapter for a list of addresses.
    pub mod vec {
        use serde::de::{SeqAccess, Visitor};
        use serde::ser::SerializeSeq;
        use serde::{Deserializer, Serializer};

        use super::super::Address;

        pub fn serialize<S: Serializer>(
            values: &[Address],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&format!("{value:#x}"))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Address>, D::Error> {
            deserializer.deserialize_seq(AddressListVisitor)
        }

        struct AddressListVisitor;

        #[derive(serde::Deserialize)]
        struct Wrapped(#[serde(with = "super")] Address);

        impl<'de> Visitor<'de> for AddressListVisitor {
            type Value = Vec<Address>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a list of addresses")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Address>, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Wrapped(value)) = seq.next_element()? {
                    out.push(value);
                }
                Ok(out)
            }
        }
    }
}
