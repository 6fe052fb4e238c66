//! Friendly names for meters.
//!
//! Names are collected once at startup (from `--name` arguments and the
//! `METER_NAMES` environment variable) into an immutable [`DeviceNames`]
//! which is then handed to the scan session.

use crate::mac_address::MacAddress;
use std::collections::BTreeMap;

/// A single `MAC=NAME` pair as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct NameEntry {
    /// The meter's address
    pub address: MacAddress,
    /// The human-readable name (e.g. "Bathroom", or a Domoticz idx like "15")
    pub name: String,
}

/// Parse a name entry in the format "MAC=NAME".
///
/// # Example
/// ```
/// use switchbot_meter_listener::names::parse_name_entry;
///
/// let entry = parse_name_entry("D2:68:00:00:00:00=Dining room").unwrap();
/// assert_eq!(entry.address.to_string(), "D2:68:00:00:00:00");
/// assert_eq!(entry.name, "Dining room");
/// ```
pub fn parse_name_entry(src: &str) -> Result<NameEntry, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid name: expected format MAC=NAME".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid name: empty name for {}", address.trim()));
    }
    let address = address.trim().parse().map_err(|e| format!("{e}"))?;
    Ok(NameEntry {
        address,
        name: name.to_string(),
    })
}

/// Several name entries given as one comma-separated string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameList(pub Vec<NameEntry>);

/// Parse a comma-separated list of "MAC=NAME" pairs, skipping empty items.
pub fn parse_name_list(src: &str) -> Result<NameList, String> {
    src.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(parse_name_entry)
        .collect::<Result<_, _>>()
        .map(NameList)
}

/// Immutable lookup from address to display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceNames {
    names: BTreeMap<MacAddress, String>,
}

impl DeviceNames {
    /// Build the lookup table. Later entries win over earlier ones.
    pub fn new(entries: impl IntoIterator<Item = NameEntry>) -> Self {
        Self {
            names: entries.into_iter().map(|e| (e.address, e.name)).collect(),
        }
    }

    /// The configured name for `address`, or the address itself.
    pub fn resolve(&self, address: &MacAddress) -> String {
        match self.names.get(address) {
            Some(name) => name.clone(),
            None => address.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
