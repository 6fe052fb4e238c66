//! Bluetooth device address of a meter.
//!
//! Backends hand us addresses in their own types (`bluer::Address`, raw
//! little-endian bytes from HCI reports); everything past the radio boundary
//! uses [`MacAddress`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A Bluetooth device address, most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Build an address from the little-endian octet order used on the HCI wire.
    pub fn from_le_bytes(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Errors returned when parsing a colon-separated address string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseMacError {
    #[error("invalid address: expected 6 octets, got {0}")]
    OctetCount(usize),
    #[error("invalid address: octet '{0}' is not two hex digits")]
    InvalidOctet(String),
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.trim().split(':').collect();
        if octets.len() != 6 {
            return Err(ParseMacError::OctetCount(octets.len()));
        }

        let mut bytes = [0u8; 6];
        for (slot, octet) in bytes.iter_mut().zip(&octets) {
            if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ParseMacError::InvalidOctet(octet.to_string()));
            }
            *slot = u8::from_str_radix(octet, 16)
                .map_err(|_| ParseMacError::InvalidOctet(octet.to_string()))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for MacAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_upper_case_colon_separated() {
        let addr = MacAddress([0xD2, 0x68, 0x00, 0x0A, 0xBC, 0x01]);
        assert_eq!(addr.to_string(), "D2:68:00:0A:BC:01");
    }

    #[test]
    fn parses_mixed_case() {
        let addr: MacAddress = "f3:50:0a:Bc:00:ff".parse().unwrap();
        assert_eq!(addr.0, [0xF3, 0x50, 0x0A, 0xBC, 0x00, 0xFF]);
    }

    #[test]
    fn parse_and_display_agree() {
        let text = "FF:A4:00:12:34:56";
        let addr: MacAddress = text.parse().unwrap();
        assert_eq!(addr.to_string(), text);
    }

    #[test]
    fn from_le_bytes_reverses_wire_order() {
        let addr = MacAddress::from_le_bytes([0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(addr, MacAddress([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(
            "D2:68:00".parse::<MacAddress>(),
            Err(ParseMacError::OctetCount(3))
        );
        assert_eq!(
            "D2:68:00:00:00:0G".parse::<MacAddress>(),
            Err(ParseMacError::InvalidOctet("0G".to_string()))
        );
        assert_eq!(
            "D2:68:00:00:00:000".parse::<MacAddress>(),
            Err(ParseMacError::InvalidOctet("000".to_string()))
        );
    }

    #[test]
    fn rejects_signed_octets() {
        assert_eq!(
            "+F:50:00:00:00:00".parse::<MacAddress>(),
            Err(ParseMacError::InvalidOctet("+F".to_string()))
        );
        assert!("D2:68:00:00:00:-1".parse::<MacAddress>().is_err());
    }

    #[cfg(feature = "bluer")]
    #[test]
    fn converts_from_bluer_address() {
        let addr = bluer::Address([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mac: MacAddress = addr.into();
        assert_eq!(mac, MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
    }
}
