//! Meter reading as handed to consumers.

use crate::decoder::DisplayUnit;
use crate::mac_address::MacAddress;
use std::fmt;

/// Dew point of a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DewPoint {
    /// Dew point in the reading's display unit
    Degrees(f64),
    /// Not computable, e.g. at 0 % relative humidity
    Indeterminate,
}

impl DewPoint {
    pub fn degrees(self) -> Option<f64> {
        match self {
            DewPoint::Degrees(v) => Some(v),
            DewPoint::Indeterminate => None,
        }
    }
}

impl fmt::Display for DewPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DewPoint::Degrees(v) => write!(f, "{v}"),
            DewPoint::Indeterminate => write!(f, "n/a"),
        }
    }
}

/// A decoded and enriched SwitchBot Meter reading.
///
/// Temperature and dew point are expressed in `display_unit`, rounded to one
/// decimal place.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedReading {
    /// Address of the meter
    pub address: MacAddress,
    /// Configured name of the meter, or its address
    pub name: String,
    /// Time the advertisement was processed
    pub timestamp: std::time::SystemTime,
    /// Unit the meter's own display is set to
    pub display_unit: DisplayUnit,
    pub temperature: f64,
    pub dew_point: DewPoint,
    /// Relative humidity in percent (0-100)
    pub humidity: u8,
    /// Battery level in percent (0-100)
    pub battery: u8,
    /// Received signal strength in dBm
    pub rssi: i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dew_point_accessors() {
        assert_eq!(DewPoint::Degrees(9.3).degrees(), Some(9.3));
        assert_eq!(DewPoint::Indeterminate.degrees(), None);
        assert_eq!(DewPoint::Degrees(-2.5).to_string(), "-2.5");
        assert_eq!(DewPoint::Indeterminate.to_string(), "n/a");
    }
}
