//! Domoticz MQTT message formatter.
//!
//! Produces the JSON accepted on Domoticz's `domoticz/in` topic for a
//! temperature + humidity virtual sensor. The meter's name is used as the
//! device `idx`, so names are expected to be configured as Domoticz indices.

use crate::output::OutputFormatter;
use crate::reading::EnrichedReading;
use serde_json::{Value, json};

/// Domoticz humidity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HumidityStatus {
    Normal = 0,
    Dry = 2,
    Wet = 3,
}

impl HumidityStatus {
    /// Dry up to 40 %, normal up to 65 %, wet above.
    pub fn from_percent(humidity: u8) -> Self {
        match humidity {
            0..=40 => HumidityStatus::Dry,
            41..=65 => HumidityStatus::Normal,
            _ => HumidityStatus::Wet,
        }
    }
}

/// Formatter for Domoticz `domoticz/in` messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomoticzFormatter;

impl OutputFormatter for DomoticzFormatter {
    fn format(&self, reading: &EnrichedReading) -> String {
        // Numeric idx stays a number; anything else (e.g. an unnamed
        // meter's address) is sent as a string.
        let idx = match reading.name.parse::<u64>() {
            Ok(idx) => Value::from(idx),
            Err(_) => Value::from(reading.name.as_str()),
        };
        let status = HumidityStatus::from_percent(reading.humidity) as u8;

        json!({
            "idx": idx,
            "nvalue": 0,
            "svalue": format!("{};{};{status}", reading.temperature, reading.humidity),
            "Battery": reading.battery,
            "RSSI": reading.rssi,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_reading;

    fn parse(message: &str) -> Value {
        serde_json::from_str(message).unwrap()
    }

    #[test]
    fn humidity_status_bands() {
        assert_eq!(HumidityStatus::from_percent(0), HumidityStatus::Dry);
        assert_eq!(HumidityStatus::from_percent(40), HumidityStatus::Dry);
        assert_eq!(HumidityStatus::from_percent(41), HumidityStatus::Normal);
        assert_eq!(HumidityStatus::from_percent(65), HumidityStatus::Normal);
        assert_eq!(HumidityStatus::from_percent(66), HumidityStatus::Wet);
        assert_eq!(HumidityStatus::from_percent(100), HumidityStatus::Wet);
    }

    #[test]
    fn numeric_name_is_used_as_idx() {
        let mut reading = sample_reading();
        reading.name = "14".to_string();

        let message = DomoticzFormatter.format(&reading);
        assert!(!message.contains('\n'));
        assert_eq!(
            parse(&message),
            json!({
                "idx": 14,
                "nvalue": 0,
                "svalue": "21.5;50;0",
                "Battery": 87,
                "RSSI": -71,
            })
        );
    }

    #[test]
    fn other_names_are_quoted() {
        let mut reading = sample_reading();
        reading.name = "Bath \"upstairs\"\t".to_string();
        reading.humidity = 80;

        let message = parse(&DomoticzFormatter.format(&reading));
        assert_eq!(message["idx"], "Bath \"upstairs\"\t");
        assert_eq!(message["svalue"], "21.5;80;3");
    }

    #[test]
    fn unnamed_meter_uses_address_as_idx() {
        let mut reading = sample_reading();
        reading.name = reading.address.to_string();
        reading.humidity = 30;

        let message = parse(&DomoticzFormatter.format(&reading));
        assert_eq!(message["idx"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(message["svalue"], "21.5;30;2");
    }
}
