//! Output formatters for meter readings.
//!
//! A formatter turns one [`EnrichedReading`] into one line of output. The
//! binary picks a formatter with `--format`.

pub mod domoticz;
pub mod influxdb;
pub mod text;

use crate::reading::EnrichedReading;

/// Trait for formatting readings into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading (without trailing newline).
    fn format(&self, reading: &EnrichedReading) -> String;
}

/// Output formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// InfluxDB line protocol (Telegraf execd input)
    #[default]
    Influxdb,
    /// Domoticz MQTT JSON message
    Domoticz,
    /// Human-readable summary line
    Text,
}

impl Format {
    /// Build the formatter for this format.
    pub fn formatter(self, influxdb_measurement: &str) -> Box<dyn OutputFormatter> {
        match self {
            Format::Influxdb => Box::new(influxdb::InfluxDbFormatter::new(
                influxdb_measurement.to_string(),
            )),
            Format::Domoticz => Box::new(domoticz::DomoticzFormatter),
            Format::Text => Box::new(text::TextFormatter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_reading;

    #[test]
    fn each_format_builds_its_formatter() {
        let reading = sample_reading();
        let influx = Format::Influxdb.formatter("meter").format(&reading);
        let domoticz = Format::Domoticz.formatter("meter").format(&reading);
        let text = Format::Text.formatter("meter").format(&reading);

        assert!(influx.starts_with("meter,"));
        assert!(domoticz.starts_with('{') && domoticz.contains("\"idx\":\"Bathroom\""));
        assert!(text.starts_with("Bathroom (AA:BB:CC:DD:EE:FF)"));
    }
}
