//! Human-readable output.

use crate::output::OutputFormatter;
use crate::reading::EnrichedReading;

/// One line per reading, e.g.
/// `Office (F3:50:00:00:00:00): T=21.5C / H=50% / Dew=10.2C / Batt=87% / RSSI=-71dBm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(&self, r: &EnrichedReading) -> String {
        let unit = r.display_unit;
        let dew_point = match r.dew_point.degrees() {
            Some(dp) => format!("{dp}{unit}"),
            None => "n/a".to_string(),
        };
        format!(
            "{} ({}): T={}{unit} / H={}% / Dew={dew_point} / Batt={}% / RSSI={}dBm",
            r.name, r.address, r.temperature, r.humidity, r.battery, r.rssi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DisplayUnit;
    use crate::reading::DewPoint;
    use crate::test_utils::sample_reading;

    #[test]
    fn formats_celsius_reading() {
        assert_eq!(
            TextFormatter.format(&sample_reading()),
            "Bathroom (AA:BB:CC:DD:EE:FF): T=21.5C / H=50% / Dew=10.2C / Batt=87% / RSSI=-71dBm"
        );
    }

    #[test]
    fn formats_fahrenheit_and_missing_dew_point() {
        let mut reading = sample_reading();
        reading.display_unit = DisplayUnit::Fahrenheit;
        reading.temperature = 72.1;
        reading.humidity = 0;
        reading.dew_point = DewPoint::Indeterminate;

        let line = TextFormatter.format(&reading);
        assert!(line.contains("T=72.1F"));
        assert!(line.contains("Dew=n/a /"));
    }
}
