//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::reading::EnrichedReading;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Characters escaped in the measurement name.
const MEASUREMENT_SPECIAL: &[char] = &[',', ' '];

/// Characters escaped in tag keys and values.
const TAG_SPECIAL: &[char] = &[',', '=', ' '];

fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", escape(&self.measurement, MEASUREMENT_SPECIAL))?;
        for (key, value) in &self.tag_set {
            write!(
                fmt,
                ",{}={}",
                escape(key, TAG_SPECIAL),
                escape(value, TAG_SPECIAL)
            )?;
        }

        let mut separator = " ";
        for (key, value) in &self.field_set {
            write!(fmt, "{separator}{key}={value}")?;
            separator = ",";
        }

        let nanos = self
            .timestamp
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok());
        if let Some(nanos) = nanos {
            write!(fmt, " {}", nanos.as_nanos())?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Tags carry the address, the resolved name and the display unit; the
/// dew point field is left out when it is indeterminate.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(&self, reading: &EnrichedReading) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("mac".to_string(), reading.address.to_string()),
            ("name".to_string(), reading.name.clone()),
            ("unit".to_string(), reading.display_unit.to_string()),
        ])
    }

    fn field_set(&self, reading: &EnrichedReading) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::from([
            (
                "temperature".to_string(),
                FieldValue::Float(reading.temperature),
            ),
            (
                "humidity".to_string(),
                FieldValue::Integer(reading.humidity.into()),
            ),
            (
                "battery".to_string(),
                FieldValue::Integer(reading.battery.into()),
            ),
            ("rssi".to_string(), FieldValue::Integer(reading.rssi.into())),
        ]);
        if let Some(dew_point) = reading.dew_point.degrees() {
            fields.insert("dew_point".to_string(), FieldValue::Float(dew_point));
        }
        fields
    }

    fn to_data_point(&self, reading: &EnrichedReading) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(reading),
            field_set: self.field_set(reading),
            timestamp: Some(reading.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &EnrichedReading) -> String {
        self.to_data_point(reading).to_string()
    }
}
