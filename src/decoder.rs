//! SwitchBot Meter advertisement decoder.
//!
//! The meter broadcasts a 6 byte service data payload under the 16-bit
//! service UUID `0xFD3D`:
//!
//! | byte | bits   | meaning                                              |
//! |------|--------|------------------------------------------------------|
//! | 0    | all    | device type, `0x54` (`'T'`) for the WoSensorTH meter |
//! | 2    | 0..=6  | battery percent                                      |
//! | 3    | 0..=3  | tenths of a degree                                   |
//! | 4    | 0..=6  | whole degrees Celsius                                |
//! | 4    | 7      | sign, **set means positive**                         |
//! | 5    | 0..=6  | relative humidity percent                            |
//! | 5    | 7      | display unit, set means Fahrenheit                   |
//!
//! The temperature bits always carry a Celsius value. The unit flag only
//! records what the meter's own display is set to.

use crate::mac_address::MacAddress;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// `0000fd3d-0000-1000-8000-00805f9b34fb`, the SwitchBot service data UUID.
pub const METER_SERVICE_UUID: u128 = 0x0000fd3d_0000_1000_8000_00805f9b34fb;

/// 16-bit alias of [`METER_SERVICE_UUID`], as seen in raw AD structures.
pub const METER_SERVICE_UUID16: u16 = 0xfd3d;

/// Device type byte of the WoSensorTH meter.
pub const SENSOR_TH_DEVICE_TYPE: u8 = 0x54;

/// Number of payload bytes the decoder reads.
pub const METER_PAYLOAD_LEN: usize = 6;

const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit service UUID onto the Bluetooth base UUID.
pub const fn uuid_from_u16(short: u16) -> u128 {
    BLUETOOTH_BASE_UUID | ((short as u128) << 96)
}

/// One advertisement as delivered by a radio backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawAdvertisement {
    /// Address of the advertising device
    pub address: MacAddress,
    /// Received signal strength in dBm
    pub rssi: i16,
    /// Service data keyed by 128-bit service UUID
    pub service_data: HashMap<u128, Vec<u8>>,
}

impl RawAdvertisement {
    /// Advertisement carrying only a meter service data payload.
    pub fn meter(address: MacAddress, rssi: i16, payload: Vec<u8>) -> Self {
        Self {
            address,
            rssi,
            service_data: HashMap::from([(METER_SERVICE_UUID, payload)]),
        }
    }
}

/// Kind of device an advertisement was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    /// SwitchBot Meter (WoSensorTH)
    SensorTH,
    /// Anything else; carries no measurement
    #[default]
    Unrecognized,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::SensorTH => write!(f, "WoSensorTH"),
            DeviceKind::Unrecognized => write!(f, "unknown"),
        }
    }
}

/// Temperature scale configured on the meter's own display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayUnit::Celsius => write!(f, "C"),
            DisplayUnit::Fahrenheit => write!(f, "F"),
        }
    }
}

/// Result of decoding one advertisement.
///
/// When `device_kind` is [`DeviceKind::Unrecognized`] every other field is
/// zero and must not be read as a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedReading {
    pub device_kind: DeviceKind,
    /// Temperature in tenths of a degree Celsius
    pub temperature: i16,
    pub display_unit: DisplayUnit,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Battery level in percent
    pub battery: u8,
    /// Received signal strength in dBm
    pub rssi: i16,
}

impl DecodedReading {
    /// The zeroed reading returned for anything that is not a meter.
    pub fn unrecognized() -> Self {
        Self::default()
    }

    pub fn is_recognized(&self) -> bool {
        self.device_kind == DeviceKind::SensorTH
    }

    /// Temperature in degrees Celsius.
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature) / 10.0
    }
}

/// Fields carried by a meter payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterData {
    /// Temperature in tenths of a degree Celsius
    pub temperature: i16,
    pub display_unit: DisplayUnit,
    pub humidity: u8,
    pub battery: u8,
}

/// Reasons a service data payload is not a meter reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Empty payload")]
    Empty,
    #[error("Unsupported device type 0x{0:02x}")]
    UnsupportedDevice(u8),
    #[error("Truncated payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("{field} out of range: {value}%")]
    OutOfRange { field: &'static str, value: u8 },
}

/// Largest valid humidity or battery percentage.
const MAX_PERCENT: u8 = 100;

fn percent(field: &'static str, raw: u8) -> Result<u8, DecodeError> {
    let value = raw & 0x7F;
    if value > MAX_PERCENT {
        return Err(DecodeError::OutOfRange { field, value });
    }
    Ok(value)
}

/// Decode the meter's service data payload.
pub fn decode_meter_data(data: &[u8]) -> Result<MeterData, DecodeError> {
    let device_type = *data.first().ok_or(DecodeError::Empty)?;
    if device_type != SENSOR_TH_DEVICE_TYPE {
        return Err(DecodeError::UnsupportedDevice(device_type));
    }
    let [_, _, battery, fraction, degrees, humidity] = data
        .get(..METER_PAYLOAD_LEN)
        .and_then(|d| <[u8; METER_PAYLOAD_LEN]>::try_from(d).ok())
        .ok_or(DecodeError::Truncated {
            expected: METER_PAYLOAD_LEN,
            actual: data.len(),
        })?;

    let magnitude = i16::from(degrees & 0x7F) * 10 + i16::from(fraction & 0x0F);
    let temperature = if degrees & 0x80 != 0 {
        magnitude
    } else {
        -magnitude
    };

    let display_unit = if humidity & 0x80 != 0 {
        DisplayUnit::Fahrenheit
    } else {
        DisplayUnit::Celsius
    };

    Ok(MeterData {
        temperature,
        display_unit,
        humidity: percent("humidity", humidity)?,
        battery: percent("battery", battery)?,
    })
}

/// Decode an advertisement.
///
/// Never fails: foreign devices and malformed payloads both come back as
/// [`DecodedReading::unrecognized`].
pub fn decode(advertisement: &RawAdvertisement) -> DecodedReading {
    let Some(payload) = advertisement.service_data.get(&METER_SERVICE_UUID) else {
        return DecodedReading::unrecognized();
    };

    match decode_meter_data(payload) {
        Ok(data) => DecodedReading {
            device_kind: DeviceKind::SensorTH,
            temperature: data.temperature,
            display_unit: data.display_unit,
            humidity: data.humidity,
            battery: data.battery,
            rssi: advertisement.rssi,
        },
        Err(e) => {
            log::debug!("{}: {e}", advertisement.address);
            DecodedReading::unrecognized()
        }
    }
}
