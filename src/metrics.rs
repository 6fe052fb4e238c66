//! Derived quantities: unit conversion, dew point and reading enrichment.
//!
//! Everything here is computed in Celsius; conversion to the meter's display
//! unit happens last, followed by rounding to one decimal place.

use crate::decoder::{DecodedReading, DeviceKind, DisplayUnit};
use crate::mac_address::MacAddress;
use crate::reading::{DewPoint, EnrichedReading};
use std::time::SystemTime;

/// Magnus coefficient `a` in millibars.
const MAGNUS_A: f64 = 6.1121;

/// Magnus `(b, c)` over water, used at or above 0 °C.
const MAGNUS_ABOVE_FREEZING: (f64, f64) = (17.368, 238.88);

/// Magnus `(b, c)` used below 0 °C.
const MAGNUS_BELOW_FREEZING: (f64, f64) = (17.966, 247.15);

#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) / 1.8
}

/// Round to one decimal place.
#[inline]
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert a Celsius value into `unit`.
pub fn to_unit(celsius: f64, unit: DisplayUnit) -> f64 {
    match unit {
        DisplayUnit::Celsius => celsius,
        DisplayUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
    }
}

/// Dew point in Celsius (unrounded) for `temperature` °C and `humidity` %.
///
/// Returns [`DewPoint::Indeterminate`] when the vapour pressure is zero (dry
/// air) or the result is otherwise not a finite number.
pub fn dew_point_celsius(temperature: f64, humidity: f64) -> DewPoint {
    let (b, c) = if temperature >= 0.0 {
        MAGNUS_ABOVE_FREEZING
    } else {
        MAGNUS_BELOW_FREEZING
    };

    let saturation = MAGNUS_A * (b * temperature / (c + temperature)).exp();
    let actual = humidity / 100.0 * saturation;
    if actual.is_nan() || actual <= 0.0 {
        return DewPoint::Indeterminate;
    }

    let gamma = (actual / MAGNUS_A).ln();
    let dew_point = c * gamma / (b - gamma);
    if dew_point.is_finite() {
        DewPoint::Degrees(dew_point)
    } else {
        DewPoint::Indeterminate
    }
}

/// Turn a decoded meter reading into the values reported to consumers.
///
/// Returns `None` for unrecognized advertisements.
pub fn enrich(
    decoded: &DecodedReading,
    address: MacAddress,
    name: String,
    timestamp: SystemTime,
) -> Option<EnrichedReading> {
    if decoded.device_kind != DeviceKind::SensorTH {
        return None;
    }

    let unit = decoded.display_unit;
    let celsius = decoded.temperature_celsius();
    let dew_point = match dew_point_celsius(celsius, f64::from(decoded.humidity)) {
        DewPoint::Degrees(dp) => DewPoint::Degrees(round_tenth(to_unit(dp, unit))),
        DewPoint::Indeterminate => DewPoint::Indeterminate,
    };

    Some(EnrichedReading {
        address,
        name,
        timestamp,
        display_unit: unit,
        temperature: round_tenth(to_unit(celsius, unit)),
        dew_point,
        humidity: decoded.humidity,
        battery: decoded.battery,
        rssi: decoded.rssi,
    })
}
