//! `switchbot-meter-listener` library.
//!
//! Decodes SwitchBot Meter (WoSensorTH) BLE advertisements into temperature,
//! humidity, battery and dew point readings.
//!
//! The pieces, leaves first:
//! - [`decoder`] turns raw service data into a [`DecodedReading`]
//! - [`metrics`] derives dew point and display-unit values
//! - [`session`] runs a cancellable scan over a [`scanner::Radio`] and hands
//!   readings to a callback
//!
//! The binary (`src/main.rs`) only sets up logging, signals and exit codes;
//! the run loop lives in [`crate::app`].

pub mod app;
pub mod decoder;
pub mod mac_address;
pub mod metrics;
pub mod names;
pub mod output;
pub mod reading;
pub mod scanner;
pub mod session;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use decoder::{DecodedReading, DeviceKind, DisplayUnit, RawAdvertisement, decode};
pub use mac_address::MacAddress;
pub use metrics::{dew_point_celsius, enrich};
pub use names::{DeviceNames, NameEntry};
pub use output::{Format, OutputFormatter};
pub use reading::{DewPoint, EnrichedReading};
pub use scanner::{Backend, Radio, RealRadio, ScanError};
pub use session::{ScanSession, SessionError, SessionState, SessionSummary, StopHandle, StopReason};
