use crate::decoder::{DisplayUnit, RawAdvertisement};
use crate::mac_address::MacAddress;
use crate::reading::{DewPoint, EnrichedReading};
use crate::scanner::{Radio, ScanError, ScanFuture};
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// A stable address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Build a 6 byte meter payload from its fields.
pub fn meter_payload(
    positive: bool,
    degrees: u8,
    tenths: u8,
    fahrenheit: bool,
    humidity: u8,
    battery: u8,
) -> Vec<u8> {
    vec![
        0x54,
        0x00,
        battery & 0x7F,
        tenths & 0x0F,
        (degrees & 0x7F) | if positive { 0x80 } else { 0 },
        (humidity & 0x7F) | if fahrenheit { 0x80 } else { 0 },
    ]
}

/// A Celsius reading with every field filled in.
pub fn sample_reading() -> EnrichedReading {
    EnrichedReading {
        address: TEST_MAC,
        name: "Bathroom".to_string(),
        timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000),
        display_unit: DisplayUnit::Celsius,
        temperature: 21.5,
        dew_point: DewPoint::Degrees(10.2),
        humidity: 50,
        battery: 87,
        rssi: -71,
    }
}

/// Radio that replays a fixed list of advertisements.
///
/// With `keep_open` the channel stays open after the last advertisement, so
/// the session only ends when it is stopped.
#[derive(Debug)]
pub struct FakeRadio {
    advertisements: Mutex<Vec<RawAdvertisement>>,
    keep_open: bool,
}

impl FakeRadio {
    pub fn new(advertisements: Vec<RawAdvertisement>) -> Self {
        Self {
            advertisements: Mutex::new(advertisements),
            keep_open: false,
        }
    }

    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }
}

impl Radio for FakeRadio {
    fn start_scan(&self) -> ScanFuture<'_> {
        let advertisements = self.advertisements.lock().unwrap().clone();
        let keep_open = self.keep_open;
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(advertisements.len().max(1));
            for adv in advertisements {
                let _ = tx.try_send(adv);
            }
            if keep_open {
                // Held until the receiver goes away.
                tokio::spawn(async move { tx.closed().await });
            }
            Ok(rx)
        })
    }
}

/// Radio whose scan never starts.
#[derive(Debug, Default)]
pub struct BrokenRadio;

impl Radio for BrokenRadio {
    fn start_scan(&self) -> ScanFuture<'_> {
        Box::pin(async { Err(ScanError::Bluetooth("adapter not powered".to_string())) })
    }
}
