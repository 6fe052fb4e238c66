//! BlueZ D-Bus backend for SwitchBot Meter scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! An advertisement monitor reports each meter once; later advertisements
//! from the same meter arrive as service data property changes on the
//! device, which are followed by a task per device.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::decoder::{METER_SERVICE_UUID16, RawAdvertisement};
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern, RssiSamplingPeriod};
use bluer::{Adapter, Address, DeviceEvent, DeviceProperty, Session, Uuid};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// AD type "Service Data - 16-bit UUID".
const SERVICE_DATA_UUID16_TYPE: u8 = 0x16;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

fn to_service_data(data: HashMap<Uuid, Vec<u8>>) -> HashMap<u128, Vec<u8>> {
    data.into_iter()
        .map(|(uuid, bytes)| (uuid.as_u128(), bytes))
        .collect()
}

/// Start scanning for SwitchBot Meters using the BlueZ D-Bus backend.
///
/// Advertisements are sent through the returned channel until the receiver
/// is dropped.
pub async fn start_scan() -> Result<mpsc::Receiver<RawAdvertisement>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    log::info!("scanning on adapter {}", adapter.name());

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    // Match on the 16-bit service UUID at the start of the service data
    let pattern = Pattern {
        data_type: SERVICE_DATA_UUID16_TYPE,
        start_position: 0,
        content: METER_SERVICE_UUID16.to_le_bytes().to_vec(),
    };

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            monitor_type: bluer::monitor::Type::OrPatterns,
            rssi_sampling_period: Some(RssiSamplingPeriod::All),
            patterns: Some(vec![pattern]),
            ..Default::default()
        })
        .await?;

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        // Keep all Bluetooth state alive by moving it into this task
        let _session = session;
        let _monitor_manager = monitor_manager;

        loop {
            let event = tokio::select! {
                _ = tx.closed() => break,
                event = monitor_handle.next() => event,
            };
            match event {
                Some(MonitorEvent::DeviceFound(device_id)) => {
                    if let Err(e) = follow_device(&adapter, device_id.device, tx.clone()).await {
                        log::debug!("{}: {e}", MacAddress::from(device_id.device));
                    }
                }
                Some(_) => {}
                None => {
                    log::warn!("advertisement monitor closed");
                    break;
                }
            }
        }
        log::debug!("bluer scan stopped");
    });

    Ok(rx)
}

/// Forward the current and all future service data of a discovered device.
async fn follow_device(
    adapter: &Adapter,
    address: Address,
    tx: mpsc::Sender<RawAdvertisement>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;
    let mac: MacAddress = address.into();
    let mut rssi = device.rssi().await?.unwrap_or_default();

    if let Some(data) = device.service_data().await? {
        let adv = RawAdvertisement {
            address: mac,
            rssi,
            service_data: to_service_data(data),
        };
        if tx.send(adv).await.is_err() {
            return Ok(());
        }
    }

    let mut events = device.events().await?;
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = tx.closed() => break,
                event = events.next() => event,
            };
            let Some(DeviceEvent::PropertyChanged(property)) = event else {
                break;
            };
            match property {
                DeviceProperty::Rssi(value) => rssi = value,
                DeviceProperty::ServiceData(data) => {
                    let adv = RawAdvertisement {
                        address: mac,
                        rssi,
                        service_data: to_service_data(data),
                    };
                    if tx.send(adv).await.is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::METER_SERVICE_UUID;

    #[test]
    fn test_service_data_keys_become_u128() {
        let uuid = Uuid::from_u128(METER_SERVICE_UUID);
        let data = HashMap::from([(uuid, vec![0x54, 0x00])]);
        let converted = to_service_data(data);
        assert_eq!(converted.get(&METER_SERVICE_UUID), Some(&vec![0x54, 0x00]));
    }

    #[test]
    fn test_monitor_pattern_content_is_little_endian() {
        assert_eq!(METER_SERVICE_UUID16.to_le_bytes(), [0x3D, 0xFD]);
    }
}
