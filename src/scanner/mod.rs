//! Radio boundary for SwitchBot Meter scanning.
//!
//! A [`Radio`] starts a BLE scan and delivers every advertisement that
//! carries service data as a [`RawAdvertisement`] on a channel. Dropping the
//! receiving end stops the scan. Decoding happens past this boundary, in the
//! scan session.

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use crate::decoder::RawAdvertisement;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
}

/// Channel buffer size for received advertisements.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// Future returned by [`Radio::start_scan`].
pub type ScanFuture<'a> =
    Pin<Box<dyn Future<Output = Result<mpsc::Receiver<RawAdvertisement>, ScanError>> + Send + 'a>>;

/// Source of raw advertisements.
///
/// Implemented by the real backends and by fakes in tests, so the scan
/// session can be driven without Bluetooth hardware.
pub trait Radio: Send + Sync {
    /// Start scanning. The scan runs until the returned receiver is dropped.
    fn start_scan(&self) -> ScanFuture<'_>;
}

/// Available scanner backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// BlueZ D-Bus backend (requires bluetoothd daemon)
    #[cfg(feature = "bluer")]
    Bluer,
    /// Raw HCI socket backend (direct kernel access, no daemon required)
    #[cfg(feature = "hci")]
    Hci,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "bluer")]
        return Backend::Bluer;
        #[cfg(all(feature = "hci", not(feature = "bluer")))]
        return Backend::Hci;
        #[cfg(not(any(feature = "bluer", feature = "hci")))]
        compile_error!("At least one backend feature must be enabled");
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "bluer")]
            Backend::Bluer => write!(f, "bluer"),
            #[cfg(feature = "hci")]
            Backend::Hci => write!(f, "hci"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "bluer")]
            "bluer" | "bluez" => Ok(Backend::Bluer),
            #[cfg(feature = "hci")]
            "hci" | "raw" => Ok(Backend::Hci),
            _ => Err(format!("Unknown backend: {s}")),
        }
    }
}

/// The radio backed by a compiled-in Bluetooth backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealRadio {
    pub backend: Backend,
}

impl RealRadio {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl Radio for RealRadio {
    fn start_scan(&self) -> ScanFuture<'_> {
        let backend = self.backend;
        Box::pin(async move {
            log::debug!("starting {backend} scan");
            match backend {
                #[cfg(feature = "bluer")]
                Backend::Bluer => bluer::start_scan().await,
                #[cfg(feature = "hci")]
                Backend::Hci => hci::start_scan().await,
            }
        })
    }
}
