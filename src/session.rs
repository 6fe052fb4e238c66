//! Scan session: one scanning run from start to stop.
//!
//! A [`ScanSession`] moves through `Idle → Scanning → Stopped`. While
//! scanning, every advertisement from the [`Radio`] is decoded and enriched
//! and, if it came from a meter, handed to the consumer callback before the
//! next advertisement is looked at. The session only ends when its
//! [`StopHandle`] fires or the radio goes away; there is no internal timeout.

use crate::decoder::{self, RawAdvertisement};
use crate::metrics;
use crate::names::DeviceNames;
use crate::reading::EnrichedReading;
use crate::scanner::{Radio, ScanError};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::watch;

/// Lifecycle state of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    /// Terminal
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Scanning => write!(f, "scanning"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop handle fired
    Cancelled,
    /// The radio closed its advertisement channel
    RadioClosed,
}

/// Counters for one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: StopReason,
    /// Advertisements taken off the radio channel
    pub received: u64,
    /// Advertisements handed to the consumer
    pub recognized: u64,
    /// Advertisements dropped as not coming from a meter
    pub unrecognized: u64,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("session cannot start while {0}")]
    NotIdle(SessionState),
}

/// Cloneable handle that stops a session.
///
/// Stopping is idempotent and may happen before the session starts, in
/// which case it stops as soon as it begins scanning.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One scanning run over a [`Radio`].
#[derive(Debug)]
pub struct ScanSession {
    names: DeviceNames,
    state: SessionState,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl ScanSession {
    pub fn new(names: DeviceNames) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            names,
            state: SessionState::Idle,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Decode and enrich one advertisement. `None` for anything but a meter.
    pub fn process(&self, advertisement: &RawAdvertisement) -> Option<EnrichedReading> {
        let decoded = decoder::decode(advertisement);
        if !decoded.is_recognized() {
            log::trace!("{}: not a meter", advertisement.address);
            return None;
        }
        let name = self.names.resolve(&advertisement.address);
        metrics::enrich(&decoded, advertisement.address, name, SystemTime::now())
    }

    /// Scan until stopped, calling `consumer` with every meter reading in
    /// delivery order.
    ///
    /// The consumer runs synchronously on the session's task; a consumer
    /// that blocks holds up the scan. Once the stop signal has been observed
    /// the consumer is not called again, even if more advertisements are
    /// already queued.
    ///
    /// # Errors
    /// [`SessionError::NotIdle`] if the session has already run, and
    /// [`SessionError::Scan`] if the radio fails to start scanning.
    pub async fn run<F>(
        &mut self,
        radio: &dyn Radio,
        mut consumer: F,
    ) -> Result<SessionSummary, SessionError>
    where
        F: FnMut(EnrichedReading),
    {
        if self.state != SessionState::Idle {
            return Err(SessionError::NotIdle(self.state));
        }
        self.state = SessionState::Scanning;

        let mut advertisements = match radio.start_scan().await {
            Ok(rx) => rx,
            Err(e) => {
                self.state = SessionState::Stopped;
                return Err(e.into());
            }
        };

        let mut summary = SessionSummary {
            reason: StopReason::Cancelled,
            received: 0,
            recognized: 0,
            unrecognized: 0,
        };
        let mut stop_rx = self.stop_rx.clone();

        loop {
            let advertisement = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                advertisement = advertisements.recv() => advertisement,
            };
            let Some(advertisement) = advertisement else {
                log::warn!("radio closed the advertisement stream");
                summary.reason = StopReason::RadioClosed;
                break;
            };

            summary.received += 1;
            match self.process(&advertisement) {
                Some(reading) => {
                    summary.recognized += 1;
                    consumer(reading);
                }
                None => summary.unrecognized += 1,
            }
        }

        // Dropping the receiver ends the radio scan.
        drop(advertisements);
        self.state = SessionState::Stopped;
        log::debug!(
            "session stopped ({:?}): {} received, {} recognized",
            summary.reason,
            summary.received,
            summary.recognized
        );
        Ok(summary)
    }
}
