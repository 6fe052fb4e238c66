//! Core application runner for `switchbot-meter-listener`.
//!
//! This module is decoupled from process setup (logging, signal handling,
//! exit codes) so it can be driven deterministically with a fake radio, an
//! in-memory writer and a hand-made shutdown future.

use crate::names::{DeviceNames, NameEntry, NameList};
use crate::output::Format;
use crate::reading::EnrichedReading;
use crate::scanner::{Backend, Radio};
use crate::session::{ScanSession, SessionError, SessionSummary, StopHandle};
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// Command-line options.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Output format.
    #[arg(long, default_value_t, value_enum)]
    pub format: Format,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "switchbot_meter")]
    pub influxdb_measurement: String,

    /// Human-readable name for a meter.
    /// Format: --name D2:68:00:00:00:00=Kitchen
    #[arg(long = "name", value_parser = crate::names::parse_name_entry, value_name = "MAC=NAME")]
    pub names: Vec<NameEntry>,

    /// Comma-separated MAC=NAME pairs. `--name` entries take precedence.
    #[arg(long = "names", env = "METER_NAMES", value_parser = crate::names::parse_name_list, value_name = "LIST")]
    pub name_list: Option<NameList>,

    /// Stop scanning after this long instead of running until interrupted.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Verbose output, log decoding details
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

impl Options {
    /// The name table built from `--names`/`METER_NAMES` and `--name`.
    pub fn device_names(&self) -> DeviceNames {
        let listed = self.name_list.iter().flat_map(|list| list.0.iter());
        DeviceNames::new(listed.chain(&self.names).cloned())
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Parse a duration from a human-readable string.
///
/// # Examples
/// ```
/// use switchbot_meter_listener::app::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s"
    let units: [(&str, fn(u64) -> Duration); 4] = [
        ("ms", Duration::from_millis),
        ("h", |n| Duration::from_secs(n * 3600)),
        ("m", |n| Duration::from_secs(n * 60)),
        ("s", Duration::from_secs),
    ];
    let seconds = units[3].1;
    let (number, unit) = units
        .iter()
        .find_map(|&(suffix, unit)| src.strip_suffix(suffix).map(|n| (n, unit)))
        .unwrap_or((src, seconds));

    number
        .trim()
        .parse::<u64>()
        .map(unit)
        .map_err(|_| format!("invalid duration: {src}"))
}

/// Resolve once `shutdown` completes or `duration` elapses, then stop.
async fn stop_when(shutdown: impl Future<Output = ()>, duration: Option<Duration>, stop: StopHandle) {
    let elapsed = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        () = shutdown => log::info!("interrupted, stopping scan"),
        () = elapsed => log::info!("scan duration elapsed, stopping scan"),
    }
    stop.stop();
}

/// Run one scan session, writing a formatted line to `out` per reading.
///
/// The session ends when `shutdown` completes, when `options.duration`
/// elapses, when the radio closes, or when writing to `out` fails. A write
/// failure is returned as [`RunError::Io`] after the session has stopped.
pub async fn run_with_io(
    options: Options,
    radio: &dyn Radio,
    shutdown: impl Future<Output = ()>,
    out: &mut dyn Write,
) -> Result<SessionSummary, RunError> {
    let names = options.device_names();
    log::debug!("{} configured meter names", names.len());
    let formatter = options.format.formatter(&options.influxdb_measurement);

    let mut session = ScanSession::new(names);
    let stop = session.stop_handle();
    let mut write_error: Option<io::Error> = None;

    let summary = {
        let consumer_stop = stop.clone();
        let consumer = |reading: EnrichedReading| {
            if write_error.is_some() {
                return;
            }
            let line = formatter.format(&reading);
            if let Err(e) = writeln!(out, "{line}") {
                log::error!("failed to write reading: {e}");
                write_error = Some(e);
                consumer_stop.stop();
            }
        };

        let run = session.run(radio, consumer);
        tokio::pin!(run);
        tokio::select! {
            summary = &mut run => summary?,
            () = stop_when(shutdown, options.duration, stop) => run.await?,
        }
    };

    if let Some(e) = write_error {
        return Err(e.into());
    }

    log::info!(
        "scan finished: {} advertisements, {} meter readings",
        summary.received,
        summary.recognized
    );
    Ok(summary)
}
