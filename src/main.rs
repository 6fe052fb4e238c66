use clap::Parser;
use std::panic::{self, PanicHookInfo};
use switchbot_meter_listener::app::{Options, run_with_io};
use switchbot_meter_listener::scanner::RealRadio;
use switchbot_meter_listener::session::StopReason;

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

/// Log to stderr at `info`, or `debug` with `--verbose`. `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Completes on Ctrl-C. If the signal handler cannot be installed the scan
/// runs until `--duration` elapses or the process is killed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    let radio = RealRadio::new(options.backend);
    let mut stdout = std::io::stdout().lock();

    match run_with_io(options, &radio, ctrl_c(), &mut stdout).await {
        Ok(summary) if summary.reason == StopReason::RadioClosed => {
            log::error!("Bluetooth scan ended unexpectedly");
            std::process::exit(EXIT_ERROR);
        }
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            log::error!("{why}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
