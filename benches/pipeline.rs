//! Integration benchmark for the meter processing pipeline.
//!
//! Feeds raw advertisements from a fake radio through `run_with_io`:
//! decode -> enrich -> format -> write.

use clap::Parser;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use switchbot_meter_listener::app::{Options, run_with_io};
use switchbot_meter_listener::scanner::ScanFuture;
use switchbot_meter_listener::{MacAddress, Radio, RawAdvertisement};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// 22.3 °C, Fahrenheit display, 5 % humidity, 85 % battery
const METER_PAYLOAD: [u8; 6] = [0x54, 0x00, 0x55, 0x03, 0x96, 0x85];

/// A radio that replays advertisements and then closes its channel.
struct FakeRadio {
    advertisements: Vec<RawAdvertisement>,
}

impl Radio for FakeRadio {
    fn start_scan(&self) -> ScanFuture<'_> {
        let advertisements = self.advertisements.clone();
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(advertisements.len().max(1));
            for adv in advertisements {
                let _ = tx.try_send(adv);
            }
            Ok(rx)
        })
    }
}

fn meters(count: usize, devices: u8) -> Vec<RawAdvertisement> {
    (0..count)
        .map(|i| {
            let mac = MacAddress([0xD2, 0x68, 0x00, 0x00, 0x00, (i % devices as usize) as u8]);
            RawAdvertisement::meter(mac, -60, METER_PAYLOAD.to_vec())
        })
        .collect()
}

fn options(args: &[&str]) -> Options {
    let mut argv = vec!["switchbot-meter-listener"];
    argv.extend_from_slice(args);
    Options::parse_from(argv)
}

fn run(rt: &Runtime, radio: &FakeRadio, options: Options, capacity: usize) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(capacity);
    rt.block_on(async {
        run_with_io(options, radio, std::future::pending(), &mut out)
            .await
            .unwrap();
    });
    out
}

/// Batches of advertisements from a single meter, per output format
fn bench_batch_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_pipeline");
    let rt = Runtime::new().unwrap();

    for format in ["influxdb", "domoticz", "text"] {
        for batch_size in [1, 10, 100] {
            let radio = FakeRadio {
                advertisements: meters(batch_size, 1),
            };
            group.throughput(Throughput::Elements(batch_size as u64));
            group.bench_with_input(
                BenchmarkId::new(format, batch_size),
                &batch_size,
                |b, &size| {
                    b.iter(|| black_box(run(&rt, &radio, options(&["--format", format]), 256 * size)))
                },
            );
        }
    }

    group.finish();
}

/// Mix of meters and foreign devices that get dropped by the decoder
fn bench_mixed_traffic(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_traffic");
    let rt = Runtime::new().unwrap();

    let mut advertisements = meters(10, 10);
    for i in 0..90u8 {
        let mac = MacAddress([0x11, 0x22, 0x33, 0x44, 0x55, i]);
        advertisements.push(RawAdvertisement::meter(mac, -90, vec![0x77, i, 0x00]));
    }
    let radio = FakeRadio { advertisements };

    group.throughput(Throughput::Elements(100));
    group.bench_function("10_meters_90_foreign", |b| {
        b.iter(|| {
            let out = run(
                &rt,
                &radio,
                options(&["--names", "D2:68:00:00:00:00=14,D2:68:00:00:00:01=9"]),
                256 * 10,
            );
            debug_assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 10);
            black_box(out)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_batch_pipeline, bench_mixed_traffic);
criterion_main!(benches);
