//! Benchmarks for the pure decode and dew point paths.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::SystemTime;
use switchbot_meter_listener::decoder::decode_meter_data;
use switchbot_meter_listener::{MacAddress, RawAdvertisement, decode, dew_point_celsius, enrich};

const MAC: MacAddress = MacAddress([0xF3, 0x50, 0x00, 0x00, 0x00, 0x00]);

fn bench_decode(c: &mut Criterion) {
    let payload = [0x54, 0x00, 0x55, 0x03, 0x96, 0x85];
    c.bench_function("decode_meter_data", |b| {
        b.iter(|| decode_meter_data(black_box(&payload)))
    });

    let meter = RawAdvertisement::meter(MAC, -60, payload.to_vec());
    c.bench_function("decode_advertisement", |b| b.iter(|| decode(black_box(&meter))));

    let foreign = RawAdvertisement::default();
    c.bench_function("decode_foreign", |b| b.iter(|| decode(black_box(&foreign))));
}

fn bench_metrics(c: &mut Criterion) {
    c.bench_function("dew_point_celsius", |b| {
        b.iter(|| dew_point_celsius(black_box(22.3), black_box(48.0)))
    });

    let decoded = decode(&RawAdvertisement::meter(MAC, -60, vec![0x54, 0x00, 0x55, 0x03, 0x96, 0x85]));
    c.bench_function("enrich", |b| {
        b.iter(|| enrich(black_box(&decoded), MAC, String::from("Office"), SystemTime::UNIX_EPOCH))
    });
}

criterion_group!(benches, bench_decode, bench_metrics);
criterion_main!(benches);
