//! Throughput Benchmark for FlashRESP
//!
//! This benchmark measures the parser and serializer under typical
//! command and response shapes.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashresp::protocol::{RespParser, RespValue};

fn set_command(value_len: usize) -> RespValue {
    RespValue::array(vec![
        RespValue::bulk_string(Bytes::from("SET")),
        RespValue::bulk_string(Bytes::from("key:000001")),
        RespValue::bulk_string(Bytes::from("x".repeat(value_len))),
    ])
}

/// Benchmark parsing single commands
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, value_len) in [("set_small", 11), ("set_medium", 1024), ("set_large", 64 * 1024)] {
        let wire = set_command(value_len).serialize();
        group.throughput(Throughput::Bytes(wire.len() as u64));

        group.bench_function(name, |b| {
            let mut parser = RespParser::new();
            b.iter(|| {
                let values = parser.feed(black_box(&wire)).unwrap();
                black_box(values);
            });
        });
    }

    group.finish();
}

/// Benchmark a pipelined batch of commands arriving in small chunks
fn bench_parse_chunked(c: &mut Criterion) {
    let mut wire = Vec::new();
    for _ in 0..100 {
        set_command(64).serialize_into(&mut wire);
    }

    let mut group = c.benchmark_group("parse_chunked");
    group.throughput(Throughput::Elements(100));

    for chunk_size in [16, 512, 4096] {
        group.bench_function(format!("pipeline_100_chunk_{}", chunk_size), |b| {
            let mut parser = RespParser::new();
            b.iter(|| {
                let mut count = 0;
                for chunk in wire.chunks(chunk_size) {
                    count += parser.feed(chunk).unwrap().len();
                }
                assert_eq!(count, 100);
            });
        });
    }

    group.finish();
}

/// Benchmark serializing responses
fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ok", |b| {
        let mut buf = Vec::with_capacity(64);
        b.iter(|| {
            buf.clear();
            RespValue::OK.serialize_into(&mut buf);
            black_box(&buf);
        });
    });

    group.bench_function("bulk_1kb", |b| {
        let value = RespValue::bulk_string(Bytes::from("x".repeat(1024)));
        let mut buf = Vec::with_capacity(2048);
        b.iter(|| {
            buf.clear();
            value.serialize_into(&mut buf);
            black_box(&buf);
        });
    });

    group.bench_function("array_100_bulk", |b| {
        let value = RespValue::array(
            (0..100)
                .map(|i| RespValue::bulk_string(Bytes::from(format!("value:{}", i))))
                .collect(),
        );
        let mut buf = Vec::with_capacity(4096);
        b.iter(|| {
            buf.clear();
            value.serialize_into(&mut buf);
            black_box(&buf);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_parse_chunked, bench_serialize);
criterion_main!(benches);
