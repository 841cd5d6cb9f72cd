//! Encode/decode throughput benchmarks.

#![allow(missing_docs)]

use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use resp_protocol::{Command, Value};
use std::hint::black_box;

fn bench_encode_command(c: &mut Criterion) {
    let cmd = Command::new("HMSET")
        .arg("session:12345")
        .arg("user")
        .arg("alice")
        .arg("seen")
        .arg("1700000000");

    c.bench_function("encode_hmset", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(128);
            black_box(&cmd).encode(&mut buf);
            black_box(buf);
        });
    });
}

fn bench_decode_replies(c: &mut Criterion) {
    let mut wire = BytesMut::new();
    Value::Array(vec![
        Value::Bulk("alice".into()),
        Value::Nil,
        Value::Integer(42),
    ])
    .encode(&mut wire);
    Value::Simple("OK".into()).encode(&mut wire);
    let wire = wire.freeze();

    c.bench_function("decode_mixed_replies", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            while let Some(value) = Value::decode(&mut buf).unwrap() {
                black_box(value);
            }
        });
    });
}

criterion_group!(benches, bench_encode_command, bench_decode_replies);
criterion_main!(benches);
