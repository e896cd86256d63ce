//! Benchmark: send + recv round trip
//!
//! # Background
//!
//! Every send converts a value to a token and every receive rebuilds it.
//! Natively shareable kinds share their payload (`Arc`), while containers
//! go through the full fallback and are serialized.
//!
//! This measures one non-blocking send followed by one receive on the same
//! channel, per value shape and size, to keep an eye on:
//!
//! - the cost of the two locks (registry, channel) per operation
//! - buffer sends staying flat as the buffer grows
//! - the gap between native and serialized conversions
//!
//! # When to revisit
//!
//! - If the buffer numbers start growing with size (a copy crept in)
//! - If the registry lock shows up under the contended benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isochan_data::Value;
use isochan_runtime::{ChannelRegistry, SendOptions};
use isochan_types::ContextId;
use std::sync::Arc;

const SENDER: ContextId = ContextId::new(0);
const RECEIVER: ContextId = ContextId::new(1);

fn round_trip(reg: &ChannelRegistry, id: isochan_types::ChannelId, value: &Value) {
    reg.send(SENDER, id, value, SendOptions::nowait())
        .expect("send");
    black_box(reg.recv(RECEIVER, id).expect("recv"));
}

fn bench_send_recv(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_recv");
    let reg = ChannelRegistry::new();
    let id = reg.create_default().expect("create");

    // === Scalars ===

    let int = Value::Int(42);
    group.bench_function("int", |b| b.iter(|| round_trip(&reg, id, &int)));

    let text = Value::from("the quick brown fox");
    group.bench_function("str", |b| b.iter(|| round_trip(&reg, id, &text)));

    // === Buffers vs bytes ===

    for size in [64_usize, 4096, 65536] {
        group.throughput(Throughput::Bytes(size as u64));

        let buffer = Value::buffer(Arc::<[u8]>::from(vec![7_u8; size]));
        group.bench_with_input(BenchmarkId::new("buffer", size), &buffer, |b, v| {
            b.iter(|| round_trip(&reg, id, v));
        });

        let bytes = Value::Bytes(vec![7_u8; size]);
        group.bench_with_input(BenchmarkId::new("bytes", size), &bytes, |b, v| {
            b.iter(|| round_trip(&reg, id, v));
        });
    }

    // === Serialized fallback ===

    for len in [4_usize, 64] {
        let list = Value::List((0..len as i64).map(Value::Int).collect());
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("list", len), &list, |b, v| {
            b.iter(|| round_trip(&reg, id, v));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_send_recv);
criterion_main!(benches);
