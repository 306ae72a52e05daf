//! Core parse and lookup benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rpcdb_bench::synthetic_database;
use rpcdb_core::rpc::{RpcDatabase, parse_all};

const SIZES: &[usize] = &[16, 256, 4096];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("rpc_parse_all");
    for &size in SIZES {
        let content = synthetic_database(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &content, |b, content| {
            b.iter(|| criterion::black_box(parse_all(content)));
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("rpc_lookup");
    for &size in SIZES {
        let mut db = RpcDatabase::from_bytes(synthetic_database(size));
        let last_alias = format!("p{}alias0", size - 3);
        let last_number = (100_000 + size - 1) as u32;

        group.bench_function(BenchmarkId::new("by_name_last", size), |b| {
            b.iter(|| criterion::black_box(db.lookup_by_name(last_alias.as_bytes())));
        });
        group.bench_function(BenchmarkId::new("by_number_last", size), |b| {
            b.iter(|| criterion::black_box(db.lookup_by_number(last_number)));
        });
        group.bench_function(BenchmarkId::new("by_name_miss", size), |b| {
            b.iter(|| criterion::black_box(db.lookup_by_name(b"absent")));
        });
    }
    group.finish();
}

fn bench_reentrant(c: &mut Criterion) {
    let mut group = c.benchmark_group("rpc_lookup_into");
    let mut db = RpcDatabase::from_bytes(synthetic_database(256));
    let mut buf = vec![0u8; 256];
    group.bench_function("by_number", |b| {
        b.iter(|| {
            let found = db.lookup_by_number_into(100_128, &mut buf);
            criterion::black_box(found.map(|view| view.map(|v| v.number)))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_lookup, bench_reentrant);
criterion_main!(benches);
