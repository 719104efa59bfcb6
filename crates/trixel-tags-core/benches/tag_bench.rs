//! # Index Benchmarks
//!
//! Performance benchmarks for trixel-tags-core association operations.
//!
//! Run with: `cargo bench -p trixel-tags-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trixel_tags_core::{MemoryStore, RedbStore, TagEngine, codec};

/// Engine where each of `size` ids carries one of ten tags.
fn populated(size: usize) -> TagEngine<MemoryStore> {
    let engine = TagEngine::new(MemoryStore::new());
    for i in 0..size {
        engine
            .associate(&i.to_string(), &format!("tag{}", i % 10))
            .expect("associate");
    }
    engine
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_quote(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote");

    for (name, tag) in [
        ("plain", "landcover/forest"),
        ("escaped", "say \"hi\"\tand\nleave"),
        ("unicode", "ünïcødé \u{200B} tag"),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), tag, |b, tag| {
            b.iter(|| black_box(codec::quote(tag)));
        });
    }

    group.finish();
}

fn bench_associate(c: &mut Criterion) {
    let mut group = c.benchmark_group("associate");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("memory", size), size, |b, &size| {
            b.iter(|| black_box(populated(size)));
        });
    }

    group.bench_function("redb_single", |b| {
        let temp = tempfile::tempdir().expect("temp dir");
        let engine =
            TagEngine::new(RedbStore::open(temp.path().join("bench.redb")).expect("open db"));
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            engine.associate(&n.to_string(), "bench").expect("associate");
        });
    });

    group.finish();
}

fn bench_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookups");

    for size in [1000, 10000].iter() {
        let engine = populated(*size);
        let middle = (size / 2).to_string();

        group.bench_with_input(BenchmarkId::new("tags_of", size), &middle, |b, id| {
            b.iter(|| black_box(engine.tags_of(id)));
        });
        group.bench_with_input(BenchmarkId::new("ids_of", size), "tag3", |b, tag| {
            b.iter(|| black_box(engine.ids_of(tag)));
        });
        group.bench_with_input(BenchmarkId::new("all_tags", size), size, |b, _| {
            b.iter(|| black_box(engine.all_tags()));
        });
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");

    for size in [100, 1000].iter() {
        let engine = populated(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(engine.verify()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_quote,
    bench_associate,
    bench_lookups,
    bench_verify,
);

criterion_main!(benches);
