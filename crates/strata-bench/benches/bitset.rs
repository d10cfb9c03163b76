//! Bit-vector benchmarks for strata.
//!
//! Benchmarks for:
//! - Random single-bit sets into a resizable bitset
//! - Set algebra between two random bitsets
//! - Scanning set bits
//! - Wire serialization of a bit range

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_bench::utils::random_bitset;
use strata_bitset::DynamicBitSet;

/// Benchmark random sets with growth.
fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitset/set");

    for size in [1000, 100_000].iter() {
        let mut rng = StdRng::seed_from_u64(42);
        let indices: Vec<usize> = (0..*size).map(|_| rng.gen_range(0..size * 16)).collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut bits = DynamicBitSet::allocate_resizable(0).unwrap();
                for &i in &indices {
                    bits.set(i).unwrap();
                }
                black_box(bits.size())
            });
        });
    }

    group.finish();
}

/// Benchmark and/or/xor over equally sized random bitsets.
fn bench_algebra(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitset/algebra");

    let left = random_bitset(50_000, 1 << 20, 1);
    let right = random_bitset(50_000, 1 << 20, 2);

    group.bench_function("and", |b| {
        b.iter(|| {
            let mut bits = left.copy().unwrap();
            bits.and(&right).unwrap();
            black_box(bits.size())
        });
    });
    group.bench_function("or", |b| {
        b.iter(|| {
            let mut bits = left.copy().unwrap();
            bits.or(&right).unwrap();
            black_box(bits.size())
        });
    });
    group.bench_function("xor", |b| {
        b.iter(|| {
            let mut bits = left.copy().unwrap();
            bits.xor(&right).unwrap();
            black_box(bits.size())
        });
    });

    group.finish();
}

/// Benchmark iteration and cardinality.
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitset/scan");

    let bits = random_bitset(100_000, 1 << 22, 3);

    group.bench_function("iter", |b| b.iter(|| black_box(bits.iter().count())));
    group.bench_function("cardinality", |b| b.iter(|| black_box(bits.cardinality())));

    group.finish();
}

/// Benchmark serializing an unaligned range and reading it back.
fn bench_wire(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitset/wire");

    let bits = random_bitset(100_000, 1 << 22, 4);
    let (from, to) = (13, (1 << 22) - 5);
    let mut wire = Vec::new();
    bits.write_to(&mut wire, from, to).unwrap();
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("write", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(wire.len());
            black_box(bits.write_to(&mut out, from, to).unwrap())
        });
    });
    group.bench_function("read", |b| {
        b.iter(|| black_box(DynamicBitSet::read_from(&mut wire.as_slice()).unwrap().size()));
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_algebra, bench_scan, bench_wire);

criterion_main!(benches);
