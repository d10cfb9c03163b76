//! Big buffer benchmarks for strata.
//!
//! Benchmarks for:
//! - Sequential writes into single-chunk and compound big buffers
//! - Typed reads straddling chunk boundaries
//! - Growable append followed by trim

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_buffer::{Allocator, BigBuffer, GrowableBigBuffer};
use strata_common::config::MemoryConfig;

fn allocators() -> [(&'static str, Allocator); 2] {
    [
        ("single", Allocator::default()),
        ("chunked", Allocator::new(MemoryConfig::for_testing(12)).unwrap()),
    ]
}

/// Benchmark writing a block of longs.
fn bench_put_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("big_buffer/put_values");

    let values: Vec<i64> = (0..65_536).collect();
    group.throughput(Throughput::Bytes(values.len() as u64 * 8));

    for (name, allocator) in allocators() {
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                let mut big = BigBuffer::allocate(&allocator, values.len() as u64 * 8).unwrap();
                big.put_values(&values).unwrap();
                black_box(big.position())
            });
        });
    }

    group.finish();
}

/// Benchmark unaligned absolute reads.
fn bench_get_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("big_buffer/get_i64_at");

    let count = 65_536u64;
    group.throughput(Throughput::Elements(count));

    for (name, allocator) in allocators() {
        let mut big = BigBuffer::allocate(&allocator, count * 8 + 3).unwrap();
        big.set_position(3).unwrap();
        big.put_values(&(0..count as i64).collect::<Vec<_>>()).unwrap();

        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                let mut sum = 0i64;
                for i in 0..count {
                    sum = sum.wrapping_add(big.get_i64_at(3 + i * 8).unwrap());
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

/// Benchmark growable appends of 1 KB blocks and the final trim.
fn bench_growable(c: &mut Criterion) {
    let mut group = c.benchmark_group("big_buffer/growable");

    let block = vec![0xA5u8; 1024];
    for blocks in [64usize, 4096].iter() {
        group.throughput(Throughput::Bytes((*blocks * block.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), blocks, |b, &n| {
            b.iter(|| {
                let mut growable = GrowableBigBuffer::new(Allocator::default());
                for _ in 0..n {
                    growable.put_slice(&block).unwrap();
                }
                black_box(growable.trim().unwrap().capacity())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put_values, bench_get_at, bench_growable);

criterion_main!(benches);
