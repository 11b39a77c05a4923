// Append throughput for the two growth policies, with and without an
// up-front reserve, plus positional insert/erase cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use record_array::{GrowthPolicy, RecordArray};

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for n in &[16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("exact_fit", n), n, |b, &n| {
            b.iter(|| {
                let mut v: RecordArray<u32, u64> = RecordArray::with_capacity(0, 0);
                for i in 0..n as u64 {
                    v.extend_one(black_box(i));
                }
                v
            });
        });

        group.bench_with_input(BenchmarkId::new("amortized", n), n, |b, &n| {
            b.iter(|| {
                let mut v: RecordArray<u32, u64> =
                    RecordArray::with_capacity(0, 0).with_growth_policy(GrowthPolicy::Amortized);
                for i in 0..n as u64 {
                    v.extend_one(black_box(i));
                }
                v
            });
        });

        group.bench_with_input(BenchmarkId::new("reserved", n), n, |b, &n| {
            b.iter(|| {
                let mut v: RecordArray<u32, u64> = RecordArray::with_capacity(0, 0);
                v.reserve(n);
                for i in 0..n as u64 {
                    v.extend_one(black_box(i));
                }
                v
            });
        });
    }

    group.finish();
}

fn bench_insert_erase(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_erase");

    for n in &[16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let items: Vec<u64> = (0..n as u64).collect();
            let mut v: RecordArray<u32, u64> = RecordArray::from_slice(0, &items);
            v.reserve(1);
            b.iter(|| {
                v.insert(black_box(0), 42);
                v.erase(black_box(0))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_insert_erase);
criterion_main!(benches);
