//! Benchmarks for view construction and element traversal.
//!
//! Compares the flat path (contiguous tensors) against the odometer path
//! (transposed and narrowed views) over the same number of elements.
//!
//! Run with:
//! ```bash
//! cargo bench --bench views_iteration
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use stridx_core::Tensor;

fn ramp(extents: &[usize]) -> Tensor<f64> {
    let n: usize = extents.iter().product();
    Tensor::from_vec((0..n).map(|x| x as f64).collect(), extents).unwrap()
}

/// Benchmark building views (no element is touched)
fn bench_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("views");
    let tensor = ramp(&[32, 32, 32]);

    group.bench_function("select", |b| {
        b.iter(|| black_box(tensor.select(black_box(1), black_box(7)).unwrap()));
    });
    group.bench_function("narrow", |b| {
        b.iter(|| black_box(tensor.narrow(black_box(2), 16, 8).unwrap()));
    });
    group.bench_function("transpose", |b| {
        b.iter(|| black_box(tensor.transpose(black_box(0), black_box(2)).unwrap()));
    });
    group.bench_function("unfold", |b| {
        b.iter(|| black_box(tensor.unfold(black_box(2), 3, 1).unwrap()));
    });

    group.finish();
}

/// Benchmark summing every element through the scalar iterator
fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    for &size in &[16usize, 64, 256] {
        let tensor = ramp(&[size, size]);
        let transposed = tensor.transpose(0, 1).unwrap();
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("flat", size), &tensor, |b, t| {
            b.iter(|| black_box(t.iter().sum::<f64>()));
        });
        group.bench_with_input(BenchmarkId::new("odometer", size), &transposed, |b, t| {
            b.iter(|| black_box(t.iter().sum::<f64>()));
        });
    }

    group.finish();
}

/// Benchmark storage growth through repeated resizes
fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");

    for &chunk in &[0usize, 1024] {
        group.bench_with_input(BenchmarkId::new("grow_by_rows", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut t = Tensor::<f32>::new(&[1, 64]).unwrap();
                for rows in 2..64 {
                    t.resize_chunk(&[rows, 64], chunk).unwrap();
                }
                black_box(t)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_views, bench_iteration, bench_resize);
criterion_main!(benches);
