//! Compression, traversal, and serialization throughput over synthetic
//! matrices with controlled value redundancy.
//!
//! Run with: cargo bench --bench encode

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use runcol::{Layout, SparseMatrix};

/// Triplets with ~5% fill drawing from a small value pool, so columns carry
/// the multi-index runs the compression exists for.
fn synthetic_triplets(rows: usize, cols: usize) -> Vec<(usize, usize, f64)> {
    let mut rng = StdRng::seed_from_u64(42);
    let pool = [0.25f64, 1.0, -3.5, 7.0];
    let mut triplets = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if rng.gen_bool(0.05) {
                triplets.push((r, c, pool[rng.gen_range(0..pool.len())]));
            }
        }
    }
    triplets
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    for cols in [64usize, 256, 1024] {
        let rows = 512;
        let triplets = synthetic_triplets(rows, cols);
        group.throughput(Throughput::Elements(triplets.len() as u64));

        group.bench_with_input(BenchmarkId::new("packed", cols), &cols, |bench, _| {
            bench.iter(|| {
                SparseMatrix::<f64>::from_triplets(
                    rows,
                    cols,
                    black_box(&triplets),
                    Layout::Packed,
                )
                .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("counted", cols), &cols, |bench, _| {
            bench.iter(|| {
                SparseMatrix::<f64>::from_triplets(
                    rows,
                    cols,
                    black_box(&triplets),
                    Layout::Counted,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let rows = 512;
    let cols = 1024;
    let triplets = synthetic_triplets(rows, cols);
    let packed = SparseMatrix::<f64>::from_triplets(rows, cols, &triplets, Layout::Packed)
        .unwrap();
    let counted = packed.to_layout(Layout::Counted).unwrap();

    let mut group = c.benchmark_group("traverse");
    group.throughput(Throughput::Elements(packed.nnz() as u64));

    let full_scan = |matrix: &SparseMatrix<f64>| -> f64 {
        let mut total = 0.0;
        for outer in 0..matrix.outer_dim() {
            let mut it = matrix.outer_iter(outer).unwrap();
            while it.has_more() {
                total += it.value();
                it.advance().unwrap();
            }
        }
        total
    };

    group.bench_function("packed", |bench| {
        bench.iter(|| full_scan(black_box(&packed)));
    });
    group.bench_function("counted", |bench| {
        bench.iter(|| full_scan(black_box(&counted)));
    });
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let rows = 512;
    let cols = 1024;
    let triplets = synthetic_triplets(rows, cols);
    let matrix = SparseMatrix::<f64>::from_triplets(rows, cols, &triplets, Layout::Packed)
        .unwrap();
    let bytes = matrix.to_bytes().unwrap();

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("to_bytes", |bench| {
        bench.iter(|| black_box(&matrix).to_bytes().unwrap());
    });
    group.bench_function("from_bytes", |bench| {
        bench.iter(|| SparseMatrix::<f64>::from_bytes(black_box(&bytes)).unwrap());
    });
    group.finish();
}

fn bench_matvec(c: &mut Criterion) {
    let rows = 512;
    let cols = 1024;
    let triplets = synthetic_triplets(rows, cols);
    let matrix = SparseMatrix::<f64>::from_triplets(rows, cols, &triplets, Layout::Packed)
        .unwrap();
    let x: Vec<f64> = (0..cols).map(|c| (c % 7) as f64 - 3.0).collect();

    let mut group = c.benchmark_group("matvec");
    group.throughput(Throughput::Elements(matrix.nnz() as u64));
    group.bench_function("packed", |bench| {
        bench.iter(|| matrix.matvec(black_box(&x)).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compress,
    bench_traverse,
    bench_serialize,
    bench_matvec,
);
criterion_main!(benches);
