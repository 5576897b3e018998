//! Container encode/decode cost against grid size and zstd level.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use hc_core::{GridSpace, HypercubeConfig, Law, ParametricHypercube};
use hc_store::{decode, encode};

fn built(resolution: usize, ratio: f64) -> ParametricHypercube {
    let grid = GridSpace::uniform(&[("x", 0.0, 4.0), ("y", 0.0, 4.0)], resolution).unwrap();
    let mut cube = ParametricHypercube::new(grid, HypercubeConfig::default()).unwrap();
    cube.build(&Law::expression("exp(-x) * sin(3*y) + x*y / 16"), ratio)
        .unwrap();
    cube
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let cube = built(64, 0.05);
    for level in [1, 3, 9, 19] {
        group.bench_with_input(BenchmarkId::new("level", level), &level, |b, &level| {
            b.iter(|| encode(black_box(&cube), level).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (resolution, ratio) in [(32, 0.05), (64, 0.05), (64, 1.0)] {
        let bytes = encode(&built(resolution, ratio), 3).unwrap();
        group.bench_with_input(
            BenchmarkId::new(format!("r{resolution}"), ratio),
            &bytes,
            |b, bytes| b.iter(|| decode(black_box(bytes)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
