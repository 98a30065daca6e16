use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};

use posealign::{procrustes, rigid_align, ExecutionStrategy, ProcrustesConfig};
use posealign_tensor::PointBatch;

fn random_points(batch: usize, n_points: usize, seed: u64) -> PointBatch {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let data = (0..batch * n_points * 3)
        .map(|_| rng.random_range(-1.0..1.0))
        .collect();
    PointBatch::from_shape_vec([batch, n_points, 3], data).expect("shape matches data")
}

fn bench_procrustes(c: &mut Criterion) {
    let mut group = c.benchmark_group("procrustes");

    // 17 joints as in common human pose skeletons
    for batch in [1, 64, 1024] {
        let target = random_points(batch, 17, 0);
        let source = random_points(batch, 17, 1);
        for (name, strategy) in [
            ("serial", ExecutionStrategy::Serial),
            ("parallel", ExecutionStrategy::ParallelElements),
        ] {
            let config = ProcrustesConfig::default()
                .with_scaling(true)
                .with_strategy(strategy);
            group.bench_with_input(
                BenchmarkId::new(name, batch),
                &(&target, &source),
                |b, (target, source)| {
                    b.iter(|| black_box(procrustes(target, source, None, &config)))
                },
            );
        }
    }
    group.finish();
}

fn bench_rigid_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("rigid_align");

    let mut gt = random_points(256, 24, 2);
    // drop every fifth point
    for (i, x) in gt.as_slice_mut().iter_mut().enumerate() {
        if (i / 3) % 5 == 0 {
            *x = f64::NAN;
        }
    }
    let pred = random_points(256, 24, 3);
    let config = ProcrustesConfig::default();

    group.bench_function("masked_256x24", |b| {
        b.iter(|| black_box(rigid_align(&pred, &gt, &config)))
    });
    group.finish();
}

criterion_group!(benches, bench_procrustes, bench_rigid_align);
criterion_main!(benches);
