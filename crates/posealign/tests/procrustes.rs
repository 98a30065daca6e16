use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use posealign::linalg::batched_determinant;
use posealign::tensor::{PointBatch, ValidityMask};
use posealign::{
    procrustes, procrustes_per_element, procrustes_transform, ExecutionStrategy,
    ProcrustesConfig, ProcrustesError,
};

type Mat3 = [[f64; 3]; 3];

fn random_rotation(rng: &mut StdRng) -> Mat3 {
    let mut q = [0.0f64; 4];
    for v in q.iter_mut() {
        *v = rng.random_range(-1.0..1.0);
    }
    let n = q.iter().map(|v| v * v).sum::<f64>().sqrt();
    let [w, x, y, z] = q.map(|v| v / n);
    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

fn random_points(rng: &mut StdRng, n: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|_| {
            [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ]
        })
        .collect()
}

/// `k * r * p + t` for every point `p`.
fn transform_points(points: &[[f64; 3]], r: &Mat3, k: f64, t: [f64; 3]) -> Vec<[f64; 3]> {
    points
        .iter()
        .map(|p| {
            let mut out = [0.0; 3];
            for (i, o) in out.iter_mut().enumerate() {
                *o = k * (r[i][0] * p[0] + r[i][1] * p[1] + r[i][2] * p[2]) + t[i];
            }
            out
        })
        .collect()
}

fn assert_points_close(a: &PointBatch, b: &PointBatch, epsilon: f64) {
    assert_eq!(a.shape, b.shape);
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_relative_eq!(x, y, epsilon = epsilon);
    }
}

#[test]
fn recovers_rotation_and_translation() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut targets = Vec::new();
    let mut sources = Vec::new();
    let mut rotations = Vec::new();
    for _ in 0..8 {
        let x = random_points(&mut rng, 20);
        let r = random_rotation(&mut rng);
        let t = [
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        ];
        sources.push(transform_points(&x, &r, 1.0, t));
        targets.push(x);
        rotations.push(r);
    }
    let target = PointBatch::from_point_sets(&targets)?;
    let source = PointBatch::from_point_sets(&sources)?;

    let config = ProcrustesConfig::default();
    let transform = procrustes_transform(&target, &source, None, &config)?;

    for (b, r) in rotations.iter().enumerate() {
        let t = transform.rotation_at(b).ok_or("missing batch element")?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(t[i * 3 + j], r[i][j], epsilon = 1e-9);
            }
        }
        assert_eq!(transform.scale_at(b), Some(1.0));
    }

    let aligned = transform.apply(&source, config.strategy)?;
    assert_points_close(&aligned, &target, 1e-9);
    Ok(())
}

#[test]
fn alignment_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let target =
        PointBatch::from_point_sets(&[random_points(&mut rng, 15), random_points(&mut rng, 15)])?;
    // unrelated source sets so that the fit is not exact
    let source =
        PointBatch::from_point_sets(&[random_points(&mut rng, 15), random_points(&mut rng, 15)])?;

    let config = ProcrustesConfig::default().with_scaling(true);
    let once = procrustes(&target, &source, None, &config)?;
    let twice = procrustes(&target, &once, None, &config)?;
    assert_points_close(&once, &twice, 1e-9);
    Ok(())
}

#[test]
fn recovers_uniform_scale() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(3);
    let x = random_points(&mut rng, 12);
    let r = random_rotation(&mut rng);
    let y = transform_points(&x, &r, 2.5, [0.3, -1.0, 4.0]);

    let target = PointBatch::from_point_sets(&[x])?;
    let source = PointBatch::from_point_sets(&[y])?;

    let config = ProcrustesConfig::default().with_scaling(true);
    let transform = procrustes_transform(&target, &source, None, &config)?;
    assert_relative_eq!(transform.scale.as_slice()[0], 1.0 / 2.5, epsilon = 1e-9);
    assert_points_close(&transform.apply(&source, config.strategy)?, &target, 1e-9);

    // and the other way around
    let transform = procrustes_transform(&source, &target, None, &config)?;
    assert_relative_eq!(transform.scale.as_slice()[0], 2.5, epsilon = 1e-9);

    // without scaling the fitted scale stays at one
    let transform = procrustes_transform(&target, &source, None, &ProcrustesConfig::default())?;
    assert_eq!(transform.scale.as_slice(), &[1.0]);
    Ok(())
}

#[test]
fn reflection_is_removed_unless_allowed() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(11);
    let mirror = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut targets = Vec::new();
    let mut sources = Vec::new();
    for _ in 0..4 {
        let x = random_points(&mut rng, 10);
        sources.push(transform_points(&x, &mirror, 1.0, [1.0, 1.0, 1.0]));
        targets.push(x);
    }
    let target = PointBatch::from_point_sets(&targets)?;
    let source = PointBatch::from_point_sets(&sources)?;

    for scaling in [false, true] {
        let config = ProcrustesConfig::default().with_scaling(scaling);
        let proper = procrustes_transform(&target, &source, None, &config)?;
        let det = batched_determinant(&proper.rotation, ExecutionStrategy::Serial)?;
        for d in det.as_slice() {
            assert_relative_eq!(*d, 1.0, epsilon = 1e-9);
        }

        let improper =
            procrustes_transform(&target, &source, None, &config.with_reflection(true))?;
        let det = batched_determinant(&improper.rotation, ExecutionStrategy::Serial)?;
        for d in det.as_slice() {
            assert_relative_eq!(*d, -1.0, epsilon = 1e-9);
        }
        assert_points_close(
            &improper.apply(&source, ExecutionStrategy::Serial)?,
            &target,
            1e-9,
        );
    }
    Ok(())
}

#[test]
fn masked_points_do_not_influence_the_fit() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(5);
    let x = random_points(&mut rng, 10);
    let r = random_rotation(&mut rng);
    let mut y = transform_points(&x, &r, 1.3, [0.5, 0.0, -2.0]);
    for (i, p) in y.iter_mut().enumerate() {
        for v in p.iter_mut() {
            *v += 0.01 * ((i * 7 % 5) as f64 - 2.0);
        }
    }

    let invalid = [2usize, 5, 9];
    let mut x_masked = x.clone();
    let mut y_masked = y.clone();
    for &i in &invalid {
        x_masked[i] = [f64::NAN, 1e6, -3.0];
        y_masked[i] = [f64::NAN, f64::NAN, 42.0];
    }
    let mask = ValidityMask::from_shape_vec(
        [1, 10],
        (0..10).map(|i| !invalid.contains(&i)).collect(),
    )?;

    let keep = |points: &[[f64; 3]]| -> Vec<[f64; 3]> {
        points
            .iter()
            .enumerate()
            .filter(|(i, _)| !invalid.contains(i))
            .map(|(_, p)| *p)
            .collect()
    };

    let config = ProcrustesConfig::default().with_scaling(true);
    let masked = procrustes_transform(
        &PointBatch::from_point_sets(&[x_masked])?,
        &PointBatch::from_point_sets(&[y_masked])?,
        Some(&mask),
        &config,
    )?;
    let reduced = procrustes_transform(
        &PointBatch::from_point_sets(&[keep(&x)])?,
        &PointBatch::from_point_sets(&[keep(&y)])?,
        None,
        &config,
    )?;

    for (a, b) in masked
        .rotation
        .as_slice()
        .iter()
        .chain(masked.scale.as_slice())
        .chain(masked.mean_source.as_slice())
        .chain(masked.mean_target.as_slice())
        .zip(
            reduced
                .rotation
                .as_slice()
                .iter()
                .chain(reduced.scale.as_slice())
                .chain(reduced.mean_source.as_slice())
                .chain(reduced.mean_target.as_slice()),
        )
    {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn end_to_end_quarter_turn() -> Result<(), Box<dyn std::error::Error>> {
    let quarter_turn = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    let sets = [
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ],
        vec![
            [1.0, 2.0, 0.5],
            [-1.0, 0.0, 2.0],
            [0.5, -0.5, -1.0],
            [2.0, 1.0, 1.0],
        ],
    ];
    let target = PointBatch::from_point_sets(&sets)?;
    let source = PointBatch::from_point_sets(
        &sets
            .iter()
            .map(|x| transform_points(x, &quarter_turn, 1.0, [1.0, 2.0, 3.0]))
            .collect::<Vec<_>>(),
    )?;

    let mask = ValidityMask::from_shape_val([2, 4], true);
    let config = ProcrustesConfig::default();
    let transform = procrustes_transform(&target, &source, Some(&mask), &config)?;

    // row vectors are multiplied from the left, so the matrix undoing the turn equals it
    for b in 0..2 {
        let r = transform.rotation_at(b).ok_or("missing batch element")?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(r[i * 3 + j], quarter_turn[i][j], epsilon = 1e-4);
            }
        }
    }
    let translation = transform.translation();
    for t in translation.outer_iter() {
        assert_relative_eq!(t[0], -2.0, epsilon = 1e-4);
        assert_relative_eq!(t[1], 1.0, epsilon = 1e-4);
        assert_relative_eq!(t[2], -3.0, epsilon = 1e-4);
    }

    let aligned = procrustes(&target, &source, Some(&mask), &config)?;
    assert_points_close(&aligned, &target, 1e-4);
    Ok(())
}

#[test]
fn empty_mask_is_reported_per_element() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(9);
    let target = PointBatch::from_point_sets(&[
        random_points(&mut rng, 6),
        random_points(&mut rng, 6),
        random_points(&mut rng, 6),
    ])?;
    let source = target.map(|v| v + 1.0);
    let mut mask = ValidityMask::from_shape_val([3, 6], true);
    if let Some(row) = mask.outer_mut(1) {
        row.fill(false);
    }

    let config = ProcrustesConfig::default();
    let res = procrustes(&target, &source, Some(&mask), &config);
    assert_eq!(res, Err(ProcrustesError::InvalidMask { batch_index: 1 }));

    let per_element = procrustes_per_element(&target, &source, Some(&mask), &config)?;
    assert_eq!(per_element.len(), 3);
    assert!(per_element[0].is_ok());
    assert_eq!(
        per_element[1].as_ref().err(),
        Some(&ProcrustesError::InvalidMask { batch_index: 1 })
    );
    let last = per_element[2].as_ref().map_err(|e| e.clone())?;
    assert_eq!(last.batch_size(), 1);
    let full = procrustes_transform(
        &PointBatch::from_shape_slice([1, 6, 3], target.outer(2).ok_or("missing element")?)?,
        &PointBatch::from_shape_slice([1, 6, 3], source.outer(2).ok_or("missing element")?)?,
        None,
        &config,
    )?;
    assert_eq!(last, &full);
    Ok(())
}

#[test]
fn coincident_points_fail_decomposition() -> Result<(), Box<dyn std::error::Error>> {
    let target = PointBatch::from_point_sets(&[
        vec![[1.0, 2.0, 3.0]; 4],
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    ])?;
    let res = procrustes(&target, &target, None, &ProcrustesConfig::default());
    assert!(matches!(
        res,
        Err(ProcrustesError::DecompositionFailure { batch_index: 0, .. })
    ));
    Ok(())
}

#[test]
fn strategies_give_identical_results() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(1234);
    let targets = (0..64).map(|_| random_points(&mut rng, 17)).collect::<Vec<_>>();
    let sources = (0..64).map(|_| random_points(&mut rng, 17)).collect::<Vec<_>>();
    let target = PointBatch::from_point_sets(&targets)?;
    let source = PointBatch::from_point_sets(&sources)?;

    let base = ProcrustesConfig::default().with_scaling(true);
    let serial = procrustes_transform(
        &target,
        &source,
        None,
        &base.with_strategy(ExecutionStrategy::Serial),
    )?;
    for strategy in [ExecutionStrategy::ParallelElements, ExecutionStrategy::Fixed(3)] {
        let other = procrustes_transform(&target, &source, None, &base.with_strategy(strategy))?;
        assert_eq!(serial, other);
    }
    Ok(())
}

#[test]
fn shape_errors_come_first() -> Result<(), Box<dyn std::error::Error>> {
    let target = PointBatch::zeros([2, 5, 3]);
    let source = PointBatch::zeros([2, 5, 3]);
    // degenerate data, but the bad mask shape is reported first
    let mask = ValidityMask::from_shape_val([2, 4], true);
    let res = procrustes(&target, &source, Some(&mask), &ProcrustesConfig::default());
    assert!(matches!(res, Err(ProcrustesError::ShapeMismatch { .. })));

    let res =
        procrustes_per_element(&target, &source, Some(&mask), &ProcrustesConfig::default());
    assert!(matches!(res, Err(ProcrustesError::ShapeMismatch { .. })));
    Ok(())
}
