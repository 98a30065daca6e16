use argh::FromArgs;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use posealign::tensor::PointBatch;
use posealign::{
    procrustes_aligned_error, procrustes_per_element, ExecutionStrategy, ProcrustesConfig,
};

#[derive(FromArgs)]
/// Align predicted 3D points onto ground truth with Procrustes analysis
struct Args {
    /// path to a JSON file with `gt` and `pred` point sets; synthetic data is used if missing
    #[argh(option, short = 'i')]
    input: Option<PathBuf>,

    /// number of synthetic point sets
    #[argh(option, short = 'b', default = "4")]
    batch_size: usize,

    /// number of points per synthetic point set
    #[argh(option, short = 'n', default = "17")]
    num_points: usize,

    /// rotation about the z axis applied to the synthetic predictions, in degrees
    #[argh(option, default = "30.0")]
    angle: f64,

    /// scale applied to the synthetic predictions
    #[argh(option, default = "1.0")]
    scale: f64,

    /// amplitude of the uniform noise added to the synthetic predictions
    #[argh(option, default = "0.01")]
    noise: f64,

    /// seed of the synthetic data
    #[argh(option, default = "0")]
    seed: u64,

    /// also fit a uniform scale
    #[argh(switch)]
    allow_scaling: bool,

    /// allow the fitted orthogonal matrix to be a reflection
    #[argh(switch)]
    allow_reflection: bool,

    /// process the batch on the calling thread
    #[argh(switch)]
    serial: bool,
}

/// Point sets read from the input file, missing ground-truth points are `null`.
#[derive(serde::Deserialize)]
struct Input {
    gt: Vec<Vec<[Option<f64>; 3]>>,
    pred: Vec<Vec<[f64; 3]>>,
}

fn read_input(path: &Path) -> Result<(PointBatch, PointBatch), Box<dyn std::error::Error>> {
    let input: Input = serde_json::from_reader(std::fs::File::open(path)?)?;
    let gt = input
        .gt
        .iter()
        .map(|set| {
            set.iter()
                .map(|p| p.map(|x| x.unwrap_or(f64::NAN)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    Ok((
        PointBatch::from_point_sets(&gt)?,
        PointBatch::from_point_sets(&input.pred)?,
    ))
}

fn synthetic_input(args: &Args) -> Result<(PointBatch, PointBatch), Box<dyn std::error::Error>> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);
    let (sin, cos) = args.angle.to_radians().sin_cos();

    let mut gt = Vec::with_capacity(args.batch_size);
    let mut pred = Vec::with_capacity(args.batch_size);
    for _ in 0..args.batch_size {
        let offset = [
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ];
        let mut gt_set = Vec::with_capacity(args.num_points);
        let mut pred_set = Vec::with_capacity(args.num_points);
        for _ in 0..args.num_points {
            let p: [f64; 3] = [
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            ];
            let mut noise = || args.noise * rng.random_range(-1.0..1.0);
            pred_set.push([
                args.scale * (cos * p[0] - sin * p[1]) + offset[0] + noise(),
                args.scale * (sin * p[0] + cos * p[1]) + offset[1] + noise(),
                args.scale * p[2] + offset[2] + noise(),
            ]);
            gt_set.push(p);
        }
        // mark one joint as missing
        if let Some(p) = gt_set.first_mut() {
            *p = [f64::NAN; 3];
        }
        gt.push(gt_set);
        pred.push(pred_set);
    }

    Ok((
        PointBatch::from_point_sets(&gt)?,
        PointBatch::from_point_sets(&pred)?,
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let (gt, pred) = match &args.input {
        Some(path) => read_input(path)?,
        None => synthetic_input(&args)?,
    };
    println!("Aligning {} point sets of {} points", gt.shape[0], gt.shape[1]);

    let config = ProcrustesConfig::default()
        .with_scaling(args.allow_scaling)
        .with_reflection(args.allow_reflection)
        .with_strategy(if args.serial {
            ExecutionStrategy::Serial
        } else {
            ExecutionStrategy::ParallelElements
        });
    log::debug!("config: {config:?}");

    let mask = posealign::validity_from_points(&gt);
    let results = procrustes_per_element(
        &posealign::nan_to_zero(&gt),
        &posealign::nan_to_zero(&pred),
        Some(&mask),
        &config,
    )?;
    for (b, result) in results.iter().enumerate() {
        match result {
            Ok(transform) => {
                println!("Point set #{b}:");
                println!("  rotation: {}", serde_json::to_string(&transform.rotation)?);
                println!("  scale: {:?}", transform.scale_at(0));
                println!(
                    "  translation: {:?}",
                    transform.translation().as_slice()
                );
            }
            Err(err) => println!("Point set #{b}: {err}"),
        }
    }

    match procrustes_aligned_error(&pred, &gt, &config) {
        Ok(error) => println!("PA-MPJPE: {error:.6}"),
        Err(err) => log::warn!("could not compute the aligned error: {err}"),
    }

    Ok(())
}
