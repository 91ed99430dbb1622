//! Measures how each estimator scales with the number of items on a dense, fully
//! connected comparison record.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;
use pairscore::{ComparisonMatrix, FitConfig, ModelKind, fit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Item counts on the x-axis of the report.
const ITEM_COUNTS: [usize; 4] = [5, 10, 25, 50];

/// Latent strengths drawn once, then win counts sampled so that the matrix is neither
/// balanced nor separable.
fn simulated_record(n: usize, seed: u64) -> ComparisonMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let skills: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.5..1.5)).collect();
    let games_per_pair = 20;
    let mut wins = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let p = 1.0 / (1.0 + (skills[j] - skills[i]).exp());
            let won = (0..games_per_pair).filter(|_| rng.gen_bool(p)).count() as f64;
            // One pseudo-game each way keeps every pair non-separable.
            wins[[i, j]] = won + 1.0;
            wins[[j, i]] = (games_per_pair as f64 - won) + 1.0;
        }
    }
    ComparisonMatrix::new(wins).expect("simulated record is connected")
}

fn bench_solvers(c: &mut Criterion) {
    let config = FitConfig::default();
    let mut group = c.benchmark_group("Paired-comparison solvers");
    for &n in &ITEM_COUNTS {
        let record = simulated_record(n, 0x5eed + n as u64);
        for kind in ModelKind::ALL {
            group.bench_with_input(BenchmarkId::new(kind.type_tag(), n), &record, |b, wm| {
                b.iter(|| fit(black_box(kind), black_box(wm), &config).expect("fit succeeds"))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_solvers);
criterion_main!(benches);
