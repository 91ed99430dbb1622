//! # Bradley-Terry by Fixed-Point Iteration
//!
//! Classical self-consistent (minorization-maximization) solution of the Bradley-Terry
//! likelihood in probability space:
//!
//! ```text
//! p_i <- wins_i / sum_j n_ij / (p_i + p_j),   then p <- p / sum(p)
//! ```
//!
//! with `n_ij = alpha_ij + alpha_ji`. Normalizing to `sum(p) = 1` fixes the scale the model
//! leaves free. At convergence the observed information
//!
//! ```text
//! lambda_ii = sum_j ( -alpha_ij / p_i^2 + n_ij / (p_i + p_j)^2 )
//! lambda_ij = n_ij / (p_i + p_j)^2
//! ```
//!
//! is bordered by the sum constraint,
//!
//! ```text
//! | -lambda  1 |
//! |  1^T     0 |
//! ```
//!
//! and pseudo-inverted. The leading diagonal of the inverse holds the constrained
//! variances of `p`. Scores are `ln(p)`; their standard errors follow from the delta method,
//! `se(ln p_i) = se(p_i) / p_i`.
//!
//! The off-diagonal information is the exact second derivative `n_ij / (p_i + p_j)^2`, so the
//! variances are observed-information variances of the constrained maximum.

use crate::faer_ndarray::pseudo_inverse_symmetric;
use crate::model::{FitConfig, FitError, ModelKind, SolverOutput};
use crate::progress::{IterationObserver, IterationProgress};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

pub(crate) fn fit_fixed_point(
    alpha: ArrayView2<'_, f64>,
    config: &FitConfig,
    observer: &mut dyn IterationObserver,
) -> Result<SolverOutput, FitError> {
    let m = alpha.nrows();
    if m == 1 {
        return Ok(SolverOutput {
            scores: Array1::zeros(1),
            std: Some(Array1::zeros(1)),
            iterations: 0,
        });
    }

    let games = Array2::from_shape_fn((m, m), |(i, j)| {
        if i == j { 0.0 } else { alpha[[i, j]] + alpha[[j, i]] }
    });
    let wins: Array1<f64> = (0..m)
        .map(|i| (0..m).filter(|&j| j != i).map(|j| alpha[[i, j]]).sum())
        .collect();

    let mut p = Array1::from_elem(m, 1.0 / m as f64);
    let mut change = f64::MAX;
    let mut iteration = 0;

    while change > config.convergence_tolerance {
        if iteration >= config.max_iterations {
            return Err(FitError::DidNotConverge {
                model: ModelKind::BradleyTerryMle,
                iterations: iteration,
                last_change: change,
            });
        }
        iteration += 1;

        let mut next = Array1::<f64>::zeros(m);
        for i in 0..m {
            let mut denominator = 0.0;
            for j in 0..m {
                let n_ij = games[[i, j]];
                let pp = p[i] + p[j];
                if n_ij > 0.0 && pp > 0.0 {
                    denominator += n_ij / pp;
                }
            }
            next[i] = if denominator > 0.0 { wins[i] / denominator } else { 0.0 };
        }
        let total = next.sum();
        next /= total;

        let delta = &next - &p;
        change = delta.dot(&delta).sqrt();
        p = next;

        observer.on_iteration(&IterationProgress {
            model: ModelKind::BradleyTerryMle,
            iteration,
            change,
            mean_parameter: p.mean().unwrap_or(0.0),
        });
    }

    let zero_win_items = p.iter().filter(|&&pi| pi == 0.0).count();
    if zero_win_items > 0 {
        log::warn!(
            "{zero_win_items} item(s) never won a comparison; their log-probability score is -inf."
        );
    }

    let variance = constrained_variance(games.view(), wins.view(), p.view())?;
    let std = Array1::from_shape_fn(m, |i| {
        if p[i] > 0.0 {
            variance[i].max(0.0).sqrt() / p[i]
        } else {
            f64::INFINITY
        }
    });
    let scores = p.mapv(f64::ln);

    Ok(SolverOutput {
        scores,
        std: Some(std),
        iterations: iteration,
    })
}

/// Diagonal of the constrained covariance of `p`.
///
/// Terms whose count is zero are skipped rather than evaluated as `0 / 0`, so items with
/// no wins still yield a finite information matrix.
fn constrained_variance(
    games: ArrayView2<'_, f64>,
    wins: ArrayView1<'_, f64>,
    p: ArrayView1<'_, f64>,
) -> Result<Array1<f64>, FitError> {
    let m = p.len();
    let mut information = Array2::<f64>::zeros((m, m));
    for i in 0..m {
        if wins[i] > 0.0 {
            information[[i, i]] -= wins[i] / (p[i] * p[i]);
        }
        for j in 0..m {
            let n_ij = games[[i, j]];
            let pp = p[i] + p[j];
            if n_ij <= 0.0 || pp <= 0.0 {
                continue;
            }
            let term = n_ij / (pp * pp);
            information[[i, j]] = term;
            information[[i, i]] += term;
        }
    }

    let mut bordered = Array2::<f64>::zeros((m + 1, m + 1));
    bordered
        .slice_mut(s![..m, ..m])
        .assign(&information.mapv(|v| -v));
    bordered.slice_mut(s![..m, m]).fill(1.0);
    bordered.slice_mut(s![m, ..m]).fill(1.0);

    let covariance = pseudo_inverse_symmetric(&bordered)?;
    Ok(covariance.diag().slice(s![..m]).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopIterationObserver;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn run(alpha: Array2<f64>) -> SolverOutput {
        fit_fixed_point(alpha.view(), &FitConfig::default(), &mut NoopIterationObserver).unwrap()
    }

    fn reference_matrix() -> Array2<f64> {
        array![
            [0.0, 3.0, 2.0, 7.0],
            [1.0, 0.0, 6.0, 3.0],
            [4.0, 3.0, 0.0, 0.0],
            [1.0, 2.0, 5.0, 0.0],
        ]
    }

    #[test]
    fn recovers_reference_probabilities() {
        let out = run(reference_matrix());
        let p = out.scores.mapv(f64::exp);
        let expected = [0.390_928, 0.252_804, 0.146_676, 0.209_592];
        for (pi, e) in p.iter().zip(expected) {
            assert_abs_diff_eq!(*pi, e, epsilon = 1e-5);
        }
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn reference_standard_errors() {
        let out = run(reference_matrix());
        let std = out.std.unwrap();
        let expected = [0.310_897, 0.385_900, 0.414_360, 0.384_761];
        for (s, e) in std.iter().zip(expected) {
            assert_abs_diff_eq!(*s, e, epsilon = 1e-4);
        }
    }

    #[test]
    fn fixed_point_equations_hold_at_solution() {
        let alpha = reference_matrix();
        let p = run(alpha.clone()).scores.mapv(f64::exp);
        let ratios: Vec<f64> = (0..4)
            .map(|i| {
                let wins: f64 = (0..4).filter(|&j| j != i).map(|j| alpha[[i, j]]).sum();
                let denom: f64 = (0..4)
                    .filter(|&j| j != i)
                    .map(|j| (alpha[[i, j]] + alpha[[j, i]]) / (p[i] + p[j]))
                    .sum();
                wins / denom / p[i]
            })
            .collect();
        // The update maps p to c * p for a common constant c at a fixed point.
        for r in &ratios {
            assert_abs_diff_eq!(*r, ratios[0], epsilon = 1e-6);
        }
    }

    #[test]
    fn symmetric_counts_give_uniform_probabilities() {
        let out = run(array![[0.0, 2.0, 3.0], [2.0, 0.0, 4.0], [3.0, 4.0, 0.0]]);
        for s in out.scores.iter() {
            assert_abs_diff_eq!(*s, (1.0_f64 / 3.0).ln(), epsilon = 1e-12);
        }
        assert!(out.std.unwrap().iter().all(|&s| s.is_finite() && s >= 0.0));
    }

    #[test]
    fn item_without_wins_scores_negative_infinity() {
        let out = run(array![[0.0, 5.0, 5.0], [0.0, 0.0, 5.0], [0.0, 0.0, 0.0]]);
        assert!(out.scores[0] > out.scores[1]);
        assert!(out.scores[1] > out.scores[2]);
        assert_eq!(out.scores[2], f64::NEG_INFINITY);
        let std = out.std.unwrap();
        assert_eq!(std[2], f64::INFINITY);
        assert!(std.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn single_item_is_certain() {
        let out = run(array![[0.0]]);
        assert_eq!(out.scores, array![0.0]);
        assert_eq!(out.std, Some(array![0.0]));
    }

    #[test]
    fn iteration_bound_is_enforced() {
        let alpha = array![[0.0, 5.0, 5.0], [0.0, 0.0, 5.0], [0.0, 0.0, 0.0]];
        let config = FitConfig::default().with_max_iterations(100);
        let err = fit_fixed_point(alpha.view(), &config, &mut NoopIterationObserver).unwrap_err();
        assert!(matches!(
            err,
            FitError::DidNotConverge { model: ModelKind::BradleyTerryMle, iterations: 100, .. }
        ));
    }
}
