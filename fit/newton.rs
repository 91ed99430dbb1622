//! # Bradley-Terry by Newton-Raphson
//!
//! Maximizes the Bradley-Terry log-likelihood
//!
//! ```text
//! L(gamma) = sum_i wins_i * gamma_i - sum_{i<j} gm_ij * ln(exp(gamma_i) + exp(gamma_j))
//! ```
//!
//! over the log-skills `gamma`. The model is unchanged by adding a constant to every
//! `gamma`, so the last item is pinned at `gamma_{n-1} = 0` and Newton steps run over the
//! remaining `n - 1` parameters. Each step solves against the curvature through its
//! pseudo-inverse, which keeps the update defined when the curvature loses rank (for
//! instance once a dominant item's win probabilities saturate at 1).
//!
//! Scores are reported as raw log-skills, not exponentiated strengths.

use crate::faer_ndarray::pseudo_inverse_symmetric;
use crate::model::{FitConfig, FitError, ModelKind, SolverOutput};
use crate::progress::{IterationObserver, IterationProgress};
use ndarray::{Array1, Array2, ArrayView2};

/// `exp(a) / (exp(a) + exp(b))` evaluated as a logistic of the difference.
#[inline]
fn win_probability(gamma_i: f64, gamma_j: f64) -> f64 {
    1.0 / (1.0 + (gamma_j - gamma_i).exp())
}

pub(crate) fn fit_newton_raphson(
    wm: ArrayView2<'_, f64>,
    config: &FitConfig,
    observer: &mut dyn IterationObserver,
) -> Result<SolverOutput, FitError> {
    let n = wm.nrows();
    let nmo = n - 1;

    // Symmetrized totals for the free rows; the diagonal never enters the likelihood.
    let games = Array2::from_shape_fn((nmo, n), |(i, j)| {
        if i == j { 0.0 } else { wm[[i, j]] + wm[[j, i]] }
    });
    let wins: Array1<f64> = (0..nmo)
        .map(|i| (0..n).filter(|&j| j != i).map(|j| wm[[i, j]]).sum())
        .collect();

    let mut gamma = Array1::<f64>::zeros(n);
    let mut change = f64::MAX;
    let mut iteration = 0;

    while change > config.convergence_tolerance {
        if iteration >= config.max_iterations {
            return Err(FitError::DidNotConverge {
                model: ModelKind::BradleyTerryNewtonRaphson,
                iterations: iteration,
                last_change: change,
            });
        }
        iteration += 1;

        let mut gradient = wins.clone();
        let mut curvature = Array2::<f64>::zeros((nmo, nmo));
        for i in 0..nmo {
            for j in 0..n {
                let g = games[[i, j]];
                if g <= 0.0 {
                    continue;
                }
                let r = win_probability(gamma[i], gamma[j]);
                gradient[i] -= g * r;
                // r_ij * r_ji rather than r * (1 - r): identical in exact arithmetic, but
                // symmetric bit-for-bit and free of cancellation once r saturates.
                let weight = g * r * win_probability(gamma[j], gamma[i]);
                curvature[[i, i]] -= weight;
                if j < nmo {
                    curvature[[i, j]] = weight;
                }
            }
        }

        let step = pseudo_inverse_symmetric(&curvature)?.dot(&gradient);
        change = step.dot(&step).sqrt();
        for (g, s) in gamma.iter_mut().zip(step.iter()) {
            *g -= s;
        }

        observer.on_iteration(&IterationProgress {
            model: ModelKind::BradleyTerryNewtonRaphson,
            iteration,
            change,
            mean_parameter: gamma.mean().unwrap_or(0.0),
        });
    }

    gamma[nmo] = 0.0;

    Ok(SolverOutput {
        scores: gamma,
        std: None,
        iterations: iteration,
    })
}
