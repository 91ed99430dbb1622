//! # Thurstone Case V by Direct Likelihood Minimization
//!
//! Each item carries a latent normal performance with mean `v_i` and a shared unit variance,
//! so item `i` beats item `j` with probability `Phi(v_i - v_j)`. The estimator minimizes
//!
//! ```text
//! -sum_{i != j} alpha_ij * ln(Phi(v_i - v_j) + eps) + alpha_ji * ln(1 - Phi(v_i - v_j) + eps)
//! ```
//!
//! with `eps = 1e-8 / M`, starting from `v = 0`. The objective handed to the optimizer is
//! divided by the total number of comparisons; this leaves the minimizer unchanged and keeps
//! the gradient tolerance independent of how many games were played.
//!
//! The likelihood is invariant to shifting every `v_i` by a constant. Gradients always sum
//! to zero, so quasi-Newton iterates started at `v = 0` stay centered.

use crate::model::{FitConfig, FitError, ModelKind, SolverOutput};
use crate::progress::{IterationObserver, IterationProgress};
use ndarray::{Array1, Array2, ArrayView2};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};
use wolfe_bfgs::{Bfgs, BfgsSolution};

/// Standard normal CDF.
#[inline]
fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal density.
#[inline]
fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Negative log-likelihood per comparison, and its gradient.
#[derive(Clone)]
struct ThurstoneObjective {
    alpha: Array2<f64>,
    total: f64,
    eps: f64,
}

impl ThurstoneObjective {
    fn new(alpha: ArrayView2<'_, f64>) -> Self {
        let m = alpha.nrows();
        let total: f64 = alpha
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, &a)| a)
            .sum();
        Self {
            alpha: alpha.to_owned(),
            total,
            eps: 1e-8 / m as f64,
        }
    }

    fn cost_and_grad(&self, v: &Array1<f64>) -> (f64, Array1<f64>) {
        let m = v.len();
        let mut cost = 0.0;
        let mut grad = Array1::<f64>::zeros(m);
        for i in 0..m {
            for j in 0..m {
                if i == j {
                    continue;
                }
                let (a_ij, a_ji) = (self.alpha[[i, j]], self.alpha[[j, i]]);
                if a_ij == 0.0 && a_ji == 0.0 {
                    continue;
                }
                let d = v[i] - v[j];
                // Phi(-d) instead of 1 - Phi(d) keeps precision in the upper tail.
                let win = normal_cdf(d) + self.eps;
                let loss = normal_cdf(-d) + self.eps;
                cost -= a_ij * win.ln() + a_ji * loss.ln();

                let density = normal_pdf(d);
                let slope = a_ij * density / win - a_ji * density / loss;
                grad[i] -= slope;
                grad[j] += slope;
            }
        }
        (cost / self.total, grad / self.total)
    }
}

pub(crate) fn fit_thurstone(
    alpha: ArrayView2<'_, f64>,
    config: &FitConfig,
    observer: &mut dyn IterationObserver,
) -> Result<SolverOutput, FitError> {
    let m = alpha.nrows();
    if m == 1 {
        return Ok(SolverOutput {
            scores: Array1::zeros(1),
            std: None,
            iterations: 0,
        });
    }

    let objective = ThurstoneObjective::new(alpha);
    let initial = Array1::<f64>::zeros(m);
    let (initial_cost, initial_grad) = objective.cost_and_grad(&initial);
    if !initial_cost.is_finite() || initial_grad.iter().any(|g| !g.is_finite()) {
        return Err(FitError::OptimizationFailed(format!(
            "Initial negative log-likelihood is not finite: {initial_cost}. Cannot start BFGS optimization."
        )));
    }
    log::debug!("Initial Thurstone cost per comparison: {initial_cost:.6}");

    // Balanced records are already optimal at the origin; a zero gradient gives the line
    // search no direction to work with.
    let initial_norm = initial_grad.dot(&initial_grad).sqrt();
    if initial_norm <= config.optimizer_tolerance {
        observer.on_iteration(&IterationProgress {
            model: ModelKind::ThurstoneMle,
            iteration: 0,
            change: initial_norm,
            mean_parameter: 0.0,
        });
        return Ok(SolverOutput {
            scores: initial,
            std: None,
            iterations: 0,
        });
    }

    let objective_for_closure = objective.clone();
    let cost_and_grad = move |v: &Array1<f64>| -> (f64, Array1<f64>) {
        objective_for_closure.cost_and_grad(v)
    };

    let BfgsSolution {
        final_point,
        final_value,
        iterations,
        ..
    } = Bfgs::new(initial, cost_and_grad)
        .with_tolerance(config.optimizer_tolerance)
        .with_max_iterations(config.optimizer_max_iterations)
        .run()
        .map_err(|e| FitError::OptimizationFailed(format!("BFGS failed: {e:?}")))?;

    if !final_value.is_finite() || final_point.iter().any(|v| !v.is_finite()) {
        return Err(FitError::OptimizationFailed(format!(
            "BFGS returned a non-finite solution (cost {final_value})."
        )));
    }

    let (_, final_grad) = objective.cost_and_grad(&final_point);
    observer.on_iteration(&IterationProgress {
        model: ModelKind::ThurstoneMle,
        iteration: iterations,
        change: final_grad.dot(&final_grad).sqrt(),
        mean_parameter: final_point.mean().unwrap_or(0.0),
    });
    log::debug!("Thurstone cost per comparison after {iterations} iterations: {final_value:.6}");

    Ok(SolverOutput {
        scores: final_point,
        std: None,
        iterations,
    })
}
