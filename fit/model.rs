//! # Model Selection and Fitting
//!
//! Entry point of the crate. A [`ModelKind`] tag picks one of the three estimators, a
//! [`FitConfig`] carries every tunable, and [`fit`] runs on an already-validated
//! [`ComparisonMatrix`]:
//!
//! 1. run the selected solver to convergence (or to its iteration bound),
//! 2. optionally z-score the resulting scores,
//! 3. package scores and standard errors as [`QualityScores`].

use crate::faer_ndarray::FaerLinalgError;
use crate::matrix::{ComparisonMatrix, MatrixError};
use crate::normalize::zscore;
use crate::progress::{IterationObserver, NoopIterationObserver};
use crate::types::{QualityScores, ScoreScale};
use crate::{fixed_point, newton, thurstone};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version string shared by every estimator's output format.
pub const MODEL_VERSION: &str = "1.0";

/// The closed set of paired-comparison estimators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Bradley-Terry fitted by Newton-Raphson on log-skills (`BTNR`).
    #[serde(rename = "BTNR")]
    BradleyTerryNewtonRaphson,
    /// Bradley-Terry fitted by the classical fixed-point iteration (`BTMLE`).
    #[serde(rename = "BTMLE")]
    BradleyTerryMle,
    /// Thurstone case V fitted by direct likelihood minimization (`THURSTONE_MLE`).
    #[serde(rename = "THURSTONE_MLE")]
    ThurstoneMle,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::BradleyTerryNewtonRaphson,
        ModelKind::BradleyTerryMle,
        ModelKind::ThurstoneMle,
    ];

    /// Short type tag used to name the model in configuration and output.
    pub fn type_tag(self) -> &'static str {
        match self {
            Self::BradleyTerryNewtonRaphson => "BTNR",
            Self::BradleyTerryMle => "BTMLE",
            Self::ThurstoneMle => "THURSTONE_MLE",
        }
    }

    pub fn version(self) -> &'static str {
        MODEL_VERSION
    }

    pub fn scale(self) -> ScoreScale {
        match self {
            Self::BradleyTerryNewtonRaphson => ScoreScale::LogSkillPinnedLast,
            Self::BradleyTerryMle => ScoreScale::LogProbability,
            Self::ThurstoneMle => ScoreScale::LatentNormalMean,
        }
    }

    /// Whether the estimator reports standard errors alongside the scores.
    pub fn provides_std(self) -> bool {
        matches!(self, Self::BradleyTerryMle)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

impl FromStr for ModelKind {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.type_tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FitError::UnknownModel(s.to_string()))
    }
}

/// Every tunable of a fit. Missing TOML keys fall back to [`FitConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Standardize the returned scores to zero mean and unit (population) standard deviation.
    pub zscore_output: bool,
    /// Threshold on the update norm that ends the Bradley-Terry iterations.
    pub convergence_tolerance: f64,
    /// Upper bound on Bradley-Terry iterations before giving up.
    pub max_iterations: usize,
    /// Gradient-norm tolerance of the Thurstone optimizer.
    ///
    /// The objective is the negative log-likelihood divided by the total comparison count, so
    /// this bounds the mean per-comparison score gradient rather than a change in the summed
    /// objective. Near the optimum the parameter error scales like this tolerance over the
    /// per-comparison curvature (order 0.1 to 1), so the default of 1e-6 pins the latent means
    /// to within about 1e-5 regardless of sample size.
    pub optimizer_tolerance: f64,
    /// Upper bound on Thurstone optimizer iterations.
    pub optimizer_max_iterations: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            zscore_output: false,
            convergence_tolerance: 1e-8,
            max_iterations: 100_000,
            optimizer_tolerance: 1e-6,
            optimizer_max_iterations: 1000,
        }
    }
}

impl FitConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn with_zscore_output(mut self, zscore_output: bool) -> Self {
        self.zscore_output = zscore_output;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Rejects settings under which a solver would report an unconverged start as a result,
    /// or could never stop before its cap.
    pub fn validate(&self) -> Result<(), FitError> {
        let tolerances = [
            ("convergence_tolerance", self.convergence_tolerance),
            ("optimizer_tolerance", self.optimizer_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(FitError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, found {value}."
                )));
            }
        }
        let caps = [
            ("max_iterations", self.max_iterations),
            ("optimizer_max_iterations", self.optimizer_max_iterations),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(FitError::InvalidConfig(format!("{name} must be at least 1.")));
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum FitError {
    #[error("Invalid comparison matrix: {0}")]
    Matrix(#[from] MatrixError),

    #[error("A pseudo-inverse failed. The curvature matrix may be degenerate. Error: {0}")]
    Linalg(#[from] FaerLinalgError),

    #[error(
        "{model} did not converge within {iterations} iterations. Last change was {last_change:.6e}."
    )]
    DidNotConverge {
        model: ModelKind,
        iterations: usize,
        last_change: f64,
    },

    #[error("Thurstone likelihood optimization failed: {0}")]
    OptimizationFailed(String),

    #[error("Cannot z-score non-finite quality scores.")]
    NonFiniteScores,

    #[error("Invalid fit configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown model type '{0}'; expected one of BTNR, BTMLE, THURSTONE_MLE.")]
    UnknownModel(String),
}

/// Raw estimator output before post-processing.
#[derive(Debug)]
pub(crate) struct SolverOutput {
    pub(crate) scores: Array1<f64>,
    pub(crate) std: Option<Array1<f64>>,
    pub(crate) iterations: usize,
}

/// Fits `kind` to `matrix`.
pub fn fit(
    kind: ModelKind,
    matrix: &ComparisonMatrix,
    config: &FitConfig,
) -> Result<QualityScores, FitError> {
    fit_with_observer(kind, matrix, config, &mut NoopIterationObserver)
}

/// Fits `kind` to `matrix`, reporting each iteration to `observer`.
pub fn fit_with_observer(
    kind: ModelKind,
    matrix: &ComparisonMatrix,
    config: &FitConfig,
    observer: &mut dyn IterationObserver,
) -> Result<QualityScores, FitError> {
    config.validate()?;
    log::info!("Fitting {} v{} to {} items.", kind, kind.version(), matrix.len());

    let wm = matrix.view();
    let SolverOutput {
        mut scores,
        mut std,
        iterations,
    } = match kind {
        ModelKind::BradleyTerryNewtonRaphson => newton::fit_newton_raphson(wm, config, observer)?,
        ModelKind::BradleyTerryMle => fixed_point::fit_fixed_point(wm, config, observer)?,
        ModelKind::ThurstoneMle => thurstone::fit_thurstone(wm, config, observer)?,
    };

    log::info!("{kind} finished after {iterations} iterations.");

    if config.zscore_output {
        let spread = zscore(&mut scores)?;
        if let Some(std) = std.as_mut() {
            std.mapv_inplace(|s| s / spread);
        }
    }

    Ok(QualityScores::new(scores, std))
}
