#![deny(dead_code)]
#![deny(unused_imports)]
//! Quality scores from paired-comparison judgments.
//!
//! A comparison matrix `wm` records how often item `i` was preferred over item `j`.
//! Three estimators turn it into one continuous score per item:
//!
//! - [`ModelKind::BradleyTerryNewtonRaphson`]: second-order fit of Bradley-Terry log-skills,
//!   last item pinned at zero.
//! - [`ModelKind::BradleyTerryMle`]: classical self-consistent Bradley-Terry iteration in
//!   probability space, reported as `ln(p)` with delta-method standard errors.
//! - [`ModelKind::ThurstoneMle`]: Thurstone (probit) likelihood minimized with BFGS.
//!
//! ```rust
//! use ndarray::array;
//! use pairscore::{fit, ComparisonMatrix, FitConfig, ModelKind};
//!
//! let wm = ComparisonMatrix::new(array![
//!     [0.0, 3.0, 2.0, 7.0],
//!     [1.0, 0.0, 6.0, 3.0],
//!     [4.0, 3.0, 0.0, 0.0],
//!     [1.0, 2.0, 5.0, 0.0],
//! ])
//! .unwrap();
//!
//! let result = fit(ModelKind::BradleyTerryMle, &wm, &FitConfig::default()).unwrap();
//! assert_eq!(result.quality_scores.len(), 4);
//! assert!(result.quality_scores_std.is_some());
//! ```

pub mod faer_ndarray;
pub mod fixed_point;
pub mod matrix;
pub mod model;
pub mod newton;
pub mod normalize;
pub mod progress;
pub mod thurstone;
pub mod types;

pub use matrix::{ComparisonMatrix, MatrixError};
pub use model::{FitConfig, FitError, ModelKind, fit, fit_with_observer};
pub use progress::{
    IterationObserver, IterationProgress, LogIterationObserver, NoopIterationObserver,
    RecordingIterationObserver,
};
pub use types::{QualityScores, ScoreScale};
