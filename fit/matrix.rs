//! # Comparison Matrix
//!
//! Validated, immutable win-count matrix consumed by every solver. Entry `(i, j)` is the
//! number of times item `i` was preferred over item `j`. Counts may be fractional (for
//! example, averaged judgments) but must be finite and non-negative. The diagonal carries
//! no information and is ignored by the solvers.
//!
//! Construction also checks that the comparison graph is connected: every item must be
//! linked to every other item through a chain of observed comparisons. Without that the
//! relative scale of the separate groups is not identifiable and the solvers have no
//! defined answer.

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Comparison matrix must be square, found {rows}x{cols}.")]
    NotSquare { rows: usize, cols: usize },

    #[error("Comparison matrix has no items.")]
    Empty,

    #[error(
        "Entry ({row}, {col}) holds {value}, but comparison counts must be finite and non-negative."
    )]
    InvalidCount { row: usize, col: usize, value: f64 },

    #[error(
        "The comparison graph splits into {components} disconnected groups of items; scores across groups are not comparable."
    )]
    Disconnected { components: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonMatrix {
    wins: Array2<f64>,
}

impl ComparisonMatrix {
    /// Validates an n×n win-count matrix.
    pub fn new(wins: Array2<f64>) -> Result<Self, MatrixError> {
        let (rows, cols) = wins.dim();
        if rows != cols {
            return Err(MatrixError::NotSquare { rows, cols });
        }
        if rows == 0 {
            return Err(MatrixError::Empty);
        }
        for ((row, col), &value) in wins.indexed_iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(MatrixError::InvalidCount { row, col, value });
            }
        }

        let components = count_components(wins.view());
        if components > 1 {
            return Err(MatrixError::Disconnected { components });
        }

        log::debug!(
            "Accepted {rows}x{rows} comparison matrix with {} total comparisons.",
            total_off_diagonal(wins.view())
        );
        Ok(Self { wins })
    }

    /// Collapses an `(item_i, item_j, observation)` array of outcomes into win counts.
    ///
    /// Missing observations are encoded as NaN and contribute nothing to the sum.
    pub fn from_observations(observations: ArrayView3<'_, f64>) -> Result<Self, MatrixError> {
        let (rows, cols, _) = observations.dim();
        if rows != cols {
            return Err(MatrixError::NotSquare { rows, cols });
        }
        let wins = observations.fold_axis(Axis(2), 0.0, |&acc, &value| {
            if value.is_nan() { acc } else { acc + value }
        });
        Self::new(wins)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.wins.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.wins.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.wins
    }
}

fn total_off_diagonal(wins: ArrayView2<'_, f64>) -> f64 {
    wins.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, &v)| v)
        .sum()
}

/// Number of connected components of the undirected graph with an edge wherever
/// `wins[i, j] + wins[j, i] > 0`.
fn count_components(wins: ArrayView2<'_, f64>) -> usize {
    let n = wins.nrows();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if wins[[i, j]] + wins[[j, i]] > 0.0 {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    (0..n).filter(|&i| find(&mut parent, i) == i).count()
}
