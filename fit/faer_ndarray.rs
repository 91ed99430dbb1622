use faer::diag::DiagRef;
use faer::linalg::solvers;
use faer::{Mat, MatRef, Side};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaerLinalgError {
    #[error("Self-adjoint eigendecomposition failed: {0:?}")]
    SelfAdjointEigen(solvers::EvdError),
    #[error("Matrix contains non-finite entries; cannot decompose a {rows}x{cols} matrix.")]
    NonFinite { rows: usize, cols: usize },
    #[error("Pseudo-inverse requires a square matrix, found {rows}x{cols}.")]
    NotSquare { rows: usize, cols: usize },
}

fn mat_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

fn diag_to_array(diag: DiagRef<'_, f64>) -> Array1<f64> {
    let mat = diag.column_vector().as_mat();
    Array1::from_shape_fn(mat.nrows(), |i| mat[(i, 0)])
}

enum FaerStorage<'a> {
    Borrowed(MatRef<'a, f64>),
    Owned(Mat<f64>),
}

impl FaerStorage<'_> {
    #[inline]
    fn as_ref(&self) -> MatRef<'_, f64> {
        match self {
            FaerStorage::Borrowed(view) => *view,
            FaerStorage::Owned(mat) => mat.as_ref(),
        }
    }
}

/// Zero-copy faer view of an ndarray matrix when the memory layout allows it.
pub struct FaerArrayView<'a> {
    storage: FaerStorage<'a>,
}

impl<'a> FaerArrayView<'a> {
    pub fn new<S: Data<Elem = f64>>(array: &'a ArrayBase<S, Ix2>) -> Self {
        let (rows, cols) = array.dim();
        let storage = match array.as_slice_memory_order() {
            Some(slice) if array.is_standard_layout() => {
                FaerStorage::Borrowed(MatRef::from_row_major_slice(slice, rows, cols))
            }
            Some(slice) if array.t().is_standard_layout() => {
                FaerStorage::Borrowed(MatRef::from_column_major_slice(slice, rows, cols))
            }
            _ => FaerStorage::Owned(Mat::from_fn(rows, cols, |i, j| array[(i, j)])),
        };
        Self { storage }
    }

    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.storage.as_ref()
    }
}

pub trait FaerEigh {
    /// Eigenvalues and eigenvectors (as columns) of a symmetric matrix.
    fn eigh(&self, side: Side) -> Result<(Array1<f64>, Array2<f64>), FaerLinalgError>;
}

impl<S: Data<Elem = f64>> FaerEigh for ArrayBase<S, Ix2> {
    fn eigh(&self, side: Side) -> Result<(Array1<f64>, Array2<f64>), FaerLinalgError> {
        let faer_view = FaerArrayView::new(self);
        let eigen = faer_view
            .as_ref()
            .self_adjoint_eigen(side)
            .map_err(FaerLinalgError::SelfAdjointEigen)?;
        let values = diag_to_array(eigen.S());
        let vectors = mat_to_array(eigen.U());
        Ok((values, vectors))
    }
}

/// Moore-Penrose pseudo-inverse of a symmetric matrix.
///
/// Eigen-directions whose `|lambda|` falls below `n * f64::EPSILON * max|lambda|` are
/// treated as null directions and dropped, which keeps the result finite for the
/// rank-deficient curvature matrices produced by saturated or degenerate fits.
pub fn pseudo_inverse_symmetric<S: Data<Elem = f64>>(
    matrix: &ArrayBase<S, Ix2>,
) -> Result<Array2<f64>, FaerLinalgError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(FaerLinalgError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(FaerLinalgError::NonFinite { rows, cols });
    }

    let (values, vectors) = matrix.eigh(Side::Lower)?;
    let largest = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let cutoff = rows as f64 * f64::EPSILON * largest;

    let inverted = values.mapv(|v| if v.abs() > cutoff { 1.0 / v } else { 0.0 });
    let scaled = &vectors * &inverted;
    Ok(scaled.dot(&vectors.t()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn inverts_well_conditioned_matrix() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let pinv = pseudo_inverse_symmetric(&a).unwrap();
        let identity = a.dot(&pinv);
        assert_abs_diff_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[1, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_satisfies_penrose_identity() {
        // Rank one: every row is a multiple of [1, 2].
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let pinv = pseudo_inverse_symmetric(&a).unwrap();
        let reconstructed = a.dot(&pinv).dot(&a);
        for (lhs, rhs) in reconstructed.iter().zip(a.iter()) {
            assert_abs_diff_eq!(*lhs, *rhs, epsilon = 1e-10);
        }
        // A+ = v v^T / 5 with v = [1, 2] / sqrt(5).
        assert_abs_diff_eq!(pinv[[0, 0]], 1.0 / 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pinv[[1, 1]], 4.0 / 25.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_matrix_maps_to_zero() {
        let a = Array2::<f64>::zeros((3, 3));
        let pinv = pseudo_inverse_symmetric(&a).unwrap();
        assert!(pinv.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_matrix_is_allowed() {
        let a = Array2::<f64>::zeros((0, 0));
        assert_eq!(pseudo_inverse_symmetric(&a).unwrap().dim(), (0, 0));
    }

    #[test]
    fn rejects_non_finite_entries() {
        let a = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        assert!(matches!(
            pseudo_inverse_symmetric(&a),
            Err(FaerLinalgError::NonFinite { rows: 2, cols: 2 })
        ));
    }

    #[test]
    fn column_major_view_matches_row_major() {
        let a = array![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0]];
        let transposed = a.t();
        let view = FaerArrayView::new(&transposed);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(view.as_ref()[(i, j)], a[[j, i]]);
            }
        }
    }
}
