//! likelihood::linalg — Cholesky-based inversion of covariance blocks.
//!
//! Purpose
//! -------
//! Invert the symmetric positive-definite covariance block selected by the
//! evaluator. The working containers are `ndarray` arrays; the factorization
//! is delegated to `nalgebra`, so this module also owns the copy between the
//! two representations.
//!
//! Key behaviors
//! -------------
//! - [`fill_dmatrix`] copies an `ndarray` matrix into a preallocated
//!   `nalgebra::DMatrix` column by column.
//! - [`cholesky_inverse`] factors `C = L Lᵀ`, solves `L Lᵀ X = I`, and returns
//!   `Xᵀ` as an `ndarray` matrix.
//! - [`quadratic_form`] evaluates `vᵀ (A v)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Input covariance blocks are square and symmetric; symmetry is enforced
//!   when the dataset is built.
//! - A failed factorization is never masked: non-positive-definite input
//!   (including blocks polluted by NaN) is reported as
//!   `LikeError::NotPositiveDefinite`.
//!
//! Testing notes
//! -------------
//! - Unit tests check the copy into `DMatrix`, the inverse of a known SPD
//!   matrix, and the failure paths for indefinite, singular, and NaN input.
use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::likelihood::errors::{LikeError, LikeResult};

/// cholesky_inverse — inverse of a symmetric positive-definite matrix.
///
/// Parameters
/// ----------
/// - `cov`: `ArrayView2<f64>`
///   Square `n×n` symmetric matrix.
///
/// Returns
/// -------
/// `LikeResult<Array2<f64>>`
///   `(C⁻¹)ᵀ`, obtained from the Cholesky factor by triangular solves against
///   the `n×n` identity. The transpose is a no-op in exact arithmetic.
///
/// Errors
/// ------
/// - `LikeError::NotPositiveDefinite { dim }`
///   When the factorization breaks down.
pub fn cholesky_inverse(cov: ArrayView2<'_, f64>) -> LikeResult<Array2<f64>> {
    let n = cov.nrows();
    let mut cov_nalg = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(cov, &mut cov_nalg);

    // nalgebra accepts a zero pivot (sqrt(0) succeeds), so the factor's
    // diagonal is checked as well.
    let chol = Cholesky::new(cov_nalg)
        .filter(|c| c.l_dirty().diagonal().iter().all(|d| d.is_finite() && *d > 0.0))
        .ok_or(LikeError::NotPositiveDefinite { dim: n })?;
    let inv = chol.solve(&DMatrix::<f64>::identity(n, n));

    // inv[(i, j)] read into out[[j, i]]: transpose on the way back.
    Ok(Array2::from_shape_fn((n, n), |(i, j)| inv[(j, i)]))
}

/// Evaluate `vᵀ (A v)`.
pub fn quadratic_form(a: ArrayView2<'_, f64>, v: ArrayView1<'_, f64>) -> f64 {
    let av: Array1<f64> = a.dot(&v);
    (&av * &v).sum()
}

/// fill_dmatrix — copy an `ndarray` matrix into a `nalgebra::DMatrix`.
///
/// The copy proceeds column by column, matching the column-major storage of
/// `DMatrix`. No symmetrization is performed; any asymmetry in `src` is
/// preserved in `dst`.
///
/// Panics
/// ------
/// - If `src` and `dst` have different shapes.
fn fill_dmatrix(src: ArrayView2<'_, f64>, dst: &mut DMatrix<f64>) {
    let (rows, cols) = src.dim();
    for j in 0..cols {
        for i in 0..rows {
            dst[(i, j)] = src[[i, j]];
        }
    }
}
