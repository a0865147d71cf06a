//! Theory spectra — validation and `D_ℓ → C_ℓ` de-weighting.
//!
//! Purpose
//! -------
//! Hold the three theory spectra (TT, TE, EE) passed to the likelihood and
//! convert them from the `D_ℓ = ℓ(ℓ+1)C_ℓ/2π` convention into zero-padded
//! `C_ℓ` working arrays aligned with the window-function columns.
//!
//! Conventions
//! -----------
//! - Input element `i` belongs to multipole `ℓ = i + 2`; a spectrum for a
//!   configuration with `tt_lmax` has `tt_lmax - 1` entries.
//! - Working arrays have length `lmax_win` and are indexed through
//!   [`ell_to_index`]; every slot outside `ℓ = 2..=tt_lmax` is exactly zero.
use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView1, s};

use crate::likelihood::{
    config::LikeConfig,
    errors::{LikeError, LikeResult},
    indexing::{ELL_MIN, ell_to_index, index_to_ell},
};

/// TheorySpectra — owned TT/TE/EE spectra in the `D_ℓ` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct TheorySpectra {
    pub tt: Array1<f64>,
    pub te: Array1<f64>,
    pub ee: Array1<f64>,
}

impl TheorySpectra {
    /// Bundle three spectra after checking them against `config`.
    ///
    /// Errors
    /// ------
    /// - `LikeError::SpectrumLength` / `LikeError::NonFiniteSpectrum`
    ///   As reported by [`validate_spectrum`].
    pub fn new(
        tt: Array1<f64>, te: Array1<f64>, ee: Array1<f64>, config: &LikeConfig,
    ) -> LikeResult<Self> {
        let expected = config.spectrum_len();
        validate_spectrum("TT", tt.view(), expected)?;
        validate_spectrum("TE", te.view(), expected)?;
        validate_spectrum("EE", ee.view(), expected)?;
        Ok(TheorySpectra { tt, te, ee })
    }

    /// Build spectra from a CAMB-style table `ℓ, TT, TE, EE, ...`.
    ///
    /// Columns 1, 2 and 3 hold TT, TE and EE; the first `tt_lmax - 1` rows
    /// are used and any further columns are ignored.
    ///
    /// Errors
    /// ------
    /// - `LikeError::ShapeMismatch`
    ///   When the table has fewer than `tt_lmax - 1` rows or 4 columns.
    pub fn from_columns(table: &Array2<f64>, config: &LikeConfig) -> LikeResult<Self> {
        let rows = config.spectrum_len();
        let (nrows, ncols) = table.dim();
        if nrows < rows || ncols < 4 {
            return Err(LikeError::ShapeMismatch {
                what: "theory spectrum table".to_string(),
                expected: format!("at least {rows}x4"),
                actual: format!("{nrows}x{ncols}"),
            });
        }
        let column = |c: usize| table.slice(s![..rows, c]).to_owned();
        TheorySpectra::new(column(1), column(2), column(3), config)
    }
}

/// Check one input spectrum for length and finiteness.
///
/// Errors
/// ------
/// - `LikeError::SpectrumLength`
///   When `values.len() != expected`.
/// - `LikeError::NonFiniteSpectrum`
///   On the first NaN/±inf entry, reported with its multipole.
pub fn validate_spectrum(
    name: &'static str, values: ArrayView1<'_, f64>, expected: usize,
) -> LikeResult<()> {
    if values.len() != expected {
        return Err(LikeError::SpectrumLength {
            spectrum: name,
            expected,
            actual: values.len(),
        });
    }
    if let Some((i, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let ell = index_to_ell(working_offset(i));
        return Err(LikeError::NonFiniteSpectrum { spectrum: name, ell, value });
    }
    Ok(())
}

/// De-weight a `D_ℓ` spectrum into a zero-padded `C_ℓ` working array.
///
/// Parameters
/// ----------
/// - `d_ell`: `ArrayView1<f64>`
///   Spectrum starting at `ℓ = 2`.
/// - `lmax_win`: `usize`
///   Length of the working array; must exceed `d_ell.len()`.
///
/// Returns
/// -------
/// `Array1<f64>`
///   `cl[ell_to_index(ℓ)] = D_ℓ / ℓ / (ℓ + 1) · 2π` for every input multipole;
///   all other slots are `0.0`.
///
/// Panics
/// ------
/// - If `d_ell.len() >= lmax_win`; a validated [`LikeConfig`] rules this out.
pub fn deweight_spectrum(d_ell: ArrayView1<'_, f64>, lmax_win: usize) -> Array1<f64> {
    let mut cl = Array1::<f64>::zeros(lmax_win);
    for (i, &d) in d_ell.iter().enumerate() {
        let offset = working_offset(i);
        let l = index_to_ell(offset) as f64;
        cl[offset] = d / l / (l + 1.0) * 2.0 * PI;
    }
    cl
}

/// Working-array offset of input element `i` (multipole `ELL_MIN + i`).
#[inline]
fn working_offset(i: usize) -> usize {
    ell_to_index(ELL_MIN) + i
}
