//! likelihood::evaluator — ACTPol s2 log-likelihood of a theory spectrum.
//!
//! Purpose
//! -------
//! Evaluate `-ln L` (up to a constant) for TT/TE/EE theory spectra against a
//! loaded [`ACTPolData`]. Every function here is pure: it reads the dataset,
//! allocates its own working arrays, and never mutates shared state, so a
//! single dataset can serve concurrent evaluations.
//!
//! Key behaviors
//! -------------
//! - [`bandpowers`] convolves a de-weighted spectrum with a window matrix,
//!   skipping the zero `ℓ = 1` column.
//! - [`model_vector`] assembles the TT|TE|EE model bandpowers, applying the
//!   polarization calibration `yp` to TE (linearly) and EE (quadratically).
//! - [`inflated_covariance`] adds the calibration term
//!   `sigc² · X_model X_modelᵀ` to the data covariance.
//! - [`loglike`] selects the active block, inverts it via Cholesky, and
//!   returns `χ²/2`.
//! - [`chi_square_summary`] reports `χ²`, the number of bins used, and the
//!   upper-tail χ² probability.
//!
//! Invariants & assumptions
//! ------------------------
//! - The dataset was built from a validated [`LikeConfig`]; all slicing below
//!   relies on those bounds.
//! - The model vector is fully populated for all `nbin` bins before the
//!   covariance is inflated, whatever the selection.
//!
//! Conventions
//! -----------
//! - Inputs are `D_ℓ` spectra starting at `ℓ = 2` with `tt_lmax - 1` entries.
//! - The TE block holds exactly `nbinte` bandpowers.
//! - `2 · loglike` is a χ² statistic.
//!
//! Testing notes
//! -------------
//! - Unit tests run on a small synthetic dataset and cover determinism, a
//!   forced zero residual, a diagonal covariance checked against a hand
//!   computed χ², each supported selection, calibration scaling, window
//!   column exclusion, and the error paths.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::likelihood::{
    config::LikeConfig,
    dataset::ACTPolData,
    errors::{LikeError, LikeResult},
    indexing::{bin_to_index, ell_to_index},
    linalg::{cholesky_inverse, quadratic_form},
    spectra::{TheorySpectra, deweight_spectrum, validate_spectrum},
};

/// Convolve a de-weighted spectrum with a window matrix.
///
/// Parameters
/// ----------
/// - `window`: `ArrayView2<f64>`
///   `bmax × lmax_win` window matrix whose column `k` belongs to
///   `ℓ = k + 1`.
/// - `cl`: `ArrayView1<f64>`
///   Working `C_ℓ` array of length `lmax_win` (see [`deweight_spectrum`]).
///
/// Returns
/// -------
/// `Array1<f64>`
///   `bp[b] = Σ_{k ≥ 1} window[b, k] · cl[k]`; column 0 never contributes.
///
/// Panics
/// ------
/// - If `window.ncols() != cl.len()`.
pub fn bandpowers(window: ArrayView2<'_, f64>, cl: ArrayView1<'_, f64>) -> Array1<f64> {
    let first = ell_to_index(2);
    window.slice(s![.., first..]).dot(&cl.slice(s![first..]))
}

/// Assemble the TT|TE|EE model bandpower vector of length `nbin`.
///
/// - TT: window rows `b0 .. b0 + nbintt` (1-based), i.e. the first `b0 - 1`
///   low-ℓ bins are skipped.
/// - TE: the first `nbinte` rows, times `yp`.
/// - EE: the first `nbinee` rows, times `yp²`.
///
/// Errors
/// ------
/// - `LikeError::SpectrumLength` / `LikeError::NonFiniteSpectrum`
///   When a spectrum is not `tt_lmax - 1` finite values.
/// - `LikeError::NonFiniteCalibration`
///   When `yp` is NaN/±inf.
pub fn model_vector(
    data: &ACTPolData, cell_tt: ArrayView1<'_, f64>, cell_te: ArrayView1<'_, f64>,
    cell_ee: ArrayView1<'_, f64>, yp: f64,
) -> LikeResult<Array1<f64>> {
    validate_inputs(data.config(), cell_tt, cell_te, cell_ee, yp)?;
    Ok(assemble_model(data, cell_tt, cell_te, cell_ee, yp))
}

fn assemble_model(
    data: &ACTPolData, cell_tt: ArrayView1<'_, f64>, cell_te: ArrayView1<'_, f64>,
    cell_ee: ArrayView1<'_, f64>, yp: f64,
) -> Array1<f64> {
    let config = data.config();
    let [win_tt, win_te, win_ee] = data.windows();

    let bp_tt = bandpowers(win_tt, deweight_spectrum(cell_tt, config.lmax_win).view());
    let bp_te = bandpowers(win_te, deweight_spectrum(cell_te, config.lmax_win).view());
    let bp_ee = bandpowers(win_ee, deweight_spectrum(cell_ee, config.lmax_win).view());

    let tt_first = bin_to_index(config.b0);
    let te_start = config.nbintt;
    let ee_start = config.nbintt + config.nbinte;

    let mut x_model = Array1::<f64>::zeros(config.nbin);
    x_model
        .slice_mut(s![..te_start])
        .assign(&bp_tt.slice(s![tt_first..tt_first + config.nbintt]));
    x_model.slice_mut(s![te_start..ee_start]).assign(&(&bp_te.slice(s![..config.nbinte]) * yp));
    x_model
        .slice_mut(s![ee_start..])
        .assign(&(&bp_ee.slice(s![..config.nbinee]) * yp.powi(2)));
    x_model
}

/// Covariance inflated by the temperature calibration uncertainty:
/// `cov + sigc² · x_model x_modelᵀ`.
pub fn inflated_covariance(
    cov: ArrayView2<'_, f64>, x_model: ArrayView1<'_, f64>, sigc: f64,
) -> Array2<f64> {
    let sigc2 = sigc.powi(2);
    Array2::from_shape_fn(cov.dim(), |(i, j)| cov[[i, j]] + sigc2 * (x_model[i] * x_model[j]))
}

/// loglike — ACTPol s2 log-likelihood for one set of theory spectra.
///
/// Parameters
/// ----------
/// - `data`: `&ACTPolData`
///   Loaded reference data.
/// - `cell_tt`, `cell_te`, `cell_ee`: `ArrayView1<f64>`
///   `D_ℓ` spectra for `ℓ = 2..=tt_lmax` (`tt_lmax - 1` entries each).
/// - `yp`: `f64`
///   Polarization calibration applied to TE (`yp`) and EE (`yp²`).
///
/// Returns
/// -------
/// `LikeResult<f64>`
///   `χ²/2` with `χ² = Yᵀ C⁻¹ Y` over the selected bins, `Y` the data minus
///   model residual and `C` the calibration-inflated covariance block.
///
/// Errors
/// ------
/// - `LikeError::UnsupportedSelection`
///   When the toggles are not TT-only, TE-only, EE-only, or all three.
/// - `LikeError::SpectrumLength` / `LikeError::NonFiniteSpectrum`
///   When a spectrum has the wrong length or a NaN/±inf entry.
/// - `LikeError::NonFiniteCalibration`
///   When `yp` is NaN/±inf.
/// - `LikeError::NotPositiveDefinite`
///   When the selected covariance block cannot be Cholesky-factored.
///
/// Examples
/// --------
/// ```no_run
/// # use std::path::Path;
/// # use actpol_like::likelihood::{ACTPolData, LikeConfig, loglike};
/// # use ndarray::Array1;
/// let data = ACTPolData::load(Path::new("data/actpol_2yr"), LikeConfig::default())?;
/// let dl = Array1::<f64>::from_elem(data.config().spectrum_len(), 1000.0);
/// let like = loglike(&data, dl.view(), dl.view(), dl.view(), 1.0)?;
/// println!("-2 ln L = {}", 2.0 * like);
/// # Ok::<(), actpol_like::likelihood::LikeError>(())
/// ```
pub fn loglike(
    data: &ACTPolData, cell_tt: ArrayView1<'_, f64>, cell_te: ArrayView1<'_, f64>,
    cell_ee: ArrayView1<'_, f64>, yp: f64,
) -> LikeResult<f64> {
    Ok(chi_square(data, cell_tt, cell_te, cell_ee, yp)?.0 / 2.0)
}

/// FitSummary — χ² goodness of fit of a theory spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    /// `2 · loglike`.
    pub chi2: f64,
    /// Number of bins entering the likelihood.
    pub dof: usize,
    /// `P(χ²_dof ≥ chi2)`.
    pub p_value: f64,
}

/// Evaluate the likelihood and report it as a χ² goodness of fit.
///
/// Errors
/// ------
/// - Everything [`loglike`] reports.
/// - `LikeError::Anyhow`
///   If the χ² distribution cannot be constructed for the bin count.
pub fn chi_square_summary(
    data: &ACTPolData, spectra: &TheorySpectra, yp: f64,
) -> LikeResult<FitSummary> {
    let (chi2, dof) =
        chi_square(data, spectra.tt.view(), spectra.te.view(), spectra.ee.view(), yp)?;
    let dist = ChiSquared::new(dof as f64).map_err(|e| anyhow::anyhow!("chi-square({dof}): {e}"))?;
    Ok(FitSummary { chi2, dof, p_value: dist.sf(chi2) })
}

impl ACTPolData {
    /// Method form of [`loglike`] taking owned [`TheorySpectra`].
    pub fn loglike(&self, spectra: &TheorySpectra, yp: f64) -> LikeResult<f64> {
        loglike(self, spectra.tt.view(), spectra.te.view(), spectra.ee.view(), yp)
    }
}

// ---- Helper methods ----

/// χ² and the number of bins it was computed over.
fn chi_square(
    data: &ACTPolData, cell_tt: ArrayView1<'_, f64>, cell_te: ArrayView1<'_, f64>,
    cell_ee: ArrayView1<'_, f64>, yp: f64,
) -> LikeResult<(f64, usize)> {
    let config: &LikeConfig = data.config();
    let selection = config.selection()?;
    validate_inputs(config, cell_tt, cell_te, cell_ee, yp)?;

    let x_model = assemble_model(data, cell_tt, cell_te, cell_ee, yp);
    let residual = &data.data_vector() - &x_model;
    let cov_tot = inflated_covariance(data.covariance(), x_model.view(), config.sigc);

    let range = selection.bin_range(config);
    let diff_vec = residual.slice(s![range.clone()]);
    let fisher = cholesky_inverse(cov_tot.slice(s![range.clone(), range.clone()]))?;

    Ok((quadratic_form(fisher.view(), diff_vec), range.len()))
}

fn validate_inputs(
    config: &LikeConfig, cell_tt: ArrayView1<'_, f64>, cell_te: ArrayView1<'_, f64>,
    cell_ee: ArrayView1<'_, f64>, yp: f64,
) -> LikeResult<()> {
    let expected = config.spectrum_len();
    validate_spectrum("TT", cell_tt, expected)?;
    validate_spectrum("TE", cell_te, expected)?;
    validate_spectrum("EE", cell_ee, expected)?;
    if !yp.is_finite() {
        return Err(LikeError::NonFiniteCalibration { value: yp });
    }
    Ok(())
}
