//! actpol_like — ACTPol season-2 CMB likelihood with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the ACTPol likelihood to Python samplers via the `_actpol_like` extension
//! module. When the `python-bindings` feature is enabled, this module defines
//! the Python-facing classes used by the `actpol_like` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust module (`likelihood`) as the public crate
//!   surface.
//! - Define the `ACTPolS2` and `FitSummary` `#[pyclass]` wrappers and the
//!   `#[pymodule]` initializer for the `_actpol_like` Python extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in [`likelihood`]; this file performs
//!   only FFI glue, argument conversion, and error mapping.
//! - A constructed `ACTPolS2` always holds a fully loaded, validated dataset;
//!   construction failures surface as Python exceptions.
//!
//! Conventions
//! -----------
//! - Spectra passed from Python are `D_ℓ` arrays for `ℓ = 2..=tt_lmax`, the
//!   same convention as [`likelihood::loglike`].
//! - Loader failures become `OSError`; every other [`likelihood::LikeError`]
//!   becomes `ValueError`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`likelihood`] directly and can ignore
//!   the PyO3 items guarded by the `python-bindings` feature.
//! - Python samplers construct one `ACTPolS2` per chain and call `loglike`
//!   for each trial cosmology.
//!
//! Testing notes
//! -------------
//! - Core numerical behavior is covered by unit tests in the `likelihood`
//!   submodules and by `tests/integration_actpol_pipeline.rs`.
//! - The bindings add no numerical logic of their own.

pub mod likelihood;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::path::PathBuf;

#[cfg(feature = "python-bindings")]
use numpy::PyReadonlyArray1;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    likelihood::{
        ACTPolData, LikeConfig, TheorySpectra, chi_square_summary, dataset::VERSION,
        evaluator::FitSummary as RustFitSummary, loglike, self_test,
    },
    utils::extract_f64_array,
};

/// ACTPolS2 — Python-facing handle on a loaded ACTPol season-2 dataset.
///
/// Purpose
/// -------
/// Load the season-2 data products once and expose the likelihood evaluation
/// to Python samplers.
///
/// Parameters
/// ----------
/// - `data_dir`: `str | os.PathLike`
///   Directory holding `cl_cmb_aps2.dat`, `c_matrix_actpol.dat`, the three
///   `BblMean*.dat` window files and, for `test()`, `planck2015.dat`.
/// - `print_version`: `bool`
///   Print the version banner before loading and a completion line after.
/// - remaining keywords
///   Fields of [`LikeConfig`], defaulting to the published configuration.
///
/// Notes
/// -----
/// - The class is `frozen`; evaluation never mutates the loaded data, so one
///   instance may be shared freely between Python threads.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "actpol_like", frozen)]
pub struct ACTPolS2 {
    inner: ACTPolData,
    data_dir: PathBuf,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ACTPolS2 {
    #[new]
    #[pyo3(
        signature = (
            data_dir,
            print_version = false,
            use_tt = true,
            use_te = true,
            use_ee = true,
            tt_lmax = 6000,
            nbin = 132,
            lmax_win = 9000,
            bmax = 53,
            sigc = 0.01,
            b0 = 4,
            nbintt = 42,
            nbinte = 45,
            nbinee = 45
        ),
        text_signature = "(data_dir, /, print_version=False, use_tt=True, use_te=True, \
                          use_ee=True, tt_lmax=6000, nbin=132, lmax_win=9000, bmax=53, \
                          sigc=0.01, b0=4, nbintt=42, nbinte=45, nbinee=45)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_dir: PathBuf, print_version: bool, use_tt: bool, use_te: bool, use_ee: bool,
        tt_lmax: usize, nbin: usize, lmax_win: usize, bmax: usize, sigc: f64, b0: usize,
        nbintt: usize, nbinte: usize, nbinee: usize,
    ) -> PyResult<Self> {
        let config = LikeConfig {
            use_tt,
            use_te,
            use_ee,
            tt_lmax,
            lmax_win,
            nbin,
            nbintt,
            nbinte,
            nbinee,
            b0,
            bmax,
            sigc,
        };
        let inner = if print_version {
            ACTPolData::load_announced(&data_dir, config, &mut std::io::stdout())?
        } else {
            ACTPolData::load(&data_dir, config)?
        };
        Ok(ACTPolS2 { inner, data_dir })
    }

    /// Log-likelihood `χ²/2` for `D_ℓ` spectra over `ℓ = 2..=tt_lmax`.
    #[pyo3(text_signature = "(self, cell_tt, cell_te, cell_ee, yp, /)")]
    pub fn loglike<'py>(
        &self, py: Python<'py>, cell_tt: &Bound<'py, PyAny>, cell_te: &Bound<'py, PyAny>,
        cell_ee: &Bound<'py, PyAny>, yp: f64,
    ) -> PyResult<f64> {
        let tt: PyReadonlyArray1<f64> = extract_f64_array(py, cell_tt, "cell_tt")?;
        let te: PyReadonlyArray1<f64> = extract_f64_array(py, cell_te, "cell_te")?;
        let ee: PyReadonlyArray1<f64> = extract_f64_array(py, cell_ee, "cell_ee")?;
        Ok(loglike(&self.inner, tt.as_array(), te.as_array(), ee.as_array(), yp)?)
    }

    /// χ², degrees of freedom and p-value for the same inputs as `loglike`.
    #[pyo3(text_signature = "(self, cell_tt, cell_te, cell_ee, yp, /)")]
    pub fn fit_summary<'py>(
        &self, py: Python<'py>, cell_tt: &Bound<'py, PyAny>, cell_te: &Bound<'py, PyAny>,
        cell_ee: &Bound<'py, PyAny>, yp: f64,
    ) -> PyResult<FitSummary> {
        let tt = extract_f64_array(py, cell_tt, "cell_tt")?.as_array().to_owned();
        let te = extract_f64_array(py, cell_te, "cell_te")?.as_array().to_owned();
        let ee = extract_f64_array(py, cell_ee, "cell_ee")?.as_array().to_owned();
        let spectra = TheorySpectra::new(tt, te, ee, self.inner.config())?;
        Ok(FitSummary { inner: chi_square_summary(&self.inner, &spectra, yp)? })
    }

    /// Evaluate the Planck 2015 reference spectrum and return
    /// `(expected, found)` for `2 · loglike`.
    pub fn test(&self) -> PyResult<(f64, f64)> {
        let outcome = self_test(&self.inner, &self.data_dir)?;
        println!("Expected: {:.12}", outcome.expected);
        println!("Found   : {:.12}", outcome.found);
        Ok((outcome.expected, outcome.found))
    }

    /// Dataset version string.
    #[getter]
    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// Bins entering the likelihood for the configured observables.
    #[getter]
    pub fn nbins_used(&self) -> PyResult<usize> {
        let config = self.inner.config();
        Ok(config.selection()?.bin_count(config))
    }
}

/// FitSummary — χ² goodness of fit returned by `ACTPolS2.fit_summary`.
///
/// Notes
/// -----
/// - Rust callers should use [`likelihood::FitSummary`] directly; this
///   wrapper exists solely for the PyO3 binding.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "actpol_like", frozen)]
pub struct FitSummary {
    pub inner: RustFitSummary,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl FitSummary {
    #[getter]
    pub fn chi2(&self) -> f64 {
        self.inner.chi2
    }

    #[getter]
    pub fn dof(&self) -> usize {
        self.inner.dof
    }

    #[getter]
    pub fn p_value(&self) -> f64 {
        self.inner.p_value
    }

    fn __repr__(&self) -> String {
        format!(
            "FitSummary(chi2={:.6}, dof={}, p_value={:.6})",
            self.inner.chi2, self.inner.dof, self.inner.p_value
        )
    }
}

/// _actpol_like — PyO3 module initializer for the Python extension.
///
/// Registers `ACTPolS2`, `FitSummary`, and the published reference χ²
/// (`EXPECTED_CHI2`) on the `_actpol_like` module. Invoked by Python when the
/// compiled extension is imported.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _actpol_like<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<ACTPolS2>()?;
    m.add_class::<FitSummary>()?;
    m.add("EXPECTED_CHI2", likelihood::reference::EXPECTED_CHI2)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
