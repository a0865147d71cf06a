//! Likelihood configuration — dataset dimensions, multipole ranges, and
//! observable selection.
//!
//! Purpose
//! -------
//! Collect the fixed scalar parameters of the ACTPol season-2 likelihood in
//! one place and check their cross-field preconditions before any file is
//! touched. The defaults reproduce the published ACTPol s2 CMB-only setup.
//!
//! Key behaviors
//! -------------
//! - [`LikeConfig`] carries observable toggles, multipole limits, bin counts,
//!   the first usable TT bin, the number of window rows, and the calibration
//!   uncertainty `sigc`.
//! - [`LikeConfig::validate`] enforces `nbin == nbintt + nbinte + nbinee` and
//!   the index bounds the evaluator relies on.
//! - [`Selection`] resolves the three toggles into one of the four supported
//!   observable blocks and maps it to a range of the concatenated bin space.
//!
//! Invariants & assumptions
//! ------------------------
//! - Bin ordering in the concatenated index space is always TT, then TE, then
//!   EE.
//! - A validated configuration never changes after construction of the
//!   dataset; the evaluator assumes every bound checked here holds.
//!
//! Conventions
//! -----------
//! - `b0` is a 1-based bin number, `tt_lmax`/`lmax_win` are multipoles.
//!   Conversion to array offsets goes through [`crate::likelihood::indexing`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover the defaults, every validation branch, and the bin
//!   counts of the four supported selections.
use std::ops::Range;

use crate::likelihood::{
    errors::{LikeError, LikeResult},
    indexing::bin_to_index,
};

/// LikeConfig — fixed scalar parameters of the ACTPol likelihood.
///
/// Fields
/// ------
/// - `use_tt`, `use_te`, `use_ee`: `bool`
///   Observable toggles. Only TT-only, TE-only, EE-only, and all three are
///   supported; see [`Selection`].
/// - `tt_lmax`: `usize`
///   Highest multipole of the input spectra. Inputs cover `ℓ = 2..=tt_lmax`.
/// - `lmax_win`: `usize`
///   Highest multipole covered by the window functions.
/// - `nbin`, `nbintt`, `nbinte`, `nbinee`: `usize`
///   Total and per-observable bin counts.
/// - `b0`: `usize`
///   First TT window row (1-based) used in the likelihood.
/// - `bmax`: `usize`
///   Number of window-function rows per observable.
/// - `sigc`: `f64`
///   Fractional temperature calibration uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeConfig {
    pub use_tt: bool,
    pub use_te: bool,
    pub use_ee: bool,
    pub tt_lmax: usize,
    pub lmax_win: usize,
    pub nbin: usize,
    pub nbintt: usize,
    pub nbinte: usize,
    pub nbinee: usize,
    pub b0: usize,
    pub bmax: usize,
    pub sigc: f64,
}

impl Default for LikeConfig {
    fn default() -> Self {
        LikeConfig {
            use_tt: true,
            use_te: true,
            use_ee: true,
            tt_lmax: 6000,
            lmax_win: 9000,
            nbin: 132,
            // 500 < ell < 4000
            nbintt: 42,
            // 250 < ell < 4000
            nbinte: 45,
            nbinee: 45,
            b0: 4,
            bmax: 53,
            sigc: 0.01,
        }
    }
}

impl LikeConfig {
    /// Check the cross-field preconditions of the configuration.
    ///
    /// Errors
    /// ------
    /// - `LikeError::InvalidConfig`
    ///   When `nbin != nbintt + nbinte + nbinee`, `b0 == 0`, the TT window
    ///   `b0 - 1 + nbintt` exceeds `bmax`, `nbinte` or `nbinee` exceeds `bmax`,
    ///   `tt_lmax < 2`, `tt_lmax > lmax_win`, or `sigc` is negative or
    ///   non-finite.
    pub fn validate(&self) -> LikeResult<()> {
        let sum = self
            .nbintt
            .checked_add(self.nbinte)
            .and_then(|s| s.checked_add(self.nbinee))
            .ok_or_else(|| invalid("nbintt + nbinte + nbinee overflows usize".to_string()))?;
        if self.nbin != sum {
            return Err(invalid(format!(
                "nbin ({}) must equal nbintt + nbinte + nbinee ({sum})",
                self.nbin
            )));
        }
        self.covariance_len()?;
        if self.b0 == 0 {
            return Err(invalid("b0 is a 1-based bin number and must be >= 1".to_string()));
        }
        let tt_end = bin_to_index(self.b0).checked_add(self.nbintt);
        if tt_end.map_or(true, |end| end > self.bmax) {
            return Err(invalid(format!(
                "TT bins starting at b0 ({}) with nbintt ({}) exceed bmax ({})",
                self.b0, self.nbintt, self.bmax
            )));
        }
        if self.nbinte > self.bmax || self.nbinee > self.bmax {
            return Err(invalid(format!(
                "nbinte ({}) and nbinee ({}) must not exceed bmax ({})",
                self.nbinte, self.nbinee, self.bmax
            )));
        }
        if self.tt_lmax < 2 {
            return Err(invalid(format!("tt_lmax must be >= 2; got {}", self.tt_lmax)));
        }
        if self.tt_lmax > self.lmax_win {
            return Err(invalid(format!(
                "tt_lmax ({}) must not exceed lmax_win ({})",
                self.tt_lmax, self.lmax_win
            )));
        }
        if !self.sigc.is_finite() || self.sigc < 0.0 {
            return Err(invalid(format!("sigc must be finite and >= 0; got {}", self.sigc)));
        }
        Ok(())
    }

    /// Number of multipoles expected in each input spectrum (`ℓ = 2..=tt_lmax`).
    pub fn spectrum_len(&self) -> usize {
        self.tt_lmax - 1
    }

    /// Number of reals in the covariance record, `nbin²`.
    ///
    /// Errors
    /// ------
    /// - `LikeError::InvalidConfig`
    ///   When `nbin²` does not fit in `usize`.
    pub fn covariance_len(&self) -> LikeResult<usize> {
        self.nbin
            .checked_mul(self.nbin)
            .ok_or_else(|| invalid(format!("nbin ({}) squared overflows usize", self.nbin)))
    }

    /// Resolve the observable toggles into a [`Selection`].
    pub fn selection(&self) -> LikeResult<Selection> {
        Selection::from_toggles(self.use_tt, self.use_te, self.use_ee)
    }
}

fn invalid(reason: String) -> LikeError {
    LikeError::InvalidConfig { reason }
}

/// Selection — the supported observable combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    TtOnly,
    TeOnly,
    EeOnly,
    All,
}

impl Selection {
    /// Map `(use_tt, use_te, use_ee)` to a supported selection.
    ///
    /// Errors
    /// ------
    /// - `LikeError::UnsupportedSelection`
    ///   For any combination other than exactly one toggle or all three
    ///   (e.g. TT+TE without EE, or nothing at all).
    pub fn from_toggles(use_tt: bool, use_te: bool, use_ee: bool) -> LikeResult<Self> {
        match (use_tt, use_te, use_ee) {
            (true, false, false) => Ok(Selection::TtOnly),
            (false, true, false) => Ok(Selection::TeOnly),
            (false, false, true) => Ok(Selection::EeOnly),
            (true, true, true) => Ok(Selection::All),
            _ => Err(LikeError::UnsupportedSelection { use_tt, use_te, use_ee }),
        }
    }

    /// Range of the concatenated TT|TE|EE bin space covered by this selection.
    pub fn bin_range(self, config: &LikeConfig) -> Range<usize> {
        let te_start = config.nbintt;
        let ee_start = config.nbintt + config.nbinte;
        match self {
            Selection::TtOnly => 0..config.nbintt,
            Selection::TeOnly => te_start..te_start + config.nbinte,
            Selection::EeOnly => ee_start..ee_start + config.nbinee,
            Selection::All => 0..config.nbin,
        }
    }

    /// Number of bins entering the likelihood for this selection.
    pub fn bin_count(self, config: &LikeConfig) -> usize {
        self.bin_range(config).len()
    }
}
