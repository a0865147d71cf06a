//! likelihood — ACTPol season-2 CMB-only likelihood.
//!
//! Purpose
//! -------
//! Compare a theoretical CMB power spectrum (TT, TE, EE) with the ACTPol
//! season-2 bandpowers and return a log-likelihood suitable for MCMC
//! parameter estimation. Data products are loaded once; each evaluation is a
//! pure function of the loaded data, the spectra, and the polarization
//! calibration `yp`.
//!
//! Key behaviors
//! -------------
//! - Configure dimensions and observable toggles with [`LikeConfig`]; resolve
//!   the toggles into a [`Selection`].
//! - Load the binned data, covariance, and window functions into an immutable
//!   [`ACTPolData`] via [`ACTPolData::load`] (or [`ACTPolData::from_parts`]).
//! - Evaluate [`loglike`] (or [`ACTPolData::loglike`]) and, when a goodness of
//!   fit is wanted, [`chi_square_summary`].
//! - Check a data directory end to end with [`reference::self_test`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `nbin == nbintt + nbinte + nbinee`, checked before loading.
//! - Bins are concatenated TT, TE, EE in the data vector, the covariance, and
//!   the residual.
//! - The covariance is exactly symmetric after loading; window matrices carry
//!   a zero column for `ℓ = 1`.
//!
//! Conventions
//! -----------
//! - Inputs are `D_ℓ = ℓ(ℓ+1)C_ℓ/2π` for `ℓ = 2..=tt_lmax`.
//! - Physical multipoles and bin numbers become array offsets only through
//!   [`indexing`].
//! - `2 · loglike` is a χ² statistic.
//! - The library never installs a logger; it emits `log` records at `debug`
//!   and `info` level while loading and self-testing.
//!
//! Downstream usage
//! ----------------
//! - Load once per process, share `&ACTPolData` between sampler threads, and
//!   call [`loglike`] for each trial spectrum.
//! - Python samplers use the `ACTPolS2` class exported by the crate root
//!   under the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests on small synthetic data.
//! - `tests/integration_actpol_pipeline.rs` runs the full load-and-evaluate
//!   pipeline on a synthetic data directory and, when `ACTPOL_DATA_DIR`
//!   points at the real data, the published reference scenario.

pub mod config;
pub mod dataset;
pub mod errors;
pub mod evaluator;
pub mod indexing;
pub mod io;
pub mod linalg;
pub mod reference;
pub mod spectra;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::config::{LikeConfig, Selection};
pub use self::dataset::ACTPolData;
pub use self::errors::{LikeError, LikeResult};
pub use self::evaluator::{FitSummary, chi_square_summary, loglike};
pub use self::reference::{SelfTestOutcome, self_test};
pub use self::spectra::TheorySpectra;

// ---- Optional convenience prelude for downstream crates ------------------

pub mod prelude {
    pub use super::config::{LikeConfig, Selection};
    pub use super::dataset::ACTPolData;
    pub use super::errors::{LikeError, LikeResult};
    pub use super::evaluator::{FitSummary, chi_square_summary, loglike};
    pub use super::spectra::TheorySpectra;
}
