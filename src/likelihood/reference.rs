//! likelihood::reference — end-to-end self-test against the published value.
//!
//! Evaluates the likelihood for the Planck 2015 best-fit spectrum shipped with
//! the ACTPol data (`planck2015.dat`) at `yp = 1` and compares `2 · loglike`
//! with the value the ACTPol team published for the same inputs. This is a
//! sanity check for a data directory and build, not a unit-test framework.
use std::path::Path;

use log::info;

use crate::likelihood::{
    dataset::ACTPolData,
    errors::LikeResult,
    io::read_text_table,
    spectra::TheorySpectra,
};

/// Reference spectrum file: `ℓ, TT, TE, EE, BB, φφ` in the `D_ℓ` convention.
pub const REFERENCE_SPECTRUM_FILE: &str = "planck2015.dat";

/// Published `2 · loglike` for [`REFERENCE_SPECTRUM_FILE`] with `yp = 1`.
pub const EXPECTED_CHI2: f64 = 147.747797921459;

/// Relative tolerance accepted by [`self_test`].
pub const SELF_TEST_RTOL: f64 = 1e-6;

/// SelfTestOutcome — expected versus computed `2 · loglike`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTestOutcome {
    pub expected: f64,
    pub found: f64,
    pub passed: bool,
}

/// Run the reference scenario.
///
/// Parameters
/// ----------
/// - `data`: `&ACTPolData`
///   Dataset loaded with the default configuration.
/// - `data_dir`: `&Path`
///   Directory containing [`REFERENCE_SPECTRUM_FILE`].
///
/// Returns
/// -------
/// `LikeResult<SelfTestOutcome>`
///   `passed` is true when `|found - expected| ≤ SELF_TEST_RTOL · expected`.
///
/// Errors
/// ------
/// - Loader errors for the spectrum file, and everything
///   [`crate::likelihood::loglike`] reports.
pub fn self_test(data: &ACTPolData, data_dir: &Path) -> LikeResult<SelfTestOutcome> {
    let config = data.config();
    let table =
        read_text_table(&data_dir.join(REFERENCE_SPECTRUM_FILE), config.spectrum_len(), 4)?;
    let spectra = TheorySpectra::from_columns(&table, config)?;

    let found = 2.0 * data.loglike(&spectra, 1.0)?;
    let passed = (found - EXPECTED_CHI2).abs() <= SELF_TEST_RTOL * EXPECTED_CHI2;

    info!("Expected: {EXPECTED_CHI2:.12}");
    info!("Found   : {found:.12}");
    Ok(SelfTestOutcome { expected: EXPECTED_CHI2, found, passed })
}
