//! Integration tests for the ACTPol season-2 likelihood pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end pipeline: from a data directory on disk, through
//!   `ACTPolData::load`, to `loglike` and `chi_square_summary`.
//! - Check χ² values that can be derived by hand on a synthetic directory
//!   with a diagonal covariance, for every supported observable selection.
//!
//! Coverage
//! --------
//! - `likelihood::dataset`:
//!   - Loading text tables, the Fortran covariance record, and the three
//!     window files; failure on a missing window file.
//! - `likelihood::evaluator`:
//!   - Exact fit, hand-computed χ², calibration inflation, `yp` handling,
//!     unsupported selections, and concurrent evaluation on shared data.
//! - `likelihood::reference`:
//!   - The published Planck 2015 scenario when `ACTPOL_DATA_DIR` points at a
//!     real ACTPol season-2 data directory.
//!
//! Exclusions
//! ----------
//! - Parser and factorization edge cases; those are covered by unit tests.
//! - Python bindings; those are exercised from the Python package.
use std::{fs, path::Path, thread};

use actpol_like::likelihood::{
    ACTPolData, LikeConfig, LikeError, TheorySpectra, chi_square_summary,
    dataset::{BBL_EE_FILE, BBL_TE_FILE, BBL_TT_FILE, COV_FILE, LIKE_FILE},
    evaluator::model_vector,
    io::encode_fortran_record,
    loglike,
    reference::{EXPECTED_CHI2, self_test},
};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array1, Array2};
use tempfile::{TempDir, tempdir};

/// Seven bins (3 TT, 2 TE, 2 EE), five window rows, `ℓ = 2..=10` in the input.
fn synthetic_config(sigc: f64) -> LikeConfig {
    LikeConfig {
        tt_lmax: 10,
        lmax_win: 12,
        nbin: 7,
        nbintt: 3,
        nbinte: 2,
        nbinee: 2,
        b0: 2,
        bmax: 5,
        sigc,
        ..LikeConfig::default()
    }
}

/// Strictly positive `D_ℓ` spectra of length `tt_lmax - 1`.
fn synthetic_spectra(config: &LikeConfig) -> TheorySpectra {
    let n = config.spectrum_len();
    let ell = |i: usize| (i + 2) as f64;
    TheorySpectra::new(
        Array1::from_shape_fn(n, |i| 1000.0 + 10.0 * ell(i)),
        Array1::from_shape_fn(n, |i| 5.0 + 0.5 * ell(i)),
        Array1::from_shape_fn(n, |i| 2.0 + 0.25 * ell(i)),
        config,
    )
    .unwrap()
}

/// Diagonal covariance `0.25 · (i + 1)` as stored on disk.
fn diagonal_covariance(n: usize) -> Vec<f64> {
    let mut values = vec![0.0; n * n];
    for i in 0..n {
        values[i * n + i] = 0.25 * (i + 1) as f64;
    }
    values
}

/// Write a complete data directory with the given data vector.
///
/// Windows are top hats: row `b` weights on-disk columns `2b` and `2b + 1`
/// (`ℓ = 2b + 2, 2b + 3`) with weight one half each.
fn write_data_dir(dir: &Path, config: &LikeConfig, x_data: &Array1<f64>) {
    let mut like = String::from("# bin  data  sigma\n");
    for (i, x) in x_data.iter().enumerate() {
        like.push_str(&format!("{} {} {}\n", 100.0 * (i + 1) as f64, x, 1.0));
    }
    fs::write(dir.join(LIKE_FILE), like).unwrap();
    fs::write(dir.join(COV_FILE), encode_fortran_record(&diagonal_covariance(config.nbin)))
        .unwrap();

    let cols = config.lmax_win - 1;
    let window =
        Array2::from_shape_fn(
            (config.bmax, cols),
            |(b, k)| if k == 2 * b || k == 2 * b + 1 { 0.5 } else { 0.0 },
        );
    let mut text = String::new();
    for row in window.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&cells.join(" "));
        text.push('\n');
    }
    for name in [BBL_TT_FILE, BBL_TE_FILE, BBL_EE_FILE] {
        fs::write(dir.join(name), &text).unwrap();
    }
}

/// Directory whose data vector is `model + offset` for the synthetic spectra
/// at `yp`.
fn data_dir_with_offset(config: &LikeConfig, yp: f64, offset: f64) -> TempDir {
    let dir = tempdir().unwrap();
    write_data_dir(dir.path(), config, &Array1::zeros(config.nbin));
    let placeholder = ACTPolData::load(dir.path(), config.clone()).unwrap();

    let spectra = synthetic_spectra(config);
    let model =
        model_vector(&placeholder, spectra.tt.view(), spectra.te.view(), spectra.ee.view(), yp)
            .unwrap();
    write_data_dir(dir.path(), config, &(model + offset));
    dir
}

fn harmonic(range: std::ops::Range<usize>) -> f64 {
    range.map(|i| 1.0 / (i + 1) as f64).sum()
}

#[test]
// Purpose
// -------
// A data vector equal to the model gives a zero log-likelihood and a
// p-value of one.
fn exact_model_gives_zero_loglike() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = synthetic_config(0.01);
    let dir = data_dir_with_offset(&config, 0.98, 0.0);
    let data = ACTPolData::load(dir.path(), config.clone()).unwrap();
    let spectra = synthetic_spectra(&config);

    let like = data.loglike(&spectra, 0.98).unwrap();
    let summary = chi_square_summary(&data, &spectra, 0.98).unwrap();

    assert_abs_diff_eq!(like, 0.0, epsilon = 1e-12);
    assert_eq!(summary.dof, config.nbin);
    assert_relative_eq!(summary.p_value, 1.0, epsilon = 1e-12);
}

#[test]
// Purpose
// -------
// With sigc = 0, a constant offset δ = 0.5 and a diagonal covariance
// 0.25·(i+1), χ² is the partial harmonic sum over the selected bins.
//
// Expect
// ------
// - All:     H_7
// - TT only: bins 0..3
// - TE only: bins 3..5
// - EE only: bins 5..7
fn hand_computed_chi2_for_each_selection() {
    let base = synthetic_config(0.0);
    let dir = data_dir_with_offset(&base, 1.0, 0.5);
    let spectra = synthetic_spectra(&base);

    let cases = [
        ((true, true, true), 0..7),
        ((true, false, false), 0..3),
        ((false, true, false), 3..5),
        ((false, false, true), 5..7),
    ];
    for ((use_tt, use_te, use_ee), bins) in cases {
        let config = LikeConfig { use_tt, use_te, use_ee, ..base.clone() };
        let data = ACTPolData::load(dir.path(), config).unwrap();

        let like = data.loglike(&spectra, 1.0).unwrap();

        assert_relative_eq!(2.0 * like, harmonic(bins), max_relative = 1e-10);
    }
}

#[test]
// Purpose
// -------
// Calibration uncertainty inflates the covariance along the model, which
// strictly lowers χ² when residual and model point the same way.
fn calibration_uncertainty_lowers_chi2() {
    let tight = synthetic_config(0.0);
    let loose = synthetic_config(0.01);
    let dir = data_dir_with_offset(&tight, 1.0, 0.5);
    let spectra = synthetic_spectra(&tight);

    let like_tight = ACTPolData::load(dir.path(), tight).unwrap().loglike(&spectra, 1.0).unwrap();
    let like_loose = ACTPolData::load(dir.path(), loose).unwrap().loglike(&spectra, 1.0).unwrap();

    assert!(like_loose < like_tight);
    assert!(like_loose > 0.0);
}

#[test]
// Purpose
// -------
// The TT block depends on neither the TE/EE model nor yp.
fn tt_only_is_independent_of_yp() {
    let base = synthetic_config(0.01);
    let dir = data_dir_with_offset(&base, 1.0, 0.5);
    let config = LikeConfig { use_te: false, use_ee: false, ..base.clone() };
    let data = ACTPolData::load(dir.path(), config).unwrap();
    let spectra = synthetic_spectra(&base);

    let at_one = data.loglike(&spectra, 1.0).unwrap();
    let at_other = data.loglike(&spectra, 0.9).unwrap();

    assert_eq!(at_one, at_other);
}

#[test]
// Purpose
// -------
// Evaluation is read-only: threads sharing one dataset agree bit for bit with
// a sequential evaluation.
fn concurrent_evaluation_matches_sequential() {
    let config = synthetic_config(0.01);
    let dir = data_dir_with_offset(&config, 1.0, 0.5);
    let data = ACTPolData::load(dir.path(), config.clone()).unwrap();
    let spectra = synthetic_spectra(&config);
    let sequential = loglike(&data, spectra.tt.view(), spectra.te.view(), spectra.ee.view(), 0.99)
        .unwrap();

    let results: Vec<f64> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    loglike(&data, spectra.tt.view(), spectra.te.view(), spectra.ee.view(), 0.99)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|&r| r == sequential));
}

#[test]
fn unsupported_selection_loads_but_fails_to_evaluate() {
    let base = synthetic_config(0.01);
    let dir = data_dir_with_offset(&base, 1.0, 0.0);
    let config = LikeConfig { use_ee: false, ..base.clone() };
    let data = ACTPolData::load(dir.path(), config).unwrap();

    let err = data.loglike(&synthetic_spectra(&base), 1.0).unwrap_err();

    assert!(matches!(
        err,
        LikeError::UnsupportedSelection { use_tt: true, use_te: true, use_ee: false }
    ));
}

#[test]
fn missing_window_file_is_a_load_error() {
    let config = synthetic_config(0.01);
    let dir = data_dir_with_offset(&config, 1.0, 0.0);
    fs::remove_file(dir.path().join(BBL_EE_FILE)).unwrap();

    let err = ACTPolData::load(dir.path(), config).unwrap_err();

    assert!(matches!(err, LikeError::DataFileMissing { .. }));
    assert!(err.is_load_error());
}

#[test]
// Purpose
// -------
// Reproduce the published 2·loglike for the Planck 2015 best fit.
//
// Notes
// -----
// Requires the ACTPol season-2 data; skipped unless `ACTPOL_DATA_DIR` is set.
fn published_reference_scenario() {
    let Ok(dir) = std::env::var("ACTPOL_DATA_DIR") else {
        return;
    };
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = Path::new(&dir);
    let data = ACTPolData::load(dir, LikeConfig::default()).unwrap();

    let outcome = self_test(&data, dir).unwrap();

    assert_relative_eq!(outcome.found, EXPECTED_CHI2, max_relative = 1e-6);
    assert!(outcome.passed);
}
