//! likelihood::dataset — the immutable ACTPol season-2 reference dataset.
//!
//! Purpose
//! -------
//! Load the binned bandpowers, covariance matrix, and TT/TE/EE window
//! functions once, check them against a validated [`LikeConfig`], and expose
//! them read-only to the evaluator.
//!
//! Key behaviors
//! -------------
//! - [`ACTPolData::load`] reads the four data products from a directory using
//!   the readers in [`crate::likelihood::io`], mirrors the covariance, and
//!   prepends the zero column to each window matrix.
//! - [`ACTPolData::load_announced`] wraps `load` with the human-readable
//!   version banner and completion line written to a caller-supplied sink.
//! - [`ACTPolData::from_parts`] builds the same value from in-memory arrays
//!   (synthetic datasets, alternative file formats) with identical checks.
//! - Fields are private; accessors hand out views so that a constructed
//!   dataset can never be modified.
//!
//! Invariants & assumptions
//! ------------------------
//! - `bval`, `x_data`, `x_sig` have length `nbin`.
//! - `covmat` is `nbin × nbin` and exactly symmetric.
//! - Each window matrix has `bmax` rows and at least `lmax_win` columns, the
//!   first of which is zero.
//! - Construction fails as a whole; there is no partially loaded dataset.
//!
//! Conventions
//! -----------
//! - Bins are concatenated TT, TE, EE in every array.
//! - `ACTPolData` is `Send + Sync`; share it by reference between threads.
//!
//! Testing notes
//! -------------
//! - Unit tests build tiny synthetic data directories with `tempfile` and
//!   cover a successful load, the symmetry fixup, and the fatal error paths.
use std::{io::Write, path::Path};

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

use crate::likelihood::{
    config::LikeConfig,
    errors::{LikeError, LikeResult},
    io::{mirror_lower_onto_upper, prepend_zero_column, read_fortran_record, read_text_table},
};

/// Binned bandpowers: bin center, value, uncertainty.
pub const LIKE_FILE: &str = "cl_cmb_aps2.dat";
/// Fortran unformatted covariance matrix.
pub const COV_FILE: &str = "c_matrix_actpol.dat";
/// TT window functions.
pub const BBL_TT_FILE: &str = "BblMean.dat";
/// TE window functions.
pub const BBL_TE_FILE: &str = "BblMean_Cross.dat";
/// EE window functions.
pub const BBL_EE_FILE: &str = "BblMean_Pol.dat";

/// Version tag reported by the likelihood.
pub const VERSION: &str = "ACTPol_s2_cmbonly_like";

/// ACTPolData — loaded reference data for the ACTPol s2 likelihood.
///
/// Fields
/// ------
/// - `config`: [`LikeConfig`]
///   Validated configuration the data was checked against.
/// - `bval`, `x_data`, `x_sig`: `Array1<f64>`
///   Bin centers, observed bandpowers, and their uncertainties.
/// - `covmat`: `Array2<f64>`
///   Symmetric bandpower covariance.
/// - `win_tt`, `win_te`, `win_ee`: `Array2<f64>`
///   Window functions with the zero `ℓ = 1` column prepended.
#[derive(Debug, Clone, PartialEq)]
pub struct ACTPolData {
    config: LikeConfig,
    bval: Array1<f64>,
    x_data: Array1<f64>,
    x_sig: Array1<f64>,
    covmat: Array2<f64>,
    win_tt: Array2<f64>,
    win_te: Array2<f64>,
    win_ee: Array2<f64>,
}

impl ACTPolData {
    /// Load the reference dataset from `data_dir`.
    ///
    /// Parameters
    /// ----------
    /// - `data_dir`: `&Path`
    ///   Directory holding `cl_cmb_aps2.dat`, `c_matrix_actpol.dat`,
    ///   `BblMean.dat`, `BblMean_Cross.dat`, and `BblMean_Pol.dat`.
    /// - `config`: [`LikeConfig`]
    ///   Dimensions and toggles; validated before any file is opened.
    ///
    /// Errors
    /// ------
    /// - `LikeError::InvalidConfig`
    ///   When `config` fails [`LikeConfig::validate`].
    /// - `LikeError::DataFileMissing`, `DataFileUnreadable`, `ParseFailure`,
    ///   `MalformedRecord`
    ///   From the file readers.
    /// - `LikeError::ShapeMismatch`
    ///   When the covariance record does not hold `nbin²` values or a table is
    ///   too small for `config`.
    pub fn load(data_dir: &Path, config: LikeConfig) -> LikeResult<Self> {
        config.validate()?;
        info!("Initializing ACTPol likelihood, version {VERSION}");

        let like = read_text_table(&data_dir.join(LIKE_FILE), config.nbin, 3)?;

        let cov_path = data_dir.join(COV_FILE);
        let cov_values = read_fortran_record(&cov_path)?;
        let expected = config.covariance_len()?;
        if cov_values.len() != expected {
            return Err(LikeError::ShapeMismatch {
                what: cov_path.display().to_string(),
                expected: format!("{expected} reals ({0}x{0})", config.nbin),
                actual: format!("{} reals", cov_values.len()),
            });
        }
        let mut covmat =
            Array2::from_shape_vec((config.nbin, config.nbin), cov_values).map_err(|e| {
                LikeError::ShapeMismatch {
                    what: cov_path.display().to_string(),
                    expected: format!("{0}x{0} matrix", config.nbin),
                    actual: e.to_string(),
                }
            })?;
        mirror_lower_onto_upper(&mut covmat);

        let min_cols = config.lmax_win - 1;
        let win_tt = read_text_table(&data_dir.join(BBL_TT_FILE), config.bmax, min_cols)?;
        let win_te = read_text_table(&data_dir.join(BBL_TE_FILE), config.bmax, min_cols)?;
        let win_ee = read_text_table(&data_dir.join(BBL_EE_FILE), config.bmax, min_cols)?;

        let data = ACTPolData::from_parts(
            config,
            like.column(0).to_owned(),
            like.column(1).to_owned(),
            like.column(2).to_owned(),
            covmat,
            win_tt.view(),
            win_te.view(),
            win_ee.view(),
        )?;
        info!("Finished initializing ({} bins from {}).", data.config.nbin, data_dir.display());
        Ok(data)
    }

    /// [`ACTPolData::load`] with progress lines written to `out`.
    ///
    /// Writes `Initializing ACTPol likelihood, version …` before any file is
    /// read and `Finished initializing.` once the dataset is complete; on a
    /// load failure only the first line is written.
    ///
    /// Errors
    /// ------
    /// - Everything [`ACTPolData::load`] reports.
    /// - `LikeError::Anyhow`
    ///   When writing to `out` fails.
    pub fn load_announced(
        data_dir: &Path, config: LikeConfig, out: &mut dyn Write,
    ) -> LikeResult<Self> {
        writeln!(out, "Initializing ACTPol likelihood, version {VERSION}")
            .map_err(|e| anyhow::anyhow!("writing version banner: {e}"))?;
        let data = ACTPolData::load(data_dir, config)?;
        writeln!(out, "Finished initializing.")
            .map_err(|e| anyhow::anyhow!("writing completion line: {e}"))?;
        Ok(data)
    }

    /// Build a dataset from in-memory arrays.
    ///
    /// Windows are passed as stored on disk (`bmax` rows, column `k` for
    /// `ℓ = k + 2`); the zero `ℓ = 1` column is prepended here. The covariance
    /// must already be symmetric.
    ///
    /// Errors
    /// ------
    /// - `LikeError::InvalidConfig`
    ///   When `config` fails [`LikeConfig::validate`].
    /// - `LikeError::ShapeMismatch`
    ///   When any array disagrees with `config`.
    /// - `LikeError::AsymmetricCovariance`
    ///   On the first `(i, j)` with `covmat[i][j] != covmat[j][i]`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        config: LikeConfig, bval: Array1<f64>, x_data: Array1<f64>, x_sig: Array1<f64>,
        covmat: Array2<f64>, win_tt: ArrayView2<'_, f64>, win_te: ArrayView2<'_, f64>,
        win_ee: ArrayView2<'_, f64>,
    ) -> LikeResult<Self> {
        config.validate()?;
        let nbin = config.nbin;

        for (name, v) in [("bin centers", &bval), ("data vector", &x_data), ("sigmas", &x_sig)] {
            if v.len() != nbin {
                return Err(shape_mismatch(name, format!("{nbin}"), format!("{}", v.len())));
            }
        }
        if covmat.dim() != (nbin, nbin) {
            let (r, c) = covmat.dim();
            return Err(shape_mismatch("covariance", format!("{nbin}x{nbin}"), format!("{r}x{c}")));
        }
        check_symmetric(covmat.view())?;

        let win_tt = pad_window("TT window", win_tt, &config)?;
        let win_te = pad_window("TE window", win_te, &config)?;
        let win_ee = pad_window("EE window", win_ee, &config)?;

        Ok(ACTPolData { config, bval, x_data, x_sig, covmat, win_tt, win_te, win_ee })
    }

    /// Configuration the dataset was validated against.
    pub fn config(&self) -> &LikeConfig {
        &self.config
    }

    /// Bin centers (multipoles), TT|TE|EE.
    pub fn bin_centers(&self) -> ArrayView1<'_, f64> {
        self.bval.view()
    }

    /// Observed bandpowers, TT|TE|EE.
    pub fn data_vector(&self) -> ArrayView1<'_, f64> {
        self.x_data.view()
    }

    /// Diagonal bandpower uncertainties, TT|TE|EE.
    pub fn sigmas(&self) -> ArrayView1<'_, f64> {
        self.x_sig.view()
    }

    /// Symmetric `nbin × nbin` covariance.
    pub fn covariance(&self) -> ArrayView2<'_, f64> {
        self.covmat.view()
    }

    /// Window functions restricted to the columns `ℓ = 1..=lmax_win - 1`
    /// that enter the convolution (column 0 is the zero `ℓ = 1` slot).
    pub fn windows(&self) -> [ArrayView2<'_, f64>; 3] {
        let cols = self.config.lmax_win;
        [
            self.win_tt.slice(s![.., ..cols]),
            self.win_te.slice(s![.., ..cols]),
            self.win_ee.slice(s![.., ..cols]),
        ]
    }
}

fn shape_mismatch(what: &str, expected: String, actual: String) -> LikeError {
    LikeError::ShapeMismatch { what: what.to_string(), expected, actual }
}

fn pad_window(
    name: &str, win: ArrayView2<'_, f64>, config: &LikeConfig,
) -> LikeResult<Array2<f64>> {
    let (rows, cols) = win.dim();
    if rows != config.bmax || cols + 1 < config.lmax_win {
        return Err(shape_mismatch(
            name,
            format!("{}x(>= {})", config.bmax, config.lmax_win - 1),
            format!("{rows}x{cols}"),
        ));
    }
    debug!("{name}: {rows} bins x {cols} multipoles");
    Ok(prepend_zero_column(win))
}

fn check_symmetric(m: ArrayView2<'_, f64>) -> LikeResult<()> {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if m[[i, j]] != m[[j, i]] {
                return Err(LikeError::AsymmetricCovariance { row: i, col: j });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::io::encode_fortran_record;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Loading a complete synthetic data directory.
    // - Mirroring of a one-triangle covariance file into a symmetric matrix.
    // - Fatal errors for missing files, wrong record sizes, and narrow
    //   window tables.
    //
    // They intentionally DO NOT cover:
    // - Likelihood evaluation (see `likelihood::evaluator`).
    // -------------------------------------------------------------------------

    fn tiny_config() -> LikeConfig {
        LikeConfig {
            tt_lmax: 4,
            lmax_win: 6,
            nbin: 4,
            nbintt: 2,
            nbinte: 1,
            nbinee: 1,
            b0: 2,
            bmax: 3,
            ..LikeConfig::default()
        }
    }

    fn write_table(dir: &Path, name: &str, rows: usize, cols: usize, scale: f64) {
        let mut text = String::new();
        for r in 0..rows {
            let row: Vec<String> =
                (0..cols).map(|c| format!("{:.6e}", scale * ((r + 1) * (c + 1)) as f64)).collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        fs::write(dir.join(name), text).unwrap();
    }

    // Lower triangle populated, upper triangle zero (as stored on disk).
    fn lower_triangle_cov(n: usize) -> Vec<f64> {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                values[i * n + j] = if i == j { 2.0 + i as f64 } else { 0.1 * (i + j) as f64 };
            }
        }
        values
    }

    fn write_data_dir(config: &LikeConfig) -> TempDir {
        let dir = tempdir().unwrap();
        write_table(dir.path(), LIKE_FILE, config.nbin, 3, 1.0);
        fs::write(dir.path().join(COV_FILE), encode_fortran_record(&lower_triangle_cov(config.nbin)))
            .unwrap();
        for name in [BBL_TT_FILE, BBL_TE_FILE, BBL_EE_FILE] {
            write_table(dir.path(), name, config.bmax, config.lmax_win - 1, 0.01);
        }
        dir
    }

    #[test]
    // Purpose
    // -------
    // A complete directory loads with the documented shapes.
    //
    // Expect
    // ------
    // - Vectors of length nbin, an nbin×nbin covariance, and windows of
    //   bmax × lmax_win whose first column is zero.
    fn load_reads_complete_directory() {
        let config = tiny_config();
        let dir = write_data_dir(&config);

        let data = ACTPolData::load(dir.path(), config.clone()).unwrap();

        assert_eq!(data.bin_centers().len(), 4);
        assert_eq!(data.data_vector()[1], 2.0 * 2.0);
        assert_eq!(data.sigmas()[3], 4.0 * 3.0);
        assert_eq!(data.covariance().dim(), (4, 4));
        for win in data.windows() {
            assert_eq!(win.dim(), (config.bmax, config.lmax_win));
            assert!(win.column(0).iter().all(|&v| v == 0.0));
            assert!(win[[0, 1]] > 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // The version banner precedes loading and the completion line follows it;
    // a failed load writes the banner only.
    fn load_announced_writes_banner_then_completion() {
        let config = tiny_config();
        let dir = write_data_dir(&config);
        let mut out: Vec<u8> = Vec::new();

        ACTPolData::load_announced(dir.path(), config.clone(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let banner = format!("Initializing ACTPol likelihood, version {VERSION}");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [banner.as_str(), "Finished initializing."]);

        fs::remove_file(dir.path().join(COV_FILE)).unwrap();
        let mut out: Vec<u8> = Vec::new();
        let result = ACTPolData::load_announced(dir.path(), config, &mut out);

        assert!(matches!(result, Err(LikeError::DataFileMissing { .. })));
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    // Purpose
    // -------
    // The stored triangle is mirrored so that `M[i][j] == M[j][i]` everywhere.
    fn load_mirrors_covariance() {
        let config = tiny_config();
        let dir = write_data_dir(&config);

        let data = ACTPolData::load(dir.path(), config).unwrap();
        let cov = data.covariance();

        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(cov[[i, j]], cov[[j, i]]);
            }
        }
        assert_eq!(cov[[0, 3]], 0.1 * 3.0);
    }

    #[test]
    // Purpose
    // -------
    // Any missing file aborts construction.
    fn load_fails_when_any_file_is_missing() {
        let config = tiny_config();
        for name in [LIKE_FILE, COV_FILE, BBL_TT_FILE, BBL_TE_FILE, BBL_EE_FILE] {
            let dir = write_data_dir(&config);
            fs::remove_file(dir.path().join(name)).unwrap();

            let err = ACTPolData::load(dir.path(), config.clone()).unwrap_err();

            assert_eq!(err, LikeError::DataFileMissing { path: dir.path().join(name) });
        }
    }

    #[test]
    fn load_rejects_covariance_of_wrong_size() {
        let config = tiny_config();
        let dir = write_data_dir(&config);
        fs::write(dir.path().join(COV_FILE), encode_fortran_record(&lower_triangle_cov(3)))
            .unwrap();

        assert!(matches!(
            ACTPolData::load(dir.path(), config),
            Err(LikeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Window tables narrower than `lmax_win - 1` multipoles are rejected.
    fn load_rejects_narrow_windows() {
        let config = tiny_config();
        let dir = write_data_dir(&config);
        write_table(dir.path(), BBL_TE_FILE, config.bmax, config.lmax_win - 2, 0.01);

        assert!(matches!(
            ACTPolData::load(dir.path(), config),
            Err(LikeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn load_validates_config_before_reading() {
        let dir = tempdir().unwrap();
        let config = LikeConfig { nbin: 5, ..tiny_config() };

        assert!(matches!(
            ACTPolData::load(dir.path(), config),
            Err(LikeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn from_parts_rejects_asymmetric_covariance() {
        let config = tiny_config();
        let mut cov = Array2::<f64>::eye(4);
        cov[[0, 2]] = 0.5;
        let win = Array2::<f64>::zeros((3, 5));

        let err = ACTPolData::from_parts(
            config,
            Array1::zeros(4),
            Array1::zeros(4),
            Array1::zeros(4),
            cov,
            win.view(),
            win.view(),
            win.view(),
        )
        .unwrap_err();

        assert_eq!(err, LikeError::AsymmetricCovariance { row: 0, col: 2 });
    }
}
