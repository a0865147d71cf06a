//! Errors for the ACTPol likelihood (configuration checks, data loading,
//! spectrum validation, observable selection, and Cholesky failures).
//!
//! This module defines the single error type [`LikeError`] used by the loader,
//! the evaluator, and the self-test. It implements `Display`/`Error` and, when
//! the `python-bindings` feature is enabled, converts to `PyErr` at the PyO3
//! boundary.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy); multipoles and bin numbers are
//!   reported in their physical (1-based) convention.
//! - Loader failures carry the offending path so that a broken data directory
//!   can be diagnosed from the message alone.
//! - Nothing in this crate retries; every variant describes a deterministic
//!   outcome of the given inputs.
use std::path::PathBuf;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyOSError, PyValueError},
    prelude::*,
};

/// Crate-wide result alias for likelihood operations that may produce
/// [`LikeError`].
pub type LikeResult<T> = Result<T, LikeError>;

/// Unified error type for the ACTPol likelihood.
///
/// Covers configuration preconditions, fatal data-loading failures, invalid
/// evaluation inputs, and numerical breakdown of the covariance factorization.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeError {
    // ---- Configuration ----
    /// A configuration precondition does not hold.
    InvalidConfig { reason: String },

    // ---- Data loading ----
    /// A required data file does not exist.
    DataFileMissing { path: PathBuf },

    /// A data file exists but could not be read.
    DataFileUnreadable { path: PathBuf, reason: String },

    /// A Fortran unformatted record has inconsistent or truncated framing.
    MalformedRecord { path: PathBuf, reason: String },

    /// A token in a text table is not a floating point number.
    ParseFailure { path: PathBuf, line: usize, token: String },

    /// A loaded table or matrix does not have the expected shape.
    ShapeMismatch { what: String, expected: String, actual: String },

    /// Covariance matrix is not symmetric.
    AsymmetricCovariance { row: usize, col: usize },

    // ---- Evaluation inputs ----
    /// The toggles select a combination of observables with no likelihood.
    UnsupportedSelection { use_tt: bool, use_te: bool, use_ee: bool },

    /// A theory spectrum has the wrong number of multipoles.
    SpectrumLength { spectrum: &'static str, expected: usize, actual: usize },

    /// A theory spectrum contains NaN/±inf.
    NonFiniteSpectrum { spectrum: &'static str, ell: usize, value: f64 },

    /// The calibration factor is NaN/±inf.
    NonFiniteCalibration { value: f64 },

    // ---- Numerics ----
    /// Selected covariance block is not positive-definite.
    NotPositiveDefinite { dim: usize },

    // ---- Anyhow catchall ----
    Anyhow(String),
}

impl std::error::Error for LikeError {}

impl std::fmt::Display for LikeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            LikeError::InvalidConfig { reason } => {
                write!(f, "Invalid likelihood configuration: {reason}")
            }
            // ---- Data loading ----
            LikeError::DataFileMissing { path } => {
                write!(f, "Couldn't load file {}: file does not exist", path.display())
            }
            LikeError::DataFileUnreadable { path, reason } => {
                write!(f, "Couldn't load file {}: {reason}", path.display())
            }
            LikeError::MalformedRecord { path, reason } => {
                write!(f, "Malformed Fortran record in {}: {reason}", path.display())
            }
            LikeError::ParseFailure { path, line, token } => {
                write!(
                    f,
                    "Couldn't parse '{token}' as a number in {} (line {line})",
                    path.display()
                )
            }
            LikeError::ShapeMismatch { what, expected, actual } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, got {actual}")
            }
            LikeError::AsymmetricCovariance { row, col } => {
                write!(f, "Covariance matrix is not symmetric at ({row}, {col})")
            }
            // ---- Evaluation inputs ----
            LikeError::UnsupportedSelection { use_tt, use_te, use_ee } => {
                write!(
                    f,
                    "Unsupported observable selection (use_tt={use_tt}, use_te={use_te}, \
                     use_ee={use_ee}); supported: TT only, TE only, EE only, or all three"
                )
            }
            LikeError::SpectrumLength { spectrum, expected, actual } => {
                write!(
                    f,
                    "Spectrum {spectrum} must have {expected} entries (ell = 2..=tt_lmax), \
                     got {actual}"
                )
            }
            LikeError::NonFiniteSpectrum { spectrum, ell, value } => {
                write!(f, "Spectrum {spectrum} is non-finite at ell = {ell}: {value}")
            }
            LikeError::NonFiniteCalibration { value } => {
                write!(f, "Calibration factor yp must be finite; got: {value}")
            }
            // ---- Numerics ----
            LikeError::NotPositiveDefinite { dim } => {
                write!(
                    f,
                    "Cholesky factorization failed: {dim}x{dim} covariance block is not \
                     positive-definite"
                )
            }
            // ---- Anyhow catchall ----
            LikeError::Anyhow(msg) => write!(f, "Likelihood Error: {msg}"),
        }
    }
}

impl LikeError {
    /// True for failures raised while reading the data directory.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            LikeError::DataFileMissing { .. }
                | LikeError::DataFileUnreadable { .. }
                | LikeError::MalformedRecord { .. }
                | LikeError::ParseFailure { .. }
        )
    }
}

impl From<anyhow::Error> for LikeError {
    fn from(err: anyhow::Error) -> Self {
        LikeError::Anyhow(err.to_string())
    }
}

/// Convert a [`LikeError`] into a Python exception.
///
/// Loader failures become `OSError` (mirroring the `IOError` raised by NumPy
/// readers); everything else becomes `ValueError`.
#[cfg(feature = "python-bindings")]
impl std::convert::From<LikeError> for PyErr {
    fn from(err: LikeError) -> PyErr {
        if err.is_load_error() {
            PyOSError::new_err(err.to_string())
        } else {
            PyValueError::new_err(err.to_string())
        }
    }
}
