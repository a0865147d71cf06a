//! likelihood::io — readers for the fixed-format ACTPol data products.
//!
//! Purpose
//! -------
//! Turn the on-disk reference files into `ndarray` containers with the shape
//! the evaluator expects. Only two formats occur in the data directory:
//! whitespace-delimited text tables and a single Fortran unformatted
//! sequential record holding the covariance matrix.
//!
//! Key behaviors
//! -------------
//! - [`read_text_table`] reads the first `max_rows` data rows of a text file,
//!   skipping blank lines and `#` comments, and checks that every row has the
//!   same width.
//! - [`read_fortran_record`] reads the first record of a Fortran unformatted
//!   file (4-byte native-endian length marker, payload, trailing marker) as
//!   native-endian `f64` values.
//! - [`mirror_lower_onto_upper`] and [`prepend_zero_column`] apply the two
//!   post-load fixups required by the data conventions.
//!
//! Invariants & assumptions
//! ------------------------
//! - Binary files use native byte order, as written by Fortran
//!   `form='unformatted'` output on the same architecture.
//! - Every failure is fatal for dataset construction; no reader returns a
//!   partially filled array.
//!
//! Conventions
//! -----------
//! - Row/column indices in error messages are 0-based; line numbers are
//!   1-based.
//! - Readers log the path and resulting shape at `debug` level.
//!
//! Testing notes
//! -------------
//! - Unit tests write small fixtures into a temporary directory and cover
//!   comment handling, ragged rows, short files, record framing errors, and
//!   the symmetry fixup.
use std::path::Path;

use log::debug;
use ndarray::{Array2, ArrayView2, s};

use crate::likelihood::errors::{LikeError, LikeResult};

/// Size in bytes of a Fortran sequential record marker.
const RECORD_MARKER_BYTES: usize = 4;

/// Size in bytes of one `real(8)` value.
const F64_BYTES: usize = 8;

/// Read the first `max_rows` rows of a whitespace-delimited numeric table.
///
/// Parameters
/// ----------
/// - `path`: `&Path`
///   Text file to read.
/// - `max_rows`: `usize`
///   Number of data rows to keep; later rows are ignored.
/// - `min_cols`: `usize`
///   Minimum number of columns every kept row must have.
///
/// Returns
/// -------
/// `LikeResult<Array2<f64>>`
///   A `max_rows × ncols` matrix where `ncols` is the common row width.
///
/// Errors
/// ------
/// - `LikeError::DataFileMissing` / `LikeError::DataFileUnreadable`
///   When the file does not exist or cannot be read as UTF-8 text.
/// - `LikeError::ParseFailure`
///   When a token is not a floating point number.
/// - `LikeError::ShapeMismatch`
///   When fewer than `max_rows` data rows exist, rows have different widths,
///   or the width is below `min_cols`.
pub fn read_text_table(path: &Path, max_rows: usize, min_cols: usize) -> LikeResult<Array2<f64>> {
    let text = read_to_string(path)?;

    let mut flat: Vec<f64> = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0usize;

    for (line_idx, raw_line) in text.lines().enumerate() {
        if nrows == max_rows {
            break;
        }
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let start = flat.len();
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| LikeError::ParseFailure {
                path: path.to_path_buf(),
                line: line_idx + 1,
                token: token.to_string(),
            })?;
            flat.push(value);
        }
        let width = flat.len() - start;

        match ncols {
            None => ncols = Some(width),
            Some(expected) if expected != width => {
                return Err(LikeError::ShapeMismatch {
                    what: format!("row {} of {}", nrows, path.display()),
                    expected: format!("{expected} columns"),
                    actual: format!("{width} columns"),
                });
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    if nrows < max_rows {
        return Err(LikeError::ShapeMismatch {
            what: path.display().to_string(),
            expected: format!("at least {max_rows} rows"),
            actual: format!("{nrows} rows"),
        });
    }
    let ncols = ncols.unwrap_or(0);
    if ncols < min_cols {
        return Err(LikeError::ShapeMismatch {
            what: path.display().to_string(),
            expected: format!("at least {min_cols} columns"),
            actual: format!("{ncols} columns"),
        });
    }

    let table = Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| {
        LikeError::ShapeMismatch {
            what: path.display().to_string(),
            expected: format!("{nrows}x{ncols} table"),
            actual: e.to_string(),
        }
    })?;
    debug!("read {} ({}x{})", path.display(), nrows, ncols);
    Ok(table)
}

/// Read the first record of a Fortran unformatted sequential file as `f64`s.
///
/// Errors
/// ------
/// - `LikeError::DataFileMissing` / `LikeError::DataFileUnreadable`
///   When the file does not exist or cannot be read.
/// - `LikeError::MalformedRecord`
///   When the file is shorter than its leading marker claims, the trailing
///   marker disagrees with the leading one, or the payload is not a whole
///   number of 8-byte values.
pub fn read_fortran_record(path: &Path) -> LikeResult<Vec<f64>> {
    let bytes = read_bytes(path)?;
    let malformed = |reason: String| LikeError::MalformedRecord { path: path.to_path_buf(), reason };

    if bytes.len() < 2 * RECORD_MARKER_BYTES {
        return Err(malformed(format!("file is only {} bytes long", bytes.len())));
    }
    let head = read_marker(&bytes[..RECORD_MARKER_BYTES]);
    let payload_end = RECORD_MARKER_BYTES + head;
    if bytes.len() < payload_end + RECORD_MARKER_BYTES {
        return Err(malformed(format!(
            "record declares {head} bytes but file holds {}",
            bytes.len().saturating_sub(2 * RECORD_MARKER_BYTES)
        )));
    }
    let tail = read_marker(&bytes[payload_end..payload_end + RECORD_MARKER_BYTES]);
    if tail != head {
        return Err(malformed(format!("leading marker {head} != trailing marker {tail}")));
    }
    if head % F64_BYTES != 0 {
        return Err(malformed(format!("payload of {head} bytes is not a multiple of 8")));
    }

    let values: Vec<f64> = bytes[RECORD_MARKER_BYTES..payload_end]
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut buf = [0u8; F64_BYTES];
            buf.copy_from_slice(chunk);
            f64::from_ne_bytes(buf)
        })
        .collect();
    debug!("read {} (record of {} reals)", path.display(), values.len());
    Ok(values)
}

/// Encode `values` as one Fortran unformatted sequential record.
///
/// Produces the byte layout [`read_fortran_record`] consumes; used to build
/// covariance fixtures.
pub fn encode_fortran_record(values: &[f64]) -> Vec<u8> {
    let payload = values.len() * F64_BYTES;
    let marker = (payload as u32).to_ne_bytes();
    let mut out = Vec::with_capacity(payload + 2 * RECORD_MARKER_BYTES);
    out.extend_from_slice(&marker);
    for v in values {
        out.extend_from_slice(&v.to_ne_bytes());
    }
    out.extend_from_slice(&marker);
    out
}

/// Copy the lower triangle onto the upper one: `M[i][j] = M[j][i]` for `i ≤ j`.
///
/// The covariance file only populates one triangle once reshaped row-major;
/// this makes the matrix exactly symmetric regardless of what the other
/// triangle held.
pub fn mirror_lower_onto_upper(matrix: &mut Array2<f64>) {
    let n = matrix.nrows();
    for i in 0..n {
        for j in i..n {
            matrix[[i, j]] = matrix[[j, i]];
        }
    }
}

/// Prepend a column of zeros (the unused `ℓ = 1` slot) to a window matrix.
pub fn prepend_zero_column(matrix: ArrayView2<'_, f64>) -> Array2<f64> {
    let (rows, cols) = matrix.dim();
    let mut out = Array2::<f64>::zeros((rows, cols + 1));
    out.slice_mut(s![.., 1..]).assign(&matrix);
    out
}

// ---- Helper methods ----

fn read_marker(bytes: &[u8]) -> usize {
    let mut buf = [0u8; RECORD_MARKER_BYTES];
    buf.copy_from_slice(bytes);
    u32::from_ne_bytes(buf) as usize
}

fn ensure_exists(path: &Path) -> LikeResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LikeError::DataFileMissing { path: path.to_path_buf() })
    }
}

fn read_to_string(path: &Path) -> LikeResult<String> {
    ensure_exists(path)?;
    std::fs::read_to_string(path).map_err(|e| LikeError::DataFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_bytes(path: &Path) -> LikeResult<Vec<u8>> {
    ensure_exists(path)?;
    std::fs::read(path).map_err(|e| LikeError::DataFileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
