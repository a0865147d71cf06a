//! Python-boundary helpers for converting array-like arguments.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Accept a 1-D float64 `numpy.ndarray`, anything exposing `to_numpy()`
/// (pandas, polars), or a plain sequence of floats, and return a read-only
/// contiguous array. `name` is used in the `TypeError` message.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>, name: &str,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw.call_method0("to_numpy") {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name} must be a 1-D numpy.ndarray, pandas.Series, or sequence of float64"
        ))
    })?;
    Ok(vec.into_pyarray(py).readonly())
}
