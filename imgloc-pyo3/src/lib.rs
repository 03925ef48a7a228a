//! `image_locate` -- Thin PyO3 wrappers around `imgloc_core`.
//!
//! Each function releases the GIL via `py.allow_threads()` and converts
//! the Rust result to Python objects.  All business logic lives in
//! `imgloc_core`.

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use imgloc_core::{ErrorKind, LocateError, LocateOptions};

// ---------------------------------------------------------------------------
// Error conversion helper
// ---------------------------------------------------------------------------

/// Usage mistakes become `ValueError`, unreadable references `IOError`,
/// capture and matching failures `RuntimeError`.
fn to_py_err(e: LocateError) -> PyErr {
    match e.kind() {
        ErrorKind::Usage => PyValueError::new_err(e.to_string()),
        ErrorKind::Input => PyIOError::new_err(e.to_string()),
        ErrorKind::Platform | ErrorKind::Matching => PyRuntimeError::new_err(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// locate
// ---------------------------------------------------------------------------

/// Find `image_path` on the screen.
///
/// Returns `{"x": int, "y": int, "score": float}` for the match centre in
/// desktop coordinates, or `None` when nothing reaches `confidence`.
#[pyfunction]
#[pyo3(signature = (image_path, grayscale=true, confidence=0.9))]
fn locate_image_on_screen(
    py: Python<'_>,
    image_path: String,
    grayscale: bool,
    confidence: f32,
) -> PyResult<PyObject> {
    let options = LocateOptions {
        grayscale,
        confidence,
    };
    let located = py
        .allow_threads(move || imgloc_core::locate_image_on_screen(&image_path, &options))
        .map_err(to_py_err)?;

    match located {
        Some(hit) => {
            let dict = PyDict::new(py);
            dict.set_item("x", hit.x)?;
            dict.set_item("y", hit.y)?;
            dict.set_item("score", hit.score as f64)?;
            Ok(dict.into())
        }
        None => Ok(py.None()),
    }
}

// ---------------------------------------------------------------------------
// Module registration
// ---------------------------------------------------------------------------

/// Register the `image_locate` Python module.
#[pymodule]
fn image_locate(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(locate_image_on_screen, m)?)?;

    m.add("DEFAULT_CONFIDENCE", imgloc_core::locate::DEFAULT_CONFIDENCE)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Find a reference image on the Windows virtual screen.")?;

    Ok(())
}
