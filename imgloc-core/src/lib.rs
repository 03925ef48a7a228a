//! `imgloc_core` -- Pure Rust core library for image-locate.
//!
//! Finds a reference image on the Windows virtual screen (all monitors)
//! and reports the centre of the best match in desktop coordinates.
//! It can be consumed by:
//! - `imgloc-pyo3` (PyO3 Python extension)
//! - `imgloc-ffi` (C ABI DLL for ctypes / other languages)
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `LocateError` enum via `thiserror` |
//! | [`handle`] | `Scoped` RAII owner for OS handles |
//! | [`screen`] | Virtual-screen geometry, BGRA frames, `ScreenSource` trait |
//! | `gdi` | GDI `BitBlt` capture backend (Windows only) |
//! | [`reference`] | Reference image decoding via the `image` crate |
//! | [`matching`] | ZNCC template matching, row-parallel via Rayon |
//! | [`locate`] | The locate pipeline and `locate_image_on_screen` |

pub mod errors;
#[cfg(windows)]
pub mod gdi;
pub mod handle;
pub mod locate;
pub mod matching;
pub mod reference;
pub mod screen;

#[cfg(test)]
pub(crate) mod test_util;

pub use errors::{ErrorKind, LocateError};
pub use locate::{locate_image_on_screen, LocateOptions, Located, Locator};
