//! Error types for `imgloc_core`.
//!
//! All failures are funnelled through [`LocateError`], which uses
//! `thiserror` for `Display` and `Error` derives.  A search that runs to
//! completion but finds nothing above the threshold is *not* an error; the
//! locate functions return `Ok(None)` for that case.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`LocateError`], used by the FFI and Python
/// layers to pick a status code or exception type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller mistake detected before any expensive work.
    Usage,
    /// The reference image could not be read or decoded.
    Input,
    /// The OS screen-capture subsystem failed.
    Platform,
    /// The correlation step failed an internal size/type check.
    Matching,
}

/// Top-level error type for the `imgloc_core` library.
#[derive(Debug, Error)]
pub enum LocateError {
    /// Confidence threshold outside `[0.0, 1.0]` (or NaN).
    #[error("InvalidConfidence: {0} is outside [0.0, 1.0]")]
    InvalidConfidence(f32),

    /// Reference image is larger than the virtual screen in some axis.
    #[error(
        "TemplateTooLarge: reference {template_width}x{template_height} exceeds \
         screen {screen_width}x{screen_height}"
    )]
    TemplateTooLarge {
        template_width: u32,
        template_height: u32,
        screen_width: u32,
        screen_height: u32,
    },

    /// Reference image missing, unreadable, or not decodable.
    #[error("ImageDecodeError: {}: {reason}", .path.display())]
    ImageDecode { path: PathBuf, reason: String },

    /// Screen geometry query or pixel capture failure (GDI).
    #[error("CaptureError: {0}")]
    Capture(String),

    /// Template matching rejected its inputs.
    #[error("MatchingError: {0}")]
    Matching(String),
}

impl LocateError {
    /// Classify this error for callers that only need the failure family.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocateError::InvalidConfidence(_) | LocateError::TemplateTooLarge { .. } => {
                ErrorKind::Usage
            }
            LocateError::ImageDecode { .. } => ErrorKind::Input,
            LocateError::Capture(_) => ErrorKind::Platform,
            LocateError::Matching(_) => ErrorKind::Matching,
        }
    }
}
