//! Locate a reference image on the virtual screen.
//!
//! [`locate_image_on_screen`] is the one-call entry point: it decodes the
//! reference, captures every monitor, runs ZNCC matching and reports the
//! centre of the best placement in absolute desktop coordinates.
//!
//! [`Locator`] runs the same pipeline against any [`ScreenSource`], which is
//! how in-memory screenshots and test doubles are searched.
//!
//! # Examples
//!
//! ```no_run
//! use imgloc_core::locate::{locate_image_on_screen, LocateOptions};
//!
//! let options = LocateOptions::default().with_confidence(0.8);
//! match locate_image_on_screen("ok_button.png", &options) {
//!     Ok(Some(hit)) => println!("found at ({}, {}) score {:.3}", hit.x, hit.y, hit.score),
//!     Ok(None) => println!("not on screen"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::path::Path;

use serde::Serialize;

use crate::errors::LocateError;
use crate::matching::find_in;
use crate::reference::{load_reference, ColorMode, Pixels};
use crate::screen::ScreenSource;

/// Default minimum score for a match.
pub const DEFAULT_CONFIDENCE: f32 = 0.9;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Parameters for a single search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocateOptions {
    /// Match on luminance (`true`) or RGB (`false`).
    pub grayscale: bool,
    /// Minimum ZNCC score, inclusive, in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            grayscale: true,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl LocateOptions {
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn mode(&self) -> ColorMode {
        ColorMode::from_grayscale(self.grayscale)
    }

    /// Reject a confidence outside `[0.0, 1.0]`, including NaN.
    pub fn validate(&self) -> Result<(), LocateError> {
        if (0.0..=1.0).contains(&self.confidence) {
            Ok(())
        } else {
            Err(LocateError::InvalidConfidence(self.confidence))
        }
    }
}

/// Centre of a successful match in absolute virtual-screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Located {
    pub x: i32,
    pub y: i32,
    pub score: f32,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs searches against one [`ScreenSource`].
#[derive(Debug, Clone)]
pub struct Locator<S> {
    source: S,
}

impl<S: ScreenSource> Locator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Decode the image at `path` and search the screen for it.
    ///
    /// Returns `Ok(None)` when the best score is below
    /// `options.confidence`.  The confidence is validated before the file
    /// is touched.
    pub fn locate(
        &self,
        path: impl AsRef<Path>,
        options: &LocateOptions,
    ) -> Result<Option<Located>, LocateError> {
        options.validate()?;
        let reference = load_reference(path, options.mode())?;
        self.search(&reference, options)
    }

    /// Search the screen for an already decoded reference.
    ///
    /// The capture is converted to `reference.mode()`; `options.grayscale`
    /// is ignored here.
    pub fn locate_reference(
        &self,
        reference: &Pixels,
        options: &LocateOptions,
    ) -> Result<Option<Located>, LocateError> {
        options.validate()?;
        self.search(reference, options)
    }

    fn search(
        &self,
        reference: &Pixels,
        options: &LocateOptions,
    ) -> Result<Option<Located>, LocateError> {
        let (ref_w, ref_h) = reference.dimensions();
        let screen = self.source.virtual_screen()?;

        if !screen.fits(ref_w, ref_h) {
            return Err(LocateError::TemplateTooLarge {
                template_width: ref_w,
                template_height: ref_h,
                screen_width: screen.width,
                screen_height: screen.height,
            });
        }

        let frame = self.source.capture(&screen)?;
        if (frame.width(), frame.height()) != (screen.width, screen.height) {
            return Err(LocateError::Capture(format!(
                "captured {}x{} but the virtual screen is {}x{}",
                frame.width(),
                frame.height(),
                screen.width,
                screen.height
            )));
        }

        let haystack = frame.to_pixels(reference.mode());
        drop(frame);

        let peak = find_in(&haystack, reference)?;
        if peak.score < options.confidence {
            log::debug!(
                "best score {:.4} at ({}, {}) is below confidence {:.4}",
                peak.score,
                peak.x,
                peak.y,
                options.confidence
            );
            return Ok(None);
        }

        let located = Located {
            x: screen.left + (peak.x + ref_w / 2) as i32,
            y: screen.top + (peak.y + ref_h / 2) as i32,
            score: peak.score,
        };
        log::debug!(
            "match at ({}, {}) score {:.4} (confidence {:.4})",
            located.x,
            located.y,
            located.score,
            options.confidence
        );
        Ok(Some(located))
    }
}

/// Find the image at `path` on the live virtual screen.
///
/// # Errors
///
/// - [`LocateError::InvalidConfidence`] -- before anything else runs.
/// - [`LocateError::ImageDecode`] -- the reference cannot be decoded.
/// - [`LocateError::TemplateTooLarge`] -- the reference exceeds the screen.
/// - [`LocateError::Capture`] -- GDI failed, or the target is not Windows.
/// - [`LocateError::Matching`] -- the correlation step rejected its inputs.
pub fn locate_image_on_screen(
    path: impl AsRef<Path>,
    options: &LocateOptions,
) -> Result<Option<Located>, LocateError> {
    #[cfg(windows)]
    let source = crate::gdi::GdiScreen::new();
    #[cfg(not(windows))]
    let source = crate::screen::UnsupportedScreen;

    Locator::new(source).locate(path, options)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
