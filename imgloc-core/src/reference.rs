//! Reference image decoding and the shared [`Pixels`] representation.
//!
//! Reference images and screen captures go through the same RGB → target
//! conversion ([`Pixels::from_rgb`]), so identical content on screen and on
//! disk yields identical samples in both grayscale and colour mode.

use std::path::Path;

use image::{imageops, DynamicImage, GrayImage, RgbImage};

use crate::errors::LocateError;

/// Channel layout used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Single luminance channel.
    #[default]
    Grayscale,
    /// Three channels, alpha dropped.
    Color,
}

impl ColorMode {
    pub fn from_grayscale(grayscale: bool) -> Self {
        if grayscale {
            ColorMode::Grayscale
        } else {
            ColorMode::Color
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            ColorMode::Grayscale => 1,
            ColorMode::Color => 3,
        }
    }
}

/// An immutable 2D grid of 8-bit samples in one [`ColorMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Pixels {
    /// Convert an RGB image to `mode`.
    pub fn from_rgb(rgb: RgbImage, mode: ColorMode) -> Self {
        match mode {
            ColorMode::Grayscale => Pixels::Gray(imageops::grayscale(&rgb)),
            ColorMode::Color => Pixels::Color(rgb),
        }
    }

    /// Convert any decoded image to `mode`, dropping alpha.
    pub fn from_dynamic(img: &DynamicImage, mode: ColorMode) -> Self {
        Self::from_rgb(img.to_rgb8(), mode)
    }

    pub fn mode(&self) -> ColorMode {
        match self {
            Pixels::Gray(_) => ColorMode::Grayscale,
            Pixels::Color(_) => ColorMode::Color,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Pixels::Gray(img) => img.width(),
            Pixels::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Pixels::Gray(img) => img.height(),
            Pixels::Color(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Decode the reference image at `path` in `mode`.
///
/// # Errors
///
/// Returns [`LocateError::ImageDecode`] if the file is missing, unreadable,
/// in an unsupported format, or decodes to an empty image.
pub fn load_reference(path: impl AsRef<Path>, mode: ColorMode) -> Result<Pixels, LocateError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| LocateError::ImageDecode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if img.width() == 0 || img.height() == 0 {
        return Err(LocateError::ImageDecode {
            path: path.to_path_buf(),
            reason: format!("decoded to an empty {}x{} image", img.width(), img.height()),
        });
    }

    let pixels = Pixels::from_dynamic(&img, mode);
    log::debug!(
        "loaded reference {} ({}x{}, {:?})",
        path.display(),
        pixels.width(),
        pixels.height(),
        mode
    );
    Ok(pixels)
}
