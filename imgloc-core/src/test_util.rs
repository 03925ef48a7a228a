//! Synthetic screens and references shared by unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Deterministic per-pixel noise so every window of a synthetic screen is
/// distinct.
pub fn noise(x: u32, y: u32, salt: u32) -> u8 {
    let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ salt;
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    (h & 0xFF) as u8
}

pub fn textured_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([noise(x, y, 1), noise(x, y, 2), noise(x, y, 3)])
    })
}

pub fn textured_gray(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([noise(x, y, 7)]))
}

/// Copy a `width` x `height` region starting at (`x`, `y`).
pub fn crop_rgb(img: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> RgbImage {
    image::imageops::crop_imm(img, x, y, width, height).to_image()
}
