//! Virtual-screen geometry, raw capture frames, and the [`ScreenSource`] seam.
//!
//! The virtual screen is the bounding rectangle of every attached monitor.
//! Its origin is the top-left of that rectangle in desktop coordinates and
//! is negative when a monitor sits left of or above the primary.
//!
//! [`BgraFrame`] holds a raw 32-bit capture exactly as GDI hands it back,
//! including any row padding, and converts it into [`Pixels`] for matching.

use image::RgbImage;
use serde::Serialize;

use crate::errors::LocateError;
use crate::reference::{ColorMode, Pixels};

/// Bytes per pixel of a 32-bit BGRA capture.
pub const BGRA_BYTES_PER_PIXEL: usize = 4;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Bounding rectangle of all monitors, in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualScreen {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl VirtualScreen {
    /// Whether a `width` x `height` region fits inside the screen.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// Row pitch in bytes of a device-independent bitmap.
///
/// DIB rows are padded to a 4-byte (DWORD) boundary, so for bit depths
/// below 32 the pitch can exceed `width * bits / 8`.
pub fn dib_stride(width: u32, bit_count: u16) -> usize {
    ((width as usize * bit_count as usize + 31) / 32) * 4
}

// ---------------------------------------------------------------------------
// Raw frames
// ---------------------------------------------------------------------------

/// Raw 4-channel capture in BGRA byte order.
///
/// Rows are `stride` bytes apart; only the first `width * 4` bytes of each
/// row hold pixels.
#[derive(Debug, Clone)]
pub struct BgraFrame {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl BgraFrame {
    /// Wrap a raw buffer, checking that `stride` and `data` cover every row.
    pub fn new(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Result<Self, LocateError> {
        let row_bytes = width as usize * BGRA_BYTES_PER_PIXEL;
        if width == 0 || height == 0 {
            return Err(LocateError::Capture(format!(
                "empty capture frame ({width}x{height})"
            )));
        }
        if stride < row_bytes {
            return Err(LocateError::Capture(format!(
                "stride {stride} is shorter than a {width}-pixel BGRA row ({row_bytes} bytes)"
            )));
        }
        let needed = stride * (height as usize - 1) + row_bytes;
        if data.len() < needed {
            return Err(LocateError::Capture(format!(
                "capture buffer holds {} bytes, {needed} needed for {width}x{height} at stride {stride}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Build a tightly packed frame from an RGB image (alpha set opaque).
    pub fn from_rgb_image(rgb: &RgbImage) -> Self {
        let data: Vec<u8> = rgb
            .pixels()
            .flat_map(|px| [px[2], px[1], px[0], 255])
            .collect();
        Self {
            width: rgb.width(),
            height: rgb.height(),
            stride: rgb.width() as usize * BGRA_BYTES_PER_PIXEL,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel bytes of row `y`, without trailing padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BGRA_BYTES_PER_PIXEL]
    }

    /// Drop alpha and reorder to RGB.
    pub fn to_rgb(&self) -> RgbImage {
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for px in self.row(y).chunks_exact(BGRA_BYTES_PER_PIXEL) {
                // px = [B, G, R, A]
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
        }
        // Length is exactly width * height * 3 by construction.
        RgbImage::from_raw(self.width, self.height, rgb)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Convert into the channel layout selected by `mode`.
    pub fn to_pixels(&self, mode: ColorMode) -> Pixels {
        Pixels::from_rgb(self.to_rgb(), mode)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Something that can report virtual-screen geometry and capture it.
///
/// Implementations own their OS resources per call; nothing is cached
/// between captures.
pub trait ScreenSource {
    /// Current virtual-screen rectangle.
    fn virtual_screen(&self) -> Result<VirtualScreen, LocateError>;

    /// Capture the whole of `screen` as a BGRA frame of the same size.
    fn capture(&self, screen: &VirtualScreen) -> Result<BgraFrame, LocateError>;
}

impl<S: ScreenSource + ?Sized> ScreenSource for &S {
    fn virtual_screen(&self) -> Result<VirtualScreen, LocateError> {
        (**self).virtual_screen()
    }

    fn capture(&self, screen: &VirtualScreen) -> Result<BgraFrame, LocateError> {
        (**self).capture(screen)
    }
}

/// In-memory screen: a fixed frame placed at a virtual origin.
///
/// Useful for searching an existing screenshot with the same pipeline
/// used for live capture.
#[derive(Debug, Clone)]
pub struct MemoryScreen {
    screen: VirtualScreen,
    frame: BgraFrame,
}

impl MemoryScreen {
    pub fn new(left: i32, top: i32, frame: BgraFrame) -> Self {
        Self {
            screen: VirtualScreen {
                left,
                top,
                width: frame.width(),
                height: frame.height(),
            },
            frame,
        }
    }

    pub fn from_rgb_image(left: i32, top: i32, rgb: &RgbImage) -> Self {
        Self::new(left, top, BgraFrame::from_rgb_image(rgb))
    }
}

impl ScreenSource for MemoryScreen {
    fn virtual_screen(&self) -> Result<VirtualScreen, LocateError> {
        Ok(self.screen)
    }

    fn capture(&self, screen: &VirtualScreen) -> Result<BgraFrame, LocateError> {
        if *screen != self.screen {
            return Err(LocateError::Capture(format!(
                "requested {screen:?} but the in-memory screen is {:?}",
                self.screen
            )));
        }
        Ok(self.frame.clone())
    }
}

/// Placeholder source for targets without a capture backend.
#[cfg(not(windows))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedScreen;

#[cfg(not(windows))]
fn unsupported_platform() -> LocateError {
    LocateError::Capture(format!(
        "screen capture is only implemented for Windows (target os: {})",
        std::env::consts::OS
    ))
}

#[cfg(not(windows))]
impl ScreenSource for UnsupportedScreen {
    fn virtual_screen(&self) -> Result<VirtualScreen, LocateError> {
        Err(unsupported_platform())
    }

    fn capture(&self, _screen: &VirtualScreen) -> Result<BgraFrame, LocateError> {
        Err(unsupported_platform())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_dib_stride_alignment() {
        assert_eq!(dib_stride(1920, 32), 1920 * 4);
        assert_eq!(dib_stride(3, 32), 12);
        // 24-bit rows pad to a DWORD boundary.
        assert_eq!(dib_stride(1, 24), 4);
        assert_eq!(dib_stride(5, 24), 16);
        assert_eq!(dib_stride(1366, 24), 4100);
        assert_eq!(dib_stride(3, 8), 4);
    }

    #[test]
    fn test_padded_stride_rows() {
        // 3x2 frame with 4 bytes of padding per row.
        let stride = 3 * 4 + 4;
        let mut data = vec![0xEE; stride * 2];
        for y in 0..2 {
            for x in 0..3 {
                let o = y * stride + x * 4;
                data[o..o + 4].copy_from_slice(&[x as u8, y as u8, 100, 255]);
            }
        }
        let frame = BgraFrame::new(3, 2, stride, data).unwrap();
        let rgb = frame.to_rgb();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(*rgb.get_pixel(2, 1), Rgb([100, 1, 2]));
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([100, 0, 0]));
        assert!(rgb.pixels().all(|p| p[0] == 100));
    }

    #[test]
    fn test_frame_rejects_short_buffer() {
        assert!(BgraFrame::new(4, 4, 16, vec![0; 63]).is_err());
        assert!(BgraFrame::new(4, 4, 12, vec![0; 64]).is_err());
        assert!(BgraFrame::new(0, 4, 16, vec![]).is_err());
        // Last row needs no padding.
        assert!(BgraFrame::new(4, 2, 20, vec![0; 36]).is_ok());
    }

    #[test]
    fn test_rgb_round_trip_through_frame() {
        let rgb = RgbImage::from_fn(5, 4, |x, y| Rgb([x as u8, y as u8, 7]));
        let frame = BgraFrame::from_rgb_image(&rgb);
        assert_eq!(frame.stride(), 20);
        assert_eq!(frame.row(1)[..4], [7u8, 1, 0, 255]);
        assert_eq!(frame.to_rgb(), rgb);
    }

    #[test]
    fn test_memory_screen_geometry() {
        let rgb = RgbImage::new(8, 6);
        let source = MemoryScreen::from_rgb_image(-1920, -200, &rgb);
        let screen = source.virtual_screen().unwrap();
        assert_eq!(
            screen,
            VirtualScreen {
                left: -1920,
                top: -200,
                width: 8,
                height: 6
            }
        );
        assert!(screen.fits(8, 6));
        assert!(!screen.fits(9, 1));
        assert!(!screen.fits(1, 7));
        assert_eq!(source.capture(&screen).unwrap().width(), 8);
    }

    #[test]
    fn test_virtual_screen_serialization() {
        let screen = VirtualScreen {
            left: -1280,
            top: 0,
            width: 3200,
            height: 1080,
        };
        let json = serde_json::to_string(&screen).unwrap();
        assert!(json.contains("\"left\":-1280"));
        assert!(json.contains("3200"));
    }
}
