//! Virtual-screen capture via GDI `BitBlt`.
//!
//! Captures the bounding rectangle of all monitors in one blit, starting
//! at the virtual origin (`SM_XVIRTUALSCREEN`, `SM_YVIRTUALSCREEN`), then
//! reads the bitmap back with `GetDIBits` as a 32-bit top-down DIB.
//!
//! # Resource handling
//!
//! Every GDI handle is owned by a [`Scoped`] guard.  The guards are declared
//! in acquisition order (screen DC, memory DC, bitmap, selection), so on
//! any exit path they release in reverse: the previous object is selected
//! back into the memory DC, then the bitmap is deleted, then the memory DC,
//! and finally the screen DC is released.
//!
//! # DPI awareness
//!
//! The process is switched to per-monitor-v2 DPI awareness before the first
//! geometry query so that metrics and pixels are physical, not scaled by
//! the primary monitor's DPI.  If awareness was already fixed (manifest or
//! an earlier call) the request fails harmlessly.

use std::sync::Once;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use crate::errors::LocateError;
use crate::handle::{Release, Scoped};
use crate::screen::{dib_stride, BgraFrame, ScreenSource, VirtualScreen};

/// Bit depth requested from `GetDIBits`.
const CAPTURE_BIT_COUNT: u16 = 32;

static DPI_AWARENESS: Once = Once::new();

/// Request per-monitor-v2 DPI awareness once per process.
pub fn ensure_dpi_awareness() {
    DPI_AWARENESS.call_once(|| {
        // SAFETY: no preconditions; fails if awareness is already set.
        if let Err(e) =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        {
            log::debug!("SetProcessDpiAwarenessContext: {e} (awareness already set)");
        }
    });
}

// ---------------------------------------------------------------------------
// Handle guards
// ---------------------------------------------------------------------------

/// DC for the whole screen from `GetDC(NULL)`.
struct ScreenDc(HDC);

impl Release for ScreenDc {
    fn release(&mut self) {
        unsafe { ReleaseDC(HWND(std::ptr::null_mut()), self.0) };
    }
}

/// Off-screen DC from `CreateCompatibleDC`.
struct MemoryDc(HDC);

impl Release for MemoryDc {
    fn release(&mut self) {
        let _ = unsafe { DeleteDC(self.0) };
    }
}

/// Bitmap from `CreateCompatibleBitmap`.
struct Bitmap(HBITMAP);

impl Release for Bitmap {
    fn release(&mut self) {
        let _ = unsafe { DeleteObject(self.0) };
    }
}

/// An object selected into a DC; restores the previous selection.
struct Selection {
    dc: HDC,
    previous: HGDIOBJ,
}

impl Release for Selection {
    fn release(&mut self) {
        let restored = unsafe { SelectObject(self.dc, self.previous) };
        if restored.0.is_null() {
            log::warn!("SelectObject failed to restore the previous bitmap");
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Live virtual-screen capture through GDI.
///
/// Stateless: every call acquires and releases its own handles, so one
/// value can be shared freely between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdiScreen;

impl GdiScreen {
    pub fn new() -> Self {
        ensure_dpi_awareness();
        Self
    }
}

impl ScreenSource for GdiScreen {
    fn virtual_screen(&self) -> Result<VirtualScreen, LocateError> {
        ensure_dpi_awareness();
        let (left, top, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };

        // GetSystemMetrics returns 0 on failure or without a desktop.
        if width <= 0 || height <= 0 {
            return Err(LocateError::Capture(format!(
                "GetSystemMetrics returned invalid virtual screen size: {width}x{height}"
            )));
        }

        let screen = VirtualScreen {
            left,
            top,
            width: width as u32,
            height: height as u32,
        };
        log::debug!("virtual screen {screen:?}");
        Ok(screen)
    }

    fn capture(&self, screen: &VirtualScreen) -> Result<BgraFrame, LocateError> {
        let (width, height) = (screen.width as i32, screen.height as i32);

        let screen_dc = unsafe { GetDC(HWND(std::ptr::null_mut())) };
        if screen_dc.is_invalid() {
            return Err(LocateError::Capture("GetDC(NULL) failed".into()));
        }
        let screen_dc = Scoped::new(ScreenDc(screen_dc));

        let mem_dc = unsafe { CreateCompatibleDC(screen_dc.0) };
        if mem_dc.is_invalid() {
            return Err(LocateError::Capture("CreateCompatibleDC failed".into()));
        }
        let mem_dc = Scoped::new(MemoryDc(mem_dc));

        let bitmap = unsafe { CreateCompatibleBitmap(screen_dc.0, width, height) };
        if bitmap.is_invalid() {
            return Err(LocateError::Capture(format!(
                "CreateCompatibleBitmap({width}x{height}) failed"
            )));
        }
        let bitmap = Scoped::new(Bitmap(bitmap));

        let previous = unsafe { SelectObject(mem_dc.0, bitmap.0) };
        if previous.0.is_null() {
            return Err(LocateError::Capture("SelectObject(bitmap) failed".into()));
        }
        let selection = Scoped::new(Selection {
            dc: mem_dc.0,
            previous,
        });

        unsafe {
            BitBlt(
                mem_dc.0,
                0,
                0,
                width,
                height,
                screen_dc.0,
                screen.left,
                screen.top,
                SRCCOPY,
            )
        }
        .map_err(|e| LocateError::Capture(format!("BitBlt failed: {e}")))?;

        // GetDIBits requires the bitmap to be deselected first.
        drop(selection);

        let stride = dib_stride(screen.width, CAPTURE_BIT_COUNT);
        let mut pixels = vec![0u8; stride * screen.height as usize];
        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height = top-down bitmap (row 0 at top).
                biHeight: -height,
                biPlanes: 1,
                biBitCount: CAPTURE_BIT_COUNT,
                biCompression: BI_RGB.0,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default()],
        };

        let lines = unsafe {
            GetDIBits(
                mem_dc.0,
                bitmap.0,
                0,
                screen.height,
                Some(pixels.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            )
        };
        if lines != height {
            return Err(LocateError::Capture(format!(
                "GetDIBits copied {lines} of {height} scan lines"
            )));
        }

        log::debug!(
            "captured {}x{} at ({}, {}), stride {stride}",
            screen.width,
            screen.height,
            screen.left,
            screen.top
        );
        BgraFrame::new(screen.width, screen.height, stride, pixels)
    }
}
