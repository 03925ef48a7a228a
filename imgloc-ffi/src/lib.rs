//! C ABI DLL for image-locate -- loadable by ctypes, C#, or any FFI consumer.
//!
//! All exported functions follow the convention:
//! - Return `i32` status: `IMGLOC_FOUND=0`, `IMGLOC_NOT_FOUND=1`, or a
//!   negative `IMGLOC_ERR_*` code naming the failure family
//! - String outputs allocated by Rust, freed via `imgloc_free_string()`
//! - Last error message retrievable via `imgloc_last_error()`

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

use imgloc_core::{locate_image_on_screen, ErrorKind, LocateError, LocateOptions, Located};

pub const IMGLOC_FOUND: i32 = 0;
pub const IMGLOC_NOT_FOUND: i32 = 1;
/// Bad arguments: confidence out of range, null pointer, reference too large.
pub const IMGLOC_ERR_USAGE: i32 = -1;
/// Reference image missing or undecodable.
pub const IMGLOC_ERR_INPUT: i32 = -2;
/// Screen capture failed.
pub const IMGLOC_ERR_PLATFORM: i32 = -3;
/// Template matching failed.
pub const IMGLOC_ERR_MATCHING: i32 = -4;

/// Screen point written on a successful match.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ImglocPoint {
    pub x: i32,
    pub y: i32,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn error_code(err: &LocateError) -> i32 {
    set_last_error(&err.to_string());
    match err.kind() {
        ErrorKind::Usage => IMGLOC_ERR_USAGE,
        ErrorKind::Input => IMGLOC_ERR_INPUT,
        ErrorKind::Platform => IMGLOC_ERR_PLATFORM,
        ErrorKind::Matching => IMGLOC_ERR_MATCHING,
    }
}

/// Validate pointer/UTF-8 arguments and run the search.
///
/// # Safety
///
/// `path` must be null or a valid null-terminated C string.
unsafe fn run_locate(
    path: *const c_char,
    grayscale: bool,
    confidence: f32,
) -> Result<Option<Located>, i32> {
    if path.is_null() {
        set_last_error("path is null");
        return Err(IMGLOC_ERR_USAGE);
    }
    let path = match unsafe { CStr::from_ptr(path) }.to_str() {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in path: {e}"));
            return Err(IMGLOC_ERR_USAGE);
        }
    };

    let options = LocateOptions {
        grayscale,
        confidence,
    };
    locate_image_on_screen(path, &options).map_err(|e| error_code(&e))
}

/// Retrieve the last error message (thread-local).
///
/// Returns a pointer valid until the next imgloc_* call on this thread.
/// Returns null if the last call succeeded.
#[no_mangle]
pub extern "C" fn imgloc_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string previously allocated by an imgloc_* function.
///
/// # Safety
///
/// `ptr` must be a pointer returned by an imgloc_* function or null.
#[no_mangle]
pub unsafe extern "C" fn imgloc_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Locate the image at `path` on the virtual screen.
///
/// On `IMGLOC_FOUND`, `*out_point` receives the match centre in desktop
/// coordinates; it is left untouched for every other status.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 C string and `out_point`
/// a valid pointer to an `ImglocPoint`.
#[no_mangle]
pub unsafe extern "C" fn imgloc_locate(
    path: *const c_char,
    grayscale: bool,
    confidence: f32,
    out_point: *mut ImglocPoint,
) -> i32 {
    clear_last_error();
    if out_point.is_null() {
        set_last_error("out_point is null");
        return IMGLOC_ERR_USAGE;
    }

    match unsafe { run_locate(path, grayscale, confidence) } {
        Ok(Some(hit)) => {
            unsafe { *out_point = ImglocPoint { x: hit.x, y: hit.y } };
            IMGLOC_FOUND
        }
        Ok(None) => IMGLOC_NOT_FOUND,
        Err(code) => code,
    }
}

/// Locate the image at `path` and return the result as JSON.
///
/// `*out_json` receives `{"x":..,"y":..,"score":..}` on `IMGLOC_FOUND` and
/// `null` on `IMGLOC_NOT_FOUND`.  Caller must free it with
/// `imgloc_free_string()`.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 C string and `out_json`
/// a valid pointer to a `*mut c_char`.
#[no_mangle]
pub unsafe extern "C" fn imgloc_locate_json(
    path: *const c_char,
    grayscale: bool,
    confidence: f32,
    out_json: *mut *mut c_char,
) -> i32 {
    clear_last_error();
    if out_json.is_null() {
        set_last_error("out_json is null");
        return IMGLOC_ERR_USAGE;
    }

    let located = match unsafe { run_locate(path, grayscale, confidence) } {
        Ok(located) => located,
        Err(code) => return code,
    };

    let status = if located.is_some() {
        IMGLOC_FOUND
    } else {
        IMGLOC_NOT_FOUND
    };

    match serde_json::to_string(&located) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => {
                unsafe { *out_json = cstr.into_raw() };
                status
            }
            Err(e) => {
                set_last_error(&format!("CString conversion failed: {e}"));
                IMGLOC_ERR_MATCHING
            }
        },
        Err(e) => {
            set_last_error(&format!("JSON serialization failed: {e}"));
            IMGLOC_ERR_MATCHING
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error() -> String {
        let ptr = imgloc_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_null_arguments() {
        let mut point = ImglocPoint::default();
        let code = unsafe { imgloc_locate(ptr::null(), true, 0.9, &mut point) };
        assert_eq!(code, IMGLOC_ERR_USAGE);
        assert!(last_error().contains("path is null"));

        let path = CString::new("ref.png").unwrap();
        let code = unsafe { imgloc_locate(path.as_ptr(), true, 0.9, ptr::null_mut()) };
        assert_eq!(code, IMGLOC_ERR_USAGE);
        assert!(last_error().contains("out_point"));
    }

    #[test]
    fn test_invalid_confidence_is_usage_error() {
        let path = CString::new("/no/such/ref.png").unwrap();
        let mut point = ImglocPoint { x: 7, y: 7 };
        let code = unsafe { imgloc_locate(path.as_ptr(), true, 1.5, &mut point) };
        assert_eq!(code, IMGLOC_ERR_USAGE);
        assert!(last_error().starts_with("InvalidConfidence"));
        assert_eq!((point.x, point.y), (7, 7));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let path = CString::new("/no/such/ref.png").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let code = unsafe { imgloc_locate_json(path.as_ptr(), false, 0.9, &mut out) };
        assert_eq!(code, IMGLOC_ERR_INPUT);
        assert!(out.is_null());
        assert!(last_error().starts_with("ImageDecodeError"));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            IMGLOC_FOUND,
            IMGLOC_NOT_FOUND,
            IMGLOC_ERR_USAGE,
            IMGLOC_ERR_INPUT,
            IMGLOC_ERR_PLATFORM,
            IMGLOC_ERR_MATCHING,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            error_code(&LocateError::Capture("BitBlt failed".into())),
            IMGLOC_ERR_PLATFORM
        );
        assert_eq!(
            error_code(&LocateError::Matching("empty template".into())),
            IMGLOC_ERR_MATCHING
        );
    }

    #[test]
    fn test_free_null_is_noop() {
        unsafe { imgloc_free_string(ptr::null_mut()) };
    }
}
