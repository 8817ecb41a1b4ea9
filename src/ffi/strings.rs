//! String lifecycle helpers for the FFI layer.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use super::set_last_error;

/// Converts a Rust `&str` to a caller-owned C string.
///
/// Returns null if the string contains interior null bytes.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Borrows a C string argument as UTF-8, recording an error naming `what`
/// if it is null or not UTF-8.
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated string that outlives `'a`.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Option<&'a str> {
    if ptr.is_null() {
        set_last_error(&format!("null {what} pointer"));
        return None;
    }
    // SAFETY: Null check above. Caller guarantees a null-terminated string.
    let c_str = unsafe { CStr::from_ptr(ptr) };
    match c_str.to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            set_last_error(&format!("invalid UTF-8 in {what}: {e}"));
            None
        }
    }
}

/// Like [`read_str`], but a null pointer means `default`.
///
/// # Safety
///
/// As for [`read_str`].
pub(crate) unsafe fn read_str_or<'a>(
    ptr: *const c_char,
    what: &str,
    default: &'a str,
) -> Option<&'a str> {
    if ptr.is_null() {
        Some(default)
    } else {
        // SAFETY: Forwarded caller guarantee.
        unsafe { read_str(ptr, what) }
    }
}

/// Frees a string previously returned by an xmlsave FFI function.
///
/// Passing null is safe and does nothing.
///
/// # Safety
///
/// The pointer must have been returned by an xmlsave FFI function,
/// or be null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: `ptr` was created by `CString::into_raw` via `to_c_string`, and is non-null.
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}
