//! C FFI layer for xmlsave.
//!
//! Provides a C-compatible API for hosts that link the engine through a C
//! ABI. All symbols use the `xmlsave_` prefix.
//!
//! # Handles
//!
//! A host object ([`xmlsave_host_new`]) owns every document created through
//! it. Documents are named by `uint64_t` handles and nodes by a document
//! handle plus a `uint32_t` node id. A handle whose document has been freed
//! is rejected with a `resolve` error; it is never dereferenced. The value 0
//! never names a document or a node.
//!
//! # Error Handling
//!
//! Functions that can fail return null pointers, 0 handles, or -1. The last
//! error message and its stage are stored in thread-local storage and can be
//! retrieved via [`xmlsave_last_error`] and [`xmlsave_last_error_stage`].
//!
//! # String Ownership
//!
//! All strings returned by FFI functions are caller-owned C strings that
//! must be freed via [`xmlsave_free_string`](strings::xmlsave_free_string).
//! Memory buffers are freed via [`xmlsave_free_buffer`](serial::xmlsave_free_buffer).
//!
//! # Safety
//!
//! All `extern "C"` functions in this module are inherently unsafe because
//! they accept raw pointers from C callers.

// FFI functions require unsafe blocks throughout.
#![allow(unsafe_code, clippy::missing_safety_doc)]

pub mod document;
pub mod serial;
pub mod strings;

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};

use crate::error::Stage;
use crate::host::{Host, HostError};

/// No error recorded.
pub const XMLSAVE_STAGE_NONE: c_int = 0;
/// A document or node handle was stale.
pub const XMLSAVE_STAGE_RESOLVE: c_int = 1;
/// Options, encoding, or target were rejected before writing.
pub const XMLSAVE_STAGE_OPEN: c_int = 2;
/// Writing to the sink failed.
pub const XMLSAVE_STAGE_WRITE: c_int = 3;
/// The final flush or close failed.
pub const XMLSAVE_STAGE_CLOSE: c_int = 4;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
    static LAST_STAGE: Cell<c_int> = const { Cell::new(XMLSAVE_STAGE_NONE) };
}

fn stage_code(stage: Stage) -> c_int {
    match stage {
        Stage::Resolve => XMLSAVE_STAGE_RESOLVE,
        Stage::Open => XMLSAVE_STAGE_OPEN,
        Stage::Write => XMLSAVE_STAGE_WRITE,
        Stage::Close => XMLSAVE_STAGE_CLOSE,
    }
}

/// Stores an error message in thread-local storage.
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg).ok();
    });
}

/// Stores a host error and its stage.
fn report(err: &HostError) {
    set_last_error(&err.message);
    LAST_STAGE.with(|cell| cell.set(stage_code(err.stage)));
}

/// Clears the thread-local error.
fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
    LAST_STAGE.with(|cell| cell.set(XMLSAVE_STAGE_NONE));
}

/// Borrows a host pointer, recording an error if it is null.
///
/// # Safety
///
/// `host` must be null or a pointer returned by [`xmlsave_host_new`] that
/// has not been freed.
unsafe fn host_ref<'a>(host: *const Host) -> Option<&'a Host> {
    if host.is_null() {
        set_last_error("null host pointer");
        return None;
    }
    // SAFETY: Null check above. Caller guarantees `host` came from `xmlsave_host_new`.
    Some(unsafe { &*host })
}

/// Mutable variant of [`host_ref`].
///
/// # Safety
///
/// As for [`host_ref`], and no other reference to the host may be live.
unsafe fn host_mut<'a>(host: *mut Host) -> Option<&'a mut Host> {
    if host.is_null() {
        set_last_error("null host pointer");
        return None;
    }
    // SAFETY: Null check above. Caller guarantees exclusive access.
    Some(unsafe { &mut *host })
}

/// Returns the last error message, or null if no error occurred.
///
/// The returned string is owned by the library and must NOT be freed
/// by the caller. It is valid until the next FFI call on the same thread.
#[no_mangle]
pub extern "C" fn xmlsave_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => std::ptr::null(),
        }
    })
}

/// Returns the stage of the last error as one of the `XMLSAVE_STAGE_*`
/// constants.
///
/// Errors that are not part of a write call (such as a null pointer)
/// report [`XMLSAVE_STAGE_NONE`] together with a message.
#[no_mangle]
pub extern "C" fn xmlsave_last_error_stage() -> c_int {
    LAST_STAGE.with(Cell::get)
}

/// Creates a host using the engine's full capability table.
///
/// The host must be freed with [`xmlsave_host_free`].
#[no_mangle]
pub extern "C" fn xmlsave_host_new() -> *mut Host {
    Box::into_raw(Box::new(Host::new()))
}

/// Creates a host that only offers the options of an engine at `version`.
#[no_mangle]
pub extern "C" fn xmlsave_host_new_for_version(version: u32) -> *mut Host {
    Box::into_raw(Box::new(Host::for_version(version)))
}

/// Frees a host and every document it still owns.
///
/// Passing null is safe and does nothing.
///
/// # Safety
///
/// `host` must have been returned by `xmlsave_host_new` or
/// `xmlsave_host_new_for_version`, or be null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_host_free(host: *mut Host) {
    if !host.is_null() {
        // SAFETY: `host` was created by `Box::into_raw` above, and is non-null.
        unsafe {
            drop(Box::from_raw(host));
        }
    }
}
