//! Option listing and save FFI functions.
#![allow(unsafe_code, clippy::missing_safety_doc)]

use std::io::{self, Write};
use std::os::raw::{c_char, c_int, c_void};

use crate::error::{SaveError, StaleHandle};
use crate::handle::{DocHandle, NodeHandle};
use crate::host::{Host, HostError, WriteArgs};
use crate::serial::OptionInfo;
use crate::tree::NodeId;

use super::strings::{read_str, read_str_or, to_c_string};
use super::{clear_last_error, host_ref, report, set_last_error};

/// A host write callback.
///
/// Receives `len` bytes at `buf` and returns how many it accepted. Anything
/// other than `len` fails the save; a negative value reports an error.
pub type XmlsaveWriteFn =
    unsafe extern "C" fn(ctx: *mut c_void, buf: *const c_char, len: usize) -> c_int;

/// Adapts a C write callback to `io::Write`.
struct CallbackStream {
    write: XmlsaveWriteFn,
    ctx: *mut c_void,
}

impl Write for CallbackStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: The caller of the save function guarantees `write` and `ctx`
        // are valid for the duration of the call.
        let accepted = unsafe { (self.write)(self.ctx, buf.as_ptr().cast(), buf.len()) };
        usize::try_from(accepted)
            .map_err(|_| io::Error::other("write callback reported an error"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Returns the number of options the host accepts.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_option_count(host: *const Host) -> usize {
    clear_last_error();
    // SAFETY: Forwarded caller guarantee.
    unsafe { host_ref(host) }.map_or(0, |host| host.capabilities().len())
}

unsafe fn option_at(host: *const Host, index: usize) -> Option<OptionInfo> {
    clear_last_error();
    // SAFETY: Forwarded caller guarantee.
    let host = unsafe { host_ref(host) }?;
    let info = host.capabilities().iter().nth(index).copied();
    if info.is_none() {
        set_last_error("option index out of range");
    }
    info
}

/// Returns the name of the option at `index`, in table order.
///
/// Returns a caller-owned C string that must be freed with
/// `xmlsave_free_string`, or null if `index` is out of range.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_option_name(host: *const Host, index: usize) -> *mut c_char {
    // SAFETY: Forwarded caller guarantee.
    unsafe { option_at(host, index) }.map_or(std::ptr::null_mut(), |info| to_c_string(info.name))
}

/// Returns the description of the option at `index`.
///
/// Returns a caller-owned C string that must be freed with
/// `xmlsave_free_string`, or null if `index` is out of range.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_option_description(
    host: *const Host,
    index: usize,
) -> *mut c_char {
    // SAFETY: Forwarded caller guarantee.
    unsafe { option_at(host, index) }
        .map_or(std::ptr::null_mut(), |info| to_c_string(info.description))
}

/// Returns the bit of the option at `index`, or 0 if out of range.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_option_bit(host: *const Host, index: usize) -> u32 {
    // SAFETY: Forwarded caller guarantee.
    unsafe { option_at(host, index) }.map_or(0, |info| info.bit.bits())
}

/// Looks up an option bit by name. Returns 0 for unknown names.
///
/// # Safety
///
/// `host` must be a valid host pointer. `name` must be a valid
/// null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_option_lookup(host: *const Host, name: *const c_char) -> u32 {
    clear_last_error();
    // SAFETY: Forwarded caller guarantees.
    let (Some(host), Some(name)) = (unsafe { host_ref(host) }, unsafe { read_str(name, "name") })
    else {
        return 0;
    };
    match host.capabilities().lookup(name) {
        Some(info) => info.bit.bits(),
        None => {
            set_last_error(&format!("unknown option `{name}`"));
            0
        }
    }
}

fn status(result: Result<(), HostError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            report(&e);
            -1
        }
    }
}

/// What a save call writes.
#[derive(Clone, Copy)]
enum Subject {
    Document(DocHandle),
    Node(NodeHandle),
}

impl Subject {
    fn node(doc: u64, node: u32) -> Result<Self, HostError> {
        let node = NodeId::from_raw(node).ok_or(SaveError::StaleReference(StaleHandle::Node))?;
        Ok(Self::Node(NodeHandle {
            doc: DocHandle::from_raw(doc),
            node,
        }))
    }
}

/// Shared argument handling for every save entry point.
///
/// # Safety
///
/// `host` must be a valid host pointer. `encoding` must be null or a valid
/// null-terminated UTF-8 string.
unsafe fn with_args<T>(
    host: *const Host,
    encoding: *const c_char,
    options: u32,
    run: impl FnOnce(&Host, &WriteArgs<'_>) -> Option<T>,
) -> Option<T> {
    clear_last_error();
    // SAFETY: Forwarded caller guarantees.
    let host = unsafe { host_ref(host) }?;
    // SAFETY: Forwarded caller guarantee.
    let encoding = unsafe { read_str_or(encoding, "encoding", "UTF-8") }?;
    let args = WriteArgs::new().encoding(encoding).bits(options);
    run(host, &args)
}

unsafe fn save_to_path(
    host: *const Host,
    subject: Result<Subject, HostError>,
    path: *const c_char,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    // SAFETY: Forwarded caller guarantees.
    let result = unsafe {
        with_args(host, encoding, options, |host, args| {
            let path = read_str(path, "path")?;
            Some(subject.and_then(|subject| match subject {
                Subject::Document(doc) => host.write_document_to_path(doc, path, args),
                Subject::Node(node) => host.write_node_to_path(node, path, args),
            }))
        })
    };
    result.map_or(-1, status)
}

unsafe fn save_to_callback(
    host: *const Host,
    subject: Result<Subject, HostError>,
    write: Option<XmlsaveWriteFn>,
    ctx: *mut c_void,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    let Some(write) = write else {
        clear_last_error();
        set_last_error("null write callback");
        return -1;
    };
    let mut stream = CallbackStream { write, ctx };
    // SAFETY: Forwarded caller guarantees.
    let result = unsafe {
        with_args(host, encoding, options, |host, args| {
            Some(subject.and_then(|subject| match subject {
                Subject::Document(doc) => host.write_document_to_stream(doc, &mut stream, args),
                Subject::Node(node) => host.write_node_to_stream(node, &mut stream, args),
            }))
        })
    };
    result.map_or(-1, status)
}

unsafe fn save_to_memory(
    host: *const Host,
    subject: Result<Subject, HostError>,
    encoding: *const c_char,
    options: u32,
    out_len: *mut usize,
) -> *mut u8 {
    if out_len.is_null() {
        clear_last_error();
        set_last_error("null out_len pointer");
        return std::ptr::null_mut();
    }
    // SAFETY: Forwarded caller guarantees.
    let result = unsafe {
        with_args(host, encoding, options, |host, args| {
            Some(subject.and_then(|subject| match subject {
                Subject::Document(doc) => host.write_document_to_memory(doc, args),
                Subject::Node(node) => host.write_node_to_memory(node, args),
            }))
        })
    };
    match result {
        Some(Ok(bytes)) => {
            let boxed = bytes.into_boxed_slice();
            // SAFETY: Null check above. Caller guarantees `out_len` is writable.
            unsafe { *out_len = boxed.len() };
            Box::into_raw(boxed).cast::<u8>()
        }
        Some(Err(e)) => {
            report(&e);
            std::ptr::null_mut()
        }
        None => std::ptr::null_mut(),
    }
}

unsafe fn save_to_string(
    host: *const Host,
    subject: Result<Subject, HostError>,
    encoding: *const c_char,
    options: u32,
) -> *mut c_char {
    // SAFETY: Forwarded caller guarantees.
    let result = unsafe {
        with_args(host, encoding, options, |host, args| {
            Some(subject.and_then(|subject| match subject {
                Subject::Document(doc) => host.write_document_to_string(doc, args),
                Subject::Node(node) => host.write_node_to_string(node, args),
            }))
        })
    };
    match result {
        Some(Ok(text)) => {
            let ptr = to_c_string(&text);
            if ptr.is_null() {
                set_last_error("output contains a null byte");
            }
            ptr
        }
        Some(Err(e)) => {
            report(&e);
            std::ptr::null_mut()
        }
        None => std::ptr::null_mut(),
    }
}

/// Writes a document to the file at `path`.
///
/// `encoding` may be null for UTF-8. `options` is a bitmask of option bits.
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `path` must be a valid
/// null-terminated UTF-8 string; `encoding` must be one or null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_doc_to_path(
    host: *const Host,
    doc: u64,
    path: *const c_char,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    let subject = Ok(Subject::Document(DocHandle::from_raw(doc)));
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_path(host, subject, path, encoding, options) }
}

/// Writes a document through a write callback.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `write` must be safe to call with
/// `ctx` for the duration of this call. `encoding` must be a valid
/// null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_doc_to_callback(
    host: *const Host,
    doc: u64,
    write: Option<XmlsaveWriteFn>,
    ctx: *mut c_void,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    let subject = Ok(Subject::Document(DocHandle::from_raw(doc)));
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_callback(host, subject, write, ctx, encoding, options) }
}

/// Writes a document to a new memory buffer.
///
/// Stores the length in `*out_len` and returns the buffer, which must be
/// freed with [`xmlsave_free_buffer`]. Returns null on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `out_len` must be writable.
/// `encoding` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_doc_to_memory(
    host: *const Host,
    doc: u64,
    encoding: *const c_char,
    options: u32,
    out_len: *mut usize,
) -> *mut u8 {
    let subject = Ok(Subject::Document(DocHandle::from_raw(doc)));
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_memory(host, subject, encoding, options, out_len) }
}

/// Writes a document to a string.
///
/// Returns a caller-owned C string that must be freed with
/// `xmlsave_free_string`. Fails if the encoded output is not UTF-8.
///
/// # Safety
///
/// `host` must be a valid host pointer. `encoding` must be a valid
/// null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_doc_to_string(
    host: *const Host,
    doc: u64,
    encoding: *const c_char,
    options: u32,
) -> *mut c_char {
    let subject = Ok(Subject::Document(DocHandle::from_raw(doc)));
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_string(host, subject, encoding, options) }
}

/// Writes the subtree of a node to the file at `path`.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// As for [`xmlsave_write_doc_to_path`].
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_node_to_path(
    host: *const Host,
    doc: u64,
    node: u32,
    path: *const c_char,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_path(host, Subject::node(doc, node), path, encoding, options) }
}

/// Writes the subtree of a node through a write callback.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// As for [`xmlsave_write_doc_to_callback`].
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_node_to_callback(
    host: *const Host,
    doc: u64,
    node: u32,
    write: Option<XmlsaveWriteFn>,
    ctx: *mut c_void,
    encoding: *const c_char,
    options: u32,
) -> c_int {
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_callback(host, Subject::node(doc, node), write, ctx, encoding, options) }
}

/// Writes the subtree of a node to a new memory buffer.
///
/// # Safety
///
/// As for [`xmlsave_write_doc_to_memory`].
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_node_to_memory(
    host: *const Host,
    doc: u64,
    node: u32,
    encoding: *const c_char,
    options: u32,
    out_len: *mut usize,
) -> *mut u8 {
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_memory(host, Subject::node(doc, node), encoding, options, out_len) }
}

/// Writes the subtree of a node to a string.
///
/// # Safety
///
/// As for [`xmlsave_write_doc_to_string`].
#[no_mangle]
pub unsafe extern "C" fn xmlsave_write_node_to_string(
    host: *const Host,
    doc: u64,
    node: u32,
    encoding: *const c_char,
    options: u32,
) -> *mut c_char {
    // SAFETY: Forwarded caller guarantees.
    unsafe { save_to_string(host, Subject::node(doc, node), encoding, options) }
}

/// Frees a buffer returned by a `*_to_memory` function.
///
/// Passing null is safe and does nothing.
///
/// # Safety
///
/// `ptr` and `len` must be exactly what a `*_to_memory` call returned, or
/// `ptr` must be null.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_free_buffer(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        // SAFETY: `ptr`/`len` describe a boxed slice leaked by `save_to_memory`.
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
        }
    }
}
