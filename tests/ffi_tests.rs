//! Integration tests for the C FFI layer.
//!
//! These tests call the `extern "C"` functions directly from Rust to verify
//! correctness before exposing them to actual C consumers.
#![cfg(feature = "ffi")]
#![allow(unsafe_code, clippy::unwrap_used)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};

use xmlsave::ffi::document::*;
use xmlsave::ffi::serial::*;
use xmlsave::ffi::strings::*;
use xmlsave::ffi::*;
use xmlsave::Host;

/// Helper to convert a C string pointer to a Rust `String`, then free it.
unsafe fn c_string_to_owned(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    unsafe { xmlsave_free_string(ptr) };
    Some(s)
}

/// Helper to get the last error as a Rust string.
fn last_error() -> Option<String> {
    unsafe {
        let ptr = xmlsave_last_error();
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_str().unwrap().to_owned())
        }
    }
}

/// Builds `<root id="1"><item>text</item></root>` and returns the host,
/// the document handle, and the item node id.
unsafe fn build() -> (*mut Host, u64, u32) {
    let host = xmlsave_host_new();
    let root_name = CString::new("root").unwrap();
    let item_name = CString::new("item").unwrap();
    let id = CString::new("id").unwrap();
    let one = CString::new("1").unwrap();
    let text = CString::new("text").unwrap();
    unsafe {
        let doc = xmlsave_doc_new(host, 0);
        assert_ne!(doc, 0);
        let root = xmlsave_doc_add_element(host, doc, xmlsave_doc_root(host, doc), root_name.as_ptr());
        assert_ne!(root, 0);
        assert_eq!(xmlsave_doc_set_attribute(host, doc, root, id.as_ptr(), one.as_ptr()), 0);
        let item = xmlsave_doc_add_element(host, doc, root, item_name.as_ptr());
        assert_ne!(xmlsave_doc_add_text(host, doc, item, text.as_ptr()), 0);
        (host, doc, item)
    }
}

// ---------- Option listing ----------

#[test]
fn test_option_listing() {
    let host = xmlsave_host_new();
    unsafe {
        assert_eq!(xmlsave_option_count(host), 8);
        assert_eq!(c_string_to_owned(xmlsave_option_name(host, 0)).unwrap(), "format");
        assert_eq!(xmlsave_option_bit(host, 7), 128);
        assert!(!c_string_to_owned(xmlsave_option_description(host, 3))
            .unwrap()
            .is_empty());
        assert!(xmlsave_option_name(host, 8).is_null());
        assert!(last_error().is_some());

        let name = CString::new("as_html").unwrap();
        assert_eq!(xmlsave_option_lookup(host, name.as_ptr()), 64);
        xmlsave_host_free(host);
    }
}

#[test]
fn test_old_engine_option_count() {
    let host = xmlsave_host_new_for_version(20703);
    unsafe {
        assert_eq!(xmlsave_option_count(host), 3);
        let name = CString::new("as_html").unwrap();
        assert_eq!(xmlsave_option_lookup(host, name.as_ptr()), 0);
        xmlsave_host_free(host);
    }
}

// ---------- Writes ----------

#[test]
fn test_write_doc_to_string() {
    unsafe {
        let (host, doc, _) = build();
        let out = c_string_to_owned(xmlsave_write_doc_to_string(host, doc, std::ptr::null(), 0));
        assert_eq!(
            out.unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root id=\"1\"><item>text</item></root>\n"
        );
        xmlsave_host_free(host);
    }
}

#[test]
fn test_write_node_to_memory() {
    unsafe {
        let (host, doc, item) = build();
        let mut len = 0usize;
        let buf = xmlsave_write_node_to_memory(host, doc, item, std::ptr::null(), 0, &mut len);
        assert!(!buf.is_null());
        assert_eq!(std::slice::from_raw_parts(buf, len), b"<item>text</item>");
        xmlsave_free_buffer(buf, len);
        xmlsave_host_free(host);
    }
}

#[test]
fn test_write_doc_to_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");
    let c_path = CString::new(path.to_str().unwrap()).unwrap();
    unsafe {
        let (host, doc, _) = build();
        assert_eq!(
            xmlsave_write_doc_to_path(host, doc, c_path.as_ptr(), std::ptr::null(), 1 | 2),
            0
        );
        xmlsave_host_free(host);
    }
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "<root id=\"1\">\n  <item>text</item>\n</root>\n"
    );
}

unsafe extern "C" fn collect(ctx: *mut c_void, buf: *const c_char, len: usize) -> c_int {
    let out = unsafe { &mut *ctx.cast::<Vec<u8>>() };
    out.extend_from_slice(unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), len) });
    c_int::try_from(len).unwrap()
}

unsafe extern "C" fn refuse(_: *mut c_void, _: *const c_char, _: usize) -> c_int {
    -1
}

unsafe extern "C" fn partial(_: *mut c_void, _: *const c_char, len: usize) -> c_int {
    c_int::try_from(len / 2).unwrap()
}

#[test]
fn test_write_doc_to_callback() {
    unsafe {
        let (host, doc, _) = build();
        let mut out: Vec<u8> = Vec::new();
        let ctx = std::ptr::addr_of_mut!(out).cast::<c_void>();
        assert_eq!(
            xmlsave_write_doc_to_callback(host, doc, Some(collect), ctx, std::ptr::null(), 2),
            0
        );
        assert_eq!(out, b"<root id=\"1\"><item>text</item></root>\n");
        xmlsave_host_free(host);
    }
}

#[test]
fn test_callback_failures_report_write_stage() {
    unsafe {
        let (host, doc, item) = build();
        let rc = xmlsave_write_doc_to_callback(
            host,
            doc,
            Some(refuse),
            std::ptr::null_mut(),
            std::ptr::null(),
            0,
        );
        assert_eq!(rc, -1);
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_WRITE);
        assert!(last_error().unwrap().contains("write callback reported an error"));

        let rc = xmlsave_write_node_to_callback(
            host,
            doc,
            item,
            Some(partial),
            std::ptr::null_mut(),
            std::ptr::null(),
            0,
        );
        assert_eq!(rc, -1);
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_WRITE);
        assert!(last_error().unwrap().contains("short write"));

        let rc = xmlsave_write_doc_to_callback(
            host,
            doc,
            None,
            std::ptr::null_mut(),
            std::ptr::null(),
            0,
        );
        assert_eq!(rc, -1);
        xmlsave_host_free(host);
    }
}

// ---------- Errors ----------

#[test]
fn test_stale_document_handle() {
    unsafe {
        let (host, doc, item) = build();
        assert_eq!(xmlsave_doc_free(host, doc), 0);
        assert_eq!(xmlsave_doc_free(host, doc), -1);
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_RESOLVE);

        let out = xmlsave_write_doc_to_string(host, doc, std::ptr::null(), 0);
        assert!(out.is_null());
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_RESOLVE);

        let mut len = 0usize;
        let buf = xmlsave_write_node_to_memory(host, doc, item, std::ptr::null(), 0, &mut len);
        assert!(buf.is_null());
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_RESOLVE);
        xmlsave_host_free(host);
    }
}

#[test]
fn test_zero_node_is_stale() {
    unsafe {
        let (host, doc, _) = build();
        let out = xmlsave_write_node_to_string(host, doc, 0, std::ptr::null(), 0);
        assert!(out.is_null());
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_RESOLVE);
        xmlsave_host_free(host);
    }
}

#[test]
fn test_bad_encoding_and_options() {
    unsafe {
        let (host, doc, _) = build();
        let empty = CString::new("").unwrap();
        assert!(xmlsave_write_doc_to_string(host, doc, empty.as_ptr(), 0).is_null());
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_OPEN);

        assert!(xmlsave_write_doc_to_string(host, doc, std::ptr::null(), 1 << 12).is_null());
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_OPEN);

        let ok = xmlsave_write_doc_to_string(host, doc, std::ptr::null(), 0);
        assert_eq!(xmlsave_last_error_stage(), XMLSAVE_STAGE_NONE);
        assert!(c_string_to_owned(ok).is_some());
        assert!(last_error().is_none());
        xmlsave_host_free(host);
    }
}

#[test]
fn test_null_pointers_are_safe() {
    unsafe {
        xmlsave_host_free(std::ptr::null_mut());
        xmlsave_free_string(std::ptr::null_mut());
        xmlsave_free_buffer(std::ptr::null_mut(), 0);
        assert_eq!(xmlsave_doc_new(std::ptr::null_mut(), 0), 0);
        assert!(last_error().is_some());
        assert_eq!(xmlsave_option_count(std::ptr::null()), 0);
        let mut len = 0usize;
        assert!(xmlsave_write_doc_to_memory(
            std::ptr::null(),
            1,
            std::ptr::null(),
            0,
            &mut len
        )
        .is_null());
    }
}
