//! Document lifecycle and construction FFI functions.
#![allow(unsafe_code, clippy::missing_safety_doc)]

use std::os::raw::{c_char, c_int};

use crate::handle::DocHandle;
use crate::host::Host;
use crate::tree::{Document, NodeId};

use super::strings::read_str;
use super::{clear_last_error, host_mut, host_ref, report, set_last_error};

/// Creates an empty document owned by `host` and returns its handle.
///
/// `html` non-zero marks the document as HTML, which selects HTML output
/// unless `as_xml` is requested. Returns 0 if `host` is null.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_new(host: *mut Host, html: c_int) -> u64 {
    clear_last_error();
    // SAFETY: Forwarded caller guarantee.
    let Some(host) = (unsafe { host_mut(host) }) else {
        return 0;
    };
    let doc = if html == 0 {
        Document::new()
    } else {
        Document::new_html()
    };
    host.insert_document(doc).into_raw()
}

/// Frees a document. Handles to it and to its nodes become stale.
///
/// Returns 0 on success, -1 if the handle was already stale.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_free(host: *mut Host, doc: u64) -> c_int {
    clear_last_error();
    // SAFETY: Forwarded caller guarantee.
    let Some(host) = (unsafe { host_mut(host) }) else {
        return -1;
    };
    match host.free_document(DocHandle::from_raw(doc)) {
        Ok(_) => 0,
        Err(e) => {
            report(&e);
            -1
        }
    }
}

/// Returns the document node id, or 0 if the handle is stale.
///
/// # Safety
///
/// `host` must be a valid host pointer.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_root(host: *const Host, doc: u64) -> u32 {
    clear_last_error();
    // SAFETY: Forwarded caller guarantee.
    let Some(host) = (unsafe { host_ref(host) }) else {
        return 0;
    };
    match host.store().document(DocHandle::from_raw(doc)) {
        Ok(d) => d.root().into_raw(),
        Err(e) => {
            report(&e.into());
            0
        }
    }
}

/// Resolves a document for mutation and a parent node inside it.
fn parent_of(host: &mut Host, doc: u64, node: u32) -> Option<(&mut Document, NodeId)> {
    let doc = match host.store_mut().document_mut(DocHandle::from_raw(doc)) {
        Ok(doc) => doc,
        Err(e) => {
            report(&e.into());
            return None;
        }
    };
    match NodeId::from_raw(node).filter(|&id| doc.contains(id)) {
        Some(id) => Some((doc, id)),
        None => {
            set_last_error("node is not part of the document");
            None
        }
    }
}

/// Appends an element named `name` to `parent` and returns its node id.
///
/// Returns 0 on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `name` must be a valid
/// null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_add_element(
    host: *mut Host,
    doc: u64,
    parent: u32,
    name: *const c_char,
) -> u32 {
    clear_last_error();
    // SAFETY: Forwarded caller guarantees.
    let (Some(host), Some(name)) = (unsafe { host_mut(host) }, unsafe { read_str(name, "name") })
    else {
        return 0;
    };
    match parent_of(host, doc, parent) {
        Some((doc, parent)) => doc.append_element(parent, name).into_raw(),
        None => 0,
    }
}

/// Appends a text node to `parent` and returns its node id.
///
/// Returns 0 on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `content` must be a valid
/// null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_add_text(
    host: *mut Host,
    doc: u64,
    parent: u32,
    content: *const c_char,
) -> u32 {
    clear_last_error();
    // SAFETY: Forwarded caller guarantees.
    let (Some(host), Some(content)) =
        (unsafe { host_mut(host) }, unsafe { read_str(content, "content") })
    else {
        return 0;
    };
    match parent_of(host, doc, parent) {
        Some((doc, parent)) => doc.append_text(parent, content).into_raw(),
        None => 0,
    }
}

/// Sets an attribute on an element, replacing an existing value in place.
///
/// Returns 0 on success, -1 on failure.
///
/// # Safety
///
/// `host` must be a valid host pointer. `name` and `value` must be valid
/// null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn xmlsave_doc_set_attribute(
    host: *mut Host,
    doc: u64,
    node: u32,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    // SAFETY: Forwarded caller guarantees.
    let (Some(host), Some(name), Some(value)) = (
        unsafe { host_mut(host) },
        unsafe { read_str(name, "name") },
        unsafe { read_str(value, "value") },
    ) else {
        return -1;
    };
    match parent_of(host, doc, node) {
        Some((doc, node)) => {
            doc.set_attribute(node, name, value);
            0
        }
        None => -1,
    }
}
