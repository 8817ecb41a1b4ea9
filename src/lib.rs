//! # xmlsave
//!
//! Writes XML document trees to a file, a host-provided stream, or an
//! in-memory buffer through one save-context API. Every pass opens its sink,
//! runs the formatter once, and closes the sink exactly once, whatever
//! happened in between.
//!
//! Which formatting options a pass may use depends on the engine version;
//! [`serial::available_options`] lists them.
//!
//! ## Quick Start
//!
//! ```
//! use xmlsave::Document;
//! use xmlsave::serial::{save_document, SaveOptions, Target};
//!
//! let mut doc = Document::new();
//! let root = doc.append_element(doc.root(), "root");
//! doc.set_attribute(root, "id", "1");
//!
//! let bytes = save_document(Target::Memory, &doc, "UTF-8", SaveOptions::FORMAT)
//!     .unwrap()
//!     .into_bytes()
//!     .unwrap();
//! assert_eq!(bytes, b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root id=\"1\"/>\n");
//! ```
//!
//! Hosts that pass documents around as handles use [`host::Host`], and C
//! callers use the `ffi` module (cargo feature `ffi`).

pub mod encoding;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod handle;
pub mod host;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{OpenError, SaveError, Stage, StaleHandle, WriteError};
pub use handle::{DocHandle, DocumentStore, NodeHandle};
pub use host::{Host, HostError, OptionsArg, WriteArgs};
pub use tree::{Attribute, Document, NodeId};
