//! Host-facing entry points.
//!
//! A [`Host`] owns the documents a host language has created and exposes the
//! write operations in the shape hosts expect: documents and nodes are passed
//! as handles, options as a bitmask or as a list of names, and every failure
//! comes back as one message plus the [`Stage`] it happened in.
//!
//! Handles are resolved before anything else, so a stale handle never opens
//! a sink (and never creates a file).

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::error::{OpenError, SaveError, Stage, WriteError};
use crate::handle::{DocHandle, DocumentStore, NodeHandle};
use crate::serial::{
    available_options, save_with, Capabilities, OptionInfo, Output, SaveContext, SaveOptions,
    Target,
};
use crate::tree::{Document, NodeId};

/// Options as a host passes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsArg<'a> {
    /// A raw bitmask, as returned by [`Host::list_supported_options`].
    Bits(u32),
    /// Option names, e.g. `["format", "no_declaration"]`.
    Names(&'a [&'a str]),
}

impl Default for OptionsArg<'_> {
    fn default() -> Self {
        Self::Bits(SaveOptions::FORMAT.bits())
    }
}

/// Encoding and options of one write call.
///
/// Defaults to `"UTF-8"` with `format`.
///
/// # Examples
///
/// ```
/// use xmlsave::host::{OptionsArg, WriteArgs};
///
/// let args = WriteArgs::new()
///     .encoding("ISO-8859-1")
///     .options(OptionsArg::Names(&["no_declaration"]));
/// assert_eq!(args.encoding_label(), "ISO-8859-1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteArgs<'a> {
    encoding: &'a str,
    options: OptionsArg<'a>,
}

impl Default for WriteArgs<'_> {
    fn default() -> Self {
        Self {
            encoding: "UTF-8",
            options: OptionsArg::default(),
        }
    }
}

impl<'a> WriteArgs<'a> {
    /// Returns the default arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output encoding label.
    #[must_use]
    pub fn encoding(mut self, encoding: &'a str) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn options(mut self, options: OptionsArg<'a>) -> Self {
        self.options = options;
        self
    }

    /// Sets the options from a bitmask.
    #[must_use]
    pub fn bits(self, bits: u32) -> Self {
        self.options(OptionsArg::Bits(bits))
    }

    /// Sets the options from names.
    #[must_use]
    pub fn names(self, names: &'a [&'a str]) -> Self {
        self.options(OptionsArg::Names(names))
    }

    /// The encoding label.
    #[must_use]
    pub fn encoding_label(&self) -> &'a str {
        self.encoding
    }

    /// The options as given.
    #[must_use]
    pub fn options_arg(&self) -> OptionsArg<'a> {
        self.options
    }
}

/// A failed host call: one message and the stage it failed in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    /// Where the call failed.
    pub stage: Stage,
    /// Human-readable description.
    pub message: String,
}

impl From<SaveError> for HostError {
    fn from(err: SaveError) -> Self {
        Self {
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

/// Owns host documents and runs write calls against them.
#[derive(Debug)]
pub struct Host {
    store: DocumentStore,
    capabilities: Cow<'static, Capabilities>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Creates a host using this engine's capability table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            capabilities: Cow::Borrowed(available_options()),
        }
    }

    /// Creates a host that only offers the options of an engine at `version`.
    #[must_use]
    pub fn for_version(version: u32) -> Self {
        Self {
            store: DocumentStore::new(),
            capabilities: Cow::Owned(Capabilities::for_version(version)),
        }
    }

    /// The capability table this host checks options against.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The documents owned by this host.
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Mutable access to the owned documents, for building them.
    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    /// Takes ownership of a document.
    pub fn insert_document(&mut self, doc: Document) -> DocHandle {
        self.store.insert(doc)
    }

    /// Frees a document. Its handles, and handles to its nodes, go stale.
    ///
    /// # Errors
    ///
    /// Fails in [`Stage::Resolve`] if the handle is already stale.
    pub fn free_document(&mut self, doc: DocHandle) -> Result<Document, HostError> {
        Ok(self.store.remove(doc)?)
    }

    /// Issues a handle to `node` of `doc`.
    ///
    /// # Errors
    ///
    /// Fails in [`Stage::Resolve`] if `doc` is stale or `node` is not in it.
    pub fn node(&self, doc: DocHandle, node: NodeId) -> Result<NodeHandle, HostError> {
        Ok(self.store.node(doc, node)?)
    }

    /// Lists the options this host accepts, in table order.
    #[must_use]
    pub fn list_supported_options(&self) -> Vec<OptionInfo> {
        self.capabilities.iter().copied().collect()
    }

    /// Maps host options to a validated bitmask.
    ///
    /// # Errors
    ///
    /// Fails in [`Stage::Open`] for unknown names, unsupported bits, or
    /// conflicting options.
    pub fn map_options(&self, options: OptionsArg<'_>) -> Result<SaveOptions, HostError> {
        let mapped = match options {
            OptionsArg::Bits(bits) => self
                .capabilities
                .validate(SaveOptions::from_bits_retain(bits)),
            OptionsArg::Names(names) => self.capabilities.parse_names(names),
        };
        mapped.map_err(|e| SaveError::Open(e).into())
    }

    /// Writes a document to a file, creating or truncating it.
    ///
    /// # Errors
    ///
    /// See [`HostError`]; the file is closed on every path once opened.
    pub fn write_document_to_path(
        &self,
        doc: DocHandle,
        path: impl AsRef<Path>,
        args: &WriteArgs<'_>,
    ) -> Result<(), HostError> {
        let doc = self.store.document(doc)?;
        self.run(Target::Path(path.as_ref()), args, |ctx| ctx.save_document(doc))?;
        Ok(())
    }

    /// Writes a document to a host stream.
    ///
    /// # Errors
    ///
    /// A stream that accepts fewer bytes than offered fails in
    /// [`Stage::Write`].
    pub fn write_document_to_stream(
        &self,
        doc: DocHandle,
        stream: &mut dyn Write,
        args: &WriteArgs<'_>,
    ) -> Result<(), HostError> {
        let doc = self.store.document(doc)?;
        self.run(Target::Stream(stream), args, |ctx| ctx.save_document(doc))?;
        Ok(())
    }

    /// Writes a document to memory and returns the encoded bytes.
    ///
    /// # Errors
    ///
    /// See [`HostError`].
    pub fn write_document_to_memory(
        &self,
        doc: DocHandle,
        args: &WriteArgs<'_>,
    ) -> Result<Vec<u8>, HostError> {
        let doc = self.store.document(doc)?;
        let output = self.run(Target::Memory, args, |ctx| ctx.save_document(doc))?;
        Ok(output.into_bytes().unwrap_or_default())
    }

    /// Writes a document to memory and returns it as a string.
    ///
    /// # Errors
    ///
    /// Fails in [`Stage::Write`] if the encoded output is not UTF-8.
    pub fn write_document_to_string(
        &self,
        doc: DocHandle,
        args: &WriteArgs<'_>,
    ) -> Result<String, HostError> {
        into_string(self.write_document_to_memory(doc, args)?)
    }

    /// Writes the subtree of a node to a file.
    ///
    /// # Errors
    ///
    /// See [`HostError`].
    pub fn write_node_to_path(
        &self,
        node: NodeHandle,
        path: impl AsRef<Path>,
        args: &WriteArgs<'_>,
    ) -> Result<(), HostError> {
        let (doc, id) = self.store.resolve_node(node)?;
        self.run(Target::Path(path.as_ref()), args, |ctx| ctx.save_tree(doc, id))?;
        Ok(())
    }

    /// Writes the subtree of a node to a host stream.
    ///
    /// # Errors
    ///
    /// See [`write_document_to_stream`](Self::write_document_to_stream).
    pub fn write_node_to_stream(
        &self,
        node: NodeHandle,
        stream: &mut dyn Write,
        args: &WriteArgs<'_>,
    ) -> Result<(), HostError> {
        let (doc, id) = self.store.resolve_node(node)?;
        self.run(Target::Stream(stream), args, |ctx| ctx.save_tree(doc, id))?;
        Ok(())
    }

    /// Writes the subtree of a node to memory.
    ///
    /// # Errors
    ///
    /// See [`HostError`].
    pub fn write_node_to_memory(
        &self,
        node: NodeHandle,
        args: &WriteArgs<'_>,
    ) -> Result<Vec<u8>, HostError> {
        let (doc, id) = self.store.resolve_node(node)?;
        let output = self.run(Target::Memory, args, |ctx| ctx.save_tree(doc, id))?;
        Ok(output.into_bytes().unwrap_or_default())
    }

    /// Writes the subtree of a node to memory and returns it as a string.
    ///
    /// # Errors
    ///
    /// Fails in [`Stage::Write`] if the encoded output is not UTF-8.
    pub fn write_node_to_string(
        &self,
        node: NodeHandle,
        args: &WriteArgs<'_>,
    ) -> Result<String, HostError> {
        into_string(self.write_node_to_memory(node, args)?)
    }

    fn run<F>(&self, target: Target<'_>, args: &WriteArgs<'_>, write: F) -> Result<Output, HostError>
    where
        F: FnOnce(&mut SaveContext<'_>) -> Result<(), SaveError>,
    {
        if args.encoding.is_empty() {
            return Err(SaveError::Open(OpenError::EmptyEncoding).into());
        }
        let options = self.map_options(args.options)?;
        debug!(
            target_kind = target.kind(),
            encoding = args.encoding,
            options = options.bits(),
            "host write"
        );
        Ok(save_with(target, args.encoding, options, &self.capabilities, write)?)
    }
}

fn into_string(bytes: Vec<u8>) -> Result<String, HostError> {
    String::from_utf8(bytes).map_err(|_| SaveError::Write(WriteError::NotUtf8).into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use tracing_test::traced_test;

    fn host_with_doc() -> (Host, DocHandle) {
        let mut host = Host::new();
        let mut doc = Document::new();
        let root = doc.append_element(doc.root(), "root");
        doc.set_attribute(root, "id", "1");
        let h = host.insert_document(doc);
        (host, h)
    }

    #[test]
    fn test_default_args() {
        let args = WriteArgs::new();
        assert_eq!(args.encoding_label(), "UTF-8");
        assert_eq!(args.options_arg(), OptionsArg::Bits(1));
    }

    #[test]
    fn test_write_document_to_string() {
        let (host, h) = host_with_doc();
        let out = host.write_document_to_string(h, &WriteArgs::new()).unwrap();
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root id=\"1\"/>\n"
        );
    }

    #[test]
    fn test_options_by_name() {
        let (host, h) = host_with_doc();
        let args = WriteArgs::new().names(&["no_declaration", "no_empty_tags"]);
        let out = host.write_document_to_string(h, &args).unwrap();
        assert_eq!(out, "<root id=\"1\"></root>\n");
    }

    #[test]
    fn test_unknown_option_name() {
        let (host, h) = host_with_doc();
        let args = WriteArgs::new().names(&["pretty"]);
        let err = host.write_document_to_memory(h, &args).unwrap_err();
        assert_eq!(err.stage, Stage::Open);
        assert!(err.message.contains("pretty"));
    }

    #[test]
    fn test_empty_encoding() {
        let (host, h) = host_with_doc();
        let err = host
            .write_document_to_memory(h, &WriteArgs::new().encoding(""))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Open);
        assert_eq!(err.message, "open failed: empty encoding name");
    }

    #[test]
    fn test_stale_document_checked_before_options() {
        let (mut host, h) = host_with_doc();
        host.free_document(h).unwrap();
        let args = WriteArgs::new().names(&["pretty"]);
        let err = host.write_document_to_memory(h, &args).unwrap_err();
        assert_eq!(err.stage, Stage::Resolve);
    }

    #[test]
    fn test_node_write() {
        let (mut host, h) = host_with_doc();
        let doc = host.store_mut().document_mut(h).unwrap();
        let root = doc.root_element().unwrap();
        let child = doc.append_element(root, "child");
        doc.append_text(child, "x");
        let node = host.node(h, child).unwrap();
        let out = host.write_node_to_string(node, &WriteArgs::new()).unwrap();
        assert_eq!(out, "<child>x</child>");
    }

    #[test]
    fn test_string_variant_rejects_non_utf8() {
        let mut host = Host::new();
        let mut doc = Document::new();
        let root = doc.append_element(doc.root(), "p");
        doc.append_text(root, "\u{e9}");
        let h = host.insert_document(doc);
        let args = WriteArgs::new().encoding("ISO-8859-1");
        let err = host.write_document_to_string(h, &args).unwrap_err();
        assert_eq!(err.stage, Stage::Write);
        assert!(host.write_document_to_memory(h, &args).is_ok());
    }

    #[test]
    fn test_old_engine_lists_fewer_options() {
        let host = Host::for_version(20704);
        let names: Vec<_> = host.list_supported_options().iter().map(|o| o.name).collect();
        assert_eq!(
            names,
            [
                "format",
                "no_declaration",
                "no_empty_tags",
                "no_xhtml",
                "require_xhtml",
                "as_xml",
                "as_html"
            ]
        );
        let err = host.map_options(OptionsArg::Bits(128)).unwrap_err();
        assert_eq!(err.stage, Stage::Open);
    }

    #[test]
    fn test_stream_error_is_write_stage() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let (host, h) = host_with_doc();
        let err = host
            .write_document_to_stream(h, &mut Broken, &WriteArgs::new())
            .unwrap_err();
        assert_eq!(err.stage, Stage::Write);
        assert!(err.message.contains("connection reset"));
    }

    #[test]
    #[traced_test]
    fn test_failed_pass_is_logged() {
        let (host, h) = host_with_doc();
        let _ = host.write_document_to_memory(h, &WriteArgs::new().encoding("klingon"));
        assert!(logs_contain("failed to open save context"));
    }

    #[test]
    #[traced_test]
    fn test_successful_pass_is_logged() {
        let (host, h) = host_with_doc();
        host.write_document_to_memory(h, &WriteArgs::new()).unwrap();
        assert!(logs_contain("opened save context"));
        assert!(logs_contain("wrote save output"));
    }
}
