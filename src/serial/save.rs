//! Save contexts.
//!
//! A [`SaveContext`] is one serialization pass into one sink:
//!
//! 1. **Opening**: [`SaveContext::open`] validates the options, resolves
//!    the output encoding and opens the target. If any of that fails, no
//!    context exists and nothing was written.
//! 2. **Writing**: [`SaveContext::save_document`] or
//!    [`SaveContext::save_tree`] runs the formatter once. Output is encoded
//!    and handed to the sink in chunks of [`CHUNK_SIZE`] bytes; the rest is
//!    flushed before the call returns.
//! 3. **Closing**: [`SaveContext::close`] flushes and releases the sink.
//!    It consumes the context, so it runs at most once, and a context that
//!    is dropped without being closed closes its sink in `Drop`.
//!
//! [`save_document`] and [`save_subtree`] run all three steps and always
//! close, reporting a write failure in preference to a close failure.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::encoding::OutputEncoder;
use crate::error::{OpenError, SaveError, WriteError};
use crate::tree::{Document, NodeId};

use super::capability::{available_options, Capabilities};
use super::sink::{Output, Sink, Target};
use super::{xml, SaveOptions};

/// Size of the chunks handed to the sink.
pub const CHUNK_SIZE: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Written,
    Failed,
}

/// One serialization pass bound to one sink.
///
/// # Examples
///
/// ```
/// use xmlsave::Document;
/// use xmlsave::serial::{SaveContext, SaveOptions, Target};
///
/// let mut doc = Document::new();
/// doc.append_element(doc.root(), "root");
///
/// let mut ctx = SaveContext::open(Target::Memory, "UTF-8", SaveOptions::NONE).unwrap();
/// ctx.save_document(&doc).unwrap();
/// let bytes = ctx.close().unwrap().into_bytes().unwrap();
/// assert_eq!(bytes, b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root/>\n");
/// ```
pub struct SaveContext<'a> {
    sink: Option<Sink<'a>>,
    encoder: OutputEncoder,
    options: SaveOptions,
    phase: Phase,
    kind: &'static str,
}

impl<'a> SaveContext<'a> {
    /// Opens a pass against the engine's own capability table.
    ///
    /// # Errors
    ///
    /// See [`open_with`](Self::open_with).
    pub fn open(target: Target<'a>, encoding: &str, options: SaveOptions) -> Result<Self, SaveError> {
        Self::open_with(target, encoding, options, available_options())
    }

    /// Opens a pass, checking `options` against `capabilities`.
    ///
    /// Options and encoding are checked before the target is touched, so an
    /// invalid request never creates a file.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Open`] if the options are unsupported or
    /// conflicting, the encoding cannot be produced, or the target cannot be
    /// opened.
    pub fn open_with(
        target: Target<'a>,
        encoding: &str,
        options: SaveOptions,
        capabilities: &Capabilities,
    ) -> Result<Self, SaveError> {
        let kind = target.kind();
        let opened = capabilities.validate(options).and_then(|options| {
            let encoder = OutputEncoder::for_label(encoding)?;
            let sink = Sink::open(target)?;
            Ok::<_, OpenError>((options, encoder, sink))
        });
        let (options, encoder, sink) = opened.map_err(|e| {
            warn!(target_kind = kind, encoding, error = %e, "failed to open save context");
            SaveError::Open(e)
        })?;
        debug!(
            target_kind = kind,
            encoding = encoder.name(),
            options = options.bits(),
            "opened save context"
        );
        Ok(Self {
            sink: Some(sink),
            encoder,
            options,
            phase: Phase::Ready,
            kind,
        })
    }

    /// The validated options of this pass.
    #[must_use]
    pub fn options(&self) -> SaveOptions {
        self.options
    }

    /// Writes a whole document.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Write`] if the sink fails or rejects a chunk, or
    /// if this context has already written.
    pub fn save_document(&mut self, doc: &Document) -> Result<(), SaveError> {
        let label = self.encoder.label().to_string();
        let options = self.options;
        self.run(|out| xml::write_document(out, doc, Some(&label), options))
    }

    /// Writes the subtree rooted at `node`.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Write`] if `node` is not part of `doc`, if the
    /// sink fails or rejects a chunk, or if this context has already written.
    pub fn save_tree(&mut self, doc: &Document, node: NodeId) -> Result<(), SaveError> {
        if !doc.contains(node) {
            self.phase = Phase::Failed;
            return Err(WriteError::InvalidNode(node).into());
        }
        let label = self.encoder.label().to_string();
        let options = self.options;
        self.run(|out| xml::write_subtree(out, doc, node, Some(&label), options))
    }

    fn run<F>(&mut self, format: F) -> Result<(), SaveError>
    where
        F: FnOnce(&mut ChunkWriter<'_, 'a>) -> fmt::Result,
    {
        if self.phase != Phase::Ready {
            return Err(WriteError::AlreadyWritten.into());
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(WriteError::AlreadyWritten.into());
        };
        let mut chunks = ChunkWriter::new(sink, &mut self.encoder);
        let result = match format(&mut chunks) {
            Ok(()) => chunks.flush(true),
            Err(fmt::Error) => Err(chunks.error.take().unwrap_or(WriteError::Format)),
        };
        let total = chunks.total;
        match result {
            Ok(()) => {
                self.phase = Phase::Written;
                debug!(target_kind = self.kind, bytes = total, "wrote save output");
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Failed;
                warn!(target_kind = self.kind, bytes = total, error = %e, "save write failed");
                Err(e.into())
            }
        }
    }

    /// Flushes and releases the sink, ending the pass.
    ///
    /// Memory sinks return their bytes in [`Output::Bytes`]. A context whose
    /// write failed can still be closed; its output is then partial.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Close`] if the final flush fails.
    pub fn close(mut self) -> Result<Output, SaveError> {
        match self.sink.take() {
            Some(sink) => sink.finish().map_err(|e| {
                warn!(target_kind = self.kind, error = %e, "failed to close save context");
                SaveError::Close(e)
            }),
            None => Ok(Output::Written),
        }
    }
}

impl Drop for SaveContext<'_> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            warn!(target_kind = self.kind, "save context dropped without close");
            if let Err(e) = sink.finish() {
                warn!(target_kind = self.kind, error = %e, "implicit close failed");
            }
        }
    }
}

impl fmt::Debug for SaveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveContext")
            .field("target", &self.kind)
            .field("encoder", &self.encoder)
            .field("options", &self.options)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Collects formatter output, encodes it, and hands it to the sink in chunks.
///
/// `fmt::Write` cannot carry an I/O error, so a sink failure is kept in
/// `error` and surfaced as `fmt::Error`; the caller takes it back out.
pub(crate) struct ChunkWriter<'c, 'a> {
    sink: &'c mut Sink<'a>,
    encoder: &'c mut OutputEncoder,
    pending: String,
    encoded: Vec<u8>,
    error: Option<WriteError>,
    total: usize,
}

impl<'c, 'a> ChunkWriter<'c, 'a> {
    fn new(sink: &'c mut Sink<'a>, encoder: &'c mut OutputEncoder) -> Self {
        Self {
            sink,
            encoder,
            pending: String::with_capacity(CHUNK_SIZE),
            encoded: Vec::with_capacity(CHUNK_SIZE),
            error: None,
            total: 0,
        }
    }

    fn flush(&mut self, last: bool) -> Result<(), WriteError> {
        self.encoded.clear();
        self.encoder.encode(&self.pending, &mut self.encoded, last);
        self.pending.clear();
        if !self.encoded.is_empty() {
            trace!(bytes = self.encoded.len(), "flushing chunk");
            self.total += self.sink.accept(&self.encoded)?;
        }
        Ok(())
    }
}

impl fmt::Write for ChunkWriter<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.pending.push_str(s);
        if self.pending.len() >= CHUNK_SIZE {
            if let Err(e) = self.flush(false) {
                self.error = Some(e);
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}

/// Saves a whole document: open, write, close.
///
/// # Errors
///
/// Returns the first failure of the pass. The sink is closed on every path.
///
/// # Examples
///
/// ```
/// use xmlsave::Document;
/// use xmlsave::serial::{save_document, SaveOptions, Target};
///
/// let doc = Document::new();
/// let out = save_document(Target::Memory, &doc, "UTF-8", SaveOptions::FORMAT).unwrap();
/// assert_eq!(out.into_bytes().unwrap(), b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
/// ```
pub fn save_document(
    target: Target<'_>,
    doc: &Document,
    encoding: &str,
    options: SaveOptions,
) -> Result<Output, SaveError> {
    save_with(target, encoding, options, available_options(), |ctx| {
        ctx.save_document(doc)
    })
}

/// Saves the subtree rooted at `node`: open, write, close.
///
/// # Errors
///
/// Returns the first failure of the pass. The sink is closed on every path.
pub fn save_subtree(
    target: Target<'_>,
    doc: &Document,
    node: NodeId,
    encoding: &str,
    options: SaveOptions,
) -> Result<Output, SaveError> {
    save_with(target, encoding, options, available_options(), |ctx| {
        ctx.save_tree(doc, node)
    })
}

/// Runs one pass with a caller-chosen write step and capability table.
///
/// # Errors
///
/// Returns the open error, else the write error, else the close error.
pub fn save_with<F>(
    target: Target<'_>,
    encoding: &str,
    options: SaveOptions,
    capabilities: &Capabilities,
    write: F,
) -> Result<Output, SaveError>
where
    F: FnOnce(&mut SaveContext<'_>) -> Result<(), SaveError>,
{
    let mut ctx = SaveContext::open_with(target, encoding, options, capabilities)?;
    let written = write(&mut ctx);
    let closed = ctx.close();
    match (written, closed) {
        (Err(e), _) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(output)) => Ok(output),
    }
}
