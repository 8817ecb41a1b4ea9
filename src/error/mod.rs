//! Error types for save passes.
//!
//! Every failure is reported with the stage it happened in, so a caller can
//! tell a target that never opened from a pass that wrote partial output or
//! a final flush that did not reach its destination. Nothing is retried.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::tree::NodeId;

/// The stage of a save pass at which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Handle resolution, before any sink is opened.
    Resolve,
    /// Opening the save context (options, encoding, target).
    Open,
    /// Running the formatter into the sink.
    Write,
    /// Flushing and releasing the sink.
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Open => write!(f, "open"),
            Self::Write => write!(f, "write"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Which kind of handle turned out to be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaleHandle {
    /// A document handle whose document has been freed.
    Document,
    /// A node handle whose document has been freed, or whose node id is not
    /// part of the document.
    Node,
}

impl fmt::Display for StaleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Node => write!(f, "node"),
        }
    }
}

/// The error type returned by save passes and host entry points.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The document or node reference no longer refers to a live object.
    #[error("stale {0} reference")]
    StaleReference(StaleHandle),

    /// The save context could not be opened.
    #[error("open failed: {0}")]
    Open(#[from] OpenError),

    /// The formatter or the sink failed while writing.
    #[error("write failed: {0}")]
    Write(#[from] WriteError),

    /// Writing succeeded but the final flush or close did not.
    #[error("close failed: {0}")]
    Close(#[source] io::Error),
}

impl SaveError {
    /// Returns the stage this error belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::StaleReference(_) => Stage::Resolve,
            Self::Open(_) => Stage::Open,
            Self::Write(_) => Stage::Write,
            Self::Close(_) => Stage::Close,
        }
    }
}

/// Failures while opening a save context. No sink output exists yet.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The target file could not be created.
    #[error("cannot open {}: {source}", path.display())]
    File {
        /// The path that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The encoding name was empty.
    #[error("empty encoding name")]
    EmptyEncoding,

    /// The encoding label is unknown or cannot be used for output.
    #[error("unsupported encoding `{0}`")]
    UnsupportedEncoding(String),

    /// The option set contains bits the engine does not provide.
    #[error("unsupported option bits {0:#x}")]
    UnsupportedOptions(u32),

    /// An option name is not in the capability table.
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    /// Two options that cannot be combined were both requested.
    #[error("options `{0}` and `{1}` cannot be combined")]
    ConflictingOptions(&'static str, &'static str),
}

/// Failures while the formatter runs.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A stream accepted fewer bytes than it was given.
    #[error("short write, expected {expected}, got {written}")]
    ShortWrite {
        /// Bytes handed to the stream.
        expected: usize,
        /// Bytes the stream reported as written.
        written: usize,
    },

    /// The sink reported an I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The subtree root is not a node of the document being saved.
    #[error("node {} is not part of the document", .0.into_raw())]
    InvalidNode(NodeId),

    /// The context has already run its single write.
    #[error("save context already written")]
    AlreadyWritten,

    /// The formatter failed without a sink error.
    #[error("formatter error")]
    Format,

    /// In-memory output was requested as text but is not valid UTF-8.
    #[error("output is not valid UTF-8")]
    NotUtf8,
}
