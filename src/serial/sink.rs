//! Output sinks.
//!
//! A save pass writes to one of three destinations: a file created at a
//! path, a host-provided stream, or a buffer owned by the pass. All three
//! sit behind one internal contract (`accept` a chunk, `finish` once), so
//! the save context drives them the same way.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{OpenError, WriteError};

/// Where a save pass writes.
pub enum Target<'a> {
    /// Create (or truncate) the file at this path.
    Path(&'a Path),
    /// Forward every chunk to a host stream. Each chunk must be accepted in
    /// full by a single `write` call; a short write fails the pass.
    Stream(&'a mut dyn Write),
    /// Collect the output in memory and return it from `close`.
    Memory,
}

impl Target<'_> {
    /// Short name of the sink kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Stream(_) => "stream",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// What a finished pass hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// The output went to a file or stream.
    Written,
    /// The bytes collected by a memory sink.
    Bytes(Vec<u8>),
}

impl Output {
    /// Returns the collected bytes of a memory sink.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Written => None,
        }
    }
}

pub(crate) enum Sink<'a> {
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
    Stream(&'a mut dyn Write),
    Memory(Vec<u8>),
}

impl<'a> Sink<'a> {
    /// Opens the destination. Only the file sink can fail here.
    pub(crate) fn open(target: Target<'a>) -> Result<Self, OpenError> {
        match target {
            Target::Path(path) => {
                let file = File::create(path).map_err(|source| OpenError::File {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::File {
                    path: path.to_path_buf(),
                    writer: BufWriter::new(file),
                })
            }
            Target::Stream(stream) => Ok(Self::Stream(stream)),
            Target::Memory => Ok(Self::Memory(Vec::new())),
        }
    }

    /// Accepts one chunk, all of it or nothing.
    pub(crate) fn accept(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        if bytes.is_empty() {
            return Ok(0);
        }
        match self {
            Self::File { writer, .. } => writer.write_all(bytes)?,
            Self::Stream(stream) => {
                let written = stream.write(bytes)?;
                if written != bytes.len() {
                    return Err(WriteError::ShortWrite {
                        expected: bytes.len(),
                        written,
                    });
                }
            }
            Self::Memory(buffer) => buffer.extend_from_slice(bytes),
        }
        Ok(bytes.len())
    }

    /// Flushes and releases the destination. Consumes the sink, so it runs
    /// at most once.
    pub(crate) fn finish(self) -> io::Result<Output> {
        match self {
            Self::File { path, writer } => {
                let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
                file.sync_all()?;
                tracing::trace!(path = %path.display(), "closing output file");
                drop(file);
                Ok(Output::Written)
            }
            Self::Stream(stream) => {
                stream.flush()?;
                Ok(Output::Written)
            }
            Self::Memory(buffer) => Ok(Output::Bytes(buffer)),
        }
    }
}
