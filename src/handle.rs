//! Generation-checked document handles.
//!
//! Hosts never hold a `&Document`. They hold a [`DocHandle`] or
//! [`NodeHandle`]: a slot index plus the generation the slot had when the
//! handle was issued. Freeing a document bumps the slot's generation, so
//! every outstanding handle into it stops resolving and yields
//! [`SaveError::StaleReference`] instead of touching freed memory.

use crate::error::{SaveError, StaleHandle};
use crate::tree::{Document, NodeId};

/// Generation 0 is never issued, so a raw handle of 0 names no document.
const FIRST_GENERATION: u32 = 1;

/// A handle to a document owned by a [`DocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocHandle {
    index: u32,
    generation: u32,
}

impl DocHandle {
    /// Packs the handle into a `u64` for hosts that only carry integers.
    #[must_use]
    pub fn into_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Unpacks a handle produced by [`into_raw`](Self::into_raw). Any other
    /// value unpacks to a handle that never resolves.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

/// A handle to one node of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    /// The document the node belongs to.
    pub doc: DocHandle,
    /// The node within that document.
    pub node: NodeId,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    doc: Option<Document>,
}

/// Owns documents on behalf of a host and hands out checked handles.
#[derive(Debug, Default)]
pub struct DocumentStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `doc` and returns a handle to it.
    ///
    /// # Panics
    ///
    /// Panics if the store already holds `u32::MAX` slots.
    #[allow(clippy::expect_used)]
    pub fn insert(&mut self, doc: Document) -> DocHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.doc = Some(doc);
            return DocHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("document store is full");
        self.slots.push(Slot {
            generation: FIRST_GENERATION,
            doc: Some(doc),
        });
        DocHandle {
            index,
            generation: FIRST_GENERATION,
        }
    }

    /// Frees the document behind `handle` and returns it.
    ///
    /// Every handle to it, and to any of its nodes, becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::StaleReference`] if the handle is already stale.
    pub fn remove(&mut self, handle: DocHandle) -> Result<Document, SaveError> {
        let slot = self
            .slot_mut(handle)
            .ok_or(SaveError::StaleReference(StaleHandle::Document))?;
        let doc = slot
            .doc
            .take()
            .ok_or(SaveError::StaleReference(StaleHandle::Document))?;
        slot.generation = slot.generation.checked_add(1).unwrap_or(FIRST_GENERATION);
        self.free.push(handle.index);
        tracing::trace!(index = handle.index, "freed document");
        Ok(doc)
    }

    /// Resolves a document handle.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::StaleReference`] if the document has been freed.
    pub fn document(&self, handle: DocHandle) -> Result<&Document, SaveError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.doc.as_ref())
            .ok_or(SaveError::StaleReference(StaleHandle::Document))
    }

    /// Resolves a document handle for construction.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::StaleReference`] if the document has been freed.
    pub fn document_mut(&mut self, handle: DocHandle) -> Result<&mut Document, SaveError> {
        self.slot_mut(handle)
            .and_then(|slot| slot.doc.as_mut())
            .ok_or(SaveError::StaleReference(StaleHandle::Document))
    }

    /// Issues a node handle after checking that `node` belongs to the document.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::StaleReference`] if the document is freed or the
    /// node is not in it.
    pub fn node(&self, doc: DocHandle, node: NodeId) -> Result<NodeHandle, SaveError> {
        let handle = NodeHandle { doc, node };
        self.resolve_node(handle)?;
        Ok(handle)
    }

    /// Resolves a node handle to its document and node id.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::StaleReference`] if the document is freed or the
    /// node is not in it.
    pub fn resolve_node(&self, handle: NodeHandle) -> Result<(&Document, NodeId), SaveError> {
        let doc = self
            .document(handle.doc)
            .map_err(|_| SaveError::StaleReference(StaleHandle::Node))?;
        if doc.contains(handle.node) {
            Ok((doc, handle.node))
        } else {
            Err(SaveError::StaleReference(StaleHandle::Node))
        }
    }

    /// Number of live documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no document is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, handle: DocHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }
}
