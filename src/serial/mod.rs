//! XML serialization through save contexts.
//!
//! [`SaveContext`] drives one pass of the XML formatter into a file, a host
//! stream, or a memory buffer. Which option flags a pass may use is decided
//! by the engine version through the [`capability`] table.

pub mod capability;
pub mod options;
pub mod save;
pub mod sink;
pub mod xml;

pub use capability::{available_options, Capabilities, OptionInfo, Tier, ENGINE_VERSION};
pub use options::SaveOptions;
pub use save::{save_document, save_subtree, save_with, SaveContext, CHUNK_SIZE};
pub use sink::{Output, Target};
pub use xml::{serialize, serialize_with_options, OutputMode};
