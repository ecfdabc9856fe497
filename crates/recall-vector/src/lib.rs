//! Flat exact-search vector index over whole documents.
//!
//! Typical flow:
//! 1) `VectorIndex::build` embeds every long-enough document in ordered batches
//! 2) `save` writes `vectors.bin` + `vectors.meta.json`; `load` cross-checks them
//! 3) an `IndexHandle` holds the serving copy and swaps in rebuilt ones
pub mod handle;
pub mod index;
pub mod persist;

pub use handle::IndexHandle;
pub use index::{SkippedDocument, VectorIndex};
pub use persist::{IndexMeta, META_FILE, VECTORS_FILE};
