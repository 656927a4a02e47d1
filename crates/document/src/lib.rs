//! Documents built on the text kernel: edit variants and their transformer,
//! eager, lazy and hollow materializations, and content storage.

/// Batch application of edits.
pub mod batch;
/// Content-addressed blob storage.
pub mod blob_store;
/// Edit application policy.
pub mod config;
/// Error types for document editing.
pub mod error;
/// Document materializations.
pub mod file_data;
/// Document-level edit operations.
pub mod operation;

pub use batch::{BatchOutcome, apply_batch};
pub use blob_store::{Blob, BlobStore, MemoryBlobStore, content_hash};
pub use config::{ApplyMode, EditConfig};
pub use error::{DocumentError, Result};
pub use file_data::{FileData, HollowStringFileData, LazyStringFileData, StoredHashes};
pub use operation::{DocumentEdit, EditOperation, transform};
