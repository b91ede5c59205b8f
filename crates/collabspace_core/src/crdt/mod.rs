//! CRDT documents and their attachments.
//!
//! All conflict resolution is done by [yrs]; this module only wraps a
//! document with the workspace-level metadata and blob store the data center
//! needs.

mod blob;
mod workspace_doc;

pub use blob::{BlobStore, MemoryBlobStore, blob_id};
pub use workspace_doc::CrdtWorkspace;
