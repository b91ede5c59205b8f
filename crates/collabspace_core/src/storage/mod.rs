//! Storage abstraction for the local provider.
//!
//! This module defines the [`WorkspaceStorage`] trait which abstracts over
//! different storage backends (SQLite, in-memory) for persisting what the
//! local provider owns: the workspace index, one CRDT snapshot per workspace,
//! and the workspace blobs.

mod memory;
#[cfg(all(not(target_arch = "wasm32"), feature = "local-sqlite"))]
mod sqlite;

pub use memory::MemoryStorage;
#[cfg(all(not(target_arch = "wasm32"), feature = "local-sqlite"))]
pub use sqlite::SqliteStorage;

use crate::error::Result;
use crate::types::WorkspaceMeta;

/// Trait for local workspace storage backends.
///
/// # Storage Model
///
/// 1. **Index**: one [`WorkspaceMeta`] row per workspace, in creation order
/// 2. **Documents**: the full CRDT state of each workspace, keyed by id
/// 3. **Blobs**: content-addressed binary data, scoped per workspace
pub trait WorkspaceStorage: Send + Sync {
    /// Load the full document state of a workspace.
    ///
    /// Returns `None` if the document doesn't exist.
    fn load_doc(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// Save the full document state, overwriting any existing state.
    fn save_doc(&self, id: &str, state: &[u8]) -> Result<()>;

    /// Delete a document.
    fn delete_doc(&self, id: &str) -> Result<()>;

    /// List the ids of all stored documents.
    fn list_docs(&self) -> Result<Vec<String>>;

    /// Load the workspace index in creation order.
    fn load_index(&self) -> Result<Vec<WorkspaceMeta>>;

    /// Insert or replace an index entry. Replacing keeps the original position.
    fn save_meta(&self, meta: &WorkspaceMeta) -> Result<()>;

    /// Remove an index entry.
    fn delete_meta(&self, id: &str) -> Result<()>;

    /// Fetch a blob of a workspace.
    fn get_blob(&self, workspace_id: &str, blob_id: &str) -> Result<Option<Vec<u8>>>;

    /// Store a blob of a workspace.
    fn put_blob(&self, workspace_id: &str, blob_id: &str, data: &[u8]) -> Result<()>;

    /// Delete every blob of a workspace.
    fn delete_blobs(&self, workspace_id: &str) -> Result<()>;

    /// Delete a workspace's blobs, index entry and document.
    ///
    /// The document goes last, so a failure part way through never leaves
    /// an indexed workspace without its state.
    fn delete_workspace(&self, id: &str) -> Result<()> {
        self.delete_blobs(id)?;
        self.delete_meta(id)?;
        self.delete_doc(id)
    }

    /// Delete everything.
    fn clear(&self) -> Result<()>;
}
