//! In-memory storage implementation for testing.
//!
//! This provides a simple in-memory implementation of [`WorkspaceStorage`]
//! for use in unit tests and development.

use std::collections::HashMap;
use std::sync::RwLock;

use indexmap::IndexMap;

use super::WorkspaceStorage;
use crate::error::Result;
use crate::types::WorkspaceMeta;

/// In-memory workspace storage for testing.
///
/// It's thread-safe via `RwLock` but data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Document snapshots (id -> binary state)
    docs: RwLock<HashMap<String, Vec<u8>>>,

    /// Workspace index (id -> meta), in insertion order
    index: RwLock<IndexMap<String, WorkspaceMeta>>,

    /// Blobs ((workspace id, blob id) -> data)
    blobs: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStorage for MemoryStorage {
    fn load_doc(&self, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    fn save_doc(&self, id: &str, state: &[u8]) -> Result<()> {
        self.docs
            .write()
            .unwrap()
            .insert(id.to_string(), state.to_vec());
        Ok(())
    }

    fn delete_doc(&self, id: &str) -> Result<()> {
        self.docs.write().unwrap().remove(id);
        Ok(())
    }

    fn list_docs(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.docs.read().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn load_index(&self) -> Result<Vec<WorkspaceMeta>> {
        Ok(self.index.read().unwrap().values().cloned().collect())
    }

    fn save_meta(&self, meta: &WorkspaceMeta) -> Result<()> {
        self.index
            .write()
            .unwrap()
            .insert(meta.id.clone(), meta.clone());
        Ok(())
    }

    fn delete_meta(&self, id: &str) -> Result<()> {
        self.index.write().unwrap().shift_remove(id);
        Ok(())
    }

    fn get_blob(&self, workspace_id: &str, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let key = (workspace_id.to_string(), blob_id.to_string());
        Ok(self.blobs.read().unwrap().get(&key).cloned())
    }

    fn put_blob(&self, workspace_id: &str, blob_id: &str, data: &[u8]) -> Result<()> {
        let key = (workspace_id.to_string(), blob_id.to_string());
        self.blobs.write().unwrap().insert(key, data.to_vec());
        Ok(())
    }

    fn delete_blobs(&self, workspace_id: &str) -> Result<()> {
        self.blobs
            .write()
            .unwrap()
            .retain(|(ws, _), _| ws != workspace_id);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.docs.write().unwrap().clear();
        self.index.write().unwrap().clear();
        self.blobs.write().unwrap().clear();
        Ok(())
    }
}
