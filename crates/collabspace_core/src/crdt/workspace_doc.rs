//! Live CRDT document for one workspace.
//!
//! [`CrdtWorkspace`] wraps a yrs [`Doc`] keyed by the workspace id (its *room*).
//! The document carries a `meta` map holding the workspace name and avatar;
//! everything else in the document belongs to the editor and is never
//! inspected here.
//!
//! ```text
//! Y.Doc (room = workspace id)
//! ├── Y.Map "meta"
//! │   ├── "name"   → "Demo"
//! │   └── "avatar" → "<blob id>"
//! └── ... editor content
//! ```
//!
//! Providers attach a [`BlobStore`] when they wrap the workspace.

use std::sync::{Arc, RwLock};

use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, Map, MapRef, ReadTxn, StateVector, Transact, Update};

use super::blob::BlobStore;
use crate::error::{CollabError, Result};
use crate::types::WorkspaceMetaPatch;

/// The name of the Y.Map containing workspace metadata.
const META_MAP_NAME: &str = "meta";

const NAME_KEY: &str = "name";
const AVATAR_KEY: &str = "avatar";

/// A live, in-memory CRDT document for a workspace.
pub struct CrdtWorkspace {
    /// Workspace id this document belongs to
    room: String,

    /// The underlying yrs document
    doc: Doc,

    /// Reference to the meta map (cached for efficiency)
    meta: MapRef,

    /// Blob store attached by the owning provider
    blobs: RwLock<Option<Arc<dyn BlobStore>>>,
}

impl CrdtWorkspace {
    /// Create an empty document for the given workspace id.
    pub fn new(room: impl Into<String>) -> Self {
        let doc = Doc::new();
        let meta = doc.get_or_insert_map(META_MAP_NAME);

        Self {
            room: room.into(),
            doc,
            meta,
            blobs: RwLock::new(None),
        }
    }

    /// Create a document for `room` and load a portable update into it.
    pub fn from_update(room: impl Into<String>, update: &[u8]) -> Result<Self> {
        let workspace = Self::new(room);
        workspace.apply_update(update)?;
        Ok(workspace)
    }

    /// Workspace id of this document.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Get the underlying yrs document.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    // ==================== Metadata ====================

    fn get_meta(&self, key: &str) -> Option<String> {
        let txn = self.doc.transact();
        self.meta
            .get(&txn, key)
            .and_then(|v| v.cast::<String>().ok())
    }

    fn set_meta(&self, key: &str, value: &str) {
        if self.get_meta(key).as_deref() == Some(value) {
            return;
        }
        let mut txn = self.doc.transact_mut();
        self.meta.insert(&mut txn, key, value);
    }

    /// Workspace name stored in the document.
    pub fn name(&self) -> Option<String> {
        self.get_meta(NAME_KEY)
    }

    /// Set the workspace name. Writing the current value is a no-op.
    pub fn set_name(&self, name: &str) {
        self.set_meta(NAME_KEY, name);
    }

    /// Workspace avatar stored in the document.
    pub fn avatar(&self) -> Option<String> {
        self.get_meta(AVATAR_KEY)
    }

    /// Set the workspace avatar. Writing the current value is a no-op.
    pub fn set_avatar(&self, avatar: &str) {
        self.set_meta(AVATAR_KEY, avatar);
    }

    /// Write the non-empty fields of `patch` into the document.
    ///
    /// Returns the patch that was actually applied; empty strings are skipped.
    pub fn apply_meta_patch(&self, patch: &WorkspaceMetaPatch) -> WorkspaceMetaPatch {
        let mut applied = WorkspaceMetaPatch::default();
        if let Some(name) = patch.name.as_deref().filter(|n| !n.is_empty()) {
            self.set_name(name);
            applied.name = Some(name.to_string());
        }
        if let Some(avatar) = patch.avatar.as_deref().filter(|a| !a.is_empty()) {
            self.set_avatar(avatar);
            applied.avatar = Some(avatar.to_string());
        }
        applied
    }

    // ==================== Sync Operations ====================

    /// Current state vector of the document.
    pub fn state_vector(&self) -> StateVector {
        let txn = self.doc.transact();
        txn.state_vector()
    }

    /// Encode the current state vector for sync.
    pub fn encode_state_vector(&self) -> Vec<u8> {
        self.state_vector().encode_v1()
    }

    /// Encode the full document state as a portable update.
    pub fn encode_state_as_update(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Encode the changes a peer with `state_vector` is missing.
    pub fn encode_diff(&self, state_vector: &[u8]) -> Result<Vec<u8>> {
        let sv = StateVector::decode_v1(state_vector)
            .map_err(|e| CollabError::Crdt(format!("Failed to decode state vector: {}", e)))?;
        let txn = self.doc.transact();
        Ok(txn.encode_state_as_update_v1(&sv))
    }

    /// Apply a portable update produced by [`Self::encode_state_as_update`]
    /// or [`Self::encode_diff`].
    pub fn apply_update(&self, update: &[u8]) -> Result<()> {
        let update = Update::decode_v1(update)
            .map_err(|e| CollabError::Crdt(format!("Failed to decode update: {}", e)))?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(update)
            .map_err(|e| CollabError::Crdt(format!("Failed to apply update: {}", e)))?;
        Ok(())
    }

    // ==================== Blobs ====================

    /// Attach the blob store used for this workspace's attachments.
    pub fn attach_blobs(&self, store: Arc<dyn BlobStore>) {
        *self.blobs.write().unwrap() = Some(store);
    }

    /// The attached blob store, if any.
    pub fn blobs(&self) -> Option<Arc<dyn BlobStore>> {
        self.blobs.read().unwrap().clone()
    }
}

impl std::fmt::Debug for CrdtWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrdtWorkspace")
            .field("room", &self.room)
            .field("name", &self.name())
            .field("has_blobs", &self.blobs.read().unwrap().is_some())
            .finish()
    }
}
