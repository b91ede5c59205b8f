//! Blob storage attached to a workspace.
//!
//! Blobs (images, attachments, avatars) are content addressed: the id of a
//! blob is the hex SHA-256 of its bytes, so storing the same content twice
//! yields the same id.

use std::collections::HashMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::provider::BoxFuture;

/// Compute the content-addressed id of a blob.
pub fn blob_id(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// A store for a workspace's binary attachments.
pub trait BlobStore: Send + Sync {
    /// Fetch a blob by id. Returns `None` if it doesn't exist.
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    /// Store a blob and return its id.
    fn set<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String>>;
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    /// True when no blob is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move { Ok(self.blobs.read().unwrap().get(id).cloned()) })
    }

    fn set<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let id = blob_id(data);
            self.blobs
                .write()
                .unwrap()
                .insert(id.clone(), data.to_vec());
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;

    #[test]
    fn test_blob_id_is_sha256() {
        assert_eq!(
            blob_id(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_memory_store_dedupes_content() {
        let store = MemoryBlobStore::new();
        let id1 = block_on(store.set(b"image bytes")).unwrap();
        let id2 = block_on(store.set(b"image bytes")).unwrap();

        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
        assert_eq!(
            block_on(store.get(&id1)).unwrap().as_deref(),
            Some(&b"image bytes"[..])
        );
        assert!(block_on(store.get("missing")).unwrap().is_none());
    }
}
