//! Local provider: workspaces stored on this device.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{BoxFuture, Provider, ProviderInitParams};
use crate::crdt::{BlobStore, CrdtWorkspace, blob_id};
use crate::error::{CollabError, Result};
use crate::meta_collection::WorkspaceMetaScope;
use crate::storage::WorkspaceStorage;
use crate::types::{LOCAL_PROVIDER_ID, WorkspaceMeta, WorkspaceMetaPatch, WorkspaceType};

/// Blob store writing into a [`WorkspaceStorage`] under one workspace id.
pub struct StorageBlobStore {
    storage: Arc<dyn WorkspaceStorage>,
    workspace_id: String,
}

impl StorageBlobStore {
    /// Create a blob store for `workspace_id`.
    pub fn new(storage: Arc<dyn WorkspaceStorage>, workspace_id: impl Into<String>) -> Self {
        Self {
            storage,
            workspace_id: workspace_id.into(),
        }
    }
}

impl BlobStore for StorageBlobStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move { self.storage.get_blob(&self.workspace_id, id) })
    }

    fn set<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let id = blob_id(data);
            self.storage.put_blob(&self.workspace_id, &id, data)?;
            Ok(id)
        })
    }
}

/// Provider that keeps workspaces in a local [`WorkspaceStorage`].
///
/// Document state is loaded into the live instance the first time it is
/// wrapped and written back as a full snapshot when it is closed or its
/// metadata changes.
pub struct LocalProvider {
    storage: Arc<dyn WorkspaceStorage>,
    workspaces: WorkspaceMetaScope,
    /// Instances currently wrapped by this provider
    open: RwLock<HashMap<String, Arc<CrdtWorkspace>>>,
}

impl LocalProvider {
    /// Create a local provider over `storage`.
    pub fn new(params: ProviderInitParams, storage: Arc<dyn WorkspaceStorage>) -> Self {
        Self {
            storage,
            workspaces: params.workspaces,
            open: RwLock::new(HashMap::new()),
        }
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn WorkspaceStorage> {
        &self.storage
    }

    fn open_instance(&self, id: &str) -> Option<Arc<CrdtWorkspace>> {
        self.open.read().unwrap().get(id).cloned()
    }

    fn attach(&self, workspace: &Arc<CrdtWorkspace>) {
        workspace.attach_blobs(Arc::new(StorageBlobStore::new(
            Arc::clone(&self.storage),
            workspace.room(),
        )));
        self.open
            .write()
            .unwrap()
            .insert(workspace.room().to_string(), Arc::clone(workspace));
    }

    fn save_snapshot(&self, workspace: &CrdtWorkspace) -> Result<()> {
        self.storage
            .save_doc(workspace.room(), &workspace.encode_state_as_update())
    }
}

impl Provider for LocalProvider {
    fn id(&self) -> &str {
        LOCAL_PROVIDER_ID
    }

    fn load_workspaces(&self) -> BoxFuture<'_, Result<Vec<WorkspaceMeta>>> {
        Box::pin(async move {
            let index = self.storage.load_index()?;
            log::debug!("[local] loaded {} workspaces", index.len());
            self.workspaces.sync_provider(LOCAL_PROVIDER_ID, index.clone());
            Ok(index)
        })
    }

    fn create_workspace_info<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<WorkspaceMeta>> {
        Box::pin(async move {
            let id = uuid::Uuid::new_v4().to_string();
            let mut info = WorkspaceMeta::new(id, "", LOCAL_PROVIDER_ID, WorkspaceType::Local);
            info.apply_patch(meta);
            Ok(info)
        })
    }

    fn create_workspace<'a>(
        &'a self,
        workspace: Arc<CrdtWorkspace>,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            workspace.apply_meta_patch(meta);

            let mut info = WorkspaceMeta::new(
                workspace.room(),
                workspace.name().unwrap_or_default(),
                LOCAL_PROVIDER_ID,
                WorkspaceType::Local,
            );
            info.avatar = workspace.avatar();

            self.save_snapshot(&workspace)?;
            self.storage.save_meta(&info)?;
            self.attach(&workspace);
            log::info!("[local] created workspace {} ({})", info.id, info.name);
            self.workspaces.add(info);
            Ok(())
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.storage.delete_workspace(id)?;
            self.open.write().unwrap().remove(id);
            self.workspaces.remove(id);
            log::info!("[local] deleted workspace {}", id);
            Ok(())
        })
    }

    fn close_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let closed = self.open.write().unwrap().remove(id);
            if let Some(workspace) = closed {
                self.save_snapshot(&workspace)?;
                log::debug!("[local] closed workspace {}", id);
            }
            Ok(())
        })
    }

    fn warp_workspace(
        &self,
        workspace: Arc<CrdtWorkspace>,
    ) -> BoxFuture<'_, Result<Arc<CrdtWorkspace>>> {
        Box::pin(async move {
            let room = workspace.room().to_string();
            if let Some(open) = self.open_instance(&room)
                && Arc::ptr_eq(&open, &workspace)
            {
                return Ok(workspace);
            }

            if let Some(state) = self.storage.load_doc(&room)? {
                workspace.apply_update(&state)?;
            }
            self.attach(&workspace);
            Ok(workspace)
        })
    }

    fn update_workspace_meta<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut info = self
                .storage
                .load_index()?
                .into_iter()
                .find(|m| m.id == id)
                .ok_or_else(|| CollabError::NotFound(id.to_string()))?;
            info.apply_patch(meta);
            self.storage.save_meta(&info)?;

            // The patched instance may not be the one held open here
            match self.open_instance(id) {
                Some(workspace) => {
                    workspace.apply_meta_patch(meta);
                    self.save_snapshot(&workspace)?;
                }
                None => {
                    if let Some(state) = self.storage.load_doc(id)? {
                        let stored = CrdtWorkspace::from_update(id, &state)?;
                        stored.apply_meta_patch(meta);
                        self.save_snapshot(&stored)?;
                    }
                }
            }
            self.workspaces.update(id, meta);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.open.write().unwrap().clear();
            self.storage.clear()?;
            self.workspaces.remove_provider(LOCAL_PROVIDER_ID);
            Ok(())
        })
    }
}
