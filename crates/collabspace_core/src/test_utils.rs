//! In-memory providers and transports shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::crdt::{CrdtWorkspace, MemoryBlobStore};
use crate::error::{CollabError, Result};
use crate::meta_collection::{WorkspaceMetaCollection, WorkspaceMetaScope};
use crate::provider::{BoxFuture, CloudApi, CloudWorkspace, Provider, ProviderInitParams};
use crate::types::{
    CLOUD_PROVIDER_ID, User, WorkspaceMeta, WorkspaceMetaPatch, WorkspaceType,
};

fn injected(op: &str) -> CollabError {
    CollabError::Remote {
        status: None,
        message: format!("injected failure in {op}"),
    }
}

/// Provider keeping documents in a map. Records every call and can be told
/// to fail specific operations.
pub struct StubProvider {
    id: String,
    workspaces: WorkspaceMetaScope,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    docs: RwLock<HashMap<String, Vec<u8>>>,
    next_id: AtomicUsize,
}

impl StubProvider {
    /// A provider editing a private collection.
    pub fn new(id: &str) -> Self {
        Self::with_params(
            id,
            ProviderInitParams {
                workspaces: WorkspaceMetaCollection::new().create_scope(),
                message_center: Default::default(),
            },
        )
    }

    /// A provider editing the collection behind `params`.
    pub fn with_params(id: &str, params: ProviderInitParams) -> Self {
        Self {
            id: id.to_string(),
            workspaces: params.workspaces,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            docs: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Make every later call to `op` fail.
    pub fn fail_on(&self, op: &str) {
        self.failing.lock().unwrap().insert(op.to_string());
    }

    /// Recorded calls as `op` or `op:id`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `op` was called.
    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    /// Stored document state of `id`.
    pub fn doc(&self, id: &str) -> Option<Vec<u8>> {
        self.docs.read().unwrap().get(id).cloned()
    }

    /// Metadata for a workspace owned by this provider.
    pub fn meta(&self, id: &str, name: &str) -> WorkspaceMeta {
        let workspace_type = if self.id == CLOUD_PROVIDER_ID {
            WorkspaceType::Cloud
        } else {
            WorkspaceType::Local
        };
        WorkspaceMeta::new(id, name, self.id.clone(), workspace_type)
    }

    fn record(&self, op: &str, id: Option<&str>) -> Result<()> {
        let entry = match id {
            Some(id) => format!("{op}:{id}"),
            None => op.to_string(),
        };
        self.calls.lock().unwrap().push(entry);
        if self.failing.lock().unwrap().contains(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

impl Provider for StubProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn auth(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("auth", None) })
    }

    fn logout(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("logout", None) })
    }

    fn load_workspaces(&self) -> BoxFuture<'_, Result<Vec<WorkspaceMeta>>> {
        Box::pin(async move {
            self.record("load_workspaces", None)?;
            Ok(self.workspaces.list(&self.id))
        })
    }

    fn create_workspace_info<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<WorkspaceMeta>> {
        Box::pin(async move {
            self.record("create_workspace_info", None)?;
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut info = self.meta(&format!("{}-{}", self.id, n), "");
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
            self.record("create_workspace", Some(workspace.room()))?;
            workspace.apply_meta_patch(meta);
            self.docs
                .write()
                .unwrap()
                .insert(workspace.room().to_string(), workspace.encode_state_as_update());
            let mut info = self.meta(workspace.room(), &workspace.name().unwrap_or_default());
            info.avatar = workspace.avatar();
            self.workspaces.add(info);
            Ok(())
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record("delete_workspace", Some(id))?;
            self.docs.write().unwrap().remove(id);
            self.workspaces.remove(id);
            Ok(())
        })
    }

    fn close_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.record("close_workspace", Some(id)) })
    }

    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record("leave_workspace", Some(id))?;
            self.workspaces.remove(id);
            Ok(())
        })
    }

    fn warp_workspace(
        &self,
        workspace: Arc<CrdtWorkspace>,
    ) -> BoxFuture<'_, Result<Arc<CrdtWorkspace>>> {
        Box::pin(async move {
            self.record("warp_workspace", Some(workspace.room()))?;
            if let Some(state) = self.doc(workspace.room()) {
                workspace.apply_update(&state)?;
            }
            if workspace.blobs().is_none() {
                workspace.attach_blobs(Arc::new(MemoryBlobStore::new()));
            }
            Ok(workspace)
        })
    }

    fn publish<'a>(&'a self, id: &'a str, is_publish: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record("publish", Some(id))?;
            self.workspaces.set_publish(id, is_publish);
            Ok(())
        })
    }

    fn invite<'a>(&'a self, id: &'a str, _email: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.record("invite", Some(id)) })
    }

    fn remove_member(&self, permission_id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.record("remove_member", Some(&permission_id.to_string())) })
    }

    fn get_user_info(&self) -> BoxFuture<'_, Result<Option<User>>> {
        Box::pin(async move {
            self.record("get_user_info", None)?;
            Ok(Some(User {
                id: format!("{}-user", self.id),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                avatar: None,
            }))
        })
    }

    fn get_user_by_email<'a>(
        &'a self,
        id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move {
            self.record("get_user_by_email", Some(id))?;
            Ok(Some(User {
                id: "found".to_string(),
                name: "Found".to_string(),
                email: email.to_string(),
                avatar: None,
            }))
        })
    }

    fn update_workspace_meta<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record("update_workspace_meta", Some(id))?;
            self.workspaces.update(id, meta);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record("clear", None)?;
            self.docs.write().unwrap().clear();
            self.workspaces.remove_provider(&self.id);
            Ok(())
        })
    }
}

/// In-memory stand-in for the remote workspace service.
#[derive(Default)]
pub struct MockCloudApi {
    token: RwLock<Option<String>>,
    workspaces: RwLock<Vec<CloudWorkspace>>,
    docs: RwLock<HashMap<String, Vec<u8>>>,
    blobs: RwLock<HashMap<(String, String), Vec<u8>>>,
    fetches: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockCloudApi {
    /// A service with a valid session.
    pub fn logged_in() -> Self {
        let api = Self::default();
        api.set_token(Some("session".to_string()));
        api
    }

    /// Add a workspace to the remote list.
    pub fn seed_workspace(&self, id: &str, name: &str, public: bool) {
        self.workspaces.write().unwrap().push(CloudWorkspace {
            id: id.to_string(),
            name: name.to_string(),
            avatar: None,
            public,
        });
    }

    /// Set the stored document of `id`.
    pub fn set_doc(&self, id: &str, state: Vec<u8>) {
        self.docs.write().unwrap().insert(id.to_string(), state);
    }

    /// The stored document of `id`.
    pub fn doc(&self, id: &str) -> Option<Vec<u8>> {
        self.docs.read().unwrap().get(id).cloned()
    }

    /// How many times a document was fetched.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Whether `id` is public.
    pub fn is_public(&self, id: &str) -> bool {
        self.workspaces
            .read()
            .unwrap()
            .iter()
            .any(|w| w.id == id && w.public)
    }

    fn authorized(&self) -> Result<()> {
        if self.has_token() {
            Ok(())
        } else {
            Err(CollabError::Unauthorized)
        }
    }
}

impl CloudApi for MockCloudApi {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    fn has_token(&self) -> bool {
        self.token.read().unwrap().is_some()
    }

    fn current_user(&self) -> BoxFuture<'_, Result<User>> {
        Box::pin(async move {
            self.authorized()?;
            Ok(User {
                id: "u1".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                avatar: None,
            })
        })
    }

    fn list_workspaces(&self) -> BoxFuture<'_, Result<Vec<CloudWorkspace>>> {
        Box::pin(async move {
            self.authorized()?;
            Ok(self.workspaces.read().unwrap().clone())
        })
    }

    fn create_workspace<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<CloudWorkspace>> {
        Box::pin(async move {
            self.authorized()?;
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let remote = CloudWorkspace {
                id: format!("remote-new-{n}"),
                name: meta.name.clone().unwrap_or_default(),
                avatar: meta.avatar.clone(),
                public: false,
            };
            self.workspaces.write().unwrap().push(remote.clone());
            Ok(remote)
        })
    }

    fn update_workspace<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.authorized()?;
            let mut workspaces = self.workspaces.write().unwrap();
            let remote = workspaces
                .iter_mut()
                .find(|w| w.id == id)
                .ok_or_else(|| CollabError::NotFound(id.to_string()))?;
            if let Some(name) = &meta.name {
                remote.name = name.clone();
            }
            if let Some(avatar) = &meta.avatar {
                remote.avatar = Some(avatar.clone());
            }
            Ok(())
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.authorized()?;
            self.workspaces.write().unwrap().retain(|w| w.id != id);
            self.docs.write().unwrap().remove(id);
            Ok(())
        })
    }

    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.authorized()?;
            self.workspaces.write().unwrap().retain(|w| w.id != id);
            Ok(())
        })
    }

    fn set_public<'a>(&'a self, id: &'a str, public: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.authorized()?;
            for remote in self.workspaces.write().unwrap().iter_mut() {
                if remote.id == id {
                    remote.public = public;
                }
            }
            Ok(())
        })
    }

    fn invite_member<'a>(&'a self, _id: &'a str, _email: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.authorized() })
    }

    fn remove_member(&self, _permission_id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.authorized() })
    }

    fn user_by_email<'a>(
        &'a self,
        _id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move {
            self.authorized()?;
            Ok((email == "alice@example.com").then(|| User {
                id: "u1".to_string(),
                name: "Alice".to_string(),
                email: email.to_string(),
                avatar: None,
            }))
        })
    }

    fn fetch_doc<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            self.authorized()?;
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.doc(id))
        })
    }

    fn push_doc<'a>(&'a self, id: &'a str, update: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.authorized()?;
            self.set_doc(id, update.to_vec());
            Ok(())
        })
    }

    fn get_blob<'a>(
        &'a self,
        id: &'a str,
        blob_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            self.authorized()?;
            Ok(self
                .blobs
                .read()
                .unwrap()
                .get(&(id.to_string(), blob_id.to_string()))
                .cloned())
        })
    }

    fn put_blob<'a>(&'a self, id: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.authorized()?;
            let blob = crate::crdt::blob_id(data);
            self.blobs
                .write()
                .unwrap()
                .insert((id.to_string(), blob.clone()), data.to_vec());
            Ok(blob)
        })
    }
}
