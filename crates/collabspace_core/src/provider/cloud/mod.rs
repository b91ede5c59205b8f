//! Cloud provider: workspaces stored on the remote service.

mod api;
#[cfg(all(not(target_arch = "wasm32"), feature = "cloud-http"))]
mod http;

pub use api::{CloudApi, CloudWorkspace};
#[cfg(all(not(target_arch = "wasm32"), feature = "cloud-http"))]
pub use http::HttpCloudClient;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{BoxFuture, Provider, ProviderInitParams};
use crate::crdt::{BlobStore, CrdtWorkspace};
use crate::error::{CollabError, Result};
use crate::message::MessageCenter;
use crate::meta_collection::WorkspaceMetaScope;
use crate::types::{
    CLOUD_PROVIDER_ID, Message, MessageCode, User, WorkspaceMeta, WorkspaceMetaPatch,
    WorkspaceType,
};

impl From<CloudWorkspace> for WorkspaceMeta {
    fn from(remote: CloudWorkspace) -> Self {
        Self {
            id: remote.id,
            name: remote.name,
            avatar: remote.avatar,
            provider: CLOUD_PROVIDER_ID.to_string(),
            is_publish: remote.public,
            workspace_type: WorkspaceType::Cloud,
        }
    }
}

/// Blob store backed by the remote service.
pub struct CloudBlobStore {
    api: Arc<dyn CloudApi>,
    workspace_id: String,
}

impl CloudBlobStore {
    /// Create a blob store for `workspace_id`.
    pub fn new(api: Arc<dyn CloudApi>, workspace_id: impl Into<String>) -> Self {
        Self {
            api,
            workspace_id: workspace_id.into(),
        }
    }
}

impl BlobStore for CloudBlobStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        self.api.get_blob(&self.workspace_id, id)
    }

    fn set<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String>> {
        self.api.put_blob(&self.workspace_id, data)
    }
}

/// Provider that keeps workspaces on the remote service.
pub struct CloudProvider {
    api: Arc<dyn CloudApi>,
    workspaces: WorkspaceMetaScope,
    messages: Arc<MessageCenter>,
    user: RwLock<Option<User>>,
    /// Instances currently wrapped by this provider
    open: RwLock<HashMap<String, Arc<CrdtWorkspace>>>,
}

impl CloudProvider {
    /// Create a cloud provider using `api` as transport.
    pub fn new(params: ProviderInitParams, api: Arc<dyn CloudApi>) -> Self {
        Self {
            api,
            workspaces: params.workspaces,
            messages: params.message_center,
            user: RwLock::new(None),
            open: RwLock::new(HashMap::new()),
        }
    }

    /// The transport.
    pub fn api(&self) -> &Arc<dyn CloudApi> {
        &self.api
    }

    fn send(&self, code: MessageCode, message: impl Into<String>) {
        self.messages
            .send(Message::new(CLOUD_PROVIDER_ID, code, message));
    }

    /// Report `Unauthorized` through the message center before returning it.
    fn check_auth<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(CollabError::Unauthorized) = &result {
            self.send(MessageCode::LoginRequired, "Login to the cloud to continue");
        }
        result
    }

    fn open_instance(&self, id: &str) -> Option<Arc<CrdtWorkspace>> {
        self.open.read().unwrap().get(id).cloned()
    }

    fn attach(&self, workspace: &Arc<CrdtWorkspace>) {
        workspace.attach_blobs(Arc::new(CloudBlobStore::new(
            Arc::clone(&self.api),
            workspace.room(),
        )));
        self.open
            .write()
            .unwrap()
            .insert(workspace.room().to_string(), Arc::clone(workspace));
    }
}

impl Provider for CloudProvider {
    fn id(&self) -> &str {
        CLOUD_PROVIDER_ID
    }

    fn auth(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let user = self.check_auth(self.api.current_user().await)?;
            log::info!("[cloud] logged in as {}", user.email);
            self.send(MessageCode::LoginSucceeded, format!("Logged in as {}", user.email));
            *self.user.write().unwrap() = Some(user);
            Ok(())
        })
    }

    fn logout(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            // Upload open documents while the token is still valid
            let open: Vec<Arc<CrdtWorkspace>> =
                self.open.write().unwrap().drain().map(|(_, ws)| ws).collect();
            for workspace in open {
                let state = workspace.encode_state_as_update();
                if let Err(e) = self.api.push_doc(workspace.room(), &state).await {
                    log::warn!("[cloud] failed to sync {} on logout: {}", workspace.room(), e);
                    self.send(
                        MessageCode::SyncFailed,
                        format!("Failed to sync workspace {}: {}", workspace.room(), e),
                    );
                }
            }

            self.api.set_token(None);
            *self.user.write().unwrap() = None;
            let removed = self.workspaces.remove_provider(CLOUD_PROVIDER_ID);
            log::info!("[cloud] logged out, dropped {} workspaces", removed);
            self.send(MessageCode::LoggedOut, "Logged out");
            Ok(())
        })
    }

    fn load_workspaces(&self) -> BoxFuture<'_, Result<Vec<WorkspaceMeta>>> {
        Box::pin(async move {
            let remote = self.check_auth(self.api.list_workspaces().await)?;
            let metas: Vec<WorkspaceMeta> = remote.into_iter().map(WorkspaceMeta::from).collect();
            log::debug!("[cloud] loaded {} workspaces", metas.len());
            self.workspaces.sync_provider(CLOUD_PROVIDER_ID, metas.clone());
            self.send(
                MessageCode::WorkspacesLoaded,
                format!("{} cloud workspaces", metas.len()),
            );
            Ok(metas)
        })
    }

    fn create_workspace_info<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<WorkspaceMeta>> {
        Box::pin(async move {
            let remote = self.check_auth(self.api.create_workspace(meta).await)?;
            Ok(WorkspaceMeta::from(remote))
        })
    }

    fn create_workspace<'a>(
        &'a self,
        workspace: Arc<CrdtWorkspace>,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            workspace.apply_meta_patch(meta);
            let state = workspace.encode_state_as_update();
            self.check_auth(self.api.push_doc(workspace.room(), &state).await)?;

            let mut info = WorkspaceMeta::new(
                workspace.room(),
                workspace.name().unwrap_or_default(),
                CLOUD_PROVIDER_ID,
                WorkspaceType::Cloud,
            );
            info.avatar = workspace.avatar();
            self.attach(&workspace);
            log::info!("[cloud] created workspace {} ({})", info.id, info.name);
            self.workspaces.add(info);
            Ok(())
        })
    }

    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_auth(self.api.delete_workspace(id).await)?;
            self.open.write().unwrap().remove(id);
            self.workspaces.remove(id);
            log::info!("[cloud] deleted workspace {}", id);
            Ok(())
        })
    }

    fn close_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let closed = self.open.write().unwrap().remove(id);
            if let Some(workspace) = closed {
                let state = workspace.encode_state_as_update();
                if let Err(e) = self.api.push_doc(id, &state).await {
                    self.send(
                        MessageCode::SyncFailed,
                        format!("Failed to sync workspace {}: {}", id, e),
                    );
                    return Err(e);
                }
                log::debug!("[cloud] closed workspace {}", id);
            }
            Ok(())
        })
    }

    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_auth(self.api.leave_workspace(id).await)?;
            self.open.write().unwrap().remove(id);
            self.workspaces.remove(id);
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

            if let Some(state) = self.check_auth(self.api.fetch_doc(&room).await)? {
                workspace.apply_update(&state)?;
            }
            self.attach(&workspace);
            Ok(workspace)
        })
    }

    fn publish<'a>(&'a self, id: &'a str, is_publish: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_auth(self.api.set_public(id, is_publish).await)?;
            self.workspaces.set_publish(id, is_publish);
            Ok(())
        })
    }

    fn invite<'a>(&'a self, id: &'a str, email: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.check_auth(self.api.invite_member(id, email).await) })
    }

    fn remove_member(&self, permission_id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.check_auth(self.api.remove_member(permission_id).await) })
    }

    fn get_user_info(&self) -> BoxFuture<'_, Result<Option<User>>> {
        Box::pin(async move {
            let cached = self.user.read().unwrap().clone();
            if cached.is_some() {
                return Ok(cached);
            }
            if !self.api.has_token() {
                return Ok(None);
            }
            let user = self.check_auth(self.api.current_user().await)?;
            *self.user.write().unwrap() = Some(user.clone());
            Ok(Some(user))
        })
    }

    fn get_user_by_email<'a>(
        &'a self,
        id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move { self.check_auth(self.api.user_by_email(id, email).await) })
    }

    fn update_workspace_meta<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_auth(self.api.update_workspace(id, meta).await)?;
            self.workspaces.update(id, meta);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.open.write().unwrap().clear();
            self.workspaces.remove_provider(CLOUD_PROVIDER_ID);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_collection::WorkspaceMetaCollection;
    use crate::test_utils::MockCloudApi;
    use futures_lite::future::block_on;
    use std::sync::Mutex;

    struct Setup {
        collection: WorkspaceMetaCollection,
        api: Arc<MockCloudApi>,
        provider: CloudProvider,
        messages: Arc<Mutex<Vec<Message>>>,
    }

    fn setup() -> Setup {
        let collection = WorkspaceMetaCollection::new();
        let center = Arc::new(MessageCenter::new());
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        center.on_message(move |m| sink.lock().unwrap().push(m.clone()));

        let api = Arc::new(MockCloudApi::logged_in());
        let provider = CloudProvider::new(
            ProviderInitParams {
                workspaces: collection.create_scope(),
                message_center: center,
            },
            api.clone(),
        );
        Setup {
            collection,
            api,
            provider,
            messages,
        }
    }

    #[test]
    fn test_auth_caches_user() {
        let s = setup();
        block_on(s.provider.auth()).unwrap();

        let user = block_on(s.provider.get_user_info()).unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(
            s.messages.lock().unwrap()[0].code,
            MessageCode::LoginSucceeded
        );
    }

    #[test]
    fn test_auth_without_token_requests_login() {
        let s = setup();
        s.api.set_token(None);

        let err = block_on(s.provider.auth()).unwrap_err();
        assert!(matches!(err, CollabError::Unauthorized));
        assert_eq!(
            s.messages.lock().unwrap()[0].code,
            MessageCode::LoginRequired
        );
        assert!(block_on(s.provider.get_user_info()).unwrap().is_none());
    }

    #[test]
    fn test_load_workspaces_syncs_collection() {
        let s = setup();
        s.api.seed_workspace("remote-1", "Shared", true);

        let loaded = block_on(s.provider.load_workspaces()).unwrap();
        assert_eq!(loaded.len(), 1);

        let meta = s.collection.find("remote-1").unwrap();
        assert_eq!(meta.provider, CLOUD_PROVIDER_ID);
        assert_eq!(meta.workspace_type, WorkspaceType::Cloud);
        assert!(meta.is_publish);
    }

    #[test]
    fn test_create_pushes_state() {
        let s = setup();
        let patch = WorkspaceMetaPatch::named("Cloudy");
        let info = block_on(s.provider.create_workspace_info(&patch)).unwrap();
        let workspace = Arc::new(CrdtWorkspace::new(info.id.clone()));
        block_on(s.provider.create_workspace(workspace.clone(), &patch)).unwrap();

        let pushed = s.api.doc(&info.id).unwrap();
        let copy = CrdtWorkspace::from_update("check", &pushed).unwrap();
        assert_eq!(copy.name().as_deref(), Some("Cloudy"));
        assert_eq!(s.collection.find(&info.id).unwrap().name, "Cloudy");
    }

    #[test]
    fn test_warp_fetches_remote_doc_once() {
        let s = setup();
        let remote = CrdtWorkspace::new("remote-1");
        remote.set_name("From server");
        s.api.seed_workspace("remote-1", "From server", false);
        s.api.set_doc("remote-1", remote.encode_state_as_update());

        let workspace = Arc::new(CrdtWorkspace::new("remote-1"));
        block_on(s.provider.warp_workspace(workspace.clone())).unwrap();
        block_on(s.provider.warp_workspace(workspace.clone())).unwrap();

        assert_eq!(workspace.name().as_deref(), Some("From server"));
        assert_eq!(s.api.fetch_count(), 1);
        assert!(workspace.blobs().is_some());
    }

    #[test]
    fn test_publish_updates_collection() {
        let s = setup();
        s.api.seed_workspace("remote-1", "Shared", false);
        block_on(s.provider.load_workspaces()).unwrap();

        block_on(s.provider.publish("remote-1", true)).unwrap();
        assert!(s.collection.find("remote-1").unwrap().is_publish);
        assert!(s.api.is_public("remote-1"));
    }

    #[test]
    fn test_logout_drops_cloud_entries() {
        let s = setup();
        s.api.seed_workspace("remote-1", "Shared", false);
        block_on(s.provider.load_workspaces()).unwrap();

        block_on(s.provider.logout()).unwrap();

        assert!(s.collection.is_empty());
        assert!(!s.api.has_token());
    }

    #[test]
    fn test_logout_uploads_open_documents() {
        let s = setup();
        let patch = WorkspaceMetaPatch::named("Cloudy");
        let info = block_on(s.provider.create_workspace_info(&patch)).unwrap();
        let workspace = Arc::new(CrdtWorkspace::new(info.id.clone()));
        block_on(s.provider.create_workspace(workspace.clone(), &patch)).unwrap();
        workspace.set_avatar("edited-after-open");

        block_on(s.provider.logout()).unwrap();

        let remote = CrdtWorkspace::from_update("check", &s.api.doc(&info.id).unwrap()).unwrap();
        assert_eq!(remote.avatar().as_deref(), Some("edited-after-open"));
        assert!(!s.api.has_token());
    }

    #[test]
    fn test_leave_removes_entry() {
        let s = setup();
        s.api.seed_workspace("remote-1", "Shared", false);
        block_on(s.provider.load_workspaces()).unwrap();

        block_on(s.provider.leave_workspace("remote-1")).unwrap();
        assert!(s.collection.find("remote-1").is_none());
    }
}
