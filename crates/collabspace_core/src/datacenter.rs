//! Workspace orchestration across providers.
//!
//! [`DataCenter`] is the entry point for every workspace operation. It owns
//! the provider registry, the workspace metadata collection, the message
//! center and the cache of live document instances, and routes each call to
//! the provider recorded in the workspace's metadata.
//!
//! # Error policy
//!
//! Most operations fail fast: an unknown workspace id is `NotFound` before
//! any provider is contacted, and an unregistered provider is
//! `ProviderUnavailable`. A few operations (leave, publish, invite, member
//! removal, user lookup by email and the provider notification of a
//! metadata update) instead log a warning and succeed when the provider is
//! missing.
//!
//! # Example
//!
//! ```ignore
//! use collabspace_core::{DataCenter, Config, WorkspaceMetaPatch};
//!
//! let data_center = DataCenter::init(&Config::load()?)?;
//! data_center.refresh_workspaces().await;
//!
//! let workspace = data_center.create_workspace(&WorkspaceMetaPatch::named("Notes")).await?;
//! let loaded = data_center.load_workspace(workspace.room()).await?;
//! ```

use std::sync::{Arc, RwLock};

use futures_util::future::join_all;

use crate::cache::WorkspaceCache;
use crate::crdt::CrdtWorkspace;
use crate::error::{CollabError, Result};
use crate::events::SubscriptionId;
use crate::message::MessageCenter;
use crate::meta_collection::{WorkspaceMetaChangeEvent, WorkspaceMetaCollection};
use crate::provider::{Provider, ProviderInitParams, ProviderRegistry};
use crate::types::{CLOUD_PROVIDER_ID, Message, User, WorkspaceMeta, WorkspaceMetaPatch};

/// Orchestrates workspaces across registered providers.
#[derive(Default)]
pub struct DataCenter {
    workspaces: WorkspaceMetaCollection,
    registry: RwLock<ProviderRegistry>,
    message_center: Arc<MessageCenter>,
    cache: WorkspaceCache,
}

impl DataCenter {
    /// Create a data center with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a data center with the local provider and, when a server URL is
    /// configured, the cloud provider. Local is registered first and becomes main.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn init(config: &crate::config::Config) -> Result<Self> {
        use crate::provider::LocalProvider;
        use crate::storage::WorkspaceStorage;

        let data_center = Self::new();

        #[cfg(feature = "local-sqlite")]
        let storage: Arc<dyn WorkspaceStorage> =
            Arc::new(crate::storage::SqliteStorage::open(&config.local_db_path)?);
        #[cfg(not(feature = "local-sqlite"))]
        let storage: Arc<dyn WorkspaceStorage> = Arc::new(crate::storage::MemoryStorage::new());

        data_center.register_provider(Arc::new(LocalProvider::new(
            data_center.init_params(),
            storage,
        )))?;
        data_center.register_cloud(config)?;
        Ok(data_center)
    }

    #[cfg(all(not(target_arch = "wasm32"), feature = "cloud-http"))]
    fn register_cloud(&self, config: &crate::config::Config) -> Result<()> {
        use crate::provider::{CloudProvider, HttpCloudClient};

        let Some(url) = &config.cloud_server_url else {
            log::debug!("No cloud server configured");
            return Ok(());
        };
        let api = Arc::new(HttpCloudClient::new(
            url.clone(),
            config.cloud_session_token.clone(),
        ));
        self.register_provider(Arc::new(CloudProvider::new(self.init_params(), api)))
    }

    #[cfg(all(not(target_arch = "wasm32"), not(feature = "cloud-http")))]
    fn register_cloud(&self, _config: &crate::config::Config) -> Result<()> {
        Ok(())
    }

    // ==================== Providers ====================

    /// Handles a provider needs at construction: a scope onto this data
    /// center's metadata collection and its message center.
    pub fn init_params(&self) -> ProviderInitParams {
        ProviderInitParams {
            workspaces: self.workspaces.create_scope(),
            message_center: Arc::clone(&self.message_center),
        }
    }

    /// Register a provider. The first one registered becomes main.
    pub fn register_provider(&self, provider: Arc<dyn Provider>) -> Result<()> {
        let id = provider.id().to_string();
        if self.provider(&id).is_some() {
            return Err(CollabError::DuplicateProvider(id));
        }
        provider.init()?;
        self.registry.write().unwrap().register(provider)?;
        log::info!("Registered provider '{}'", id);
        Ok(())
    }

    /// Make `id` the provider new workspaces are created on.
    pub fn set_main_provider(&self, id: &str) -> Result<()> {
        self.registry.write().unwrap().set_main(id)
    }

    /// Id of the main provider.
    pub fn main_provider_id(&self) -> Option<String> {
        self.registry.read().unwrap().main_id().map(str::to_string)
    }

    /// Registered providers in registration order.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.registry.read().unwrap().providers()
    }

    fn provider(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.registry.read().unwrap().get(id)
    }

    fn require_provider(&self, id: &str) -> Result<Arc<dyn Provider>> {
        self.registry.read().unwrap().require(id)
    }

    fn main_provider(&self) -> Result<Arc<dyn Provider>> {
        self.registry
            .read()
            .unwrap()
            .main()
            .ok_or(CollabError::NoMainProvider)
    }

    /// Resolve a workspace's metadata, failing with `NotFound`.
    fn meta(&self, id: &str) -> Result<WorkspaceMeta> {
        self.workspaces
            .find(id)
            .ok_or_else(|| CollabError::NotFound(id.to_string()))
    }

    // ==================== Collection ====================

    /// The workspace metadata collection.
    pub fn workspaces(&self) -> &WorkspaceMetaCollection {
        &self.workspaces
    }

    /// Live document instances.
    pub fn cache(&self) -> &WorkspaceCache {
        &self.cache
    }

    /// The message center providers report through.
    pub fn message_center(&self) -> &Arc<MessageCenter> {
        &self.message_center
    }

    /// Reload every provider's workspace list concurrently.
    ///
    /// Waits for all providers; one failing doesn't stop the others.
    /// Returns each provider's outcome in registration order.
    pub async fn refresh_workspaces(&self) -> Vec<(String, Result<Vec<WorkspaceMeta>>)> {
        let providers = self.providers();
        let results = join_all(providers.iter().map(|p| p.load_workspaces())).await;

        providers
            .iter()
            .map(|p| p.id().to_string())
            .zip(results)
            .inspect(|(id, result)| {
                if let Err(e) = result {
                    log::warn!("Failed to load workspaces from '{}': {}", id, e);
                }
            })
            .collect()
    }

    /// Subscribe to workspace list changes.
    pub fn on_workspaces_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&WorkspaceMetaChangeEvent) + Send + Sync + 'static,
    {
        self.workspaces.on_change(callback)
    }

    /// Remove a workspace list subscription.
    pub fn off_workspaces_change(&self, id: SubscriptionId) -> bool {
        self.workspaces.off_change(id)
    }

    // ==================== Workspace lifecycle ====================

    /// Create a workspace on the main provider.
    pub async fn create_workspace(&self, meta: &WorkspaceMetaPatch) -> Result<Arc<CrdtWorkspace>> {
        let provider = self.main_provider()?;
        let info = provider.create_workspace_info(meta).await?;
        log::info!("Creating {} workspace {}", provider.id(), info.id);

        let workspace = Arc::new(CrdtWorkspace::new(info.id));
        provider
            .create_workspace(Arc::clone(&workspace), meta)
            .await?;
        Ok(workspace)
    }

    /// Delete a workspace from its provider and drop its live instance.
    pub async fn delete_workspace(&self, id: &str) -> Result<()> {
        let meta = self.meta(id)?;
        let provider = self.require_provider(&meta.provider)?;
        provider.delete_workspace(id).await?;
        self.cache.evict(id);
        Ok(())
    }

    /// Open a workspace and return its live instance.
    ///
    /// Repeated loads return the same instance; each load takes a handle that
    /// [`close_workspace`](Self::close_workspace) releases.
    pub async fn load_workspace(&self, id: &str) -> Result<Arc<CrdtWorkspace>> {
        let meta = self.meta(id)?;
        let provider = self.require_provider(&meta.provider)?;

        if let Some(opener) = self.cache.provider_of(id)
            && opener != meta.provider
            && let Some(previous) = self.provider(&opener)
        {
            log::debug!("Closing {} in '{}' before reopening", id, opener);
            previous.close_workspace(id).await?;
        }

        log::debug!("Loading {} workspace {}", meta.provider, id);
        let workspace = self
            .cache
            .acquire(id, &meta.provider, || Arc::new(CrdtWorkspace::new(id)));
        match provider.warp_workspace(workspace).await {
            Ok(workspace) => Ok(workspace),
            Err(e) => {
                self.cache.release(id);
                Err(e)
            }
        }
    }

    /// Release one handle taken by [`load_workspace`](Self::load_workspace).
    ///
    /// When the last handle goes, the owning provider closes the workspace and
    /// the instance is dropped from the cache. Unknown ids are ignored.
    pub async fn close_workspace(&self, id: &str) -> Result<()> {
        let Some(opener) = self.cache.provider_of(id) else {
            return Ok(());
        };
        if !self.cache.release(id) {
            return Ok(());
        }
        match self.provider(&opener) {
            Some(provider) => provider.close_workspace(id).await,
            None => {
                log::warn!("Provider '{}' for workspace {} is gone", opener, id);
                Ok(())
            }
        }
    }

    // ==================== Auth ====================

    /// Authenticate with a provider (default: cloud), then reload its
    /// workspace list. A failed reload is logged, not returned.
    pub async fn login(&self, provider_id: Option<&str>) -> Result<()> {
        let provider = self.require_provider(provider_id.unwrap_or(CLOUD_PROVIDER_ID))?;
        provider.auth().await?;
        if let Err(e) = provider.load_workspaces().await {
            log::warn!(
                "Logged in to '{}' but loading workspaces failed: {}",
                provider.id(),
                e
            );
        }
        Ok(())
    }

    /// Drop a provider's credentials (default: cloud).
    pub async fn logout(&self, provider_id: Option<&str>) -> Result<()> {
        let provider = self.require_provider(provider_id.unwrap_or(CLOUD_PROVIDER_ID))?;
        provider.logout().await?;
        let evicted = self.cache.evict_provider(provider.id());
        if !evicted.is_empty() {
            log::debug!("Dropped {} open workspaces on logout", evicted.len());
        }
        Ok(())
    }

    /// The user a provider is authenticated as (default: cloud).
    pub async fn get_user_info(&self, provider_id: Option<&str>) -> Result<Option<User>> {
        let provider = self.require_provider(provider_id.unwrap_or(CLOUD_PROVIDER_ID))?;
        provider.get_user_info().await
    }

    // ==================== Metadata & membership ====================

    /// Write name/avatar changes into a live workspace and tell its provider.
    pub async fn update_workspace_meta(
        &self,
        meta: &WorkspaceMetaPatch,
        workspace: &CrdtWorkspace,
    ) -> Result<()> {
        let id = workspace.room();
        if id.is_empty() {
            return Err(CollabError::InvalidArgument(
                "workspace has no room id".to_string(),
            ));
        }
        let info = self.meta(id)?;

        let applied = workspace.apply_meta_patch(meta);
        match self.provider(&info.provider) {
            Some(provider) => provider.update_workspace_meta(id, &applied).await,
            None => {
                log::warn!(
                    "update_workspace_meta: provider '{}' for {} is not registered",
                    info.provider,
                    id
                );
                Ok(())
            }
        }
    }

    /// Close a shared workspace and leave it.
    pub async fn leave_workspace(&self, id: &str) -> Result<()> {
        let meta = self.meta(id)?;
        let Some(provider) = self.soft_provider(&meta, "leave_workspace") else {
            return Ok(());
        };
        provider.close_workspace(id).await?;
        provider.leave_workspace(id).await?;
        self.cache.evict(id);
        Ok(())
    }

    /// Make a workspace public or private.
    pub async fn set_workspace_publish(&self, id: &str, is_publish: bool) -> Result<()> {
        let meta = self.meta(id)?;
        match self.soft_provider(&meta, "set_workspace_publish") {
            Some(provider) => provider.publish(id, is_publish).await,
            None => Ok(()),
        }
    }

    /// Invite a user to a workspace by email.
    pub async fn invite_member(&self, id: &str, email: &str) -> Result<()> {
        let meta = self.meta(id)?;
        match self.soft_provider(&meta, "invite_member") {
            Some(provider) => provider.invite(id, email).await,
            None => Ok(()),
        }
    }

    /// Revoke a member's permission on a workspace.
    pub async fn remove_member(&self, id: &str, permission_id: i64) -> Result<()> {
        let meta = self.meta(id)?;
        match self.soft_provider(&meta, "remove_member") {
            Some(provider) => provider.remove_member(permission_id).await,
            None => Ok(()),
        }
    }

    /// Look up a user by email through a provider (default: cloud).
    ///
    /// Only the named provider is consulted; the workspace id is passed
    /// through without being resolved.
    pub async fn get_user_by_email(
        &self,
        id: &str,
        email: &str,
        provider_id: Option<&str>,
    ) -> Result<Option<User>> {
        let provider_id = provider_id.unwrap_or(CLOUD_PROVIDER_ID);
        match self.provider(provider_id) {
            Some(provider) => provider.get_user_by_email(id, email).await,
            None => {
                log::warn!(
                    "get_user_by_email: provider '{}' is not registered",
                    provider_id
                );
                Ok(None)
            }
        }
    }

    /// Owning provider for operations that degrade to a no-op without one.
    fn soft_provider(&self, meta: &WorkspaceMeta, operation: &str) -> Option<Arc<dyn Provider>> {
        let provider = self.provider(&meta.provider);
        if provider.is_none() {
            log::warn!(
                "{}: provider '{}' for {} is not registered, skipping",
                operation,
                meta.provider,
                meta.id
            );
        }
        provider
    }

    // ==================== Migration ====================

    /// Move a workspace to the cloud provider.
    pub async fn enable_workspace_cloud(
        &self,
        workspace: &CrdtWorkspace,
    ) -> Result<Option<Arc<CrdtWorkspace>>> {
        self.trans_workspace_provider(workspace, CLOUD_PROVIDER_ID)
            .await
    }

    /// Move a workspace to `target_id`.
    ///
    /// The target allocates a new workspace, receives a full copy of the
    /// document state, and the original is deleted from its provider. If any
    /// step after allocation fails, the new workspace is deleted from the
    /// target and the original error is returned.
    ///
    /// Returns the new live instance, or `None` when the workspace is already
    /// on `target_id`.
    pub async fn trans_workspace_provider(
        &self,
        workspace: &CrdtWorkspace,
        target_id: &str,
    ) -> Result<Option<Arc<CrdtWorkspace>>> {
        let id = workspace.room();
        if id.is_empty() {
            return Err(CollabError::InvalidArgument(
                "workspace has no room id".to_string(),
            ));
        }
        let meta = self.meta(id)?;
        if meta.provider == target_id {
            log::debug!("Workspace {} is already on '{}'", id, target_id);
            return Ok(None);
        }
        let current = self.require_provider(&meta.provider)?;
        let target = self.require_provider(target_id)?;

        let patch = WorkspaceMetaPatch::from(&meta);
        log::info!("Creating {} workspace for {} ({})", target_id, id, meta.name);
        let info = target.create_workspace_info(&patch).await?;

        let migrated = match self
            .copy_to_provider(workspace, &info.id, &patch, &*current, &*target)
            .await
        {
            Ok(migrated) => migrated,
            Err(e) => {
                log::warn!(
                    "Moving {} to '{}' failed, removing {}: {}",
                    id,
                    target_id,
                    info.id,
                    e
                );
                if let Err(cleanup) = target.delete_workspace(&info.id).await {
                    log::warn!("Failed to remove {}: {}", info.id, cleanup);
                }
                return Err(e);
            }
        };

        self.cache.evict(id);
        log::info!("Moved {} to '{}' as {}", id, target_id, info.id);
        Ok(Some(self.cache.acquire(&info.id, target_id, || migrated)))
    }

    async fn copy_to_provider(
        &self,
        source: &CrdtWorkspace,
        new_id: &str,
        patch: &WorkspaceMetaPatch,
        current: &dyn Provider,
        target: &dyn Provider,
    ) -> Result<Arc<CrdtWorkspace>> {
        let migrated = Arc::new(CrdtWorkspace::new(new_id));
        migrated.apply_update(&source.encode_state_as_update())?;
        target
            .create_workspace(Arc::clone(&migrated), patch)
            .await?;
        current.delete_workspace(source.room()).await?;
        Ok(migrated)
    }

    // ==================== Blobs ====================

    /// Fetch a blob from a workspace's blob store. Missing store or blob
    /// yields an empty buffer.
    pub async fn get_blob(&self, workspace: &CrdtWorkspace, id: &str) -> Result<Vec<u8>> {
        let Some(store) = workspace.blobs() else {
            return Ok(Vec::new());
        };
        Ok(store.get(id).await?.unwrap_or_default())
    }

    /// Store a blob in a workspace's blob store, returning its id. Without a
    /// store the id is empty.
    pub async fn set_blob(&self, workspace: &CrdtWorkspace, data: &[u8]) -> Result<String> {
        let Some(store) = workspace.blobs() else {
            return Ok(String::new());
        };
        store.set(data).await
    }

    // ==================== Messages ====================

    /// Subscribe to provider messages.
    pub fn on_message<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.message_center.on_message(callback)
    }

    /// Remove a message subscription.
    pub fn off_message(&self, id: SubscriptionId) -> bool {
        self.message_center.off_message(id)
    }

    // ==================== Import / export ====================

    /// Encode the full state of a workspace as a portable update.
    pub async fn export_workspace(&self, id: &str) -> Result<Vec<u8>> {
        if let Some(workspace) = self.cache.get(id) {
            return Ok(workspace.encode_state_as_update());
        }
        let workspace = self.load_workspace(id).await?;
        let state = workspace.encode_state_as_update();
        self.close_workspace(id).await?;
        Ok(state)
    }

    /// Create a workspace on the main provider from a portable update.
    pub async fn import_workspace(&self, update: &[u8]) -> Result<Arc<CrdtWorkspace>> {
        let provider = self.main_provider()?;
        let source = CrdtWorkspace::from_update("import", update)?;
        let patch = WorkspaceMetaPatch {
            name: source.name(),
            avatar: source.avatar(),
        };

        let info = provider.create_workspace_info(&patch).await?;
        let workspace = Arc::new(CrdtWorkspace::new(info.id));
        workspace.apply_update(update)?;
        provider
            .create_workspace(Arc::clone(&workspace), &patch)
            .await?;
        log::info!("Imported workspace {}", workspace.room());
        Ok(workspace)
    }

    /// Clear every provider's workspaces, in registration order.
    #[deprecated(note = "removes all data from every provider")]
    pub async fn clear(&self) -> Result<()> {
        for provider in self.providers() {
            provider.clear().await?;
        }
        self.cache.clear();
        Ok(())
    }
}

impl std::fmt::Debug for DataCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCenter")
            .field("workspaces", &self.workspaces)
            .field("registry", &*self.registry.read().unwrap())
            .field("cache", &self.cache.len())
            .finish()
    }
}
