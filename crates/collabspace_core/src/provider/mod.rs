#![doc = include_str!(concat!(env!("OUT_DIR"), "/provider_README.md"))]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::crdt::CrdtWorkspace;
use crate::error::Result;
use crate::message::MessageCenter;
use crate::meta_collection::WorkspaceMetaScope;
use crate::types::{User, WorkspaceMeta, WorkspaceMetaPatch};

mod cloud;
mod local;
mod registry;

pub use cloud::{CloudApi, CloudBlobStore, CloudProvider, CloudWorkspace};
#[cfg(all(not(target_arch = "wasm32"), feature = "cloud-http"))]
pub use cloud::HttpCloudClient;
pub use local::{LocalProvider, StorageBlobStore};
pub use registry::ProviderRegistry;

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with multi-threaded runtimes.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods.
///
/// WASM version without `Send` requirement - JavaScript is single-threaded.
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Shared handles a provider receives at construction.
#[derive(Debug, Clone)]
pub struct ProviderInitParams {
    /// Handle for editing the workspace metadata collection
    pub workspaces: WorkspaceMetaScope,
    /// Where to send user-facing notifications
    pub message_center: Arc<MessageCenter>,
}

/// A backend that persists and fetches workspaces.
///
/// The data center routes every workspace operation to the provider whose id
/// is recorded in the workspace's metadata. Providers keep the metadata
/// collection up to date through their [`WorkspaceMetaScope`].
///
/// Capabilities a backend doesn't have fall back to the default methods,
/// which log and succeed without doing anything.
pub trait Provider: Send + Sync {
    /// Unique id of this provider (e.g. `"local"`, `"cloud"`).
    fn id(&self) -> &str;

    /// Called once when the provider is registered.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Authenticate with the backend.
    fn auth(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            log::debug!("[{}] auth: nothing to do", self.id());
            Ok(())
        })
    }

    /// Drop credentials.
    fn logout(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            log::debug!("[{}] logout: nothing to do", self.id());
            Ok(())
        })
    }

    /// Load this provider's workspace list into the metadata collection.
    fn load_workspaces(&self) -> BoxFuture<'_, Result<Vec<WorkspaceMeta>>>;

    /// Allocate a new workspace id and build its metadata.
    fn create_workspace_info<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<WorkspaceMeta>>;

    /// Persist a freshly allocated workspace and register it in the collection.
    fn create_workspace<'a>(
        &'a self,
        workspace: Arc<CrdtWorkspace>,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>>;

    /// Delete a workspace and its data.
    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Stop syncing an open workspace.
    fn close_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::debug!("[{}] close_workspace {}: nothing to do", self.id(), id);
            Ok(())
        })
    }

    /// Leave a workspace shared with the current user.
    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::warn!("[{}] leave_workspace {} is not supported", self.id(), id);
            Ok(())
        })
    }

    /// Attach sync and blob storage to a live workspace and return it.
    fn warp_workspace(
        &self,
        workspace: Arc<CrdtWorkspace>,
    ) -> BoxFuture<'_, Result<Arc<CrdtWorkspace>>>;

    /// Make a workspace public or private.
    fn publish<'a>(&'a self, id: &'a str, is_publish: bool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::warn!(
                "[{}] publish {} = {} is not supported",
                self.id(),
                id,
                is_publish
            );
            Ok(())
        })
    }

    /// Invite a user to a workspace.
    fn invite<'a>(&'a self, id: &'a str, email: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::warn!("[{}] invite {} to {} is not supported", self.id(), email, id);
            Ok(())
        })
    }

    /// Revoke a member's permission.
    fn remove_member(&self, permission_id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            log::warn!(
                "[{}] remove_member {} is not supported",
                self.id(),
                permission_id
            );
            Ok(())
        })
    }

    /// The user this provider is authenticated as.
    fn get_user_info(&self) -> BoxFuture<'_, Result<Option<User>>> {
        Box::pin(async move { Ok(None) })
    }

    /// Look up a user by email in the context of a workspace.
    fn get_user_by_email<'a>(
        &'a self,
        _id: &'a str,
        _email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        Box::pin(async move { Ok(None) })
    }

    /// Persist a metadata change.
    fn update_workspace_meta<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>>;

    /// Forget every workspace this provider knows about.
    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            log::debug!("[{}] clear: nothing to do", self.id());
            Ok(())
        })
    }
}
