//! Transport trait for the remote workspace service.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::provider::BoxFuture;
use crate::types::{User, WorkspaceMetaPatch};

/// A workspace as described by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudWorkspace {
    /// Remote workspace id
    pub id: String,
    /// Display name
    pub name: String,
    /// Avatar blob id
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the workspace is public
    #[serde(default)]
    pub public: bool,
}

/// Calls the cloud provider makes against the remote service.
///
/// [`HttpCloudClient`](super::HttpCloudClient) implements this over HTTP; tests
/// substitute an in-memory implementation.
pub trait CloudApi: Send + Sync {
    /// Set or drop the session token used for requests.
    fn set_token(&self, token: Option<String>);

    /// Whether a session token is present.
    fn has_token(&self) -> bool;

    /// The user owning the session. Fails with `Unauthorized` without a valid session.
    fn current_user(&self) -> BoxFuture<'_, Result<User>>;

    /// Workspaces the user can access.
    fn list_workspaces(&self) -> BoxFuture<'_, Result<Vec<CloudWorkspace>>>;

    /// Create a workspace.
    fn create_workspace<'a>(
        &'a self,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<CloudWorkspace>>;

    /// Rename a workspace or change its avatar.
    fn update_workspace<'a>(
        &'a self,
        id: &'a str,
        meta: &'a WorkspaceMetaPatch,
    ) -> BoxFuture<'a, Result<()>>;

    /// Delete a workspace.
    fn delete_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Drop the current user's membership.
    fn leave_workspace<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Make a workspace public or private.
    fn set_public<'a>(&'a self, id: &'a str, public: bool) -> BoxFuture<'a, Result<()>>;

    /// Invite a user by email.
    fn invite_member<'a>(&'a self, id: &'a str, email: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Revoke a permission.
    fn remove_member(&self, permission_id: i64) -> BoxFuture<'_, Result<()>>;

    /// Look up a user by email within a workspace.
    fn user_by_email<'a>(
        &'a self,
        id: &'a str,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>>;

    /// Full document state of a workspace, `None` when the server has none yet.
    fn fetch_doc<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    /// Upload the full document state of a workspace.
    fn push_doc<'a>(&'a self, id: &'a str, update: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Download a blob.
    fn get_blob<'a>(
        &'a self,
        id: &'a str,
        blob_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    /// Upload a blob, returning its id.
    fn put_blob<'a>(&'a self, id: &'a str, data: &'a [u8]) -> BoxFuture<'a, Result<String>>;
}
