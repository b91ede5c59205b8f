//! Core data types shared between the data center, providers and the UI layer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Provider id of the local (on-device) provider.
pub const LOCAL_PROVIDER_ID: &str = "local";

/// Provider id of the cloud provider. Used as the default for auth calls.
pub const CLOUD_PROVIDER_ID: &str = "cloud";

/// Where a workspace lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum WorkspaceType {
    /// Stored on this device only
    #[default]
    Local,
    /// Stored on the remote service
    Cloud,
}

/// Metadata for a known workspace.
///
/// One entry exists per workspace regardless of whether its document is loaded.
/// `provider` names the registered provider that owns the workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorkspaceMeta {
    /// Workspace id (also the CRDT room id)
    pub id: String,

    /// Display name
    pub name: String,

    /// Avatar blob id or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Id of the owning provider
    pub provider: String,

    /// Whether the workspace is publicly readable
    #[serde(default)]
    pub is_publish: bool,

    /// Backing location
    #[serde(rename = "type", default)]
    pub workspace_type: WorkspaceType,
}

impl WorkspaceMeta {
    /// Create metadata for a workspace owned by `provider`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        workspace_type: WorkspaceType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
            provider: provider.into(),
            is_publish: false,
            workspace_type,
        }
    }

    /// Apply the set fields of a patch. Returns true when anything changed.
    pub fn apply_patch(&mut self, patch: &WorkspaceMetaPatch) -> bool {
        let mut changed = false;
        if let Some(name) = &patch.name
            && *name != self.name
        {
            self.name = name.clone();
            changed = true;
        }
        if let Some(avatar) = &patch.avatar
            && self.avatar.as_ref() != Some(avatar)
        {
            self.avatar = Some(avatar.clone());
            changed = true;
        }
        changed
    }
}

/// Partial workspace metadata used for creation and updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkspaceMetaPatch {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl WorkspaceMetaPatch {
    /// Patch that only sets the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            avatar: None,
        }
    }

    /// Builder-style avatar setter.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none()
    }
}

impl From<&WorkspaceMeta> for WorkspaceMetaPatch {
    fn from(meta: &WorkspaceMeta) -> Self {
        Self {
            name: Some(meta.name.clone()),
            avatar: meta.avatar.clone(),
        }
    }
}

/// A user known to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Kind of a broadcast [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum MessageCode {
    /// The provider needs the user to log in
    LoginRequired,
    /// Login finished
    LoginSucceeded,
    /// Logout finished
    LoggedOut,
    /// A workspace list was (re)loaded
    WorkspacesLoaded,
    /// A document could not be synced with its backend
    SyncFailed,
}

/// Notification relayed through the message center.
///
/// The data center never interprets messages; they are for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Message {
    /// Id of the provider that sent the message
    pub provider: String,
    /// Message kind
    pub code: MessageCode,
    /// Human-readable text
    pub message: String,
}

impl Message {
    /// Create a message from a provider.
    pub fn new(provider: impl Into<String>, code: MessageCode, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_json_shape() {
        let mut meta = WorkspaceMeta::new("ws1", "Demo", LOCAL_PROVIDER_ID, WorkspaceType::Local);
        meta.is_publish = true;
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["id"], "ws1");
        assert_eq!(json["isPublish"], true);
        assert_eq!(json["type"], "local");
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn test_meta_deserialize_defaults() {
        let meta: WorkspaceMeta =
            serde_json::from_str(r#"{"id":"a","name":"A","provider":"cloud"}"#).unwrap();
        assert!(!meta.is_publish);
        assert_eq!(meta.workspace_type, WorkspaceType::Local);
    }

    #[test]
    fn test_apply_patch_reports_changes() {
        let mut meta = WorkspaceMeta::new("ws1", "Demo", LOCAL_PROVIDER_ID, WorkspaceType::Local);
        assert!(!meta.apply_patch(&WorkspaceMetaPatch::named("Demo")));
        assert!(meta.apply_patch(&WorkspaceMetaPatch::default().with_avatar("blob-1")));
        assert_eq!(meta.avatar.as_deref(), Some("blob-1"));
        assert!(meta.apply_patch(&WorkspaceMetaPatch::named("Renamed")));
        assert_eq!(meta.name, "Renamed");
    }
}
