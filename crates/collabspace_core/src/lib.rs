#![doc = include_str!(concat!(env!("OUT_DIR"), "/README.md"))]
#![warn(missing_docs)]

/// Reference-counted cache of open workspaces
pub mod cache;

/// Configuration options
pub mod config;

/// CRDT documents and blob stores
pub mod crdt;

/// Workspace orchestration
pub mod datacenter;

/// Error (common error types)
pub mod error;

/// Callback registry for subscriptions
pub mod events;

/// Provider notifications
pub mod message;

/// Workspace metadata index
pub mod meta_collection;

/// Storage backends (local and cloud providers)
pub mod provider;

/// Persistence for the local provider
pub mod storage;

/// Shared data types
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use crdt::CrdtWorkspace;
pub use datacenter::DataCenter;
pub use error::{CollabError, Result, SerializableError};
pub use meta_collection::{WorkspaceMetaChangeEvent, WorkspaceMetaCollection};
pub use provider::Provider;
pub use types::{
    CLOUD_PROVIDER_ID, LOCAL_PROVIDER_ID, Message, MessageCode, User, WorkspaceMeta,
    WorkspaceMetaPatch, WorkspaceType,
};
