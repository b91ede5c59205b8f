use serde::Serialize;
use thiserror::Error;

/// Unified error type for collabspace operations
#[derive(Debug, Error)]
pub enum CollabError {
    // Lookup errors
    #[error("Workspace not found: '{0}'")]
    NotFound(String),

    #[error("Provider '{0}' is not registered")]
    ProviderUnavailable(String),

    #[error("There is no provider. Register a provider first.")]
    NoMainProvider,

    #[error("Provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Remote errors
    #[error("Not logged in")]
    Unauthorized,

    #[error("Remote request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },

    // Document errors
    #[error("CRDT error: {0}")]
    Crdt(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type alias for collabspace operations
pub type Result<T> = std::result::Result<T, CollabError>;

#[cfg(all(not(target_arch = "wasm32"), feature = "local-sqlite"))]
impl From<rusqlite::Error> for CollabError {
    fn from(err: rusqlite::Error) -> Self {
        CollabError::Storage(err.to_string())
    }
}

#[cfg(all(not(target_arch = "wasm32"), feature = "cloud-http"))]
impl From<reqwest::Error> for CollabError {
    fn from(err: reqwest::Error) -> Self {
        match err.status().map(|s| s.as_u16()) {
            Some(401) => CollabError::Unauthorized,
            status => CollabError::Remote {
                status,
                message: err.to_string(),
            },
        }
    }
}

/// A serializable representation of CollabError for IPC with the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Workspace or provider id the error refers to (if applicable)
    pub subject: Option<String>,
}

impl From<&CollabError> for SerializableError {
    fn from(err: &CollabError) -> Self {
        let kind = match err {
            CollabError::NotFound(_) => "NotFound",
            CollabError::ProviderUnavailable(_) => "ProviderUnavailable",
            CollabError::NoMainProvider => "NoMainProvider",
            CollabError::DuplicateProvider(_) => "DuplicateProvider",
            CollabError::InvalidArgument(_) => "InvalidArgument",
            CollabError::Unauthorized => "Unauthorized",
            CollabError::Remote { .. } => "Remote",
            CollabError::Crdt(_) => "Crdt",
            CollabError::Storage(_) => "Storage",
            CollabError::Io(_) => "Io",
            CollabError::Json(_) => "Json",
            CollabError::ConfigParse(_) => "ConfigParse",
            CollabError::ConfigSerialize(_) => "ConfigSerialize",
            CollabError::NoConfigDir => "NoConfigDir",
        }
        .to_string();

        let subject = match err {
            CollabError::NotFound(id) => Some(id.clone()),
            CollabError::ProviderUnavailable(id) => Some(id.clone()),
            CollabError::DuplicateProvider(id) => Some(id.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            subject,
        }
    }
}

impl From<CollabError> for SerializableError {
    fn from(err: CollabError) -> Self {
        SerializableError::from(&err)
    }
}

impl CollabError {
    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}
