//! Provider registry.

use std::sync::Arc;

use indexmap::IndexMap;

use super::Provider;
use crate::error::{CollabError, Result};

/// Map of provider id to provider, plus the id of the main provider.
///
/// The main provider is the one new workspaces are created on. The first
/// registered provider becomes main until [`Self::set_main`] says otherwise.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Arc<dyn Provider>>,
    main_id: Option<String>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Duplicate ids are rejected.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<()> {
        let id = provider.id().to_string();
        if self.providers.contains_key(&id) {
            return Err(CollabError::DuplicateProvider(id));
        }
        if self.main_id.is_none() {
            self.main_id = Some(id.clone());
        }
        self.providers.insert(id, provider);
        Ok(())
    }

    /// Make `id` the main provider.
    pub fn set_main(&mut self, id: &str) -> Result<()> {
        if !self.providers.contains_key(id) {
            return Err(CollabError::ProviderUnavailable(id.to_string()));
        }
        self.main_id = Some(id.to_string());
        Ok(())
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    /// Look up a provider by id, failing with `ProviderUnavailable`.
    pub fn require(&self, id: &str) -> Result<Arc<dyn Provider>> {
        self.get(id)
            .ok_or_else(|| CollabError::ProviderUnavailable(id.to_string()))
    }

    /// The main provider, if any provider is registered.
    pub fn main(&self) -> Option<Arc<dyn Provider>> {
        self.main_id.as_deref().and_then(|id| self.get(id))
    }

    /// Id of the main provider.
    pub fn main_id(&self) -> Option<&str> {
        self.main_id.as_deref()
    }

    /// All providers in registration order.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.values().cloned().collect()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .field("main_id", &self.main_id)
            .finish()
    }
}
