//! Reference-counted cache of live workspace instances.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::crdt::CrdtWorkspace;

#[derive(Debug)]
struct CacheEntry {
    workspace: Arc<CrdtWorkspace>,
    /// Provider that last wrapped the instance
    provider: String,
    refs: usize,
}

/// Live [`CrdtWorkspace`] instances keyed by workspace id.
///
/// Each [`acquire`](Self::acquire) takes one open handle and each
/// [`release`](Self::release) drops one; an entry is removed when its last
/// handle is released or when it is evicted explicitly.
#[derive(Debug, Default)]
pub struct WorkspaceCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl WorkspaceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a handle on `id`, using the instance from `create` if absent.
    ///
    /// The entry is tagged with `provider` as its opener.
    pub fn acquire(
        &self,
        id: &str,
        provider: &str,
        create: impl FnOnce() -> Arc<CrdtWorkspace>,
    ) -> Arc<CrdtWorkspace> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(id.to_string()).or_insert_with(|| CacheEntry {
            workspace: create(),
            provider: provider.to_string(),
            refs: 0,
        });
        entry.refs += 1;
        if entry.provider != provider {
            entry.provider = provider.to_string();
        }
        Arc::clone(&entry.workspace)
    }

    /// The cached instance for `id`, without taking a handle.
    pub fn get(&self, id: &str) -> Option<Arc<CrdtWorkspace>> {
        self.entries
            .read()
            .unwrap()
            .get(id)
            .map(|entry| Arc::clone(&entry.workspace))
    }

    /// Provider that opened the cached instance for `id`.
    pub fn provider_of(&self, id: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap()
            .get(id)
            .map(|entry| entry.provider.clone())
    }

    /// Open handles on `id`.
    pub fn ref_count(&self, id: &str) -> usize {
        self.entries
            .read()
            .unwrap()
            .get(id)
            .map_or(0, |entry| entry.refs)
    }

    /// Drop one handle on `id`. Returns `true` when that was the last one and
    /// the entry was removed.
    pub fn release(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(id) else {
            return false;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            entries.remove(id);
            true
        } else {
            false
        }
    }

    /// Remove `id` regardless of open handles.
    pub fn evict(&self, id: &str) -> Option<Arc<CrdtWorkspace>> {
        self.entries
            .write()
            .unwrap()
            .remove(id)
            .map(|entry| entry.workspace)
    }

    /// Remove every entry opened by `provider`. Returns the evicted ids.
    pub fn evict_provider(&self, provider: &str) -> Vec<String> {
        let mut entries = self.entries.write().unwrap();
        let ids: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.provider == provider)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            entries.remove(id);
        }
        ids
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_acquire_reuses_instance() {
        let cache = WorkspaceCache::new();
        let created = Cell::new(0);

        let first = cache.acquire("ws1", "local", || {
            created.set(created.get() + 1);
            Arc::new(CrdtWorkspace::new("ws1"))
        });
        let second = cache.acquire("ws1", "local", || {
            created.set(created.get() + 1);
            Arc::new(CrdtWorkspace::new("ws1"))
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.get(), 1);
        assert_eq!(cache.ref_count("ws1"), 2);
    }

    #[test]
    fn test_acquire_retags_provider() {
        let cache = WorkspaceCache::new();
        cache.acquire("ws1", "local", || Arc::new(CrdtWorkspace::new("ws1")));
        cache.acquire("ws1", "cloud", || Arc::new(CrdtWorkspace::new("ws1")));
        assert_eq!(cache.provider_of("ws1").as_deref(), Some("cloud"));
    }

    #[test]
    fn test_evict_provider() {
        let cache = WorkspaceCache::new();
        cache.acquire("a", "local", || Arc::new(CrdtWorkspace::new("a")));
        cache.acquire("b", "cloud", || Arc::new(CrdtWorkspace::new("b")));

        assert_eq!(cache.evict_provider("cloud"), vec!["b".to_string()]);
        assert!(cache.get("a").is_some());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_release_evicts_on_last_handle() {
        let cache = WorkspaceCache::new();
        cache.acquire("ws1", "local", || Arc::new(CrdtWorkspace::new("ws1")));
        cache.acquire("ws1", "local", || Arc::new(CrdtWorkspace::new("ws1")));

        assert!(!cache.release("ws1"));
        assert!(cache.get("ws1").is_some());
        assert!(cache.release("ws1"));
        assert!(cache.is_empty());
        assert!(!cache.release("ws1"));
    }

    #[test]
    fn test_evict() {
        let cache = WorkspaceCache::new();
        cache.acquire("ws1", "local", || Arc::new(CrdtWorkspace::new("ws1")));
        assert!(cache.evict("ws1").is_some());
        assert!(cache.evict("ws1").is_none());
        assert_eq!(cache.len(), 0);
    }
}
