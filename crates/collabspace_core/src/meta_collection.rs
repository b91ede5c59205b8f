//! In-memory index of workspace metadata.
//!
//! [`WorkspaceMetaCollection`] is the authoritative list of known workspaces.
//! Providers never see the collection itself; they get a
//! [`WorkspaceMetaScope`] handle that shares the same state and lets them
//! add, update and remove their own entries. Every mutation emits a
//! [`WorkspaceMetaChangeEvent`] to subscribers (the UI, the data center).
//!
//! Nothing here is persisted; persistence belongs to the providers.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::Serialize;

use crate::events::{CallbackRegistry, SubscriptionId};
use crate::types::{WorkspaceMeta, WorkspaceMetaPatch};

/// A batch of changes applied to the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkspaceMetaChangeEvent {
    /// Newly inserted entries
    pub added: Vec<WorkspaceMeta>,
    /// Entries whose fields changed (new values)
    pub updated: Vec<WorkspaceMeta>,
    /// Entries that were removed (last known values)
    pub removed: Vec<WorkspaceMeta>,
}

impl WorkspaceMetaChangeEvent {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Default)]
struct CollectionInner {
    workspaces: RwLock<IndexMap<String, WorkspaceMeta>>,
    listeners: CallbackRegistry<WorkspaceMetaChangeEvent>,
}

impl CollectionInner {
    /// Run a mutation under the write lock, then notify outside of it.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut IndexMap<String, WorkspaceMeta>, &mut WorkspaceMetaChangeEvent) -> T,
    ) -> T {
        let mut event = WorkspaceMetaChangeEvent::default();
        let result = {
            let mut workspaces = self.workspaces.write().unwrap();
            f(&mut workspaces, &mut event)
        };
        if !event.is_empty() {
            self.listeners.emit(&event);
        }
        result
    }

    fn upsert(
        workspaces: &mut IndexMap<String, WorkspaceMeta>,
        event: &mut WorkspaceMetaChangeEvent,
        meta: WorkspaceMeta,
    ) {
        match workspaces.get_mut(&meta.id) {
            Some(existing) if *existing == meta => {}
            Some(existing) => {
                *existing = meta.clone();
                event.updated.push(meta);
            }
            None => {
                workspaces.insert(meta.id.clone(), meta.clone());
                event.added.push(meta);
            }
        }
    }
}

/// Authoritative in-memory registry of workspace metadata.
#[derive(Default)]
pub struct WorkspaceMetaCollection {
    inner: Arc<CollectionInner>,
}

impl WorkspaceMetaCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a workspace by id.
    pub fn find(&self, id: &str) -> Option<WorkspaceMeta> {
        self.inner.workspaces.read().unwrap().get(id).cloned()
    }

    /// Snapshot of all workspaces in insertion order.
    pub fn workspaces(&self) -> Vec<WorkspaceMeta> {
        self.inner.workspaces.read().unwrap().values().cloned().collect()
    }

    /// Number of known workspaces.
    pub fn len(&self) -> usize {
        self.inner.workspaces.read().unwrap().len()
    }

    /// True when no workspace is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a handle providers use to edit the collection.
    pub fn create_scope(&self) -> WorkspaceMetaScope {
        WorkspaceMetaScope {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Subscribe to change events.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&WorkspaceMetaChangeEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(Arc::new(callback))
    }

    /// Remove a change subscription. Returns `true` if it existed.
    pub fn off_change(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }
}

impl std::fmt::Debug for WorkspaceMetaCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceMetaCollection")
            .field("len", &self.len())
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

/// Provider-facing handle onto a [`WorkspaceMetaCollection`].
///
/// Clones share the same underlying collection.
#[derive(Clone)]
pub struct WorkspaceMetaScope {
    inner: Arc<CollectionInner>,
}

impl WorkspaceMetaScope {
    /// Look up a workspace by id.
    pub fn get(&self, id: &str) -> Option<WorkspaceMeta> {
        self.inner.workspaces.read().unwrap().get(id).cloned()
    }

    /// All entries owned by `provider_id`.
    pub fn list(&self, provider_id: &str) -> Vec<WorkspaceMeta> {
        self.inner
            .workspaces
            .read()
            .unwrap()
            .values()
            .filter(|meta| meta.provider == provider_id)
            .cloned()
            .collect()
    }

    /// Insert an entry, or replace the existing entry with the same id.
    pub fn add(&self, meta: WorkspaceMeta) {
        self.inner
            .mutate(|workspaces, event| CollectionInner::upsert(workspaces, event, meta));
    }

    /// Apply a patch to an entry. Returns the updated entry, or `None` if unknown.
    pub fn update(&self, id: &str, patch: &WorkspaceMetaPatch) -> Option<WorkspaceMeta> {
        self.inner.mutate(|workspaces, event| {
            let meta = workspaces.get_mut(id)?;
            if meta.apply_patch(patch) {
                event.updated.push(meta.clone());
            }
            Some(meta.clone())
        })
    }

    /// Set the publish flag of an entry. Returns the updated entry, or `None` if unknown.
    pub fn set_publish(&self, id: &str, is_publish: bool) -> Option<WorkspaceMeta> {
        self.inner.mutate(|workspaces, event| {
            let meta = workspaces.get_mut(id)?;
            if meta.is_publish != is_publish {
                meta.is_publish = is_publish;
                event.updated.push(meta.clone());
            }
            Some(meta.clone())
        })
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&self, id: &str) -> Option<WorkspaceMeta> {
        self.inner.mutate(|workspaces, event| {
            let removed = workspaces.shift_remove(id)?;
            event.removed.push(removed.clone());
            Some(removed)
        })
    }

    /// Remove every entry owned by `provider_id`. Returns how many were removed.
    pub fn remove_provider(&self, provider_id: &str) -> usize {
        self.inner.mutate(|workspaces, event| {
            let (removed, kept): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(workspaces)
                .into_iter()
                .partition(|(_, meta)| meta.provider == provider_id);
            *workspaces = kept;
            event.removed.extend(removed.into_values());
            event.removed.len()
        })
    }

    /// Replace the entries of `provider_id` with `metas`.
    ///
    /// Entries missing from `metas` are removed, others are inserted or updated,
    /// all in a single change event.
    pub fn sync_provider(&self, provider_id: &str, metas: Vec<WorkspaceMeta>) {
        self.inner.mutate(|workspaces, event| {
            let stale: Vec<String> = workspaces
                .values()
                .filter(|meta| meta.provider == provider_id)
                .filter(|meta| !metas.iter().any(|m| m.id == meta.id))
                .map(|meta| meta.id.clone())
                .collect();
            for id in stale {
                if let Some(removed) = workspaces.shift_remove(&id) {
                    event.removed.push(removed);
                }
            }
            for meta in metas {
                CollectionInner::upsert(workspaces, event, meta);
            }
        });
    }
}

impl std::fmt::Debug for WorkspaceMetaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceMetaScope").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkspaceType;
    use std::sync::Mutex;

    fn meta(id: &str, provider: &str) -> WorkspaceMeta {
        WorkspaceMeta::new(id, format!("Workspace {id}"), provider, WorkspaceType::Local)
    }

    fn record_events(
        collection: &WorkspaceMetaCollection,
    ) -> Arc<Mutex<Vec<WorkspaceMetaChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        collection.on_change(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_scope_edits_are_visible_in_collection() {
        let collection = WorkspaceMetaCollection::new();
        let scope = collection.create_scope();

        scope.add(meta("a", "local"));
        scope.add(meta("b", "cloud"));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.find("a").unwrap().provider, "local");
        assert!(collection.find("missing").is_none());

        let ids: Vec<_> = collection.workspaces().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_change_events() {
        let collection = WorkspaceMetaCollection::new();
        let events = record_events(&collection);
        let scope = collection.create_scope();

        scope.add(meta("a", "local"));
        // Re-adding identical metadata is not a change
        scope.add(meta("a", "local"));
        scope.update("a", &WorkspaceMetaPatch::named("Renamed"));
        scope.remove("a");

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].added[0].id, "a");
        assert_eq!(events[1].updated[0].name, "Renamed");
        assert_eq!(events[2].removed[0].id, "a");
    }

    #[test]
    fn test_update_unknown_returns_none() {
        let collection = WorkspaceMetaCollection::new();
        let events = record_events(&collection);
        let scope = collection.create_scope();

        assert!(scope.update("nope", &WorkspaceMetaPatch::named("x")).is_none());
        assert!(scope.set_publish("nope", true).is_none());
        assert!(scope.remove("nope").is_none());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_publish() {
        let collection = WorkspaceMetaCollection::new();
        let scope = collection.create_scope();
        scope.add(meta("a", "cloud"));

        let updated = scope.set_publish("a", true).unwrap();
        assert!(updated.is_publish);
        assert!(collection.find("a").unwrap().is_publish);
    }

    #[test]
    fn test_remove_provider_keeps_others_in_order() {
        let collection = WorkspaceMetaCollection::new();
        let scope = collection.create_scope();
        scope.add(meta("a", "local"));
        scope.add(meta("b", "cloud"));
        scope.add(meta("c", "local"));
        scope.add(meta("d", "cloud"));

        assert_eq!(scope.remove_provider("cloud"), 2);
        let ids: Vec<_> = collection.workspaces().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(scope.list("cloud").is_empty());
    }

    #[test]
    fn test_sync_provider_replaces_entries() {
        let collection = WorkspaceMetaCollection::new();
        let scope = collection.create_scope();
        scope.add(meta("local-1", "local"));
        scope.add(meta("old", "cloud"));
        scope.add(meta("kept", "cloud"));

        let events = record_events(&collection);
        let mut kept = meta("kept", "cloud");
        kept.is_publish = true;
        scope.sync_provider("cloud", vec![kept, meta("new", "cloud")]);

        assert!(collection.find("old").is_none());
        assert!(collection.find("kept").unwrap().is_publish);
        assert!(collection.find("new").is_some());
        assert!(collection.find("local-1").is_some());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].removed.len(), 1);
        assert_eq!(events[0].updated.len(), 1);
        assert_eq!(events[0].added.len(), 1);
    }

    #[test]
    fn test_off_change() {
        let collection = WorkspaceMetaCollection::new();
        let events = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&events);
        let id = collection.on_change(move |_| *sink.lock().unwrap() += 1);

        assert!(collection.off_change(id));
        collection.create_scope().add(meta("a", "local"));
        assert_eq!(*events.lock().unwrap(), 0);
    }
}
