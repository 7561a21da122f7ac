//! In-process [`ResourceStore`] for controller tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use kube::{Resource, ResourceExt};

use crate::{Error, ResourceStore, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Create(String),
    Update(String),
    UpdateStatus(String),
}

type Key = (Option<String>, String);

struct State<K> {
    objects: BTreeMap<Key, K>,
    writes: Vec<Write>,
    version: u64,
    pending_edits: usize,
}

/// Keeps objects in a map and mimics the API server closely enough for
/// finalizer flows: objects with a deletion timestamp disappear once their
/// last finalizer is removed.
#[derive(Clone)]
pub struct MemoryStore<K> {
    state: Arc<Mutex<State<K>>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                objects: BTreeMap::new(),
                writes: Vec::new(),
                version: 0,
                pending_edits: 0,
            })),
        }
    }
}

impl<K> MemoryStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State<K>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the next status write race with another writer: the stored
    /// object's resourceVersion moves on just before the write is checked.
    pub fn edit_before_next_status_write(&self) {
        self.state().pending_edits += 1;
    }

    /// Seeds an object without recording a write.
    pub fn insert(&self, mut obj: K) {
        let mut state = self.state();
        state.version += 1;
        obj.meta_mut().resource_version = Some(state.version.to_string());
        state.objects.insert(key(&obj), obj);
    }

    pub fn get_sync(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        let state = self.state();
        state
            .objects
            .get(&(namespace.map(String::from), name.to_string()))
            .cloned()
    }

    pub fn objects(&self) -> Vec<K> {
        let state = self.state();
        state.objects.values().cloned().collect()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state().writes.clone()
    }

    fn store(&self, obj: &K, write: Write, status_only: bool) -> Result<K> {
        let mut state = self.state();
        let key = key(obj);
        if status_only && state.pending_edits > 0 {
            state.pending_edits -= 1;
            state.version += 1;
            let version = state.version.to_string();
            if let Some(current) = state.objects.get_mut(&key) {
                current.meta_mut().resource_version = Some(version);
            }
        }
        let current = state
            .objects
            .get(&key)
            .ok_or_else(|| Error::NotFound(key.1.clone()))?;
        if current.meta().resource_version != obj.meta().resource_version {
            return Err(Error::Conflict(key.1));
        }
        let mut next = if status_only {
            // status writes never touch metadata besides the version
            let mut merged = obj.clone();
            *merged.meta_mut() = current.meta().clone();
            merged
        } else {
            obj.clone()
        };
        state.version += 1;
        next.meta_mut().resource_version = Some(state.version.to_string());
        state.writes.push(write);

        if next.meta().deletion_timestamp.is_some() && next.finalizers().is_empty() {
            state.objects.remove(&key);
        } else {
            state.objects.insert(key, next.clone());
        }
        Ok(next)
    }
}

fn key<K: Resource>(obj: &K) -> Key {
    (obj.meta().namespace.clone(), obj.meta().name.clone().unwrap_or_default())
}

impl<K> ResourceStore<K> for MemoryStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>> {
        Ok(self.get_sync(namespace, name))
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let mut state = self.state();
        let key = key(obj);
        if key.1.is_empty() {
            return Err(Error::MissingName);
        }
        if state.objects.contains_key(&key) {
            return Err(Error::AlreadyExists(key.1));
        }
        let mut obj = obj.clone();
        state.version += 1;
        obj.meta_mut().resource_version = Some(state.version.to_string());
        state.writes.push(Write::Create(key.1.clone()));
        state.objects.insert(key, obj.clone());
        Ok(obj)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.store(obj, Write::Update(obj.name_any()), false)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.store(obj, Write::UpdateStatus(obj.name_any()), true)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{
        api::core::v1::ConfigMap,
        apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time},
    };

    use super::*;

    fn config_map(name: &str, finalizers: Vec<String>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("default".into()),
                finalizers: Some(finalizers),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_conflicts_on_existing_name() {
        let store = MemoryStore::new();
        store.create(&config_map("a", vec![])).await.expect("create");
        let err = store.create(&config_map("a", vec![])).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(name) if name == "a"));
        assert_eq!(store.writes(), vec![Write::Create("a".into())]);
    }

    #[tokio::test]
    async fn test_stale_update_rejected() {
        let store = MemoryStore::new();
        let created = store.create(&config_map("a", vec![])).await.expect("create");
        store.update(&created).await.expect("first update");
        assert!(store.update(&created).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_edit_conflicts_status_write() {
        let store = MemoryStore::new();
        let created = store.create(&config_map("a", vec![])).await.expect("create");
        store.edit_before_next_status_write();

        let err = store.update_status(&created).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(name) if name == "a"));

        let current = store.get_sync(Some("default"), "a").expect("present");
        store.update_status(&current).await.expect("fresh write");
    }

    #[tokio::test]
    async fn test_removing_last_finalizer_deletes_marked_object() {
        let store = MemoryStore::new();
        let mut obj = config_map("a", vec!["example.com/f".into()]);
        obj.metadata.deletion_timestamp = Some(Time(Default::default()));
        store.insert(obj);

        let mut current = store.get_sync(Some("default"), "a").expect("seeded");
        current.metadata.finalizers = Some(vec![]);
        store.update(&current).await.expect("update");
        assert!(store.get_sync(Some("default"), "a").is_none());
    }
}
