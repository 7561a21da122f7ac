use kube::{Resource, ResourceExt};
use spire_operator_k8s_utils::ResourceStore;
use tracing::{debug, info};

use crate::Result;

/// Guards an external side effect with a finalizer marker.
///
/// The marker is persisted before the side effect is created and removed
/// only after cleanup succeeds, so a resource is never deleted while the
/// authority may still hold its entry.
///
/// Unlike `kube::runtime::finalizer`, this works over any [`ResourceStore`]
/// and takes the cleanup as a plain future.
#[derive(Debug, Clone, Copy)]
pub struct Finalizer {
    name: &'static str,
}

impl Finalizer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Deletion has been requested, whether or not a marker is attached.
    pub fn is_finalizable<K: Resource>(obj: &K) -> bool {
        obj.meta().deletion_timestamp.is_some()
    }

    pub fn is_attached<K: Resource>(&self, obj: &K) -> bool {
        obj.finalizers().iter().any(|f| f == self.name)
    }

    /// Attaches the marker and waits for the write to land. Returns the
    /// object as persisted.
    pub async fn add<K, S>(&self, store: &S, obj: &K) -> Result<K>
    where
        K: Resource + Clone + Send + Sync,
        S: ResourceStore<K>,
    {
        if self.is_attached(obj) {
            return Ok(obj.clone());
        }
        let mut obj = obj.clone();
        obj.finalizers_mut().push(self.name.to_string());
        let persisted = store.update(&obj).await?;
        debug!(finalizer = self.name, "added finalizer to {}", obj.name_any());
        Ok(persisted)
    }

    /// Runs `cleanup` and then drops the marker. Without a marker there is
    /// nothing to clean up. A failed cleanup leaves the marker in place.
    pub async fn finalize<K, S, F, Fut>(&self, store: &S, obj: &K, cleanup: F) -> Result<()>
    where
        K: Resource + Clone + Send + Sync,
        S: ResourceStore<K>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.is_attached(obj) {
            return Ok(());
        }
        cleanup().await?;

        let mut obj = obj.clone();
        obj.finalizers_mut().retain(|f| f != self.name);
        store.update(&obj).await?;
        info!(finalizer = self.name, "removed finalizer from {}", obj.name_any());
        Ok(())
    }
}
