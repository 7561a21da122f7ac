use std::fmt::Debug;

use kube::{
    Api, Client, Resource, ResourceExt,
    api::{Patch, PatchParams, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;

use crate::{Error, Result};

/// Builds the correctly scoped [`Api`] for a resource kind.
pub trait ScopedResource: Resource<DynamicType = ()> + Sized {
    fn scoped_api(client: Client, namespace: Option<&str>) -> Api<Self>;
}

/// Authoritative reads and writes of Kubernetes objects.
///
/// Reconcilers go through this instead of a reflector cache so that every
/// decision is made against the latest persisted state.
pub trait ResourceStore<K>: Send + Sync {
    fn get(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> impl Future<Output = Result<Option<K>>> + Send;

    fn create(&self, obj: &K) -> impl Future<Output = Result<K>> + Send;

    /// Replaces metadata and spec. Fails on a stale resourceVersion.
    fn update(&self, obj: &K) -> impl Future<Output = Result<K>> + Send;

    /// Writes only the status subresource.
    fn update_status(&self, obj: &K) -> impl Future<Output = Result<K>> + Send;
}

#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
    manager: String,
}

impl KubeResourceStore {
    pub fn new(client: Client, manager: impl Into<String>) -> Self {
        Self {
            client,
            manager: manager.into(),
        }
    }

    fn api<K: ScopedResource>(&self, obj: &K) -> Api<K> {
        K::scoped_api(self.client.clone(), obj.meta().namespace.as_deref())
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.manager.clone()),
            ..Default::default()
        }
    }
}

impl<K> ResourceStore<K> for KubeResourceStore
where
    K: ScopedResource + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>> {
        let api = K::scoped_api(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create(&self, obj: &K) -> Result<K> {
        debug!(name = %obj.name_any(), "creating resource");
        Ok(self.api(obj).create(&self.post_params(), obj).await?)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let name = obj.meta().name.as_deref().ok_or(Error::MissingName)?;
        Ok(self.api(obj).replace(name, &self.post_params(), obj).await?)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let name = obj.meta().name.as_deref().ok_or(Error::MissingName)?;
        let value = serde_json::to_value(obj)?;
        let status = value.get("status").cloned().unwrap_or_default();
        // resourceVersion in the merge body makes the write conditional
        let patch = json!({
            "metadata": { "resourceVersion": obj.meta().resource_version },
            "status": status,
        });
        let params = PatchParams {
            field_manager: Some(self.manager.clone()),
            ..Default::default()
        };
        Ok(self
            .api(obj)
            .patch_status(name, &params, &Patch::Merge(&patch))
            .await?)
    }
}
