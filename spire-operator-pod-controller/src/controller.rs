use std::{sync::Arc, time::Duration};

use k8s_openapi::{
    api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::{
    ResourceExt,
    api::ObjectMeta,
    runtime::controller::Action,
};
use spire_operator_crds::v1alpha1::spiffe_id::{Selector, SpiffeId, SpiffeIdSpec};
use spire_operator_k8s_utils::ResourceStore;
use tracing::{debug, info, warn};

use crate::{Error, Result, context::Context};

const NAME_PREFIX: &str = "spire-operator-";

#[tracing::instrument(skip(pod, ctx), fields(pod = %pod.name_any()))]
pub(crate) async fn reconcile<S>(pod: Arc<Pod>, ctx: Arc<Context<S>>) -> Result<Action>
where
    S: ResourceStore<SpiffeId> + 'static,
{
    if pod.metadata.deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }
    let namespace = pod.namespace().ok_or(Error::InvalidResource)?;
    let pod_name = pod.metadata.name.clone().ok_or(Error::InvalidResource)?;

    let spiffe_id = match ctx.mode.spiffe_id(&ctx.trust_domain, &pod) {
        Ok(Some(id)) => id,
        Ok(None) => {
            debug!("{}/{} has no identity source, skipping", namespace, pod_name);
            return Ok(Action::await_change());
        }
        Err(error) => {
            warn!(%error, "cannot derive identity for {}/{}", namespace, pod_name);
            return Ok(Action::await_change());
        }
    };

    let name = derived_name(&pod_name);
    if ctx.store.get(Some(&namespace), &name).await?.is_some() {
        return Ok(Action::requeue(Duration::from_secs(300)));
    }

    let resource = derived_resource(&pod, &namespace, &name, spiffe_id.to_string());
    ctx.store.create(&resource).await?;
    info!("created {}/{} for {}", namespace, name, spiffe_id);
    Ok(Action::requeue(Duration::from_secs(300)))
}

pub(crate) fn error_policy<C>(pod: Arc<Pod>, error: &Error, _ctx: Arc<C>) -> Action {
    let name = pod.name_any();
    let ns = pod.namespace().unwrap_or_default();
    tracing::error!(?error, "reconcile error for {}/{}", ns, name);
    Action::requeue(Duration::from_secs(5))
}

fn derived_name(pod_name: &str) -> String {
    format!("{NAME_PREFIX}{pod_name}")
}

fn derived_resource(pod: &Pod, namespace: &str, name: &str, spiffe_id: String) -> SpiffeId {
    SpiffeId {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            owner_references: Some(owner_references(pod)),
            ..Default::default()
        },
        spec: SpiffeIdSpec {
            spiffe_id,
            selector: Selector {
                pod_name: pod.name_any(),
                namespace: namespace.into(),
                ..Default::default()
            },
        },
        status: None,
    }
}

fn owner_references(pod: &Pod) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: "v1".into(),
        block_owner_deletion: Some(true),
        controller: Some(true),
        kind: "Pod".into(),
        name: pod.name_any(),
        uid: pod.uid().unwrap_or_default(),
    }]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::PodSpec;
    use spire_operator_k8s_utils::memory::{MemoryStore, Write};

    use super::*;
    use crate::PodIdentityMode;

    fn make_context(mode: PodIdentityMode) -> (MemoryStore<SpiffeId>, Arc<Context<MemoryStore<SpiffeId>>>) {
        let store = MemoryStore::new();
        let ctx = Context {
            trust_domain: "example.org".into(),
            mode,
            store: store.clone(),
        };
        (store, Arc::new(ctx))
    }

    fn make_pod(name: &str, labels: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("prod".into()),
                uid: Some(format!("uid-{name}")),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            spec: Some(PodSpec {
                service_account_name: Some("web".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creates_owned_resource() {
        let (store, ctx) = make_context(PodIdentityMode::ServiceAccount);

        reconcile(Arc::new(make_pod("web-0", &[])), ctx)
            .await
            .expect("reconcile");

        let created = store
            .get_sync(Some("prod"), "spire-operator-web-0")
            .expect("created");
        assert_eq!(created.spec.spiffe_id, "spiffe://example.org/ns/prod/sa/web");
        assert_eq!(created.spec.selector.pod_name, "web-0");
        assert_eq!(created.spec.selector.namespace, "prod");

        let owners = created.metadata.owner_references.expect("owner refs");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Pod");
        assert_eq!(owners[0].uid, "uid-web-0");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_missing_label_creates_nothing() {
        let (store, ctx) = make_context(PodIdentityMode::Label("spiffe.io/spiffe-id".into()));

        let action = reconcile(Arc::new(make_pod("web-0", &[("app", "web")])), ctx)
            .await
            .expect("reconcile");
        assert_eq!(action, Action::await_change());
        assert!(store.objects().is_empty());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_annotation_creates_nothing() {
        let (store, ctx) =
            make_context(PodIdentityMode::Annotation("spiffe.io/spiffe-id".into()));

        let action = reconcile(
            Arc::new(make_pod("web-0", &[("spiffe.io/spiffe-id", "billing")])),
            ctx,
        )
        .await
        .expect("reconcile");
        assert_eq!(action, Action::await_change());
        assert!(store.objects().is_empty());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_label_value_is_path() {
        let (store, ctx) = make_context(PodIdentityMode::Label("spiffe.io/spiffe-id".into()));

        reconcile(
            Arc::new(make_pod("web-0", &[("spiffe.io/spiffe-id", "billing/api")])),
            ctx,
        )
        .await
        .expect("reconcile");

        let created = store
            .get_sync(Some("prod"), "spire-operator-web-0")
            .expect("created");
        assert_eq!(created.spec.spiffe_id, "spiffe://example.org/billing/api");
    }

    #[tokio::test]
    async fn test_existing_resource_left_alone() {
        let (store, ctx) = make_context(PodIdentityMode::ServiceAccount);
        let pod = Arc::new(make_pod("web-0", &[]));

        reconcile(pod.clone(), ctx.clone()).await.expect("first");
        reconcile(pod, ctx).await.expect("second");

        assert_eq!(store.objects().len(), 1);
        assert_eq!(
            store.writes(),
            vec![Write::Create("spire-operator-web-0".into())]
        );
    }

    #[tokio::test]
    async fn test_unusable_label_skipped() {
        let (store, ctx) = make_context(PodIdentityMode::Label("spiffe.io/spiffe-id".into()));

        let action = reconcile(
            Arc::new(make_pod("web-0", &[("spiffe.io/spiffe-id", "..")])),
            ctx,
        )
        .await
        .expect("reconcile");
        assert_eq!(action, Action::await_change());
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn test_terminating_pod_skipped() {
        let (store, ctx) = make_context(PodIdentityMode::ServiceAccount);
        let mut pod = make_pod("web-0", &[]);
        pod.metadata.deletion_timestamp = Some(
            k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(Default::default()),
        );

        reconcile(Arc::new(pod), ctx).await.expect("reconcile");
        assert!(store.objects().is_empty());
    }
}
