use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    Api, Client,
    runtime::{Controller, watcher},
};
use spire_operator_crds::v1alpha1::spiffe_id::SpiffeId;
use spire_operator_k8s_utils::{KubeResourceStore, create_store_and_subscriber};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    PodIdentityMode, Result,
    context::Context,
    controller::{error_policy, reconcile},
};

const MANAGER: &str = "spire-operator-pod-controller";

/// Derives `SpiffeId` resources from Pods until `cancel` fires. Deleting a
/// derived resource triggers its Pod again, so it is recreated.
pub async fn start_pod_controller(
    client: Client,
    trust_domain: String,
    mode: PodIdentityMode,
    cancel: CancellationToken,
) -> Result<()> {
    let (pods, pod_subscriber) =
        create_store_and_subscriber(Api::<Pod>::all(client.clone()), Some(Duration::from_secs(30)))
            .await?;

    let context = Arc::new(Context {
        trust_domain,
        mode,
        store: KubeResourceStore::new(client.clone(), MANAGER),
    });

    info!(mode = ?context.mode, "starting pod controller");
    Controller::for_shared_stream(pod_subscriber, pods)
        .owns(Api::<SpiffeId>::all(client), watcher::Config::default())
        .graceful_shutdown_on(shutdown(cancel))
        .run(reconcile, error_policy, context)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
    Ok(())
}

async fn shutdown(cancel: CancellationToken) {
    cancel.cancelled().await;
}
