use std::sync::Arc;

use futures::StreamExt;
use kube::{
    Api, Client,
    runtime::{Controller, watcher},
};
use spire_operator_authority::{Authority, EntryLookup, OperatorIdentity, Registration};
use spire_operator_crds::v1alpha1::spiffe_id::{ClusterSpiffeId, SpiffeId};
use spire_operator_k8s_utils::KubeResourceStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    Result,
    context::Context,
    controller::{error_policy, reconcile},
};

const MANAGER: &str = "spire-operator";

/// Runs the `SpiffeId` and `ClusterSpiffeId` controllers until `cancel` fires.
pub async fn start_spiffeid_controllers<R, L>(
    client: Client,
    authority: Authority<R, L>,
    identity: Arc<OperatorIdentity>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: Registration + 'static,
    L: EntryLookup + 'static,
{
    let context = Arc::new(Context {
        authority,
        identity,
        store: KubeResourceStore::new(client.clone(), MANAGER),
    });

    info!("starting spiffeid controllers");
    let cluster_ids = Controller::new(
        Api::<ClusterSpiffeId>::all(client.clone()),
        watcher::Config::default(),
    )
    .graceful_shutdown_on(shutdown(cancel.clone()))
    .run(reconcile, error_policy, context.clone())
    .filter_map(|x| async move { std::result::Result::ok(x) })
    .for_each(|_| futures::future::ready(()));

    let ids = Controller::new(Api::<SpiffeId>::all(client), watcher::Config::default())
        .graceful_shutdown_on(shutdown(cancel))
        .run(reconcile, error_policy, context)
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()));

    tokio::join!(cluster_ids, ids);
    Ok(())
}

async fn shutdown(cancel: CancellationToken) {
    cancel.cancelled().await;
}
