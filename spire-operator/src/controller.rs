use std::sync::Arc;

use spire_operator_authority::{Authority, GrpcRegistration, OperatorIdentity, connect};
use spire_operator_pod_controller::start_pod_controller;
use spire_operator_spiffeid_controller::start_spiffeid_controllers;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{Error, Result, config::ControllerArgs};

pub async fn start(args: ControllerArgs, cancel: CancellationToken) -> Result<()> {
    let client = kube::Client::try_default().await?;

    let channel = connect(&args.spire_server).await?;
    let authority = Authority::new(GrpcRegistration::new(channel))
        .with_delete_policy(args.delete_policy.into());

    // Nothing can be registered without the parent identity
    let identity = Arc::new(OperatorIdentity::new(&args.trust_domain, &args.cluster));
    let operator_id = identity.get(&authority).await?;
    info!(%operator_id, "operator identity ready");

    let spiffeid_handle = tokio::spawn(start_spiffeid_controllers(
        client.clone(),
        authority,
        identity,
        cancel.clone(),
    ));

    let pod_handle = args.enable_pod_controller.then(|| {
        tokio::spawn(start_pod_controller(
            client,
            args.trust_domain.clone(),
            args.pod_identity_mode(),
            cancel.clone(),
        ))
    });
    let pods = async move {
        match pod_handle {
            Some(handle) => join(handle).await,
            None => Ok(()),
        }
    };

    tokio::try_join!(join(spiffeid_handle), pods)?;
    Ok(())
}

async fn join<E>(handle: JoinHandle<std::result::Result<(), E>>) -> Result<()>
where
    E: Into<Error>,
{
    handle
        .await
        .map_err(|e| Error::Task(e.to_string()))?
        .map_err(Into::into)
}
