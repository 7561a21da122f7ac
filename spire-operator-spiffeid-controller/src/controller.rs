use std::{sync::Arc, time::Duration};

use kube::{ResourceExt, runtime::controller::Action};
use spire_operator_authority::{Authority, EntryLookup, Registration, SpiffeId};
use spire_operator_k8s_utils::ResourceStore;
use tracing::{debug, info, warn};

use crate::{
    Error, Result, context::Context, finalizer::Finalizer, resource::SpiffeIdResource,
    selector::build_selectors,
};

const RESYNC: Duration = Duration::from_secs(300);
const RETRY: Duration = Duration::from_secs(5);

/// Converges the authority towards one registration resource.
///
/// Every pass re-reads the resource, attaches the finalizer before anything
/// is created, and then asks the authority for the entry through
/// create-or-reuse. There is no separate update path: a changed spec simply
/// resolves to a different entry.
#[tracing::instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
pub(crate) async fn reconcile<K, R, S, L>(obj: Arc<K>, ctx: Arc<Context<R, S, L>>) -> Result<Action>
where
    K: SpiffeIdResource,
    R: Registration + 'static,
    S: ResourceStore<K> + 'static,
    L: EntryLookup + 'static,
{
    let name = obj.meta().name.clone().ok_or(Error::InvalidResource)?;
    let namespace = obj.namespace();
    let Some(current) = ctx.store.get(namespace.as_deref(), &name).await? else {
        debug!("{} no longer exists", name);
        return Ok(Action::await_change());
    };

    let finalizer = Finalizer::new(K::FINALIZER);
    if Finalizer::is_finalizable(&current) {
        finalizer
            .finalize(&ctx.store, &current, || retire(&ctx.authority, &current))
            .await?;
        return Ok(Action::await_change());
    }

    let spiffe_id = match current.spiffe_id().parse::<SpiffeId>() {
        Ok(id) => id,
        Err(error) => {
            warn!(%error, "ignoring {} until its spiffe id is fixed", name);
            return Ok(Action::await_change());
        }
    };

    let current = finalizer.add(&ctx.store, &current).await?;
    let parent_id = ctx.identity.get(&ctx.authority).await?;
    let selectors = build_selectors(current.selector());
    let entry_id = ctx
        .authority
        .create_or_reuse_entry(&parent_id.to_string(), &spiffe_id.to_string(), &selectors)
        .await?;

    if current.entry_id() != Some(entry_id.as_str()) {
        info!(%entry_id, "recording entry for {}", name);
        let mut updated = current.clone();
        updated.set_entry_id(entry_id);
        ctx.store.update_status(&updated).await?;
    }

    Ok(Action::requeue(RESYNC))
}

async fn retire<K, R, L>(authority: &Authority<R, L>, obj: &K) -> Result<()>
where
    K: SpiffeIdResource,
    R: Registration,
    L: EntryLookup,
{
    match obj.entry_id() {
        Some(entry_id) => Ok(authority.delete_entry(entry_id).await?),
        None => {
            debug!("{} was never registered", obj.name_any());
            Ok(())
        }
    }
}

pub(crate) fn error_policy<K, C>(k: Arc<K>, error: &Error, _ctx: Arc<C>) -> Action
where
    K: SpiffeIdResource,
{
    let name = k.name_any();
    let ns = k.namespace().unwrap_or_default();
    tracing::error!(?error, "reconcile error for {}/{}", ns, name);
    Action::requeue(RETRY)
}
