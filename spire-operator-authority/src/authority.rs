use tonic::Code;
use tracing::{debug, error, info, warn};

use crate::lookup::{EntryLookup, ListByParent};
use crate::registration::Registration;
use crate::selector::{Selector, SelectorSet};
use crate::spiffe::SpiffeId;
use crate::{Error, Result};

/// Selector type the node attestor uses to identify the cluster.
pub const OPERATOR_SELECTOR_TYPE: &str = "k8s_psat";

/// How [`Authority::delete_entry`] treats failures other than `NotFound`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Only a confirmed deletion or `NotFound` is a success.
    #[default]
    Strict,
    /// Log any other failure and report success anyway. Trades a possibly
    /// leaked entry for finalizers that never get stuck.
    IgnoreErrors,
}

/// The operator identity registered for `cluster`.
pub fn operator_spiffe_id(trust_domain: &str, cluster: &str) -> Result<SpiffeId> {
    SpiffeId::new(trust_domain, &format!("spire-k8s-operator/{cluster}/node"))
}

/// Idempotent create/delete on top of the authority's imperative API.
pub struct Authority<R, L = ListByParent> {
    registration: R,
    lookup: L,
    delete_policy: DeletePolicy,
}

impl<R: Registration> Authority<R> {
    pub fn new(registration: R) -> Self {
        Self {
            registration,
            lookup: ListByParent,
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl<R, L> Authority<R, L>
where
    R: Registration,
    L: EntryLookup,
{
    pub fn with_lookup<L2: EntryLookup>(self, lookup: L2) -> Authority<R, L2> {
        Authority {
            registration: self.registration,
            lookup,
            delete_policy: self.delete_policy,
        }
    }

    pub fn with_delete_policy(mut self, delete_policy: DeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub fn registration(&self) -> &R {
        &self.registration
    }

    /// Registers the operator's own identity under the server root. An
    /// existing registration counts as success; any other failure is a
    /// [`Error::Bootstrap`].
    #[tracing::instrument(skip(self))]
    pub async fn ensure_operator_identity(
        &self,
        trust_domain: &str,
        cluster: &str,
    ) -> Result<SpiffeId> {
        let operator_id = operator_spiffe_id(trust_domain, cluster)?;
        let server_id = SpiffeId::server(trust_domain)?;
        let selectors: SelectorSet =
            [Selector::new(OPERATOR_SELECTOR_TYPE, format!("cluster:{cluster}"))]
                .into_iter()
                .collect();

        info!("initializing operator parent id {}", operator_id);
        match self
            .registration
            .create_entry(
                &server_id.to_string(),
                &operator_id.to_string(),
                &selectors,
            )
            .await
        {
            Ok(entry_id) => info!(%entry_id, "created operator parent id {}", operator_id),
            Err(status) if status.code() == Code::AlreadyExists => {
                info!("operator parent id {} already registered", operator_id)
            }
            Err(source) => {
                error!(%source, "failed to create operator parent id {}", operator_id);
                return Err(Error::Bootstrap {
                    spiffe_id: operator_id.to_string(),
                    source,
                });
            }
        }
        Ok(operator_id)
    }

    /// Creates the entry, or returns the id of the identical entry the
    /// authority already holds.
    #[tracing::instrument(skip(self, selectors), fields(selectors = %selectors))]
    pub async fn create_or_reuse_entry(
        &self,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> Result<String> {
        let status = match self
            .registration
            .create_entry(parent_id, spiffe_id, selectors)
            .await
        {
            Ok(entry_id) => {
                info!(%entry_id, "created entry for {}", spiffe_id);
                return Ok(entry_id);
            }
            Err(status) => status,
        };

        if status.code() != Code::AlreadyExists {
            error!(%status, "failed to create entry for {}", spiffe_id);
            return Err(status.into());
        }

        let found = self
            .lookup
            .find_entry(&self.registration, parent_id, spiffe_id, selectors)
            .await?;
        match found {
            Some(entry_id) => {
                info!(%entry_id, "reusing existing entry for {}", spiffe_id);
                Ok(entry_id)
            }
            None => {
                warn!("entry for {} exists but could not be found", spiffe_id);
                Err(Error::DedupMismatch {
                    spiffe_id: spiffe_id.to_owned(),
                    parent_id: parent_id.to_owned(),
                })
            }
        }
    }

    /// Deletes the entry. `NotFound` is success; other failures follow the
    /// configured [`DeletePolicy`].
    #[tracing::instrument(skip(self))]
    pub async fn delete_entry(&self, entry_id: &str) -> Result<()> {
        match self.registration.delete_entry(entry_id).await {
            Ok(()) => info!("deleted entry {}", entry_id),
            Err(status) if status.code() == Code::NotFound => {
                debug!("entry {} already deleted", entry_id)
            }
            Err(status) => match self.delete_policy {
                DeletePolicy::Strict => {
                    error!(%status, "failed to delete entry {}", entry_id);
                    return Err(status.into());
                }
                DeletePolicy::IgnoreErrors => {
                    error!(%status, "failed to delete entry {}, treating it as deleted", entry_id)
                }
            },
        }
        Ok(())
    }
}
