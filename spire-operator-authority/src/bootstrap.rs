use tokio::sync::OnceCell;

use crate::Result;
use crate::authority::Authority;
use crate::lookup::EntryLookup;
use crate::registration::Registration;
use crate::spiffe::SpiffeId;

/// The operator's own identity, parent of every entry it creates.
///
/// Registered at most once per process; concurrent callers wait on the same
/// initialization and a failed attempt leaves the cell empty for the next
/// caller to retry. The id is derived from the trust domain and cluster name,
/// so every replica converges on the same value.
pub struct OperatorIdentity {
    trust_domain: String,
    cluster: String,
    id: OnceCell<SpiffeId>,
}

impl OperatorIdentity {
    pub fn new(trust_domain: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            trust_domain: trust_domain.into(),
            cluster: cluster.into(),
            id: OnceCell::new(),
        }
    }

    pub async fn get<R, L>(&self, authority: &Authority<R, L>) -> Result<&SpiffeId>
    where
        R: Registration,
        L: EntryLookup,
    {
        self.id
            .get_or_try_init(|| authority.ensure_operator_identity(&self.trust_domain, &self.cluster))
            .await
    }

    pub fn cached(&self) -> Option<&SpiffeId> {
        self.id.get()
    }

    pub fn trust_domain(&self) -> &str {
        &self.trust_domain
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tonic::Status;

    use super::*;
    use crate::memory::{Call, InMemoryRegistration};

    #[tokio::test]
    async fn test_registers_once() {
        let registration = Arc::new(InMemoryRegistration::default());
        let authority = Authority::new(registration.clone());
        let identity = OperatorIdentity::new("example.org", "prod");
        assert!(identity.cached().is_none());

        let first = identity.get(&authority).await.expect("first").clone();
        let second = identity.get(&authority).await.expect("second").clone();
        assert_eq!(first, second);
        assert_eq!(identity.cached(), Some(&first));

        let creates = registration
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_failure_is_retried_by_next_caller() {
        let registration = Arc::new(InMemoryRegistration::default());
        let authority = Authority::new(registration.clone());
        let identity = OperatorIdentity::new("example.org", "prod");

        registration.fail_next_create(Status::unavailable("down"));
        assert!(identity.get(&authority).await.is_err());
        assert!(identity.cached().is_none());

        let id = identity.get(&authority).await.expect("retry");
        assert_eq!(
            id.to_string(),
            "spiffe://example.org/spire-k8s-operator/prod/node"
        );
    }

    #[tokio::test]
    async fn test_replicas_converge() {
        let registration = Arc::new(InMemoryRegistration::default());
        let authority = Authority::new(registration.clone());
        let a = OperatorIdentity::new("example.org", "prod");
        let b = OperatorIdentity::new("example.org", "prod");

        let (ida, idb) = tokio::join!(a.get(&authority), b.get(&authority));
        assert_eq!(ida.expect("a"), idb.expect("b"));
        assert_eq!(registration.entries().len(), 1);
    }
}
