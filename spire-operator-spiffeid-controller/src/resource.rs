use std::fmt::Debug;

use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};
use spire_operator_crds::v1alpha1::spiffe_id::{
    ClusterSpiffeId, Selector, SpiffeId, SpiffeIdStatus,
};

/// What the reconciler needs from a registration resource kind.
pub trait SpiffeIdResource:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Marker guarding the authority entry owned by this kind.
    const FINALIZER: &'static str;

    fn spiffe_id(&self) -> &str;

    fn selector(&self) -> &Selector;

    /// The registered entry, if any. An empty string counts as none.
    fn entry_id(&self) -> Option<&str>;

    fn set_entry_id(&mut self, entry_id: String);
}

fn entry_id(status: Option<&SpiffeIdStatus>) -> Option<&str> {
    status
        .and_then(|s| s.entry_id.as_deref())
        .filter(|id| !id.is_empty())
}

impl SpiffeIdResource for SpiffeId {
    const FINALIZER: &'static str = "finalizer.spiffeid.spiffe.io";

    fn spiffe_id(&self) -> &str {
        &self.spec.spiffe_id
    }

    fn selector(&self) -> &Selector {
        &self.spec.selector
    }

    fn entry_id(&self) -> Option<&str> {
        entry_id(self.status.as_ref())
    }

    fn set_entry_id(&mut self, entry_id: String) {
        self.status.get_or_insert_with(Default::default).entry_id = Some(entry_id);
    }
}

impl SpiffeIdResource for ClusterSpiffeId {
    const FINALIZER: &'static str = "finalizer.clusterspiffeid.spiffe.io";

    fn spiffe_id(&self) -> &str {
        &self.spec.spiffe_id
    }

    fn selector(&self) -> &Selector {
        &self.spec.selector
    }

    fn entry_id(&self) -> Option<&str> {
        entry_id(self.status.as_ref())
    }

    fn set_entry_id(&mut self, entry_id: String) {
        self.status.get_or_insert_with(Default::default).entry_id = Some(entry_id);
    }
}

#[cfg(test)]
mod tests {
    use spire_operator_crds::v1alpha1::spiffe_id::SpiffeIdSpec;

    use super::*;

    #[test]
    fn test_empty_entry_id_is_none() {
        let mut id = SpiffeId::new("a", SpiffeIdSpec::default());
        assert_eq!(id.entry_id(), None);

        id.status = Some(SpiffeIdStatus {
            entry_id: Some(String::new()),
        });
        assert_eq!(id.entry_id(), None);

        id.set_entry_id("E1".into());
        assert_eq!(id.entry_id(), Some("E1"));
    }
}
