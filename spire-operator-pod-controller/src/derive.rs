use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use spire_operator_authority::SpiffeId;

use crate::Result;

const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Which part of a Pod's metadata names its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodIdentityMode {
    /// `ns/<namespace>/sa/<service-account>`
    ServiceAccount,
    /// The value of this label is the path.
    Label(String),
    /// The value of this annotation is the path.
    Annotation(String),
}

impl PodIdentityMode {
    /// Computes the identity for `pod`. `None` when the Pod does not carry
    /// the configured label or annotation.
    pub fn spiffe_id(&self, trust_domain: &str, pod: &Pod) -> Result<Option<SpiffeId>> {
        let path = match self {
            PodIdentityMode::ServiceAccount => {
                let namespace = pod.namespace().unwrap_or_default();
                let service_account = pod
                    .spec
                    .as_ref()
                    .and_then(|s| s.service_account_name.as_deref())
                    .filter(|sa| !sa.is_empty())
                    .unwrap_or(DEFAULT_SERVICE_ACCOUNT);
                format!("ns/{namespace}/sa/{service_account}")
            }
            PodIdentityMode::Label(key) => match pod.labels().get(key) {
                Some(value) => value.clone(),
                None => return Ok(None),
            },
            PodIdentityMode::Annotation(key) => match pod.annotations().get(key) {
                Some(value) => value.clone(),
                None => return Ok(None),
            },
        };
        Ok(Some(SpiffeId::new(trust_domain, &path)?))
    }
}
