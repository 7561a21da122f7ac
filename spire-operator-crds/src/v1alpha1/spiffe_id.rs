use std::collections::BTreeMap;

use kube::{Api, Client, CustomResource, KubeSchema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spire_operator_k8s_utils::ScopedResource;

pub const NAME_GROUP_SPIFFEID: &str = "spiffeids.spiffeid.spiffe.io";
pub const NAME_GROUP_CLUSTERSPIFFEID: &str = "clusterspiffeids.spiffeid.spiffe.io";

/// Attestation criteria a workload must satisfy to be issued the identity.
/// Every populated field contributes selectors; all of them must match.
#[derive(KubeSchema, Serialize, Deserialize, Default, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Pod label names/values to match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pod_label: BTreeMap<String, String>,
    /// Exact Pod name to match
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,
    /// Namespace the Pod must run in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Service account the Pod must run as
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,
    /// Raw `type:value` selectors passed to SPIRE as-is
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arbitrary: Vec<String>,
}

#[derive(
    CustomResource, KubeSchema, Serialize, Deserialize, Default, PartialEq, Eq, Clone, Debug,
)]
#[kube(
    group = "spiffeid.spiffe.io",
    version = "v1alpha1",
    kind = "SpiffeId",
    status = "SpiffeIdStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"SpiffeID","type":"string","jsonPath":".spec.spiffeId"}"#,
    printcolumn = r#"{"name":"Entry","type":"string","jsonPath":".status.entryId"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SpiffeIdSpec {
    /// The SPIFFE ID to register, `spiffe://<trust-domain>/<path>`
    pub spiffe_id: String,
    /// Selectors to match for this ID
    #[serde(default)]
    pub selector: Selector,
}

#[derive(
    CustomResource, KubeSchema, Serialize, Deserialize, Default, PartialEq, Eq, Clone, Debug,
)]
#[kube(
    group = "spiffeid.spiffe.io",
    version = "v1alpha1",
    kind = "ClusterSpiffeId",
    status = "SpiffeIdStatus",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"SpiffeID","type":"string","jsonPath":".spec.spiffeId"}"#,
    printcolumn = r#"{"name":"Entry","type":"string","jsonPath":".status.entryId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpiffeIdSpec {
    /// The SPIFFE ID to register, `spiffe://<trust-domain>/<path>`
    pub spiffe_id: String,
    /// Selectors to match for this ID
    #[serde(default)]
    pub selector: Selector,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpiffeIdStatus {
    /// The SPIRE entry ID registered for this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl ScopedResource for SpiffeId {
    fn scoped_api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        }
    }
}

impl ScopedResource for ClusterSpiffeId {
    fn scoped_api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}

#[cfg(test)]
mod tests {
    use kube::CustomResourceExt;

    use super::*;

    #[test]
    fn test_crd_scope_and_names() {
        let crd = SpiffeId::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some(NAME_GROUP_SPIFFEID));
        assert_eq!(crd.spec.scope, "Namespaced");

        let crd = ClusterSpiffeId::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some(NAME_GROUP_CLUSTERSPIFFEID));
        assert_eq!(crd.spec.scope, "Cluster");
    }

    #[test]
    fn test_crd_has_status_subresource() {
        for crd in [SpiffeId::crd(), ClusterSpiffeId::crd()] {
            let version = &crd.spec.versions[0];
            assert!(
                version
                    .subresources
                    .as_ref()
                    .and_then(|s| s.status.as_ref())
                    .is_some()
            );
        }
    }

    #[test]
    fn test_deserialize_manifest() {
        let manifest = r#"
apiVersion: spiffeid.spiffe.io/v1alpha1
kind: ClusterSpiffeId
metadata:
  name: svc-a
spec:
  spiffeId: spiffe://example.org/svc-a
  selector:
    podLabel:
      app: svc-a
    namespace: default
    arbitrary:
      - unix:uid:1000
status:
  entryId: E1
"#;
        let id: ClusterSpiffeId = serde_yaml::from_str(manifest).expect("manifest");
        assert_eq!(id.spec.spiffe_id, "spiffe://example.org/svc-a");
        assert_eq!(id.spec.selector.pod_label.get("app").map(String::as_str), Some("svc-a"));
        assert_eq!(id.spec.selector.namespace, "default");
        assert!(id.spec.selector.service_account.is_empty());
        assert_eq!(id.spec.selector.arbitrary, vec!["unix:uid:1000".to_string()]);
        assert_eq!(
            id.status.and_then(|s| s.entry_id).as_deref(),
            Some("E1")
        );
    }

    #[test]
    fn test_empty_selector_serializes_compactly() {
        let spec = SpiffeIdSpec {
            spiffe_id: "spiffe://example.org/a".into(),
            selector: Selector::default(),
        };
        let value = serde_json::to_value(&spec).expect("json");
        assert_eq!(
            value,
            serde_json::json!({"spiffeId": "spiffe://example.org/a", "selector": {}})
        );
    }
}
