use spire_operator_authority::{Selector, SelectorSet};
use spire_operator_crds::v1alpha1::spiffe_id::Selector as SelectorSpec;

/// Selector type of the workload attestor's Kubernetes plugin.
pub const K8S_SELECTOR_TYPE: &str = "k8s";

/// Computes the attestation selectors for a selector spec. Every populated
/// field contributes; arbitrary strings are passed through untouched.
pub fn build_selectors(spec: &SelectorSpec) -> SelectorSet {
    let mut selectors = SelectorSet::new();
    for (key, value) in &spec.pod_label {
        selectors.insert(Selector::new(
            K8S_SELECTOR_TYPE,
            format!("pod-label:{key}:{value}"),
        ));
    }
    if !spec.pod_name.is_empty() {
        selectors.insert(Selector::new(
            K8S_SELECTOR_TYPE,
            format!("pod-name:{}", spec.pod_name),
        ));
    }
    if !spec.namespace.is_empty() {
        selectors.insert(Selector::new(
            K8S_SELECTOR_TYPE,
            format!("ns:{}", spec.namespace),
        ));
    }
    if !spec.service_account.is_empty() {
        selectors.insert(Selector::new(
            K8S_SELECTOR_TYPE,
            format!("sa:{}", spec.service_account),
        ));
    }
    for raw in &spec.arbitrary {
        selectors.insert(Selector::from_raw(raw));
    }
    selectors
}
