use clap::{Parser, Subcommand, ValueEnum};
use spire_operator_authority::DeletePolicy;
use spire_operator_pod_controller::PodIdentityMode;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Commands {
    Controller(ControllerArgs),
    /// Print the CustomResourceDefinitions as YAML
    Crdgen,
}

#[derive(Parser, Debug, Clone)]
pub struct ControllerArgs {
    /// SPIRE server registration API, `http(s)://host:port` or `unix:///path/to/api.sock`
    #[arg(long, env = "SPIRE_SERVER")]
    pub spire_server: String,

    /// Trust domain of the SPIRE server
    #[arg(long, env = "TRUST_DOMAIN")]
    pub trust_domain: String,

    /// Cluster name as configured in the server's k8s_psat node attestor
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster: String,

    /// How failed entry deletions other than not found are treated
    #[arg(long, env = "DELETE_POLICY", value_enum, default_value_t = DeletePolicyArg::Strict)]
    pub delete_policy: DeletePolicyArg,

    /// Create SpiffeIds for Pods automatically
    #[arg(long)]
    pub enable_pod_controller: bool,

    /// Pod label whose value is the SPIFFE ID path
    #[arg(long, env = "POD_LABEL", conflicts_with = "pod_annotation")]
    pub pod_label: Option<String>,

    /// Pod annotation whose value is the SPIFFE ID path
    #[arg(long, env = "POD_ANNOTATION")]
    pub pod_annotation: Option<String>,
}

impl ControllerArgs {
    /// Label and annotation modes take precedence over the service account.
    pub fn pod_identity_mode(&self) -> PodIdentityMode {
        match (&self.pod_label, &self.pod_annotation) {
            (Some(label), _) => PodIdentityMode::Label(label.clone()),
            (None, Some(annotation)) => PodIdentityMode::Annotation(annotation.clone()),
            (None, None) => PodIdentityMode::ServiceAccount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeletePolicyArg {
    Strict,
    IgnoreErrors,
}

impl From<DeletePolicyArg> for DeletePolicy {
    fn from(arg: DeletePolicyArg) -> Self {
        match arg {
            DeletePolicyArg::Strict => DeletePolicy::Strict,
            DeletePolicyArg::IgnoreErrors => DeletePolicy::IgnoreErrors,
        }
    }
}
