pub mod config;
pub mod controller;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("kube error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("authority error: {0}")]
    AuthorityError(#[from] spire_operator_authority::Error),

    #[error("spiffeid controller error: {0}")]
    SpiffeIdControllerError(#[from] spire_operator_spiffeid_controller::Error),

    #[error("pod controller error: {0}")]
    PodControllerError(#[from] spire_operator_pod_controller::Error),

    #[error("crd error: {0}")]
    CrdError(#[from] spire_operator_crds::Error),

    #[error("task failed: {0}")]
    Task(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
