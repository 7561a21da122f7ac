use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    StoreError(#[from] spire_operator_k8s_utils::Error),

    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] spire_operator_authority::Error),

    #[error("invalid resource reconciled")]
    InvalidResource,
}
