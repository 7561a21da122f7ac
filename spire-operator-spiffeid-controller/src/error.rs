use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    StoreError(#[from] spire_operator_k8s_utils::Error),

    #[error("authority error: {0}")]
    AuthorityError(#[from] spire_operator_authority::Error),

    #[error("invalid resource reconciled")]
    InvalidResource,
}
