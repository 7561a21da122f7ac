use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authority error: {0}")]
    Status(#[from] tonic::Status),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error(
        "authority reported an existing entry for {spiffe_id} under {parent_id} but no entry with matching selectors was listed"
    )]
    DedupMismatch { spiffe_id: String, parent_id: String },

    #[error("invalid spiffe id {id}: {reason}")]
    InvalidSpiffeId { id: String, reason: &'static str },

    #[error("invalid trust domain: {0:?}")]
    InvalidTrustDomain(String),

    #[error("invalid authority endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to establish operator identity {spiffe_id}: {source}")]
    Bootstrap {
        spiffe_id: String,
        #[source]
        source: tonic::Status,
    },
}

impl Error {
    /// Errors that may resolve on their own and are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Status(_) | Error::Transport(_) | Error::DedupMismatch { .. }
        )
    }
}
