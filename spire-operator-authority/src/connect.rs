use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::info;

use crate::{Error, Result};

const UNIX_PREFIX: &str = "unix://";

/// Opens a channel to the SPIRE server. Accepts `unix:///path/to/api.sock`
/// for the server's local admin socket, or an `http(s)://host:port` address.
/// A bare `host:port` is treated as plain http.
pub async fn connect(endpoint: &str) -> Result<Channel> {
    if let Some(path) = endpoint.strip_prefix(UNIX_PREFIX) {
        if path.is_empty() {
            return Err(Error::InvalidEndpoint(endpoint.to_owned()));
        }
        let path = path.to_owned();
        // The uri is ignored by the connector but must be well formed.
        let channel = Endpoint::try_from("http://[::]:50051")?
            .connect_with_connector(service_fn(move |_: Uri| {
                let path = path.clone();
                async move {
                    Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?))
                }
            }))
            .await?;
        info!("connected to spire server at {}", endpoint);
        return Ok(channel);
    }

    let uri = normalize_endpoint(endpoint)?;
    let channel = Endpoint::from_shared(uri)?.connect().await?;
    info!("connected to spire server at {}", endpoint);
    Ok(channel)
}

fn normalize_endpoint(endpoint: &str) -> Result<String> {
    if endpoint.is_empty() {
        return Err(Error::InvalidEndpoint(endpoint.to_owned()));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_owned());
    }
    if endpoint.contains("://") {
        return Err(Error::InvalidEndpoint(endpoint.to_owned()));
    }
    Ok(format!("http://{endpoint}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("spire-server:8081").expect("endpoint"),
            "http://spire-server:8081"
        );
        assert_eq!(
            normalize_endpoint("https://spire-server:8081").expect("endpoint"),
            "https://spire-server:8081"
        );
        assert!(normalize_endpoint("").is_err());
        assert!(normalize_endpoint("tcp://spire-server:8081").is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_socket_path() {
        assert!(matches!(
            connect("unix://").await,
            Err(Error::InvalidEndpoint(_))
        ));
    }
}
