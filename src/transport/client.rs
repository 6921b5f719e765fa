//! Peer Transport client - fetches values from a remote node over HTTP

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, instrument};

use super::wire::{GetRequest, GetResponse};
use crate::cache::PeerGetter;
use crate::error::{Error, Result};

/// Client for one peer, e.g. `http://10.0.0.2:8001` with base path `/_peercache/`
#[derive(Debug, Clone)]
pub struct HttpGetter {
    peer: String,
    base_path: String,
    client: Client,
}

impl HttpGetter {
    /// Create a getter sharing `client`'s connection pool
    pub fn new(peer: impl Into<String>, base_path: impl Into<String>, client: Client) -> Self {
        Self {
            peer: peer.into(),
            base_path: base_path.into(),
            client,
        }
    }

    /// Build a shared HTTP client; `timeout` of `None` waits indefinitely
    pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))
    }

    /// Full URL of a lookup
    pub fn url(&self, group: &str, key: &str) -> String {
        format!(
            "{}{}",
            self.peer,
            GetRequest::new(group, key).to_path(&self.base_path)
        )
    }

    fn connection_error(&self, err: reqwest::Error) -> Error {
        error!(peer = %self.peer, error = %err, "peer request failed");
        Error::PeerConnection {
            peer: self.peer.clone(),
            source: Arc::new(err),
        }
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    #[instrument(skip(self), fields(peer = %self.peer))]
    async fn get(&self, group: &str, key: &str) -> Result<Bytes> {
        let url = self.url(group, key);
        debug!(%url, "fetching from peer");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::PeerStatus {
                peer: self.peer.clone(),
                status: status.as_u16(),
                message: message.trim_end().to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.connection_error(e))?;
        Ok(GetResponse::decode(body)?.value)
    }

    fn addr(&self) -> &str {
        &self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn getter(peer: &str) -> HttpGetter {
        HttpGetter::new(peer, "/_peercache/", HttpGetter::build_client(None).unwrap())
    }

    #[test]
    fn test_url_escapes_segments() {
        let g = getter("http://10.0.0.2:8001");
        assert_eq!(g.url("scores", "Tom"), "http://10.0.0.2:8001/_peercache/scores/Tom");
        assert_eq!(
            g.url("scores", "a b/c"),
            "http://10.0.0.2:8001/_peercache/scores/a%20b%2Fc"
        );
        assert_eq!(g.addr(), "http://10.0.0.2:8001");
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        // Reserve a port, then free it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let g = getter(&format!("http://{}", addr));
        let err = g.get("scores", "Tom").await.unwrap_err();
        assert_matches!(err, Error::PeerConnection { .. });
        assert!(err.is_peer_error());
    }
}
