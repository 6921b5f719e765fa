//! HTTP Pool - the peer set of one node and its server role
//!
//! The pool owns the consistent hash ring over every peer's base URL
//! (including its own) and one `HttpGetter` per peer. Registered with a
//! group as its `PeerPicker`, it routes each key to the owning node; served
//! on a listener, it answers other nodes' lookups from the local registry.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::client::HttpGetter;
use super::wire::{GetRequest, GetResponse};
use crate::cache::{
    GroupRegistry, HashFn, HashRing, PeerGetter, PeerPicker, DEFAULT_BASE_PATH, DEFAULT_REPLICAS,
};
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for an `HttpPool`
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// URL prefix for peer requests; must start and end with `/`
    pub base_path: String,

    /// Virtual positions per peer on the hash ring
    pub replicas: usize,

    /// Ring hash; `None` selects CRC-32 (IEEE)
    pub hash_fn: Option<HashFn>,

    /// Per-request timeout for peer fetches; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            hash_fn: None,
            request_timeout: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(Error::Config(format!(
                "base path must start and end with '/': {:?}",
                self.base_path
            )));
        }
        if self.replicas == 0 {
            return Err(Error::Config("replicas must be at least 1".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Pool
// =============================================================================

struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

/// Peer set and server for one node
pub struct HttpPool {
    /// This node's base URL, e.g. `http://10.0.0.1:8001`
    self_addr: String,
    config: PoolConfig,
    registry: Arc<GroupRegistry>,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    /// Create a pool with an empty peer set
    pub fn new(
        self_addr: impl Into<String>,
        registry: Arc<GroupRegistry>,
        config: PoolConfig,
    ) -> Result<Self> {
        config.validate()?;
        let client = HttpGetter::build_client(config.request_timeout)?;
        let state = PoolState {
            ring: HashRing::new(config.replicas, config.hash_fn),
            getters: HashMap::new(),
        };

        Ok(Self {
            self_addr: self_addr.into(),
            config,
            registry,
            client,
            state: Mutex::new(state),
        })
    }

    /// Replace the peer set. `peers` are base URLs and should include this node.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers: Vec<String> = peers
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut ring = HashRing::new(self.config.replicas, self.config.hash_fn);
        ring.add(&peers);

        let getters = peers
            .iter()
            .map(|peer| {
                let getter = HttpGetter::new(peer, &self.config.base_path, self.client.clone());
                (peer.clone(), Arc::new(getter))
            })
            .collect();

        *self.state.lock() = PoolState { ring, getters };
        info!(node = %self.self_addr, peers = ?peers, "peer set updated");
    }

    /// Current peers, sorted
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.state.lock().getters.keys().cloned().collect();
        peers.sort();
        peers
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    // =========================================================================
    // Server role
    // =========================================================================

    /// Answer one peer lookup given its raw request path
    pub async fn respond(&self, path: &str) -> Response<Full<Bytes>> {
        let req = match GetRequest::from_path(path, &self.config.base_path) {
            Ok(req) => req,
            Err(e) => return text_response(StatusCode::BAD_REQUEST, e.to_string()),
        };
        info!(node = %self.self_addr, group = %req.group, key = %req.key, "serving peer request");

        let Some(group) = self.registry.get_group(&req.group) else {
            return text_response(
                StatusCode::NOT_FOUND,
                Error::GroupNotFound(req.group).to_string(),
            );
        };

        match group.get(&req.key).await {
            Ok(view) => {
                let body = GetResponse::new(view.to_bytes()).encode();
                let mut response = Response::new(Full::new(body));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/octet-stream"),
                );
                response
            }
            Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    async fn handle(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
        Ok(self.respond(req.uri().path()).await)
    }

    /// Serve peer requests on `listener` until accept fails
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!(node = %self.self_addr, %local, base_path = %self.config.base_path, "peer server listening");

        loop {
            let (stream, remote) = listener.accept().await?;
            debug!(%remote, "peer connection accepted");
            let io = TokioIo::new(stream);
            let pool = Arc::clone(&self);

            tokio::spawn(async move {
                let service = service_fn(move |req| Arc::clone(&pool).handle(req));
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Peer server connection error: {}", e);
                }
            });
        }
    }

    /// Bind `addr` and serve peer requests
    pub async fn run(self: Arc<Self>, addr: &str) -> Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid peer server address {}: {}", addr, e)))?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let peer = state.ring.get(key)?;
        if peer.is_empty() || peer == self.self_addr {
            return None;
        }
        info!(node = %self.self_addr, %peer, key, "pick peer");
        let getter: Arc<dyn PeerGetter> = state.getters.get(peer).cloned()?;
        Some(getter)
    }
}

impl std::fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_addr", &self.self_addr)
            .field("config", &self.config)
            .field("peers", &self.peers())
            .finish()
    }
}

fn text_response(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

// =============================================================================
// Tests
// =============================================================================
