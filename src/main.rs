//! PeerCache node
//!
//! Runs one cache node: a peer server that other nodes query, a demo
//! `scores` group backed by an in-memory table, and optionally a front-end
//! API server for clients (`/api?key=`, `/stats`, `/metrics`, `/healthz`).
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      PeerCache Node                        │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌─────────────┐  │
//! │  │  API Server  │───▶│    Group     │───▶│  HttpPool   │  │
//! │  │  /api?key=   │    │  "scores"    │    │ (peer ring) │  │
//! │  └──────────────┘    └──────────────┘    └─────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Three-node example:
//!
//! ```text
//! peercache --addr http://localhost:8001 --bind 127.0.0.1:8001 \
//!     --peers http://localhost:8001,http://localhost:8002,http://localhost:8003 \
//!     --api-addr 127.0.0.1:9999
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use peercache::metrics::GroupMetrics;
use peercache::{GetterFunc, Group, GroupRegistry, HttpPool, PoolConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

/// PeerCache - distributed read-through cache node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL other peers use to reach this node
    #[arg(long, env = "PEERCACHE_ADDR", default_value = "http://localhost:8001")]
    addr: String,

    /// Peer server bind address
    #[arg(long, env = "PEERCACHE_BIND", default_value = "127.0.0.1:8001")]
    bind: String,

    /// All peer base URLs, including this node (comma-separated)
    #[arg(long, env = "PEERCACHE_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Front-end API server bind address
    #[arg(long, env = "PEERCACHE_API_ADDR")]
    api_addr: Option<String>,

    /// Name of the demo group
    #[arg(long, env = "PEERCACHE_GROUP", default_value = "scores")]
    group: String,

    /// Main cache budget in bytes (0 = unbounded)
    #[arg(long, env = "PEERCACHE_CACHE_BYTES", default_value = "2048")]
    cache_bytes: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let mut peers = args.peers.clone();
    if peers.is_empty() {
        peers.push(args.addr.clone());
    }

    info!("Starting PeerCache node");
    info!("  Advertised address: {}", args.addr);
    info!("  Peers: {}", peers.join(", "));
    info!("  Group: {} ({} bytes)", args.group, args.cache_bytes);

    let registry = Arc::new(GroupRegistry::new());
    let group = create_demo_group(&registry, &args.group, args.cache_bytes)?;

    let pool = Arc::new(
        HttpPool::new(&args.addr, Arc::clone(&registry), PoolConfig::default())
            .context("invalid peer pool configuration")?,
    );
    pool.set_peers(&peers);
    group.register_peers(pool.clone())?;

    let peer_server = {
        let pool = Arc::clone(&pool);
        let bind = args.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = pool.run(&bind).await {
                error!("Peer server error: {}", e);
            }
        })
    };

    if let Some(api_addr) = args.api_addr.clone() {
        let metrics = Arc::new(GroupMetrics::new()?);
        tokio::spawn(async move {
            if let Err(e) = run_api_server(&api_addr, group, registry, metrics).await {
                error!("API server error: {}", e);
            }
        });
    }

    tokio::select! {
        _ = peer_server => {
            error!("Peer server exited");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    info!("Node shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

// =============================================================================
// Demo Origin
// =============================================================================

fn create_demo_group(
    registry: &GroupRegistry,
    name: &str,
    cache_bytes: u64,
) -> anyhow::Result<Arc<Group>> {
    let db: HashMap<&'static str, &'static str> =
        HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]);

    let getter = GetterFunc::new(move |key: &str| {
        info!(key, "[SlowDB] search key");
        db.get(key)
            .map(|v| v.as_bytes().to_vec())
            .ok_or_else(|| anyhow::anyhow!("{} not exist", key))
    });

    Ok(registry.new_group(name, cache_bytes, Arc::new(getter))?)
}

// =============================================================================
// API Server
// =============================================================================

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn query_param(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.uri().query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if k != name {
            return None;
        }
        urlencoding::decode(v).ok().map(|v| v.into_owned())
    })
}

async fn api_handler(
    req: Request<Incoming>,
    group: Arc<Group>,
    registry: Arc<GroupRegistry>,
    metrics: Arc<GroupMetrics>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/api" => {
            let key = query_param(&req, "key").unwrap_or_default();
            match group.get(&key).await {
                Ok(view) => {
                    let mut response = text(StatusCode::OK, view.to_bytes());
                    response.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/octet-stream"),
                    );
                    response
                }
                Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            }
        }
        "/stats" => {
            let stats = serde_json::json!({
                "group": group.name(),
                "stats": group.stats(),
                "cache": group.cache_stats(),
            });
            let mut response = text(StatusCode::OK, stats.to_string());
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        "/healthz" | "/livez" | "/readyz" => text(StatusCode::OK, "ok"),
        "/metrics" => {
            metrics.update(&registry);
            match metrics.render() {
                Ok(body) => {
                    let mut response = text(StatusCode::OK, body);
                    response.headers_mut().insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static(metrics.format_type()),
                    );
                    response
                }
                Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            }
        }
        _ => text(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

async fn run_api_server(
    addr: &str,
    group: Arc<Group>,
    registry: Arc<GroupRegistry>,
    metrics: Arc<GroupMetrics>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid API server address: {}", addr))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;

    info!("API server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("API server accept error")?;

        let io = TokioIo::new(stream);
        let group = Arc::clone(&group);
        let registry = Arc::clone(&registry);
        let metrics = Arc::clone(&metrics);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                api_handler(
                    req,
                    Arc::clone(&group),
                    Arc::clone(&registry),
                    Arc::clone(&metrics),
                )
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("API server connection error: {}", e);
            }
        });
    }
}
