//! PeerCache - In-process read-through cache with consistent-hash peer sharding
//!
//! Each node embeds named cache groups. On a miss a group asks the peer that
//! owns the key (chosen by a consistent hash ring), and falls back to a
//! host-supplied loader when it owns the key itself or the peer fails.
//! Concurrent misses for one key collapse into a single load.
//!
//! # Architecture
//!
//! ```text
//!            Group::get(key)
//!                  │
//!        ┌─────────▼─────────┐   hit
//!        │ MainCache (LRU)   │──────────► value
//!        └─────────┬─────────┘
//!                  │ miss
//!        ┌─────────▼─────────┐
//!        │ Coalescer         │  one load per key
//!        └─────────┬─────────┘
//!          ┌───────┴────────┐
//!   remote │                │ local
//!  ┌───────▼──────┐  ┌──────▼───────┐
//!  │ HttpGetter   │  │ Getter       │
//!  │ (owner peer) │  │ (origin)     │
//!  └──────────────┘  └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Groups, eviction store, hash ring, coalescer
//! - [`error`] - Error types
//! - [`metrics`] - Prometheus exposition of group statistics
//! - [`transport`] - HTTP peer client, server, and wire format
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use peercache::{GetterFunc, GroupRegistry, HttpPool, PoolConfig};
//!
//! # async fn run() -> peercache::Result<()> {
//! let registry = Arc::new(GroupRegistry::new());
//! let scores = registry.new_group(
//!     "scores",
//!     2 << 10,
//!     Arc::new(GetterFunc::new(|key: &str| Ok(key.as_bytes().to_vec()))),
//! )?;
//!
//! let pool = Arc::new(HttpPool::new(
//!     "http://localhost:8001",
//!     Arc::clone(&registry),
//!     PoolConfig::default(),
//! )?);
//! pool.set_peers(["http://localhost:8001", "http://localhost:8002"]);
//! scores.register_peers(pool.clone())?;
//!
//! let value = scores.get("Tom").await?;
//! println!("{}", value);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod metrics;
pub mod transport;

pub use cache::{ByteView, Getter, GetterFunc, Group, GroupRegistry, PeerGetter, PeerPicker};
pub use error::{Error, Result};
pub use transport::{HttpGetter, HttpPool, PoolConfig};
