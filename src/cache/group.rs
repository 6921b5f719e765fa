//! Cache Group - read-through orchestration for one namespace
//!
//! ```text
//! get(key)
//!   ├─ empty key ─────────────────────────────► Err(EmptyKey)
//!   ├─ main cache hit ────────────────────────► value
//!   └─ miss ─► coalescer(key)
//!                ├─ owning peer ─► remote fetch ─► value (not cached here)
//!                │                     └─ failure ─┐
//!                └─ origin callback ◄──────────────┘ ─► populate main cache ─► value
//! ```

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::byteview::ByteView;
use super::peers::{PeerGetter, PeerPicker};
use super::singleflight::Coalescer;
use super::stats::{CacheStats, GroupStats, GroupStatsSnapshot};
use super::store::MainCache;
use crate::error::{Error, Result};

/// Loads a value from the system of record on a cache miss
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}

/// Adapter turning a plain function into a `Getter`
pub struct GetterFunc<F>(pub F);

impl<F> GetterFunc<F>
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Getter for GetterFunc<F>
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        (self.0)(key)
    }
}

/// A named cache with its own store, miss callback, and peer set
pub struct Group {
    this: Weak<Group>,
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: MainCache,
    peers: OnceCell<Arc<dyn PeerPicker>>,
    loader: Coalescer<Result<ByteView>>,
    stats: GroupStats,
}

impl Group {
    /// Groups are created through `GroupRegistry::new_group`
    pub(crate) fn new(
        name: impl Into<String>,
        cache_bytes: u64,
        getter: Arc<dyn Getter>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            name: name.into(),
            getter,
            main_cache: MainCache::new(cache_bytes),
            peers: OnceCell::new(),
            loader: Coalescer::new(),
            stats: GroupStats::new(),
        })
    }

    /// Namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind the peer set. Allowed exactly once per group.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers
            .set(peers)
            .map_err(|_| Error::PeersAlreadyRegistered(self.name.clone()))?;
        info!(group = %self.name, "peers registered");
        Ok(())
    }

    /// True once `register_peers` has succeeded
    pub fn has_peers(&self) -> bool {
        self.peers.get().is_some()
    }

    /// Read-through lookup
    #[instrument(skip(self), fields(group = %self.name))]
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.stats.record_get();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(value) = self.main_cache.get(key) {
            self.stats.record_cache_hit();
            debug!("cache hit");
            return Ok(value);
        }

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        self.stats.record_load();
        // The load runs on its own task and must outlive this caller
        let group = self
            .this
            .upgrade()
            .ok_or_else(|| Error::Internal(format!("group {} dropped", self.name)))?;
        let owned_key = key.to_string();
        let outcome = self
            .loader
            .call(key, move || async move { group.load_once(&owned_key).await })
            .await;

        match outcome {
            Some((result, shared)) => {
                if shared {
                    debug!("joined in-flight load");
                }
                result
            }
            None => Err(Error::Internal(format!("load of {} aborted", key))),
        }
    }

    /// Body of one coalesced computation
    async fn load_once(&self, key: &str) -> Result<ByteView> {
        // A previous flight may have populated the store since our miss
        if let Some(value) = self.main_cache.get(key) {
            self.stats.record_cache_hit();
            return Ok(value);
        }
        self.stats.record_load_deduped();

        if let Some(peer) = self.peers.get().and_then(|picker| picker.pick_peer(key)) {
            match self.get_from_peer(peer.as_ref(), key).await {
                Ok(value) => {
                    self.stats.record_peer_load();
                    return Ok(value);
                }
                Err(err) => {
                    self.stats.record_peer_error();
                    warn!(peer = peer.addr(), error = %err, "peer fetch failed, loading locally");
                }
            }
        }

        self.get_locally(key).await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let bytes = peer.get(&self.name, key).await?;
        Ok(ByteView::from_owned(bytes))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        match self.getter.get(key).await {
            Ok(bytes) => {
                self.stats.record_local_load();
                let value = ByteView::copy_from_slice(&bytes);
                self.populate_cache(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                self.stats.record_local_load_err();
                debug!(error = %err, "origin lookup failed");
                Err(Error::origin(err))
            }
        }
    }

    fn populate_cache(&self, key: &str, value: ByteView) {
        self.main_cache.add(key, value);
    }

    /// Group counters
    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Main cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.main_cache.stats()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cached_items", &self.main_cache.len())
            .field("has_peers", &self.has_peers())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
