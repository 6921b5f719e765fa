//! Peer abstractions
//!
//! A `PeerPicker` decides which peer owns a key; a `PeerGetter` fetches a
//! value from that peer. The HTTP implementations live in `transport`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Locates the peer that owns a key
pub trait PeerPicker: Send + Sync {
    /// The owning peer, or `None` when this node owns `key` (or there are
    /// no peers)
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Fetches a value for `(group, key)` from one remote peer
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Bytes>;

    /// Address used in logs
    fn addr(&self) -> &str;
}

/// Picker that never selects a peer (single-node operation)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_peers_never_picks() {
        assert!(NoPeers.pick_peer("Tom").is_none());
    }
}
