//! Read-Through Cache Core
//!
//! Groups of cached values, each with a byte-bounded LRU store, a miss
//! callback to the system of record, and an optional set of peers that
//! share ownership of the key space through a consistent hash ring.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        GroupRegistry                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Group "scores"                                               │
//! │  ┌──────────────┐   ┌──────────────┐   ┌───────────────────┐  │
//! │  │ MainCache    │   │ Coalescer    │   │ PeerPicker        │  │
//! │  │ (LRU, bytes) │   │ (per key)    │   │ (HashRing + HTTP) │  │
//! │  └──────────────┘   └──────────────┘   └───────────────────┘  │
//! │          ▲                  │                     │           │
//! │          └──── Getter ◄─────┴──── fallback ◄──────┘           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only values loaded from the origin are cached locally. Values owned by a
//! peer are fetched on every miss and live in that peer's store.

mod byteview;
mod group;
mod lru;
mod peers;
mod registry;
mod ring;
mod singleflight;
mod stats;
mod store;

#[cfg(test)]
mod proptest;

pub use byteview::ByteView;
pub use group::{Getter, GetterFunc, Group};
pub use lru::{LruCache, OnEvicted, Value};
pub use peers::{NoPeers, PeerGetter, PeerPicker};
pub use registry::GroupRegistry;
pub use ring::{crc32_ieee, HashFn, HashRing};
pub use singleflight::Coalescer;
pub use stats::{CacheStats, GroupStats, GroupStatsSnapshot};
pub use store::MainCache;

/// Virtual positions per peer on the hash ring
pub const DEFAULT_REPLICAS: usize = 50;

/// URL prefix under which peers serve each other
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";
