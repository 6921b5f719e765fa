//! Consistent Hash Ring
//!
//! Maps arbitrary keys onto a fixed set of node identifiers. Each real node
//! is placed on the ring `replicas` times at `hash("{i}{node}")`, which
//! smooths the load across a handful of nodes and limits remapping to about
//! `1/N` of the key space when a node joins.
//!
//! Keys resolve clockwise to the first virtual position `>= hash(key)`,
//! wrapping to the first position past the end.

use std::collections::HashMap;

use super::DEFAULT_REPLICAS;

/// Pluggable 32-bit hash
pub type HashFn = fn(&[u8]) -> u32;

/// Default hash: CRC-32 (IEEE)
pub fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Consistent hash ring with virtual nodes
#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted virtual positions
    keys: Vec<u32>,
    /// Virtual position -> real node
    nodes: HashMap<u32, String>,
}

impl HashRing {
    /// Create a ring; `hash` defaults to CRC-32 (IEEE)
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        Self {
            hash: hash.unwrap_or(crc32_ieee),
            replicas,
            keys: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Add real nodes, each contributing `replicas` virtual positions
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{}{}", i, node).as_bytes());
                self.keys.push(position);
                self.nodes.insert(position, node.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    /// Node owning `key`, or `None` if the ring is empty
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&position| position < hash);
        let position = self.keys[idx % self.keys.len()];
        self.nodes.get(&position).map(String::as_str)
    }

    /// True if no node has been added
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of virtual positions on the ring
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Virtual positions per real node
    pub fn replicas(&self) -> usize {
        self.replicas
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS, None)
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("positions", &self.keys.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
