//! Eviction Store - byte-budgeted LRU
//!
//! Strict least-recently-used ordering over a fixed byte budget.
//!
//! # Design
//!
//! - Doubly linked recency list stored in a slot vector and linked by index,
//!   so promotion and eviction are O(1) without unsafe pointers
//! - `HashMap<String, usize>` index from key to slot
//! - Entry size = key length + value length; budget 0 means unbounded
//!
//! ```text
//!   head (most recent) ─► [slot 3] ◄──► [slot 0] ◄──► [slot 5] ◄── tail (evict next)
//! ```
//!
//! Not thread-safe. The owning group serializes access (see `store.rs`).

use std::collections::HashMap;

/// Anything stored in the LRU reports its size in bytes
pub trait Value {
    fn len(&self) -> usize;
}

impl Value for String {
    fn len(&self) -> usize {
        self.len()
    }
}

impl Value for Vec<u8> {
    fn len(&self) -> usize {
        self.len()
    }
}

/// Callback fired synchronously for every evicted entry
pub type OnEvicted<V> = Box<dyn FnMut(&str, &V) + Send>;

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Byte-budgeted LRU cache
pub struct LruCache<V> {
    /// Byte budget (0 = unbounded)
    max_bytes: u64,
    /// Bytes currently tracked (keys + values)
    nbytes: u64,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<String, usize>,
    evictions: u64,
    on_evicted: Option<OnEvicted<V>>,
}

impl<V: Value> LruCache<V> {
    /// Create an LRU holding at most `max_bytes` (0 = unbounded)
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            nbytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            evictions: 0,
            on_evicted: None,
        }
    }

    /// Register the eviction callback
    pub fn with_on_evicted<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(f));
        self
    }

    /// Insert or replace `key`, then evict from the tail while over budget
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(&idx) = self.index.get(&key) {
            self.detach(idx);
            self.attach_front(idx);
            if let Some(node) = self.slots[idx].as_mut() {
                self.nbytes = self.nbytes - node.value.len() as u64 + value.len() as u64;
                node.value = value;
            }
        } else {
            let size = (key.len() + value.len()) as u64;
            let node = Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            };
            let idx = match self.free.pop() {
                Some(idx) => {
                    self.slots[idx] = Some(node);
                    idx
                }
                None => {
                    self.slots.push(Some(node));
                    self.slots.len() - 1
                }
            };
            self.attach_front(idx);
            self.index.insert(key, idx);
            self.nbytes += size;
        }

        while self.max_bytes != 0 && self.nbytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Look up `key`, promoting it to most-recently-used on a hit
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.detach(idx);
        self.attach_front(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Look up `key` without touching recency
    pub fn peek(&self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Evict the least-recently-used entry and fire the eviction callback
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.tail?;
        let (key, value) = self.take(idx)?;
        self.evictions += 1;
        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&key, &value);
        }
        Some((key, value))
    }

    /// Remove `key` explicitly. Explicit removal is not an eviction: the
    /// eviction callback does not fire.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = *self.index.get(key)?;
        self.take(idx).map(|(_, value)| value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no entries are cached
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently tracked
    pub fn bytes(&self) -> u64 {
        self.nbytes
    }

    /// Configured byte budget
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Entries evicted since creation
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys ordered from most to least recently used
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            match self.slots[idx].as_ref() {
                Some(node) => {
                    out.push(node.key.clone());
                    cursor = node.next;
                }
                None => break,
            }
        }
        out
    }

    /// Unlink slot `idx`, free it, and fix up the byte count
    fn take(&mut self, idx: usize) -> Option<(String, V)> {
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.index.remove(&node.key);
        self.nbytes -= (node.key.len() + node.value.len()) as u64;
        Some((node.key, node.value))
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(node) = self.slots[h].as_mut() {
                node.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_get_hit_and_miss() {
        let mut lru = LruCache::new(0);
        lru.add("key1", "1234".to_string());

        assert_eq!(lru.get("key1").map(String::as_str), Some("1234"));
        assert!(lru.get("key2").is_none());
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.bytes(), 8);
    }

    #[test]
    fn test_remove_oldest_on_budget() {
        let (k1, k2, k3) = ("key1", "key2", "k3");
        let (v1, v2, v3) = ("value1", "value2", "v3");
        let budget = (k1.len() + k2.len() + v1.len() + v2.len()) as u64;
        assert_eq!(budget, 20);

        let mut lru = LruCache::new(budget);
        lru.add(k1, v1.to_string());
        lru.add(k2, v2.to_string());
        lru.add(k3, v3.to_string());

        assert!(lru.get("key1").is_none());
        assert!(lru.get("key2").is_some());
        assert!(lru.get("k3").is_some());
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.bytes(), 14);
        assert_eq!(lru.evictions(), 1);
    }

    #[test]
    fn test_on_evicted_fires_in_order() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let mut lru = LruCache::new(10).with_on_evicted(move |key: &str, _value: &String| {
            sink.lock().unwrap().push(key.to_string());
        });

        lru.add("key1", "123456".to_string());
        lru.add("k2", "k2".to_string());
        lru.add("k3", "k3".to_string());
        lru.add("k4", "k4".to_string());

        assert_eq!(*evicted.lock().unwrap(), vec!["key1", "k2"]);
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut lru = LruCache::new(12);
        lru.add("a", "11111".to_string());
        lru.add("b", "22222".to_string());

        // Touch "a" so "b" becomes the eviction candidate
        lru.get("a");
        lru.add("c", "33333".to_string());

        assert!(lru.peek("a").is_some());
        assert!(lru.peek("b").is_none());
        assert_eq!(lru.keys(), vec!["c", "a"]);
    }

    #[test]
    fn test_replace_adjusts_bytes() {
        let mut lru = LruCache::new(0);
        lru.add("key", "short".to_string());
        assert_eq!(lru.bytes(), 8);

        lru.add("key", "a much longer value".to_string());
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.bytes(), 22);

        lru.add("key", "x".to_string());
        assert_eq!(lru.bytes(), 4);
    }

    #[test]
    fn test_replace_promotes_and_can_evict_others() {
        let mut lru = LruCache::new(10);
        lru.add("a", "1111".to_string());
        lru.add("b", "2".to_string());
        lru.add("a", "111111".to_string());

        // a=7 bytes, b=2 bytes: fits
        assert_eq!(lru.keys(), vec!["a", "b"]);

        lru.add("a", "11111111".to_string());
        // a=9 + b=2 > 10: b is least recent
        assert_eq!(lru.keys(), vec!["a"]);
        assert_eq!(lru.bytes(), 9);
    }

    #[test]
    fn test_oversized_entry_is_evicted_immediately() {
        let mut lru = LruCache::new(4);
        lru.add("big", "0123456789".to_string());
        assert!(lru.is_empty());
        assert_eq!(lru.bytes(), 0);
        assert_eq!(lru.evictions(), 1);
    }

    #[test]
    fn test_explicit_remove_is_not_eviction() {
        let fired = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&fired);
        let mut lru = LruCache::new(0).with_on_evicted(move |_: &str, _: &Vec<u8>| {
            *counter.lock().unwrap() += 1;
        });

        lru.add("k", vec![0u8; 3]);
        assert_eq!(lru.remove("k"), Some(vec![0u8; 3]));
        assert!(lru.remove("k").is_none());
        assert_eq!(*fired.lock().unwrap(), 0);
        assert_eq!(lru.evictions(), 0);
        assert_eq!(lru.bytes(), 0);
    }

    #[test]
    fn test_remove_oldest_on_empty() {
        let mut lru: LruCache<String> = LruCache::new(0);
        assert!(lru.remove_oldest().is_none());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut lru = LruCache::new(6);
        for i in 0..100 {
            lru.add(format!("k{}", i % 10), "v".to_string());
        }
        assert!(lru.slots.len() <= 3);
        assert_eq!(lru.len(), 2);
    }
}
