//! Property-Based Tests for the Cache Core
//!
//! # Test Properties
//!
//! 1. **Byte Budget**: a bounded LRU never holds more than its budget
//! 2. **Accounting**: tracked bytes equal the sum of retained key and value sizes
//! 3. **Retained Set**: the LRU keeps exactly what a naive recency list keeps
//! 4. **Ring Stability**: adding a node only moves keys onto that node
//! 5. **Wire Fidelity**: values and paths survive peer encoding

#![cfg(test)]

use std::collections::VecDeque;

use proptest::prelude::*;

use super::lru::LruCache;
use super::ring::HashRing;

// =============================================================================
// Property Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(String, String),
    Get(String),
}

/// Small key space so that replacements and promotions are frequent
fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "bb", "ccc", "dddd", "k1", "k2", "k3", "key"])
        .prop_map(str::to_string)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key_strategy(), "[a-z]{0,12}").prop_map(|(k, v)| Op::Add(k, v)),
        1 => key_strategy().prop_map(Op::Get),
    ]
}

fn node_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("10\\.0\\.0\\.[0-9]{1,3}:[0-9]{4}", 1..6)
        .prop_map(|set| set.into_iter().map(|n| format!("http://{}", n)).collect())
}

/// Reference model: most recent first
fn model_apply(model: &mut VecDeque<(String, usize)>, max_bytes: u64, op: &Op) {
    match op {
        Op::Add(k, v) => {
            model.retain(|(key, _)| key != k);
            model.push_front((k.clone(), k.len() + v.len()));
            while max_bytes != 0
                && model.iter().map(|(_, size)| *size as u64).sum::<u64>() > max_bytes
            {
                model.pop_back();
            }
        }
        Op::Get(k) => {
            if let Some(pos) = model.iter().position(|(key, _)| key == k) {
                if let Some(entry) = model.remove(pos) {
                    model.push_front(entry);
                }
            }
        }
    }
}

// =============================================================================
// LRU Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: a bounded cache stays within its byte budget after every op.
    #[test]
    fn prop_lru_respects_budget(
        max_bytes in 1u64..64,
        ops in prop::collection::vec(op_strategy(), 1..100),
    ) {
        let mut lru: LruCache<String> = LruCache::new(max_bytes);
        for op in &ops {
            match op {
                Op::Add(k, v) => lru.add(k.clone(), v.clone()),
                Op::Get(k) => { let _ = lru.get(k); }
            }
            prop_assert!(lru.bytes() <= max_bytes);
        }
    }

    /// Property: byte accounting matches the retained entries.
    #[test]
    fn prop_lru_byte_accounting(
        max_bytes in 0u64..64,
        ops in prop::collection::vec(op_strategy(), 1..100),
    ) {
        let mut lru: LruCache<String> = LruCache::new(max_bytes);
        for op in &ops {
            match op {
                Op::Add(k, v) => lru.add(k.clone(), v.clone()),
                Op::Get(k) => { let _ = lru.get(k); }
            }
        }

        let keys = lru.keys();
        prop_assert_eq!(keys.len(), lru.len());
        let total: u64 = keys
            .iter()
            .map(|k| (k.len() + lru.peek(k).map(String::len).unwrap_or(0)) as u64)
            .sum();
        prop_assert_eq!(total, lru.bytes());
    }

    /// Property: retained keys and their recency order match the model.
    #[test]
    fn prop_lru_matches_model(
        max_bytes in 0u64..48,
        ops in prop::collection::vec(op_strategy(), 1..100),
    ) {
        let mut lru: LruCache<String> = LruCache::new(max_bytes);
        let mut model = VecDeque::new();
        for op in &ops {
            match op {
                Op::Add(k, v) => lru.add(k.clone(), v.clone()),
                Op::Get(k) => { let _ = lru.get(k); }
            }
            model_apply(&mut model, max_bytes, op);
        }

        let expected: Vec<String> = model.into_iter().map(|(k, _)| k).collect();
        prop_assert_eq!(lru.keys(), expected);
    }
}

// =============================================================================
// Ring Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: identical membership yields identical ownership.
    #[test]
    fn prop_ring_deterministic(
        nodes in node_strategy(),
        keys in prop::collection::vec("[a-zA-Z0-9]{1,16}", 1..50),
    ) {
        let mut a = HashRing::default();
        let mut b = HashRing::default();
        a.add(&nodes);
        b.add(&nodes);

        for key in &keys {
            let owner = a.get(key);
            prop_assert!(owner.is_some());
            prop_assert_eq!(owner, b.get(key));
        }
    }

    /// Property: adding a node moves keys only onto the new node.
    #[test]
    fn prop_ring_minimal_remap(
        nodes in node_strategy(),
        keys in prop::collection::vec("[a-zA-Z0-9]{1,16}", 1..100),
    ) {
        let newcomer = "http://192.168.1.1:9000".to_string();
        let mut before = HashRing::default();
        before.add(&nodes);
        let mut after = before.clone();
        after.add([&newcomer]);

        for key in &keys {
            let old = before.get(key);
            let new = after.get(key);
            prop_assert!(
                new == old || new == Some(newcomer.as_str()),
                "key {} moved from {:?} to {:?}", key, old, new
            );
        }
    }
}

// =============================================================================
// Wire Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: any value survives the peer response encoding.
    #[test]
    fn prop_wire_preserves_value(value in prop::collection::vec(any::<u8>(), 0..4096)) {
        use crate::transport::GetResponse;

        let encoded = GetResponse::new(bytes::Bytes::from(value.clone())).encode();
        let decoded = GetResponse::decode(encoded)?;
        prop_assert_eq!(&decoded.value[..], &value[..]);
    }

    /// Property: any group and key survive the request path.
    #[test]
    fn prop_wire_preserves_path(group in "\\PC{1,16}", key in "\\PC{0,32}") {
        use crate::transport::GetRequest;

        let req = GetRequest::new(group, key);
        let path = req.to_path(super::DEFAULT_BASE_PATH);
        prop_assert_eq!(GetRequest::from_path(&path, super::DEFAULT_BASE_PATH)?, req);
    }
}
