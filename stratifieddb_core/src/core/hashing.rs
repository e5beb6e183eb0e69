use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use once_cell::sync::Lazy;
use xxhash_rust::xxh64::xxh64;

pub(crate) static HASHER: Lazy<RandomState> = Lazy::new(|| {
    let hash_builder = RandomState::with_seed(1);
    return hash_builder;
});

pub(crate) type SeededMap<K, V> = HashMap<K, V, RandomState>;
pub(crate) type SeededSet<K> = HashSet<K, RandomState>;

pub(crate) fn new_map<K, V>() -> SeededMap<K, V> {
    HashMap::with_hasher(HASHER.clone())
}

pub(crate) fn new_set<K>() -> SeededSet<K> {
    HashSet::with_hasher(HASHER.clone())
}

/// 64-bit content hash used by the byte/string set matchers.
#[inline]
pub(crate) fn sum64(data: &[u8]) -> u64 {
    xxh64(data, 0)
}
