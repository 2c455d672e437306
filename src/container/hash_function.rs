use std::hash::{Hash, Hasher};
use std::sync::Arc;
use xxhash_rust::xxh3::Xxh3;

/// Hash function for index keys.
///
/// The default construction hashes through xxh3; `with_fn` installs an
/// arbitrary hash, which tests use to force collisions on chosen bits.
pub struct HashFunction<K> {
    hasher: Arc<dyn Fn(&K) -> u64 + Send + Sync>,
}

impl<K: Hash> HashFunction<K> {
    /// Creates the default xxh3-backed hash function.
    pub fn new() -> Self {
        Self {
            hasher: Arc::new(|key: &K| {
                let mut hasher = Xxh3::new();
                key.hash(&mut hasher);
                hasher.finish()
            }),
        }
    }
}

impl<K> HashFunction<K> {
    /// Creates a hash function backed by an arbitrary closure.
    pub fn with_fn(f: impl Fn(&K) -> u64 + Send + Sync + 'static) -> Self {
        Self { hasher: Arc::new(f) }
    }

    /// Returns the hash value of the given key.
    pub fn get_hash(&self, key: &K) -> u64 {
        (self.hasher)(key)
    }
}

impl<K> Clone for HashFunction<K> {
    fn clone(&self) -> Self {
        Self {
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<K: Hash> Default for HashFunction<K> {
    fn default() -> Self {
        Self::new()
    }
}
