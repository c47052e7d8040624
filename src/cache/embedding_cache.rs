use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Thread-safe LRU cache for query embeddings.
///
/// Retrieval re-embeds the same query text often (repeated searches, the
/// citation flow following a generic search). Caching avoids redundant
/// gateway calls while keeping memory bounded by LRU eviction.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` embeddings (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("Cache capacity must be at least 1");
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Look up a cached embedding for a text.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.cache.lock().unwrap().get(text).cloned()
    }

    /// Store an embedding keyed by its source text.
    pub fn put(&self, text: String, embedding: Vec<f32>) {
        self.cache.lock().unwrap().put(text, embedding);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }
}
