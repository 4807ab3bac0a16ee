use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

/// LRU-by-URL cache of raw image bytes. Memoized, no TTL; a failed fetch
/// caches nothing so the next call retries.
#[derive(Clone)]
pub struct ImageCache {
    cache: Arc<RwLock<LruCache<String, Bytes>>>,
    client: Client,
}

impl ImageCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(100).expect("nonzero"));
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            client: Client::new(),
        }
    }

    pub fn with_client(capacity: usize, client: Client) -> Self {
        let mut cache = Self::with_capacity(capacity);
        cache.client = client;
        cache
    }

    /// Load image bytes for the url, serving from cache when present.
    pub async fn load(&self, url: &str) -> Option<Bytes> {
        if let Some(bytes) = self.cache.write().get(url).cloned() {
            return Some(bytes);
        }

        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let bytes = response.bytes().await.ok()?;

        debug!(url, size = bytes.len(), "Cached image");
        self.cache.write().put(url.to_string(), bytes.clone());
        Some(bytes)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.cache.read().contains(url)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}
