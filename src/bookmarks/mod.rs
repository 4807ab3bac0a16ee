use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::feed::Article;

/// Key-based bookmark persistence, keyed by article `url`.
///
/// The cache core only requires these four operations; the backing store is
/// a collaborator's concern.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Save a bookmark. Duplicate urls conflict with `AlreadyExists`.
    async fn save(&self, article: &Article) -> Result<(), StorageError>;

    /// Remove a bookmark. Missing urls fail with `NotFound`.
    async fn remove(&self, article: &Article) -> Result<(), StorageError>;

    async fn is_bookmarked(&self, article: &Article) -> Result<bool, StorageError>;

    /// All bookmarks in insertion order.
    async fn get_all(&self) -> Result<Vec<Article>, StorageError>;
}

/// In-memory bookmark store.
#[derive(Default, Clone)]
pub struct MemoryBookmarkStore {
    articles: Arc<RwLock<Vec<Article>>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.articles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.read().is_empty()
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn save(&self, article: &Article) -> Result<(), StorageError> {
        let mut articles = self.articles.write();
        if articles.iter().any(|a| a.url == article.url) {
            return Err(StorageError::AlreadyExists);
        }
        articles.push(article.clone());
        Ok(())
    }

    async fn remove(&self, article: &Article) -> Result<(), StorageError> {
        let mut articles = self.articles.write();
        let before = articles.len();
        articles.retain(|a| a.url != article.url);
        if articles.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn is_bookmarked(&self, article: &Article) -> Result<bool, StorageError> {
        Ok(self.articles.read().iter().any(|a| a.url == article.url))
    }

    async fn get_all(&self) -> Result<Vec<Article>, StorageError> {
        Ok(self.articles.read().clone())
    }
}

/// Observer of bookmark status changes for one article.
pub trait BookmarkObserver: Send + Sync {
    fn on_bookmark_changed(&self, url: &str, bookmarked: bool);
}

/// Bookmark change signaling scoped to article identity, so a detail view
/// hears about its own article only instead of a process-wide broadcast.
#[derive(Default, Clone)]
pub struct BookmarkEvents {
    subscribers: Arc<RwLock<HashMap<String, Vec<Arc<dyn BookmarkObserver>>>>>,
}

impl BookmarkEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, url: &str, observer: Arc<dyn BookmarkObserver>) {
        self.subscribers
            .write()
            .entry(url.to_string())
            .or_default()
            .push(observer);
    }

    /// Drop all subscriptions for the url (e.g. the detail view closed).
    pub fn unsubscribe(&self, url: &str) {
        self.subscribers.write().remove(url);
    }

    pub fn notify(&self, url: &str, bookmarked: bool) {
        let observers = {
            let subscribers = self.subscribers.read();
            subscribers.get(url).cloned().unwrap_or_default()
        };
        for observer in observers {
            observer.on_bookmark_changed(url, bookmarked);
        }
    }
}
