use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feed::client::FeedClient;
use crate::feed::{CachedArticles, NewsCategory};
use crate::storage::page_cache::PageCacheStore;

/// Orchestrates cache reads, network refetches, write-through, and the
/// stale-cache fallback.
///
/// The fallback contract: a connectivity failure never fails the caller as
/// long as something is cached for the key. The returned
/// [`CachedArticles::state`] tells the caller whether it got stale data.
/// Auth, rate-limit, server, and decoding failures always propagate; those
/// are problems the user should see, not paper over with old articles.
#[derive(Clone)]
pub struct NewsCacheCoordinator {
    client: Arc<dyn FeedClient>,
    store: PageCacheStore,
}

impl NewsCacheCoordinator {
    pub fn new(client: Arc<dyn FeedClient>, store: PageCacheStore) -> Self {
        Self { client, store }
    }

    /// Get one page of articles, serving from cache when fresh and falling
    /// back to stale cache rows when the refetch fails for lack of
    /// connectivity.
    pub async fn get_articles(
        &self,
        category: NewsCategory,
        page: u32,
    ) -> Result<CachedArticles, FetchError> {
        match self.store.read(category, page).await {
            Some(lookup) if !lookup.is_expired => {
                debug!(category = category.as_str(), page, "Cache hit, fresh");
                Ok(CachedArticles::fresh(lookup.articles))
            }
            Some(stale) => {
                debug!(category = category.as_str(), page, "Cache hit, expired; refetching");
                match self.client.fetch_page(category, page).await {
                    Ok(articles) => {
                        self.store.write(&articles, category, page).await;
                        Ok(CachedArticles::fresh(articles))
                    }
                    Err(e) if e.is_connectivity() => {
                        warn!(
                            category = category.as_str(),
                            page, "Offline; serving stale cached articles"
                        );
                        Ok(CachedArticles::expired(stale.articles))
                    }
                    Err(e) => Err(e),
                }
            }
            None => {
                debug!(category = category.as_str(), page, "Cache miss; fetching");
                let articles = self.client.fetch_page(category, page).await?;
                self.store.write(&articles, category, page).await;
                Ok(CachedArticles::fresh(articles))
            }
        }
    }

    pub async fn clear_all(&self) {
        self.store.clear_all().await;
    }

    pub async fn clear_category(&self, category: NewsCategory) {
        self.store.clear_category(category).await;
    }

    /// Sweep expired rows across all keys. Returns how many rows went away.
    pub async fn remove_expired(&self) -> usize {
        self.store.remove_expired().await
    }

    pub fn store(&self) -> &PageCacheStore {
        &self.store
    }
}
