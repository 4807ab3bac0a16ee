use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feed::{Article, NewsCategory};

/// One cached article row, tagged with the page it belongs to and its
/// position within that page.
///
/// For a given (category, page) the positions form a contiguous 0..N-1
/// sequence matching fetch order, and all rows share one expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub article: Article,
    pub category: NewsCategory,
    pub page: u32,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub position: u32,
}

/// Result of a cache read: the page's articles in position order, plus
/// whether their TTL has elapsed.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub articles: Vec<Article>,
    pub is_expired: bool,
}

/// TTL and eviction budget for the page cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// How long a cached page stays fresh.
    pub ttl: Duration,
    /// How many pages per category survive eviction.
    pub max_cached_pages: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_cached_pages: 5,
        }
    }
}

/// On-disk snapshot of the cache rows.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRows {
    rows: Vec<CachedEntry>,
    cache_version: u32,
    saved_at: DateTime<Utc>,
}

/// Row store of cached article pages keyed by (category, page).
///
/// A write atomically replaces the key's rows, stamps a fresh TTL, and runs
/// the page-count-budget eviction for the written category before any other
/// operation can observe the store. All operations take the one store-wide
/// lock, which is the whole-store serialization the concurrency model asks
/// for; none of them block on I/O while holding it except the snapshot write
/// itself.
///
/// Persistence is best-effort: load and save failures are logged and the
/// store behaves as if the affected rows never existed.
#[derive(Clone)]
pub struct PageCacheStore {
    rows: Arc<RwLock<Vec<CachedEntry>>>,
    policy: CachePolicy,
    cache_file: Option<PathBuf>,
}

impl PageCacheStore {
    /// Memory-only store. Used by tests and callers that do not want rows to
    /// survive a restart.
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            policy,
            cache_file: None,
        }
    }

    /// File-backed store. Loads any previously persisted rows; a missing or
    /// unreadable file starts the store empty.
    pub fn open(policy: CachePolicy, cache_file: PathBuf) -> Self {
        let rows = Self::load_rows(&cache_file);
        Self {
            rows: Arc::new(RwLock::new(rows)),
            policy,
            cache_file: Some(cache_file),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Replace any rows for (category, page) with fresh ones stamped with
    /// the policy TTL and evict pages beyond the category's budget.
    pub async fn write(&self, articles: &[Article], category: NewsCategory, page: u32) {
        self.write_with_ttl(articles, category, page, self.policy.ttl)
            .await;
    }

    /// Like [`write`](Self::write) but with an explicit TTL.
    pub async fn write_with_ttl(
        &self,
        articles: &[Article],
        category: NewsCategory,
        page: u32,
        ttl: Duration,
    ) {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(30 * 60));
        let expires_at = now + ttl;

        let snapshot = {
            let mut rows = self.rows.write();
            rows.retain(|r| !(r.category == category && r.page == page));

            for (index, article) in articles.iter().enumerate() {
                rows.push(CachedEntry {
                    article: article.clone(),
                    category,
                    page,
                    cached_at: now,
                    expires_at,
                    position: index as u32,
                });
            }

            Self::evict_old_pages(&mut rows, category, self.policy.max_cached_pages);
            rows.clone()
        };

        debug!(
            category = category.as_str(),
            page,
            count = articles.len(),
            "Cached page"
        );
        self.persist(snapshot);
    }

    /// Read the page's articles in position order. `None` means no rows
    /// exist for the key; `is_expired` reports whether the TTL has elapsed.
    pub async fn read(&self, category: NewsCategory, page: u32) -> Option<CacheLookup> {
        let rows = self.rows.read();
        let mut matched: Vec<&CachedEntry> = rows
            .iter()
            .filter(|r| r.category == category && r.page == page)
            .collect();

        if matched.is_empty() {
            return None;
        }

        matched.sort_by_key(|r| r.position);

        let now = Utc::now();
        let oldest_expiry = matched
            .iter()
            .map(|r| r.expires_at)
            .min()
            .expect("non-empty page has an expiry");

        Some(CacheLookup {
            articles: matched.iter().map(|r| r.article.clone()).collect(),
            is_expired: now >= oldest_expiry,
        })
    }

    /// Cheap existence check, ignoring expiry.
    pub async fn exists(&self, category: NewsCategory, page: u32) -> bool {
        self.rows
            .read()
            .iter()
            .any(|r| r.category == category && r.page == page)
    }

    /// Delete every row for the category.
    pub async fn clear_category(&self, category: NewsCategory) {
        let snapshot = {
            let mut rows = self.rows.write();
            rows.retain(|r| r.category != category);
            rows.clone()
        };
        self.persist(snapshot);
    }

    /// Delete every cached row.
    pub async fn clear_all(&self) {
        {
            self.rows.write().clear();
        }
        self.persist(Vec::new());
    }

    /// Delete all rows whose TTL has elapsed, across all keys. Returns how
    /// many rows were removed.
    pub async fn remove_expired(&self) -> usize {
        let now = Utc::now();
        let (removed, snapshot) = {
            let mut rows = self.rows.write();
            let before = rows.len();
            rows.retain(|r| r.expires_at >= now);
            (before - rows.len(), rows.clone())
        };

        if removed > 0 {
            debug!(removed, "Removed expired cache rows");
            self.persist(snapshot);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Keep only the `budget` most-recently-cached pages of the category.
    /// Pages are ranked by their newest `cached_at` descending; identical
    /// timestamps fall back to page number ascending so the policy stays
    /// deterministic and idempotent.
    fn evict_old_pages(rows: &mut Vec<CachedEntry>, category: NewsCategory, budget: usize) {
        let mut newest_by_page: HashMap<u32, DateTime<Utc>> = HashMap::new();
        for row in rows.iter().filter(|r| r.category == category) {
            newest_by_page
                .entry(row.page)
                .and_modify(|t| {
                    if row.cached_at > *t {
                        *t = row.cached_at;
                    }
                })
                .or_insert(row.cached_at);
        }

        if newest_by_page.len() <= budget {
            return;
        }

        let mut ranked: Vec<(u32, DateTime<Utc>)> = newest_by_page.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let evicted: Vec<u32> = ranked.iter().skip(budget).map(|(page, _)| *page).collect();
        rows.retain(|r| r.category != category || !evicted.contains(&r.page));

        debug!(
            category = category.as_str(),
            ?evicted,
            "Evicted pages beyond cache budget"
        );
    }

    fn load_rows(path: &PathBuf) -> Vec<CachedEntry> {
        if !path.exists() {
            debug!(path = %path.display(), "No cache file to load");
            return Vec::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<PersistedRows>(&content) {
            Ok(data) => {
                debug!(rows = data.rows.len(), "Loaded cache rows from disk");
                data.rows
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse cache file, starting empty");
                Vec::new()
            }
        }
    }

    /// Best-effort snapshot write: temp file first, then rename, so readers
    /// of the file never see a half-written snapshot. Failures are logged
    /// and swallowed; the in-memory rows stay authoritative.
    fn persist(&self, rows: Vec<CachedEntry>) {
        let Some(path) = &self.cache_file else {
            return;
        };

        let data = PersistedRows {
            rows,
            cache_version: 1,
            saved_at: Utc::now(),
        };

        let json = match serde_json::to_string(&data) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cache snapshot");
                return;
            }
        };

        let temp = path.with_extension("tmp");
        if let Err(e) = fs::write(&temp, json) {
            warn!(path = %temp.display(), error = %e, "Failed to write cache snapshot");
            return;
        }
        if let Err(e) = fs::rename(&temp, path) {
            warn!(path = %path.display(), error = %e, "Failed to commit cache snapshot");
        }
    }
}
