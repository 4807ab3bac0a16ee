pub mod client;
pub mod dto;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single news article as the rest of the system sees it.
///
/// Immutable once constructed; identity is the canonical `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Article {}

/// Topic partition of the news feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    General,
    Business,
    Entertainment,
    Health,
    Science,
    Sports,
    Technology,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 7] = [
        NewsCategory::General,
        NewsCategory::Business,
        NewsCategory::Entertainment,
        NewsCategory::Health,
        NewsCategory::Science,
        NewsCategory::Sports,
        NewsCategory::Technology,
    ];

    /// Provider token for the category query parameter. `General` is the
    /// default feed and carries no token.
    pub fn api_token(&self) -> Option<&'static str> {
        match self {
            NewsCategory::General => None,
            NewsCategory::Business => Some("business"),
            NewsCategory::Entertainment => Some("entertainment"),
            NewsCategory::Health => Some("health"),
            NewsCategory::Science => Some("science"),
            NewsCategory::Sports => Some("sports"),
            NewsCategory::Technology => Some("technology"),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NewsCategory::General => "General",
            NewsCategory::Business => "Business",
            NewsCategory::Entertainment => "Entertainment",
            NewsCategory::Health => "Health",
            NewsCategory::Science => "Science",
            NewsCategory::Sports => "Sports",
            NewsCategory::Technology => "Technology",
        }
    }

    /// Stable key used for cache rows and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::General => "general",
            NewsCategory::Business => "business",
            NewsCategory::Entertainment => "entertainment",
            NewsCategory::Health => "health",
            NewsCategory::Science => "science",
            NewsCategory::Sports => "sports",
            NewsCategory::Technology => "technology",
        }
    }
}

/// Freshness of the data a fetch completion carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Fresh,
    Expired,
    Loading,
    Error,
}

/// Articles paired with the cache state they were served under, so callers
/// can tell a stale fallback apart from fresh data without a side channel.
#[derive(Debug, Clone)]
pub struct CachedArticles {
    pub articles: Vec<Article>,
    pub state: CacheState,
}

impl CachedArticles {
    pub fn fresh(articles: Vec<Article>) -> Self {
        Self {
            articles,
            state: CacheState::Fresh,
        }
    }

    pub fn expired(articles: Vec<Article>) -> Self {
        Self {
            articles,
            state: CacheState::Expired,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.state == CacheState::Expired
    }
}
