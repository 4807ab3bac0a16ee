pub mod bookmarks;
pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod images;
pub mod storage;

pub use config::{init_tracing, Config};
pub use controller::{FeedObserver, NewsFeedController, SessionSettings};
pub use error::{ConfigError, FetchError, StorageError};
pub use feed::client::{FeedClient, RemoteFeedClient};
pub use feed::{Article, CacheState, CachedArticles, NewsCategory};
pub use storage::{CacheLookup, CachePolicy, NewsCacheCoordinator, PageCacheStore};
