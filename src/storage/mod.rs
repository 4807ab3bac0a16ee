pub mod coordinator;
pub mod page_cache;

pub use coordinator::NewsCacheCoordinator;
pub use page_cache::{CacheLookup, CachePolicy, CachedEntry, PageCacheStore};
