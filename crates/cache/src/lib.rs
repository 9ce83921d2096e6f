//! Shared caching for the polystore repository layer
//!
//! Two caches live at this boundary:
//!
//! - [`RepositoryCache`]: the process-wide record/query/count cache every
//!   backend adapter reads through and writes into
//! - [`PageCache`]: the interface to the rendering layer's coarse
//!   page-level response cache, invalidated wholesale on commit

pub mod lru;
pub mod page_cache;
pub mod repo_cache;

pub use lru::LruCache;
pub use page_cache::{CountingPageCache, NoopPageCache, PageCache};
pub use repo_cache::{CacheStats, CachedValue, RepositoryCache, DEFAULT_CAPACITY};
