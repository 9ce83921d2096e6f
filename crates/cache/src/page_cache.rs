//! Page-level response cache interface
//!
//! The rendering layer keeps its own coarse, HTML-page-granularity cache.
//! This layer only needs one thing from it: wholesale invalidation after
//! a transaction commit, since a commit may have touched content visible
//! on arbitrarily many rendered pages. The trait is the whole interface;
//! the real cache lives with the rendering layer.

use std::sync::atomic::{AtomicU64, Ordering};

/// The single call this layer makes into the page-level response cache
pub trait PageCache: Send + Sync {
    /// Drop every cached page
    fn invalidate_all(&self);
}

/// No-op implementation for deployments without a page cache
#[derive(Debug, Default)]
pub struct NoopPageCache;

impl PageCache for NoopPageCache {
    fn invalidate_all(&self) {}
}

/// Counting test double; records how often invalidation was requested
#[derive(Debug, Default)]
pub struct CountingPageCache {
    invalidations: AtomicU64,
}

impl CountingPageCache {
    /// Create a counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `invalidate_all` calls observed
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

impl PageCache for CountingPageCache {
    fn invalidate_all(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_page_cache() {
        let pc = CountingPageCache::new();
        assert_eq!(pc.invalidations(), 0);
        pc.invalidate_all();
        pc.invalidate_all();
        assert_eq!(pc.invalidations(), 2);
    }

    #[test]
    fn test_noop_is_object_safe() {
        let pc: Box<dyn PageCache> = Box::new(NoopPageCache);
        pc.invalidate_all();
    }
}
