//! Content cache for generated pages.
//!
//! The generator stores every page it converts under the page's url, and the
//! page-serving path reads from the same cache. The trait here decouples both
//! sides from the eviction strategy.
//!
//! # Implementations
//!
//! - [`FifoCache`]: bounded, evicts the oldest inserted key first
//! - [`NullCache`]: no-op implementation (always misses)
//!
//! # Example
//!
//! ```
//! use mirror_cache::{ContentCache, FifoCache};
//!
//! let cache = FifoCache::new(2);
//! cache.put("a.html", "<p>a</p>".to_owned());
//! cache.put("b.html", "<p>b</p>".to_owned());
//! cache.put("c.html", "<p>c</p>".to_owned());
//! assert_eq!(cache.try_get("a.html"), None);
//! assert!(cache.try_get("c.html").is_some());
//! ```

mod fifo;
pub use fifo::FifoCache;

/// Key-value store from generated url to generated content.
///
/// Implementations must be safe to share between the generator stage and any
/// number of readers.
pub trait ContentCache: Send + Sync {
    /// Retrieve cached content for `url`, if present.
    fn try_get(&self, url: &str) -> Option<String>;

    /// Store content for `url`, replacing any previous value.
    fn put(&self, url: &str, content: String);

    /// Remove `url` from the cache. Absent keys are ignored.
    fn invalidate(&self, url: &str);
}

/// No-op [`ContentCache`] that never stores anything.
///
/// Use when caching is disabled. Every lookup misses.
pub struct NullCache;

impl ContentCache for NullCache {
    fn try_get(&self, _url: &str) -> Option<String> {
        None
    }

    fn put(&self, _url: &str, _content: String) {}

    fn invalidate(&self, _url: &str) {}
}
