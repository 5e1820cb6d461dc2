//! Bounded FIFO content cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::ContentCache;

/// Bounded cache that evicts in insertion order.
///
/// Reads never refresh a key's position, so a frequently served page is
/// evicted as soon as it becomes the oldest insertion. Replacing the content
/// of an existing key keeps its original position. All operations take one
/// mutex.
pub struct FifoCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl FifoCache {
    /// Capacity used when none is configured.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FifoCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ContentCache for FifoCache {
    fn try_get(&self, url: &str) -> Option<String> {
        self.inner.lock().unwrap().entries.get(url).cloned()
    }

    fn put(&self, url: &str, content: String) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.entries.get_mut(url) {
            *existing = content;
            return;
        }

        while inner.order.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            tracing::debug!(url = %oldest, "evicted from content cache");
        }

        inner.order.push_back(url.to_owned());
        inner.entries.insert(url.to_owned(), content);
    }

    fn invalidate(&self, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.remove(url).is_some() {
            inner.order.retain(|key| key != url);
        }
    }
}
