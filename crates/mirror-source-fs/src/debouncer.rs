//! Per-path debouncing of content changes.
//!
//! Editors often write a file several times per save. Each content change
//! pushes the path's deadline back, so one update is reported once the path
//! has been quiet for the debounce duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe update debouncer.
pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, Instant>>,
    debounce_duration: Duration,
}

impl EventDebouncer {
    pub fn new(debounce_duration: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            debounce_duration,
        }
    }

    /// Record a content change, restarting the path's quiet period.
    pub fn record(&self, path: PathBuf) {
        let deadline = Instant::now() + self.debounce_duration;
        self.pending.lock().unwrap().insert(path, deadline);
    }

    /// Forget pending updates at or below `path`.
    ///
    /// Called when a structural change makes them stale.
    pub fn cancel(&self, path: &Path) {
        self.pending
            .lock()
            .unwrap()
            .retain(|pending, _| !pending.starts_with(path));
    }

    /// Remove and return the paths whose quiet period has passed.
    pub fn drain_ready(&self) -> Vec<PathBuf> {
        let mut pending = self.pending.lock().unwrap();
        let now = Instant::now();

        let mut ready = Vec::new();
        pending.retain(|path, deadline| {
            if *deadline <= now {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready.sort();
        ready
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_update_emitted_after_deadline() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        debouncer.record(PathBuf::from("/src/a.md"));

        assert!(debouncer.drain_ready().is_empty());
        thread::sleep(Duration::from_millis(15));

        assert_eq!(debouncer.drain_ready(), vec![PathBuf::from("/src/a.md")]);
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_repeated_updates_coalesce() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        for _ in 0..5 {
            debouncer.record(PathBuf::from("/src/a.md"));
        }
        assert_eq!(debouncer.len(), 1);

        thread::sleep(Duration::from_millis(15));
        assert_eq!(debouncer.drain_ready().len(), 1);
    }

    #[test]
    fn test_cancel_drops_path_and_descendants() {
        let debouncer = EventDebouncer::new(Duration::ZERO);
        debouncer.record(PathBuf::from("/src/dir"));
        debouncer.record(PathBuf::from("/src/dir/a.md"));
        debouncer.record(PathBuf::from("/src/dirty.md"));

        debouncer.cancel(Path::new("/src/dir"));

        assert_eq!(debouncer.drain_ready(), vec![PathBuf::from("/src/dirty.md")]);
    }

    #[test]
    fn test_independent_paths() {
        let debouncer = EventDebouncer::new(Duration::ZERO);
        debouncer.record(PathBuf::from("/src/b.md"));
        debouncer.record(PathBuf::from("/src/a.md"));

        assert_eq!(
            debouncer.drain_ready(),
            vec![PathBuf::from("/src/a.md"), PathBuf::from("/src/b.md")]
        );
    }
}
