//! Resilient source file reads.
//!
//! Editors and sync tools often hold a file open while the watcher already
//! reports it. [`FileReader`] retries such reads under a [`ReadPolicy`] and
//! reports a missing file immediately, since that only means the file was
//! removed between notification and read.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::SourceError;

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// How long to keep retrying a read that fails with a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Fail on the first error.
    Immediate,
    /// Retry until the elapsed time exceeds the budget.
    Bounded(Duration),
    /// Retry until the read succeeds or fails permanently.
    Unbounded,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self::Bounded(Duration::from_secs(2))
    }
}

/// Reads source files, retrying past transient lock contention.
#[derive(Debug, Clone)]
pub struct FileReader {
    policy: ReadPolicy,
    retry_interval: Duration,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(ReadPolicy::default())
    }
}

impl FileReader {
    /// Pause between attempts unless overridden.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

    #[must_use]
    pub fn new(policy: ReadPolicy) -> Self {
        Self {
            policy,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    #[must_use]
    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Read a file as text.
    ///
    /// Temporary failures are retried per the policy. The last error is
    /// returned once the policy gives up.
    pub fn read(&self, path: &Path) -> Result<String, SourceError> {
        self.read_with(path, |p| fs::read_to_string(p))
    }

    /// Read a file as text, folding every failure into `None`.
    ///
    /// A missing file is not worth a warning; anything else is logged.
    #[must_use]
    pub fn try_read(&self, path: &Path) -> Option<String> {
        match self.read(path) {
            Ok(content) => Some(content),
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "source file vanished before read");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "giving up on source file");
                None
            }
        }
    }

    fn read_with(
        &self,
        path: &Path,
        mut read: impl FnMut(&Path) -> io::Result<String>,
    ) -> Result<String, SourceError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match read(path) {
                Ok(content) => return Ok(content),
                Err(e) => SourceError::io(e, path).with_backend(BACKEND),
            };
            if !err.is_temporary() || !self.may_retry(started.elapsed()) {
                return Err(err);
            }
            tracing::debug!(path = %path.display(), attempt, error = %err, "source file busy, retrying");
            thread::sleep(self.retry_interval);
        }
    }

    fn may_retry(&self, elapsed: Duration) -> bool {
        match self.policy {
            ReadPolicy::Immediate => false,
            ReadPolicy::Bounded(budget) => elapsed < budget,
            ReadPolicy::Unbounded => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn busy() -> io::Error {
        io::Error::from(io::ErrorKind::WouldBlock)
    }

    fn fast(policy: ReadPolicy) -> FileReader {
        FileReader::new(policy).with_retry_interval(Duration::from_millis(1))
    }

    #[test]
    fn test_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.md");
        fs::write(&path, "# Hello").unwrap();

        let reader = FileReader::default();
        assert_eq!(reader.try_read(&path), Some("# Hello".to_owned()));
    }

    #[test]
    fn test_missing_file_short_circuits_even_when_unbounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.md");

        let reader = fast(ReadPolicy::Unbounded);
        let err = reader.read(&path).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(reader.try_read(&path), None);
    }

    #[test]
    fn test_retries_until_contention_clears() {
        let reader = fast(ReadPolicy::Bounded(Duration::from_secs(5)));
        let mut calls = 0;

        let content = reader
            .read_with(Path::new("/src/a.md"), |_| {
                calls += 1;
                if calls < 3 { Err(busy()) } else { Ok("done".to_owned()) }
            })
            .unwrap();

        assert_eq!(content, "done");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_immediate_policy_does_not_retry() {
        let reader = fast(ReadPolicy::Immediate);
        let mut calls = 0;

        let err = reader
            .read_with(Path::new("/src/a.md"), |_| {
                calls += 1;
                Err(busy())
            })
            .unwrap_err();

        assert_eq!(err.kind, SourceErrorKind::Locked);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_bounded_policy_gives_up_after_budget() {
        let reader = fast(ReadPolicy::Bounded(Duration::from_millis(30)));
        let mut calls = 0;
        let started = Instant::now();

        let err = reader
            .read_with(Path::new("/src/a.md"), |_| {
                calls += 1;
                Err(busy())
            })
            .unwrap_err();

        assert!(err.is_temporary());
        assert!(calls > 1);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_unbounded_policy_keeps_retrying() {
        let reader = fast(ReadPolicy::Unbounded);
        let mut calls = 0;

        let content = reader
            .read_with(Path::new("/src/a.md"), |_| {
                calls += 1;
                if calls < 20 { Err(busy()) } else { Ok("late".to_owned()) }
            })
            .unwrap();

        assert_eq!(content, "late");
        assert_eq!(calls, 20);
    }

    #[test]
    fn test_invalid_utf8_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.md");
        fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let reader = fast(ReadPolicy::Unbounded);
        let err = reader.read(&path).unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::InvalidData);
    }
}
