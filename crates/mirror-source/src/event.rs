//! Raw source change notifications.
//!
//! A watch backend produces [`SourceEvent`]s in the order it observed them at
//! the watch boundary. Consumers read them through a [`SourceEventReceiver`]
//! and stop the backend by dropping its [`WatchHandle`].

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// A typed change notification for one source path.
///
/// Paths are absolute. Moves carry the prior path in `from`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent {
    FileAdded(PathBuf),
    FileUpdated(PathBuf),
    FileDeleted(PathBuf),
    FileMoved { from: PathBuf, to: PathBuf },
    DirectoryAdded(PathBuf),
    DirectoryUpdated(PathBuf),
    DirectoryDeleted(PathBuf),
    DirectoryMoved { from: PathBuf, to: PathBuf },
}

impl SourceEvent {
    /// The path the event applies to after the change.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::FileAdded(path)
            | Self::FileUpdated(path)
            | Self::FileDeleted(path)
            | Self::DirectoryAdded(path)
            | Self::DirectoryUpdated(path)
            | Self::DirectoryDeleted(path) => path,
            Self::FileMoved { to, .. } | Self::DirectoryMoved { to, .. } => to,
        }
    }

    /// Whether this event changes structure rather than content.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::FileUpdated(_) | Self::DirectoryUpdated(_))
    }
}

/// Create a connected sender and receiver pair.
///
/// Used by watch backends, and directly by callers that feed events by hand.
#[must_use]
pub fn channel() -> (mpsc::Sender<SourceEvent>, SourceEventReceiver) {
    let (tx, rx) = mpsc::channel();
    (tx, SourceEventReceiver::new(rx))
}

/// Receiver for source events.
///
/// Wraps a [`std::sync::mpsc::Receiver`] for synchronous event delivery.
pub struct SourceEventReceiver {
    rx: mpsc::Receiver<SourceEvent>,
}

impl SourceEventReceiver {
    /// Create a new receiver from a channel receiver.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<SourceEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Returns `None` when every sender is dropped.
    #[must_use]
    pub fn recv(&self) -> Option<SourceEvent> {
        self.rx.recv().ok()
    }

    /// Wait for the next event for at most `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SourceEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<SourceEvent> {
        self.rx.try_recv().ok()
    }

    /// Returns an iterator over events.
    ///
    /// Blocks until an event is available. Stops when every sender is dropped.
    pub fn iter(&self) -> impl Iterator<Item = SourceEvent> + '_ {
        self.rx.iter()
    }

    /// Create a receiver that is already closed.
    #[must_use]
    pub fn closed() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }
}

/// Handle to stop watching for changes.
///
/// Dropping the handle stops watching. Shutdown is signalled by dropping the
/// internal channel sender.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    /// Create a new watch handle with a shutdown signal sender.
    ///
    /// When the handle is dropped, the sender is dropped and the backend's
    /// receiver sees a disconnect.
    #[must_use]
    pub fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(mut self) {
        self._shutdown.take();
    }

    /// Create a handle that watches nothing.
    #[must_use]
    pub fn no_op() -> Self {
        Self { _shutdown: None }
    }
}
