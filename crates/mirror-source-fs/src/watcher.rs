use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use glob::Pattern;
use mirror_source::{SourceError, SourceErrorKind, SourceEventReceiver, WatchHandle};
use notify::{RecursiveMode, Watcher};

use crate::filter::PathFilter;
use crate::scanner::scan;
use crate::translate::EventTranslator;

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// How often the drain thread flushes debounced events.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Create a source error from a notify error.
fn notify_error(e: notify::Error) -> SourceError {
    let kind = match &e.kind {
        notify::ErrorKind::PathNotFound => SourceErrorKind::NotFound,
        notify::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            SourceErrorKind::PermissionDenied
        }
        _ => SourceErrorKind::Other,
    };
    let path = e.paths.first().cloned();
    let err = SourceError::new(kind).with_backend(BACKEND);
    let err = match path {
        Some(path) => err.with_path(path),
        None => err,
    };
    err.with_source(e)
}

/// Options for scanning and watching one source root.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    /// Tracked file extension, without the dot.
    pub extension: String,
    pub excludes: Vec<Pattern>,
    /// Directory never reported, typically the output root when it is nested
    /// inside the source root.
    pub skip_dir: Option<PathBuf>,
    /// Quiet period before a content change is reported.
    pub debounce: Duration,
    /// How long a rename source half waits for its destination.
    pub rename_window: Duration,
}

impl WatchOptions {
    #[must_use]
    pub fn new(root: PathBuf, extension: &str) -> Self {
        Self {
            root,
            extension: extension.trim_start_matches('.').to_owned(),
            excludes: Vec::new(),
            skip_dir: None,
            debounce: Duration::from_millis(100),
            rename_window: Duration::from_millis(100),
        }
    }
}

/// Filesystem source: initial scan plus live change notifications.
pub struct FsSource {
    options: WatchOptions,
    filter: PathFilter,
}

impl FsSource {
    #[must_use]
    pub fn new(options: WatchOptions) -> Self {
        let filter = PathFilter::new(options.root.clone(), &options.extension)
            .with_excludes(options.excludes.clone())
            .with_skip_dir(options.skip_dir.clone());
        Self { options, filter }
    }

    #[must_use]
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Every tracked file under the root, sorted.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let files = scan(&self.filter, &self.options.root);
        tracing::debug!(root = %self.options.root.display(), files = files.len(), "scanned source");
        files
    }

    /// Start watching the root recursively.
    ///
    /// Structural events are sent as soon as `notify` reports them; content
    /// changes once debounced. Dropping the returned handle stops the watcher
    /// and closes the receiver.
    pub fn watch(&self) -> Result<(SourceEventReceiver, WatchHandle), SourceError> {
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let translator = Arc::new(EventTranslator::new(
            self.filter.clone(),
            self.options.debounce,
            self.options.rename_window,
        ));

        let watcher_translator = Arc::clone(&translator);
        let watcher_tx = event_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in watcher_translator.translate(&event) {
                        // Receiver gone means the drain thread is shutting down
                        let _ = watcher_tx.send(event);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "watch backend error"),
            }
        })
        .map_err(notify_error)?;

        watcher
            .watch(&self.options.root, RecursiveMode::Recursive)
            .map_err(notify_error)?;

        // Spawn drain thread. The watcher is moved in to keep it alive.
        let root = self.options.root.clone();
        thread::Builder::new()
            .name("source-watcher".to_owned())
            .spawn(move || {
                let _watcher = watcher;
                tracing::info!(root = %root.display(), "watching source");

                loop {
                    match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    for event in translator.drain_ready() {
                        if event_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!(root = %root.display(), "stopped watching source");
            })
            .map_err(|e| SourceError::io(e, &self.options.root).with_backend(BACKEND))?;

        // When dropped, shutdown_tx disconnects, causing the drain thread to exit
        Ok((
            SourceEventReceiver::new(event_rx),
            WatchHandle::new(shutdown_tx),
        ))
    }
}
