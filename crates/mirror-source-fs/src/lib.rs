//! Filesystem backend for the mirror engine.
//!
//! [`FsSource`] discovers the tracked files under a source root and watches the
//! root for changes, turning `notify` events into
//! [`SourceEvent`](mirror_source::SourceEvent)s:
//!
//! - Structural changes (create, delete, rename) are forwarded in arrival order
//! - Content changes are debounced per path
//! - Rename halves are paired into a single move; an unpaired source half
//!   becomes a delete once the pairing window expires
//! - Hidden entries, excluded globs, and the output directory are ignored
//!
//! # Example
//!
//! ```ignore
//! use mirror_source_fs::{FsSource, WatchOptions};
//!
//! let source = FsSource::new(WatchOptions::new("docs".into(), "md"));
//! let files = source.scan();
//! let (events, _handle) = source.watch()?;
//! for event in events.iter() {
//!     tracing::info!(?event, "source changed");
//! }
//! ```

mod debouncer;
mod filter;
mod scanner;
mod translate;
mod watcher;

pub use filter::PathFilter;
pub use scanner::scan;
pub use watcher::{FsSource, WatchOptions};
