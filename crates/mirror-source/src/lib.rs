//! Source-side primitives for the mirror engine.
//!
//! This crate holds everything the synchronization core needs to know about
//! the source tree without depending on a particular watch backend:
//!
//! - [`paths`]: canonical path form, case-insensitive identity, relative urls
//! - [`SourceEvent`]: typed raw change notifications, with [`SourceEventReceiver`]
//!   and [`WatchHandle`] for consuming them
//! - [`FileReader`]: source reads that retry past transient lock contention
//! - [`SourceError`]: unified error type with retry guidance
//!
//! The filesystem watcher that produces events lives in `mirror-source-fs`.

mod error;
mod event;
pub mod paths;
mod reader;

pub use error::{ErrorStatus, SourceError, SourceErrorKind};
pub use event::{SourceEvent, SourceEventReceiver, WatchHandle, channel};
pub use paths::PathKey;
pub use reader::{FileReader, ReadPolicy};
