//! Immutable entry values handed out by snapshots.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use crate::event::EntityKind;

/// Location triple of an entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryPaths {
    /// Canonical absolute source path.
    pub source_path: PathBuf,
    /// Canonical absolute path of the generated artifact.
    pub output_path: PathBuf,
    /// `output_path` relative to the output root, `/`-separated. Empty for the root.
    pub url: String,
}

/// Snapshot copy of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub paths: EntryPaths,
    pub last_updated: SystemTime,
    /// Separators between the source root and `source_path`.
    pub depth: usize,
}

/// Snapshot copy of a directory with its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub paths: EntryPaths,
    pub last_updated: SystemTime,
    pub depth: usize,
    pub children: Vec<Entry>,
}

/// An entry in a [`Snapshot`](crate::Snapshot).
///
/// Cheap to clone; the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Page(Arc<PageEntry>),
    Directory(Arc<DirectoryEntry>),
}

impl Entry {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Page(_) => EntityKind::Page,
            Self::Directory(_) => EntityKind::Directory,
        }
    }

    #[must_use]
    pub fn paths(&self) -> &EntryPaths {
        match self {
            Self::Page(page) => &page.paths,
            Self::Directory(dir) => &dir.paths,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.paths().url
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Page(page) => page.depth,
            Self::Directory(dir) => dir.depth,
        }
    }

    #[must_use]
    pub fn last_updated(&self) -> SystemTime {
        match self {
            Self::Page(page) => page.last_updated,
            Self::Directory(dir) => dir.last_updated,
        }
    }

    #[must_use]
    pub fn as_page(&self) -> Option<&Arc<PageEntry>> {
        match self {
            Self::Page(page) => Some(page),
            Self::Directory(_) => None,
        }
    }

    #[must_use]
    pub fn as_directory(&self) -> Option<&Arc<DirectoryEntry>> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::Page(_) => None,
        }
    }
}
