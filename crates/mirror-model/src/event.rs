//! Model change events.

use std::path::PathBuf;

use crate::entry::EntryPaths;

/// What happened to an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Updated,
    Deleted,
    Moved,
}

/// Which kind of entry changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Page,
    Directory,
}

/// One committed mutation of a tree.
///
/// `previous` holds the prior path triple and is only set for moves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelChange {
    pub kind: ChangeKind,
    pub entity: EntityKind,
    pub paths: EntryPaths,
    pub previous: Option<EntryPaths>,
}

impl ModelChange {
    pub(crate) fn new(kind: ChangeKind, entity: EntityKind, paths: EntryPaths) -> Self {
        Self {
            kind,
            entity,
            paths,
            previous: None,
        }
    }

    pub(crate) fn moved(entity: EntityKind, previous: EntryPaths, paths: EntryPaths) -> Self {
        Self {
            kind: ChangeKind::Moved,
            entity,
            paths,
            previous: Some(previous),
        }
    }
}

/// Source and output roots of one mirrored tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteRoots {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
}

impl SiteRoots {
    /// Roots in canonical form.
    #[must_use]
    pub fn canonical(source_root: &std::path::Path, output_root: &std::path::Path) -> Self {
        Self {
            source_root: mirror_source::paths::canonicalize(source_root),
            output_root: mirror_source::paths::canonicalize(output_root),
        }
    }
}

/// Message on a master's event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    /// The initial scan is fully applied. Every later event stems from a
    /// live notification.
    Initialized(SiteRoots),
    Changed(ModelChange),
}
