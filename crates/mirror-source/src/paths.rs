//! Canonical path handling.
//!
//! Every entry in the mirror is identified by a canonical path: absolute,
//! lexically normalized, and without a trailing separator. Identity is
//! case-insensitive, so two paths that differ only by case refer to the same
//! entry. [`canonicalize`] produces the path form and [`PathKey`] the identity.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Components, Path, PathBuf};

/// Case-folded identity of a canonical path.
///
/// Used as the map key for entries. Two paths that differ only by case
/// produce equal keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// Build the key for an already canonical path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self(fold(path.as_os_str()))
    }

    /// The folded string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a path to canonical form.
///
/// Relative paths are resolved against the current directory. `.` and `..`
/// are resolved lexically, so the path does not need to exist and symlinks are
/// not followed. The result never ends with a separator unless it is the
/// filesystem root.
#[must_use]
pub fn canonicalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Check whether `path` is `root` or lies beneath it, ignoring case.
#[must_use]
pub fn is_within(root: &Path, path: &Path) -> bool {
    strip_root(root, path).is_some()
}

/// Path of `path` relative to `root`, ignoring case when matching the prefix.
///
/// Returns an empty path when `path` is `root`, and `None` when `path` lies
/// outside `root`.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> Option<PathBuf> {
    strip_root(root, path).map(|rest| rest.collect())
}

/// Forward-slash url of `path` relative to `root`.
///
/// The root itself maps to the empty string.
#[must_use]
pub fn relative_url(root: &Path, path: &Path) -> Option<String> {
    let rest = strip_root(root, path)?;
    let segments: Vec<_> = rest
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

/// Number of separators between `root` and `path`.
///
/// The root itself has depth 0 and its direct children depth 1.
#[must_use]
pub fn depth(root: &Path, path: &Path) -> usize {
    strip_root(root, path).map_or(0, Iterator::count)
}

/// Case-insensitive extension test.
///
/// `extension` may be given with or without its leading dot.
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .is_some_and(|actual| fold(actual) == wanted.to_lowercase())
}

fn strip_root<'a>(root: &Path, path: &'a Path) -> Option<Components<'a>> {
    let mut rest = path.components();
    for expected in root.components() {
        let actual = rest.next()?;
        if fold(expected.as_os_str()) != fold(actual.as_os_str()) {
            return None;
        }
    }
    Some(rest)
}

fn fold(value: &OsStr) -> String {
    value.to_string_lossy().to_lowercase()
}
