//! Which source paths the backend reports.

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use mirror_source::paths::{has_extension, is_within, relative_path};

/// Decides which paths under a source root are visible to the mirror.
///
/// A path is ignored when it lies outside the root, inside the skipped
/// directory (usually the output root), has a hidden component below the root,
/// or matches an exclude glob relative to the root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    extension: String,
    excludes: Vec<Pattern>,
    skip_dir: Option<PathBuf>,
}

impl PathFilter {
    #[must_use]
    pub fn new(root: PathBuf, extension: &str) -> Self {
        Self {
            root,
            extension: extension.trim_start_matches('.').to_lowercase(),
            excludes: Vec::new(),
            skip_dir: None,
        }
    }

    /// Ignore paths matching any of `excludes`.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<Pattern>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Ignore everything at or below `dir`.
    #[must_use]
    pub fn with_skip_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.skip_dir = dir;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(relative) = relative_path(&self.root, path) else {
            return true;
        };
        if self
            .skip_dir
            .as_deref()
            .is_some_and(|dir| is_within(dir, path))
        {
            return true;
        }
        let hidden = relative.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        });
        hidden || self.excludes.iter().any(|p| p.matches_path(&relative))
    }

    /// Whether `path` is a visible file with the tracked extension.
    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        has_extension(path, &self.extension) && !self.is_ignored(path)
    }
}
