//! Initial discovery of tracked files.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::filter::PathFilter;

/// List every tracked file at or below `dir`, sorted.
///
/// Returns an empty list when `dir` does not exist. Ignored directories are not
/// descended into, and symlinks are not followed.
#[must_use]
pub fn scan(filter: &PathFilter, dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let entry_filter = filter.clone();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| entry.depth() == 0 || !entry_filter.is_ignored(entry.path()))
        .build();

    let mut files: Vec<_> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during scan");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| filter.is_tracked(path))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::Pattern;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# Page").unwrap();
    }

    #[test]
    fn test_scan_finds_tracked_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "index.md");
        touch(root, "sub1/sub2/index.md");
        touch(root, "notes.txt");
        touch(root, ".hidden/secret.md");
        touch(root, "drafts/wip.md");
        touch(root, "_site/stale.md");

        let filter = PathFilter::new(root.to_path_buf(), "md")
            .with_excludes(vec![Pattern::new("drafts/**").unwrap()])
            .with_skip_dir(Some(root.join("_site")));
        let files = scan(&filter, root);

        assert_eq!(
            files,
            vec![root.join("index.md"), root.join("sub1/sub2/index.md")]
        );
    }

    #[test]
    fn test_scan_subdirectory_only() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "index.md");
        touch(root, "new/a.md");
        touch(root, "new/deep/b.MD");

        let filter = PathFilter::new(root.to_path_buf(), "md");
        let files = scan(&filter, &root.join("new"));

        assert_eq!(files, vec![root.join("new/a.md"), root.join("new/deep/b.MD")]);
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");
        let filter = PathFilter::new(missing.clone(), "md");
        assert!(scan(&filter, &missing).is_empty());
    }
}
