//! Synchronization engine.
//!
//! [`Repository`] applies the operation vocabulary (add, update, delete and
//! rename of pages and directories) to a [`TreeModel`]. Each operation runs
//! under one write-lock acquisition and collects the changes it committed;
//! the changes are handed to the [`ModelObserver`] after the lock is released.
//!
//! Structural rules:
//!
//! - Directories are only materialized as ancestors of a page, and are pruned
//!   as soon as their last child goes away. The root is the exception.
//! - Deletes cascade post-order, so observers see children before parents.
//! - Renames rewrite the whole subtree and report the subtree root first.
//! - Operations on absent entries are silent no-ops.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use mirror_source::PathKey;
use mirror_source::paths::{self, has_extension, is_within, relative_path, relative_url};

use crate::entry::EntryPaths;
use crate::event::{ChangeKind, EntityKind, ModelChange, SiteRoots};
use crate::reader::ModelReader;
use crate::tree::{Node, Tree, TreeModel};

/// Extension of generated pages.
pub const OUTPUT_EXTENSION: &str = "html";

/// Receives every committed change, in commit order.
pub trait ModelObserver: Send {
    fn on_change(&mut self, change: &ModelChange);
}

/// Observer that ignores every change.
pub struct NullObserver;

impl ModelObserver for NullObserver {
    fn on_change(&mut self, _change: &ModelChange) {}
}

/// Repository settings shared by master and replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    extension: String,
}

impl RepositoryConfig {
    /// Track source files with `extension` (leading dot optional).
    #[must_use]
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    #[must_use]
    pub fn tracked_extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        has_extension(path, &self.extension)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new("md")
    }
}

/// Mutation engine over one [`TreeModel`].
///
/// Every operation takes a canonical path and needs `&mut self`, so a
/// repository has exactly one writer.
pub struct Repository<O> {
    model: Arc<TreeModel>,
    config: RepositoryConfig,
    observer: O,
}

impl<O: ModelObserver> Repository<O> {
    #[must_use]
    pub fn new(config: RepositoryConfig, observer: O) -> Self {
        Self {
            model: Arc::new(TreeModel::new()),
            config,
            observer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Read access to the model, usable from any thread.
    #[must_use]
    pub fn reader(&self) -> ModelReader {
        ModelReader::new(Arc::clone(&self.model))
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Materialize the root directory. Later calls are no-ops.
    pub fn init_root(&mut self, roots: &SiteRoots) {
        self.run(|edit| edit.init_root(roots));
    }

    pub fn add_page(&mut self, path: &Path) {
        self.run(|edit| edit.add_page(path));
    }

    pub fn update_page(&mut self, path: &Path) {
        self.run(|edit| edit.update(path));
    }

    pub fn update_directory(&mut self, path: &Path) {
        self.run(|edit| edit.update(path));
    }

    pub fn delete_page(&mut self, path: &Path) {
        self.run(|edit| edit.delete(path));
    }

    pub fn delete_directory(&mut self, path: &Path) {
        self.run(|edit| edit.delete(path));
    }

    pub fn rename_page(&mut self, old_path: &Path, new_path: &Path) {
        self.run(|edit| edit.rename_page(old_path, new_path));
    }

    pub fn rename_directory(&mut self, old_path: &Path, new_path: &Path) {
        self.run(|edit| edit.rename_directory(old_path, new_path));
    }

    /// Directories only appear as ancestors of pages, so a bare directory
    /// notification carries nothing to record.
    pub fn add_directory(&mut self, path: &Path) {
        tracing::trace!(path = %path.display(), "ignoring directory creation");
    }

    fn run(&mut self, op: impl FnOnce(&mut Edit<'_>)) {
        let config = &self.config;
        let changes = self.model.mutate(|tree| {
            let mut edit = Edit {
                tree,
                config,
                changes: Vec::new(),
            };
            op(&mut edit);
            edit.changes
        });
        for change in &changes {
            self.observer.on_change(change);
        }
    }

    #[cfg(test)]
    pub(crate) fn model(&self) -> &TreeModel {
        &self.model
    }
}

/// One operation in progress, holding the write lock.
struct Edit<'a> {
    tree: &'a mut Tree,
    config: &'a RepositoryConfig,
    changes: Vec<ModelChange>,
}

impl Edit<'_> {
    fn roots(&self) -> &SiteRoots {
        self.tree
            .roots()
            .unwrap_or_else(|| panic!("tree model used before its root was initialized"))
    }

    fn init_root(&mut self, roots: &SiteRoots) {
        if self.tree.roots().is_some() {
            return;
        }
        let paths = EntryPaths {
            source_path: roots.source_root.clone(),
            output_path: roots.output_root.clone(),
            url: String::new(),
        };
        let node = Node {
            entity: EntityKind::Directory,
            paths: paths.clone(),
            last_updated: SystemTime::now(),
            depth: 0,
            parent: None,
            children: Vec::new(),
        };
        self.tree
            .set_root(roots.clone(), PathKey::new(&roots.source_root), node);
        self.changes
            .push(ModelChange::new(ChangeKind::Added, EntityKind::Directory, paths));
    }

    fn add_page(&mut self, path: &Path) {
        let key = PathKey::new(path);
        if self.tree.contains(&key) {
            return;
        }
        if !self.config.is_tracked(path) {
            tracing::debug!(path = %path.display(), "skipping untracked file");
            return;
        }
        if !is_within(&self.roots().source_root, path) || self.tree.is_root(&key) {
            tracing::debug!(path = %path.display(), "skipping file outside the source root");
            return;
        }

        let parent = self.ensure_directory(parent_of(path));
        let paths = self.page_paths(path);
        self.link(key, EntityKind::Page, paths.clone(), parent);
        self.changes
            .push(ModelChange::new(ChangeKind::Added, EntityKind::Page, paths));
    }

    /// Make sure `dir` and its ancestors exist, announcing each one created.
    fn ensure_directory(&mut self, dir: &Path) -> PathKey {
        let key = PathKey::new(dir);
        if self.tree.contains(&key) {
            return key;
        }
        assert!(
            is_within(&self.roots().source_root, dir),
            "tree model inconsistent: ancestor chain of {} escaped the source root",
            dir.display()
        );

        let parent = self.ensure_directory(parent_of(dir));
        let paths = self.directory_paths(dir);
        self.link(key.clone(), EntityKind::Directory, paths.clone(), parent);
        self.changes
            .push(ModelChange::new(ChangeKind::Added, EntityKind::Directory, paths));
        key
    }

    fn link(&mut self, key: PathKey, entity: EntityKind, paths: EntryPaths, parent: PathKey) {
        let depth = paths::depth(&self.roots().source_root, &paths.source_path);
        self.tree.node_mut(&parent).children.push(key.clone());
        self.tree.insert(
            key,
            Node {
                entity,
                paths,
                last_updated: SystemTime::now(),
                depth,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
    }

    fn update(&mut self, path: &Path) {
        let key = PathKey::new(path);
        if !self.tree.contains(&key) {
            return;
        }
        let node = self.tree.node_mut(&key);
        node.last_updated = SystemTime::now();
        let change = ModelChange::new(ChangeKind::Updated, node.entity, node.paths.clone());
        self.changes.push(change);
    }

    fn delete(&mut self, path: &Path) {
        let key = PathKey::new(path);
        if !self.tree.contains(&key) {
            return;
        }
        if self.tree.is_root(&key) {
            tracing::warn!(path = %path.display(), "source root removed, clearing its contents");
            let children = self.tree.node(&key).children.clone();
            for child in children {
                self.delete_entry(&child);
            }
            return;
        }
        self.delete_entry(&key);
    }

    /// Remove `key` with its subtree, then prune ancestors left empty.
    fn delete_entry(&mut self, key: &PathKey) {
        if let Some(parent) = self.remove_subtree(key) {
            self.unlink(&parent, key);
            self.prune(&parent);
        }
    }

    /// Post-order removal. Returns the parent of the removed subtree root.
    fn remove_subtree(&mut self, key: &PathKey) -> Option<PathKey> {
        let node = self.tree.remove(key);
        for child in &node.children {
            self.remove_subtree(child);
        }
        self.changes
            .push(ModelChange::new(ChangeKind::Deleted, node.entity, node.paths));
        node.parent
    }

    fn unlink(&mut self, parent: &PathKey, child: &PathKey) {
        self.tree.node_mut(parent).children.retain(|c| c != child);
    }

    fn prune(&mut self, dir: &PathKey) {
        if !self.tree.is_root(dir) && self.tree.node(dir).children.is_empty() {
            self.delete_entry(dir);
        }
    }

    fn rename_page(&mut self, old_path: &Path, new_path: &Path) {
        let old_key = PathKey::new(old_path);
        let tracked = self.config.is_tracked(new_path);
        match self.tree.get(&old_key).map(|node| node.entity) {
            Some(EntityKind::Directory) => self.rename_directory(old_path, new_path),
            Some(EntityKind::Page) if !tracked => self.delete(old_path),
            Some(EntityKind::Page) if !is_within(&self.roots().source_root, new_path) => {
                self.delete(old_path);
            }
            Some(EntityKind::Page) => self.rename_entry(old_path, new_path),
            None if tracked => self.add_page(new_path),
            None => {}
        }
    }

    fn rename_directory(&mut self, old_path: &Path, new_path: &Path) {
        let old_key = PathKey::new(old_path);
        if !self.tree.contains(&old_key) {
            return;
        }
        if self.tree.is_root(&old_key) {
            tracing::warn!(path = %old_path.display(), "ignoring rename of the source root");
            return;
        }
        if !is_within(&self.roots().source_root, new_path) {
            self.delete(old_path);
            return;
        }
        self.rename_entry(old_path, new_path);
    }

    /// Move the subtree at `old_path` to `new_path`.
    fn rename_entry(&mut self, old_path: &Path, new_path: &Path) {
        let old_key = PathKey::new(old_path);
        let new_key = PathKey::new(new_path);
        if old_key != new_key && (is_within(old_path, new_path) || is_within(new_path, old_path)) {
            tracing::warn!(
                from = %old_path.display(),
                to = %new_path.display(),
                "ignoring move between an entry and its own subtree"
            );
            return;
        }

        if old_key != new_key && self.tree.contains(&new_key) {
            self.delete_entry(&new_key);
        }

        let old_parent = self.tree.node(&old_key).parent.clone().unwrap_or_else(|| {
            panic!("tree model inconsistent: {old_key} has no parent")
        });
        let new_parent = self.ensure_directory(parent_of(new_path));

        let keys = self.tree.subtree(&old_key);
        let nodes: Vec<_> = keys.iter().map(|key| self.tree.remove(key)).collect();
        let rekeyed: Vec<_> = nodes
            .iter()
            .map(|node| {
                let rest = relative_path(old_path, &node.paths.source_path).unwrap_or_else(|| {
                    panic!(
                        "tree model inconsistent: {} is not under {}",
                        node.paths.source_path.display(),
                        old_path.display()
                    )
                });
                let source = if rest.as_os_str().is_empty() {
                    new_path.to_path_buf()
                } else {
                    new_path.join(rest)
                };
                (PathKey::new(&source), source)
            })
            .collect();
        let remap = |key: &PathKey| -> PathKey {
            keys.iter()
                .position(|k| k == key)
                .map_or_else(|| key.clone(), |i| rekeyed[i].0.clone())
        };

        self.unlink(&old_parent, &old_key);
        self.tree.node_mut(&new_parent).children.push(new_key);

        for (index, mut node) in nodes.into_iter().enumerate() {
            let (key, source) = &rekeyed[index];
            let paths = match node.entity {
                EntityKind::Page => self.page_paths(source),
                EntityKind::Directory => self.directory_paths(source),
            };
            let previous = std::mem::replace(&mut node.paths, paths.clone());
            node.depth = paths::depth(&self.roots().source_root, source);
            node.parent = if index == 0 {
                Some(new_parent.clone())
            } else {
                node.parent.as_ref().map(remap)
            };
            node.children = node.children.iter().map(remap).collect();
            let entity = node.entity;
            self.tree.insert(key.clone(), node);
            self.changes.push(ModelChange::moved(entity, previous, paths));
        }

        self.prune(&old_parent);
    }

    fn page_paths(&self, source: &Path) -> EntryPaths {
        assert!(
            self.config.is_tracked(source),
            "page path computed for untracked file {}",
            source.display()
        );
        let relative = self.relative(source).with_extension(OUTPUT_EXTENSION);
        self.output_paths(source, &relative)
    }

    fn directory_paths(&self, source: &Path) -> EntryPaths {
        let relative = self.relative(source);
        self.output_paths(source, &relative)
    }

    fn relative(&self, source: &Path) -> PathBuf {
        relative_path(&self.roots().source_root, source).unwrap_or_else(|| {
            panic!(
                "tree model inconsistent: {} is outside the source root",
                source.display()
            )
        })
    }

    fn output_paths(&self, source: &Path, relative: &Path) -> EntryPaths {
        let output_root = &self.roots().output_root;
        let output_path = output_root.join(relative);
        let url = relative_url(output_root, &output_path).unwrap_or_default();
        EntryPaths {
            source_path: source.to_path_buf(),
            output_path,
            url,
        }
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}
