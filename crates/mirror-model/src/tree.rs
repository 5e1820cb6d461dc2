//! Mutable tree arena and its immutable snapshot.
//!
//! Entries live in a single map keyed by [`PathKey`]; parent and child links
//! are keys into the same map. [`TreeModel`] wraps the arena with a lazily
//! rebuilt [`Snapshot`]:
//!
//! - Every mutation bumps the arena revision.
//! - A reader compares the cached snapshot's revision with the current one and
//!   rebuilds under `rebuild_lock` on mismatch, re-checking after acquiring it.
//! - Readers hold an `Arc<Snapshot>`, so a rebuild never disturbs them.
//! - A rebuild never waits for a mutation: while the writer holds the arena,
//!   readers keep getting the previous snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::SystemTime;

use mirror_source::PathKey;
use mirror_source::paths::canonicalize;

use crate::entry::{DirectoryEntry, Entry, EntryPaths, PageEntry};
use crate::event::{EntityKind, SiteRoots};

/// Mutable entry owned by the arena.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub entity: EntityKind,
    pub paths: EntryPaths,
    pub last_updated: SystemTime,
    pub depth: usize,
    pub parent: Option<PathKey>,
    pub children: Vec<PathKey>,
}

/// The mutable arena.
#[derive(Debug, Default)]
pub(crate) struct Tree {
    roots: Option<SiteRoots>,
    root: Option<PathKey>,
    nodes: HashMap<PathKey, Node>,
    revision: u64,
}

impl Tree {
    pub fn roots(&self) -> Option<&SiteRoots> {
        self.roots.as_ref()
    }

    pub fn is_root(&self, key: &PathKey) -> bool {
        self.root.as_ref() == Some(key)
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &PathKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Node that must exist; a miss means the arena is already inconsistent.
    pub fn node(&self, key: &PathKey) -> &Node {
        self.nodes
            .get(key)
            .unwrap_or_else(|| panic!("tree model inconsistent: no entry for {key}"))
    }

    pub fn node_mut(&mut self, key: &PathKey) -> &mut Node {
        self.revision += 1;
        self.nodes
            .get_mut(key)
            .unwrap_or_else(|| panic!("tree model inconsistent: no entry for {key}"))
    }

    pub fn set_root(&mut self, roots: SiteRoots, key: PathKey, node: Node) {
        self.roots = Some(roots);
        self.root = Some(key.clone());
        self.insert(key, node);
    }

    pub fn insert(&mut self, key: PathKey, node: Node) {
        self.revision += 1;
        self.nodes.insert(key, node);
    }

    pub fn remove(&mut self, key: &PathKey) -> Node {
        self.revision += 1;
        self.nodes
            .remove(key)
            .unwrap_or_else(|| panic!("tree model inconsistent: removing missing entry {key}"))
    }

    /// Keys of `key` and all its descendants, parents before children.
    pub fn subtree(&self, key: &PathKey) -> Vec<PathKey> {
        let mut keys = Vec::new();
        let mut stack = vec![key.clone()];
        while let Some(next) = stack.pop() {
            stack.extend(self.node(&next).children.iter().rev().cloned());
            keys.push(next);
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Panic unless parent links, child lists and pruning all agree.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (key, node) in &self.nodes {
            match &node.parent {
                None => assert!(self.is_root(key), "{key} has no parent but is not the root"),
                Some(parent) => {
                    let parent_node = self.node(parent);
                    assert_eq!(parent_node.entity, EntityKind::Directory);
                    assert!(
                        parent_node.children.contains(key),
                        "{parent} does not list child {key}"
                    );
                }
            }
            for child in &node.children {
                assert_eq!(self.node(child).parent.as_ref(), Some(key));
            }
            if node.entity == EntityKind::Directory && !self.is_root(key) {
                assert!(!node.children.is_empty(), "empty directory {key} left behind");
            }
        }
    }
}

/// Immutable, fully materialized copy of a tree with path and url indexes.
#[derive(Debug, Default)]
pub struct Snapshot {
    revision: u64,
    root: Option<Entry>,
    by_source: HashMap<PathKey, Entry>,
    /// Pages only; a directory may share a page's url.
    by_url: HashMap<String, Arc<PageEntry>>,
}

impl Snapshot {
    /// Convert the arena bottom-up: children enter the snapshot before their
    /// parent is built.
    fn build(tree: &Tree) -> Self {
        let mut snapshot = Self {
            revision: tree.revision,
            root: None,
            by_source: HashMap::with_capacity(tree.len()),
            by_url: HashMap::with_capacity(tree.len()),
        };
        if let Some(root) = tree.root.clone() {
            snapshot.root = Some(snapshot.convert(tree, &root));
        }
        snapshot
    }

    fn convert(&mut self, tree: &Tree, key: &PathKey) -> Entry {
        let node = tree.node(key);
        let entry = match node.entity {
            EntityKind::Page => {
                let page = Arc::new(PageEntry {
                    paths: node.paths.clone(),
                    last_updated: node.last_updated,
                    depth: node.depth,
                });
                self.by_url
                    .insert(node.paths.url.to_lowercase(), Arc::clone(&page));
                Entry::Page(page)
            }
            EntityKind::Directory => {
                let children = node
                    .children
                    .iter()
                    .map(|child| self.convert(tree, child))
                    .collect();
                Entry::Directory(Arc::new(DirectoryEntry {
                    paths: node.paths.clone(),
                    last_updated: node.last_updated,
                    depth: node.depth,
                    children,
                }))
            }
        };
        self.by_source.insert(key.clone(), entry.clone());
        entry
    }

    /// The root directory, if initialized.
    #[must_use]
    pub fn root(&self) -> Option<&Entry> {
        self.root.as_ref()
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.by_source.values()
    }

    /// Entry at a source path.
    #[must_use]
    pub fn entry(&self, source_path: &Path) -> Option<&Entry> {
        self.by_source
            .get(&PathKey::new(&canonicalize(source_path)))
    }

    /// Directory at a source path.
    #[must_use]
    pub fn directory(&self, source_path: &Path) -> Option<Arc<DirectoryEntry>> {
        self.entry(source_path)?.as_directory().cloned()
    }

    /// Page by its generated url, ignoring case.
    #[must_use]
    pub fn page_by_url(&self, url: &str) -> Option<Arc<PageEntry>> {
        self.by_url.get(&url.to_lowercase()).cloned()
    }

    /// Sorted urls of every page.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self
            .by_source
            .values()
            .filter_map(Entry::as_page)
            .map(|page| page.paths.url.clone())
            .collect();
        urls.sort();
        urls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Canonical tree of entries shared between its writer and any readers.
///
/// Only the owning [`Repository`](crate::Repository) mutates it. A rebuild
/// reads the arena under a shared lock, so a mutation that starts while a
/// rebuild is copying waits for that copy to finish.
#[derive(Debug, Default)]
pub struct TreeModel {
    tree: RwLock<Tree>,
    revision: AtomicU64,
    current: RwLock<Arc<Snapshot>>,
    rebuild_lock: Mutex<()>,
}

impl TreeModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one mutation under the write lock and publish the new revision.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        let mut tree = self.tree.write().unwrap();
        let result = f(&mut tree);
        self.revision.store(tree.revision, Ordering::Release);
        result
    }

    #[cfg(test)]
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.tree.read().unwrap())
    }

    /// Current snapshot, rebuilt first if the tree changed since the last one.
    ///
    /// Returns the previous snapshot while a mutation is in flight.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // Fast path: snapshot current
        let current = Arc::clone(&self.current.read().unwrap());
        if current.revision == self.revision.load(Ordering::Acquire) {
            return current;
        }

        // Slow path: acquire rebuild lock
        let _guard = self.rebuild_lock.lock().unwrap();

        // Double-check after acquiring lock
        let current = Arc::clone(&self.current.read().unwrap());
        if current.revision == self.revision.load(Ordering::Acquire) {
            return current;
        }

        let tree = match self.tree.try_read() {
            Ok(tree) => tree,
            Err(TryLockError::WouldBlock) => return current,
            Err(TryLockError::Poisoned(err)) => panic!("tree lock poisoned: {err}"),
        };
        let snapshot = Arc::new(Snapshot::build(&tree));
        drop(tree);
        *self.current.write().unwrap() = Arc::clone(&snapshot);
        snapshot
    }
}
