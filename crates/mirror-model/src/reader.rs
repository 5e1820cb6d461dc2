use std::path::Path;
use std::sync::Arc;

use crate::entry::{DirectoryEntry, Entry, PageEntry};
use crate::tree::{Snapshot, TreeModel};

/// Cloneable read handle on a [`TreeModel`].
///
/// Every query works on the current snapshot; hold on to
/// [`snapshot`](Self::snapshot) to run several queries against one state.
#[derive(Debug, Clone)]
pub struct ModelReader {
    model: Arc<TreeModel>,
}

impl ModelReader {
    pub(crate) fn new(model: Arc<TreeModel>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.model.snapshot()
    }

    /// The root directory, if initialized.
    #[must_use]
    pub fn root(&self) -> Option<Entry> {
        self.snapshot().root().cloned()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.snapshot().entries().cloned().collect()
    }

    #[must_use]
    pub fn directory(&self, source_path: &Path) -> Option<Arc<DirectoryEntry>> {
        self.snapshot().directory(source_path)
    }

    #[must_use]
    pub fn page_by_url(&self, url: &str) -> Option<Arc<PageEntry>> {
        self.snapshot().page_by_url(url)
    }

    /// Sorted urls of every page.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.snapshot().urls()
    }
}
