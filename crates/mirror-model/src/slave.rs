//! Read replicas of a master's tree.

use std::io;
use std::sync::mpsc;

use crate::event::{ChangeKind, EntityKind, ModelChange, ModelEvent, SiteRoots};
use crate::reader::ModelReader;
use crate::repository::{NullObserver, Repository, RepositoryConfig};
use crate::stage::Stage;

/// Replays a master's event stream into an independent tree.
///
/// Directory additions other than the root are implied by page additions,
/// and moves of descendants after a directory move find their entries
/// already in place, so both are no-ops here.
pub struct Slave {
    repository: Repository<NullObserver>,
}

impl Slave {
    #[must_use]
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            repository: Repository::new(config, NullObserver),
        }
    }

    #[must_use]
    pub fn reader(&self) -> ModelReader {
        self.repository.reader()
    }

    pub fn apply(&mut self, event: &ModelEvent) {
        match event {
            ModelEvent::Initialized(roots) => self.repository.init_root(roots),
            ModelEvent::Changed(change) => self.apply_change(change),
        }
    }

    fn apply_change(&mut self, change: &ModelChange) {
        let source = &change.paths.source_path;
        let repository = &mut self.repository;
        match (change.kind, change.entity) {
            (ChangeKind::Added, EntityKind::Directory) if change.paths.url.is_empty() => {
                repository.init_root(&SiteRoots {
                    source_root: source.clone(),
                    output_root: change.paths.output_path.clone(),
                });
            }
            (ChangeKind::Added, EntityKind::Directory) => repository.add_directory(source),
            (ChangeKind::Added, EntityKind::Page) => repository.add_page(source),
            (ChangeKind::Updated, EntityKind::Page) => repository.update_page(source),
            (ChangeKind::Updated, EntityKind::Directory) => repository.update_directory(source),
            (ChangeKind::Deleted, EntityKind::Page) => repository.delete_page(source),
            (ChangeKind::Deleted, EntityKind::Directory) => repository.delete_directory(source),
            (ChangeKind::Moved, entity) => {
                let Some(previous) = &change.previous else {
                    tracing::debug!(path = %source.display(), "move without a previous path");
                    return;
                };
                match entity {
                    EntityKind::Page => repository.rename_page(&previous.source_path, source),
                    EntityKind::Directory => {
                        repository.rename_directory(&previous.source_path, source);
                    }
                }
            }
        }
    }

    /// Run the replica on the `model-replica` thread until `events` closes.
    pub fn spawn(mut self, events: mpsc::Receiver<ModelEvent>) -> io::Result<SlaveHandle> {
        let reader = self.reader();
        let stage = Stage::spawn("model-replica", move || {
            for event in events {
                self.apply(&event);
            }
        })?;
        Ok(SlaveHandle { reader, stage })
    }
}

/// A running replica.
#[derive(Debug)]
pub struct SlaveHandle {
    reader: ModelReader,
    stage: Stage,
}

impl SlaveHandle {
    #[must_use]
    pub fn reader(&self) -> &ModelReader {
        &self.reader
    }

    pub fn join(self) {
        self.stage.join();
    }
}
