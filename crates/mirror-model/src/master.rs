//! The single writer of a site's tree.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;

use mirror_source::paths::canonicalize;
use mirror_source::{SourceEvent, SourceEventReceiver};

use crate::bus::Subscribers;
use crate::event::{ModelChange, ModelEvent, SiteRoots};
use crate::reader::ModelReader;
use crate::repository::{ModelObserver, Repository, RepositoryConfig};
use crate::stage::Stage;

/// Publishes every committed change as [`ModelEvent::Changed`].
#[derive(Debug, Default)]
pub struct BusObserver {
    subscribers: Subscribers<ModelEvent>,
}

impl BusObserver {
    fn publish(&mut self, event: &ModelEvent) {
        self.subscribers.publish(event);
    }
}

impl ModelObserver for BusObserver {
    fn on_change(&mut self, change: &ModelChange) {
        self.publish(&ModelEvent::Changed(change.clone()));
    }
}

/// Master model: turns raw source events into model events.
///
/// Subscribers registered before the initial scan see the whole tree being
/// built, then [`ModelEvent::Initialized`], then live changes.
pub struct Master {
    repository: Repository<BusObserver>,
}

impl Master {
    #[must_use]
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            repository: Repository::new(config, BusObserver::default()),
        }
    }

    /// Register a subscriber for every event published from now on.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ModelEvent> {
        self.repository.observer_mut().subscribers.subscribe()
    }

    #[must_use]
    pub fn reader(&self) -> ModelReader {
        self.repository.reader()
    }

    /// Build the tree from an initial file list and announce completion.
    ///
    /// Entries outside the source root and untracked files are skipped.
    pub fn initialize(&mut self, roots: &SiteRoots, files: &[PathBuf]) {
        let roots = SiteRoots::canonical(&roots.source_root, &roots.output_root);
        self.repository.init_root(&roots);
        for file in files {
            let path = canonicalize(file);
            if path != roots.source_root {
                self.repository.add_page(&path);
            }
        }
        tracing::info!(
            source = %roots.source_root.display(),
            entries = self.reader().snapshot().len(),
            "initial scan applied"
        );
        self.repository
            .observer_mut()
            .publish(&ModelEvent::Initialized(roots));
    }

    /// Apply one raw source event.
    pub fn apply(&mut self, event: &SourceEvent) {
        tracing::debug!(?event, "applying source event");
        let repository = &mut self.repository;
        match event {
            SourceEvent::FileAdded(path) => repository.add_page(&canonicalize(path)),
            SourceEvent::FileUpdated(path) => repository.update_page(&canonicalize(path)),
            SourceEvent::FileDeleted(path) => repository.delete_page(&canonicalize(path)),
            SourceEvent::FileMoved { from, to } => {
                repository.rename_page(&canonicalize(from), &canonicalize(to));
            }
            SourceEvent::DirectoryAdded(path) => repository.add_directory(&canonicalize(path)),
            SourceEvent::DirectoryUpdated(path) => {
                repository.update_directory(&canonicalize(path));
            }
            SourceEvent::DirectoryDeleted(path) => {
                repository.delete_directory(&canonicalize(path));
            }
            SourceEvent::DirectoryMoved { from, to } => {
                repository.rename_directory(&canonicalize(from), &canonicalize(to));
            }
        }
    }

    /// Run the master on the `model-builder` thread.
    ///
    /// The initial scan is applied before any event from `source`, so updates
    /// queued while scanning are replayed after [`ModelEvent::Initialized`].
    /// The thread exits once `source` closes, which in turn closes every
    /// subscriber channel.
    pub fn spawn(
        mut self,
        roots: SiteRoots,
        files: Vec<PathBuf>,
        source: SourceEventReceiver,
    ) -> io::Result<MasterHandle> {
        let reader = self.reader();
        let stage = Stage::spawn("model-builder", move || {
            self.initialize(&roots, &files);
            for event in source.iter() {
                self.apply(&event);
            }
        })?;
        Ok(MasterHandle { reader, stage })
    }
}

/// A running master.
#[derive(Debug)]
pub struct MasterHandle {
    reader: ModelReader,
    stage: Stage,
}

impl MasterHandle {
    #[must_use]
    pub fn reader(&self) -> &ModelReader {
        &self.reader
    }

    /// Wait for the master to finish after its source closes.
    pub fn join(self) {
        self.stage.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChangeKind, EntityKind};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Duration;

    fn roots() -> SiteRoots {
        SiteRoots {
            source_root: PathBuf::from("/root"),
            output_root: PathBuf::from("/out"),
        }
    }

    fn files() -> Vec<PathBuf> {
        ["/root", "/root/index.md", "/root/sub1/sub2/index.md", "/root/notes.txt"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn summary(event: &ModelEvent) -> String {
        match event {
            ModelEvent::Initialized(_) => "initialized".to_owned(),
            ModelEvent::Changed(change) => {
                format!("{:?} {:?} {}", change.kind, change.entity, change.paths.url)
            }
        }
    }

    #[test]
    fn test_initialize_publishes_scan_then_marker() {
        let mut master = Master::new(RepositoryConfig::default());
        let rx = master.subscribe();

        master.initialize(&roots(), &files());

        let events: Vec<_> = rx.try_iter().map(|e| summary(&e)).collect();
        assert_eq!(
            events,
            vec![
                "Added Directory ",
                "Added Page index.html",
                "Added Directory sub1",
                "Added Directory sub1/sub2",
                "Added Page sub1/sub2/index.html",
                "initialized",
            ]
        );
    }

    #[test]
    fn test_initialize_canonicalizes_roots() {
        let mut master = Master::new(RepositoryConfig::default());
        let rx = master.subscribe();
        let roots = SiteRoots {
            source_root: PathBuf::from("/root/./docs/"),
            output_root: PathBuf::from("/out/x/.."),
        };

        master.initialize(&roots, &[PathBuf::from("/root/docs/a.md")]);

        let last = rx.try_iter().last().unwrap();
        assert_eq!(
            last,
            ModelEvent::Initialized(SiteRoots {
                source_root: PathBuf::from("/root/docs"),
                output_root: PathBuf::from("/out"),
            })
        );
        assert!(master.reader().page_by_url("a.html").is_some());
    }

    #[test]
    fn test_apply_maps_source_events() {
        let mut master = Master::new(RepositoryConfig::default());
        master.initialize(&roots(), &files());
        let rx = master.subscribe();

        master.apply(&SourceEvent::FileUpdated(PathBuf::from("/root/index.md")));
        master.apply(&SourceEvent::DirectoryAdded(PathBuf::from("/root/empty")));
        master.apply(&SourceEvent::FileMoved {
            from: PathBuf::from("/root/notes.txt"),
            to: PathBuf::from("/root/notes.md"),
        });
        master.apply(&SourceEvent::DirectoryMoved {
            from: PathBuf::from("/root/sub1"),
            to: PathBuf::from("/root/part"),
        });
        master.apply(&SourceEvent::DirectoryDeleted(PathBuf::from("/root/part/sub2")));

        let events: Vec<_> = rx.try_iter().map(|e| summary(&e)).collect();
        assert_eq!(
            events,
            vec![
                "Updated Page index.html",
                "Added Page notes.html",
                "Moved Directory part",
                "Moved Directory part/sub2",
                "Moved Page part/sub2/index.html",
                "Deleted Page part/sub2/index.html",
                "Deleted Directory part/sub2",
                "Deleted Directory part",
            ]
        );
    }

    #[test]
    fn test_spawned_master_replays_queued_events_after_scan() {
        let mut master = Master::new(RepositoryConfig::default());
        let rx = master.subscribe();
        let (tx, source) = mirror_source::channel();
        tx.send(SourceEvent::FileAdded(PathBuf::from("/root/late.md")))
            .unwrap();

        let handle = master.spawn(roots(), files(), source).unwrap();
        drop(tx);
        handle.join();

        let events: Vec<_> = rx.iter().map(|e| summary(&e)).collect();
        let marker = events.iter().position(|e| e == "initialized").unwrap();
        assert_eq!(marker, 5);
        assert_eq!(events[marker + 1..].to_vec(), vec!["Added Page late.html"]);
    }

    #[test]
    fn test_reader_sees_live_changes() {
        let mut master = Master::new(RepositoryConfig::new(".MD"));
        let rx = master.subscribe();
        let (tx, source) = mirror_source::channel();
        let handle = master.spawn(roots(), Vec::new(), source).unwrap();

        tx.send(SourceEvent::FileAdded(PathBuf::from("/root/guide/start.md")))
            .unwrap();
        let added = rx
            .iter()
            .find(|e| matches!(e, ModelEvent::Changed(c) if c.entity == EntityKind::Page))
            .unwrap();
        let ModelEvent::Changed(change) = added else {
            unreachable!()
        };
        assert_eq!(change.kind, ChangeKind::Added);

        let page = handle.reader().page_by_url("guide/start.html").unwrap();
        assert_eq!(page.paths.source_path, Path::new("/root/guide/start.md"));

        drop(tx);
        handle.join();
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
    }
}
