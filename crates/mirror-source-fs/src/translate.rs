//! Translation of raw `notify` events into source events.
//!
//! Backends disagree on how they report renames. inotify sends a `From` half,
//! a `To` half sharing a tracker cookie, and then a combined `Both` event.
//! Other backends send only halves, or only `Any`. The translator pairs halves
//! into one move, suppresses the `Both` event that follows an already paired
//! move, and turns a `From` half that finds no partner within the rename
//! window into a delete.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use mirror_source::SourceEvent;
use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};

use crate::debouncer::EventDebouncer;
use crate::filter::PathFilter;
use crate::scanner::scan;

/// A rename source half waiting for its destination.
struct PendingRename {
    from: PathBuf,
    tracker: Option<usize>,
    deadline: Instant,
}

#[derive(Default)]
struct Renames {
    pending: Vec<PendingRename>,
    /// Moves already emitted from halves, awaiting their `Both` echo.
    paired: Vec<(PathBuf, PathBuf, Instant)>,
}

/// Stateful, thread-safe translator shared by the notify callback and the
/// drain thread.
pub(crate) struct EventTranslator {
    filter: PathFilter,
    debouncer: EventDebouncer,
    rename_window: Duration,
    renames: Mutex<Renames>,
}

impl EventTranslator {
    pub fn new(filter: PathFilter, debounce: Duration, rename_window: Duration) -> Self {
        Self {
            filter,
            debouncer: EventDebouncer::new(debounce),
            rename_window,
            renames: Mutex::new(Renames::default()),
        }
    }

    /// Structural events ready to send now. Content changes are held back
    /// until [`drain_ready`](Self::drain_ready) finds them quiet.
    pub fn translate(&self, event: &notify::Event) -> Vec<SourceEvent> {
        let mut out = Vec::new();
        match event.kind {
            EventKind::Create(kind) => {
                for path in &event.paths {
                    let is_dir = match kind {
                        CreateKind::Folder => true,
                        CreateKind::File => false,
                        _ => path.is_dir(),
                    };
                    self.created(path, is_dir, &mut out);
                }
            }
            EventKind::Remove(kind) => {
                for path in &event.paths {
                    self.removed(path, kind, &mut out);
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => self.renamed(mode, event, &mut out),
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.modified(path);
                }
            }
            _ => {}
        }
        out
    }

    /// Deletes for expired rename halves, then debounced updates.
    pub fn drain_ready(&self) -> Vec<SourceEvent> {
        let now = Instant::now();
        let expired: Vec<_> = {
            let mut renames = self.renames.lock().unwrap();
            renames.paired.retain(|(_, _, deadline)| *deadline > now);
            let (expired, pending) = std::mem::take(&mut renames.pending)
                .into_iter()
                .partition(|pending| pending.deadline <= now);
            renames.pending = pending;
            expired
        };

        let mut out = Vec::new();
        for pending in expired {
            tracing::debug!(path = %pending.from.display(), "rename source left unpaired");
            self.removed(&pending.from, RemoveKind::Any, &mut out);
        }
        for path in self.debouncer.drain_ready() {
            if path.is_dir() {
                out.push(SourceEvent::DirectoryUpdated(path));
            } else {
                out.push(SourceEvent::FileUpdated(path));
            }
        }
        out
    }

    fn created(&self, path: &Path, is_dir: bool, out: &mut Vec<SourceEvent>) {
        if self.filter.is_ignored(path) {
            return;
        }
        self.debouncer.cancel(path);
        if is_dir {
            out.push(SourceEvent::DirectoryAdded(path.to_path_buf()));
            // Files created before the directory's watch was attached are
            // never reported on their own
            out.extend(
                scan(&self.filter, path)
                    .into_iter()
                    .map(SourceEvent::FileAdded),
            );
        } else if self.filter.is_tracked(path) {
            out.push(SourceEvent::FileAdded(path.to_path_buf()));
        }
    }

    fn removed(&self, path: &Path, kind: RemoveKind, out: &mut Vec<SourceEvent>) {
        if self.filter.is_ignored(path) {
            return;
        }
        self.debouncer.cancel(path);
        match kind {
            RemoveKind::Folder => out.push(SourceEvent::DirectoryDeleted(path.to_path_buf())),
            RemoveKind::File if !self.filter.is_tracked(path) => {}
            _ => out.push(SourceEvent::FileDeleted(path.to_path_buf())),
        }
    }

    fn modified(&self, path: &Path) {
        if self.filter.is_tracked(path) || (!self.filter.is_ignored(path) && path.is_dir()) {
            self.debouncer.record(path.to_path_buf());
        }
    }

    fn renamed(&self, mode: RenameMode, event: &notify::Event, out: &mut Vec<SourceEvent>) {
        match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to, ..]) => {
                let echo = {
                    let mut renames = self.renames.lock().unwrap();
                    renames.pending.retain(|pending| pending.from != *from);
                    let index = renames
                        .paired
                        .iter()
                        .position(|(f, t, _)| f == from && t == to);
                    index.map(|i| renames.paired.remove(i)).is_some()
                };
                if !echo {
                    self.moved(from, to, out);
                }
            }
            (RenameMode::From, [from, ..]) => {
                self.renames.lock().unwrap().pending.push(PendingRename {
                    from: from.clone(),
                    tracker: event.tracker(),
                    deadline: Instant::now() + self.rename_window,
                });
            }
            (RenameMode::To, [to, ..]) => {
                let from = {
                    let mut renames = self.renames.lock().unwrap();
                    let tracker = event.tracker();
                    let index = renames
                        .pending
                        .iter()
                        .position(|pending| tracker.is_none() || pending.tracker == tracker);
                    index.map(|i| {
                        let pending = renames.pending.remove(i);
                        let deadline = Instant::now() + self.rename_window;
                        renames
                            .paired
                            .push((pending.from.clone(), to.clone(), deadline));
                        pending.from
                    })
                };
                match from {
                    Some(from) => self.moved(&from, to, out),
                    None => self.created(to, to.is_dir(), out),
                }
            }
            (_, paths) => {
                for path in paths {
                    if path.exists() {
                        self.created(path, path.is_dir(), out);
                    } else {
                        self.removed(path, RemoveKind::Any, out);
                    }
                }
            }
        }
    }

    fn moved(&self, from: &Path, to: &Path, out: &mut Vec<SourceEvent>) {
        let is_dir = to.is_dir();
        match (self.filter.is_ignored(from), self.filter.is_ignored(to)) {
            (true, true) => {}
            (true, false) => self.created(to, is_dir, out),
            (false, true) => {
                let kind = if is_dir { RemoveKind::Folder } else { RemoveKind::Any };
                self.removed(from, kind, out);
            }
            (false, false) => {
                self.debouncer.cancel(from);
                self.debouncer.cancel(to);
                let (from, to) = (from.to_path_buf(), to.to_path_buf());
                out.push(if is_dir {
                    SourceEvent::DirectoryMoved { from, to }
                } else {
                    SourceEvent::FileMoved { from, to }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, Event};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        translator: EventTranslator,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().unwrap();
            let filter = PathFilter::new(temp.path().to_path_buf(), "md")
                .with_skip_dir(Some(temp.path().join("_site")));
            let translator =
                EventTranslator::new(filter, Duration::from_millis(10), Duration::from_millis(10));
            Self { temp, translator }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }

        fn send(&self, kind: EventKind, paths: &[&str]) -> Vec<SourceEvent> {
            let mut event = Event::new(kind);
            for rel in paths {
                event = event.add_path(self.path(rel));
            }
            self.translator.translate(&event)
        }

        fn rename_half(&self, mode: RenameMode, rel: &str, tracker: usize) -> Vec<SourceEvent> {
            let event = Event::new(EventKind::Modify(ModifyKind::Name(mode)))
                .add_path(self.path(rel))
                .set_tracker(tracker);
            self.translator.translate(&event)
        }

        fn settle(&self) -> Vec<SourceEvent> {
            thread::sleep(Duration::from_millis(20));
            self.translator.drain_ready()
        }
    }

    fn data_change() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    #[test]
    fn test_created_file_is_filtered_by_extension() {
        let fx = Fixture::new();
        assert_eq!(
            fx.send(EventKind::Create(CreateKind::File), &["a.md"]),
            vec![SourceEvent::FileAdded(fx.path("a.md"))]
        );
        assert!(fx.send(EventKind::Create(CreateKind::File), &["a.txt"]).is_empty());
    }

    #[test]
    fn test_created_folder_reports_contents() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.path("new/deep")).unwrap();
        fs::write(fx.path("new/deep/page.md"), "x").unwrap();

        assert_eq!(
            fx.send(EventKind::Create(CreateKind::Folder), &["new"]),
            vec![
                SourceEvent::DirectoryAdded(fx.path("new")),
                SourceEvent::FileAdded(fx.path("new/deep/page.md")),
            ]
        );
    }

    #[test]
    fn test_output_directory_is_ignored() {
        let fx = Fixture::new();
        assert!(fx.send(EventKind::Create(CreateKind::File), &["_site/a.md"]).is_empty());
        assert!(fx.send(data_change(), &["_site/a.md"]).is_empty());
        assert!(fx.settle().is_empty());
    }

    #[test]
    fn test_removed_folder_and_file() {
        let fx = Fixture::new();
        assert_eq!(
            fx.send(EventKind::Remove(RemoveKind::Folder), &["sub"]),
            vec![SourceEvent::DirectoryDeleted(fx.path("sub"))]
        );
        assert_eq!(
            fx.send(EventKind::Remove(RemoveKind::Any), &["maybe"]),
            vec![SourceEvent::FileDeleted(fx.path("maybe"))]
        );
        assert!(fx.send(EventKind::Remove(RemoveKind::File), &["a.txt"]).is_empty());
    }

    #[test]
    fn test_rename_halves_pair_into_one_move() {
        let fx = Fixture::new();
        assert!(fx.rename_half(RenameMode::From, "old.md", 7).is_empty());
        assert_eq!(
            fx.rename_half(RenameMode::To, "new.md", 7),
            vec![SourceEvent::FileMoved {
                from: fx.path("old.md"),
                to: fx.path("new.md"),
            }]
        );

        let both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(fx.path("old.md"))
            .add_path(fx.path("new.md"));
        assert!(fx.translator.translate(&both).is_empty(), "echo is suppressed");
        assert!(fx.settle().is_empty());
    }

    #[test]
    fn test_both_without_halves_is_a_move() {
        let fx = Fixture::new();
        fs::create_dir(fx.path("renamed")).unwrap();
        assert_eq!(
            fx.send(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &["orig", "renamed"]),
            vec![SourceEvent::DirectoryMoved {
                from: fx.path("orig"),
                to: fx.path("renamed"),
            }]
        );
    }

    #[test]
    fn test_unpaired_from_becomes_delete() {
        let fx = Fixture::new();
        fx.rename_half(RenameMode::From, "gone.md", 3);
        assert_eq!(fx.settle(), vec![SourceEvent::FileDeleted(fx.path("gone.md"))]);
    }

    #[test]
    fn test_unpaired_to_becomes_add() {
        let fx = Fixture::new();
        assert_eq!(
            fx.rename_half(RenameMode::To, "arrived.md", 9),
            vec![SourceEvent::FileAdded(fx.path("arrived.md"))]
        );
    }

    #[test]
    fn test_move_out_of_and_into_visible_area() {
        let fx = Fixture::new();
        assert_eq!(
            fx.send(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["a.md", ".trash/a.md"]
            ),
            vec![SourceEvent::FileDeleted(fx.path("a.md"))]
        );
        assert_eq!(
            fx.send(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &[".trash/b.md", "b.md"]
            ),
            vec![SourceEvent::FileAdded(fx.path("b.md"))]
        );
    }

    #[test]
    fn test_ambiguous_rename_checks_existence() {
        let fx = Fixture::new();
        fs::write(fx.path("here.md"), "x").unwrap();
        assert_eq!(
            fx.send(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["here.md"]),
            vec![SourceEvent::FileAdded(fx.path("here.md"))]
        );
        assert_eq!(
            fx.send(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["there.md"]),
            vec![SourceEvent::FileDeleted(fx.path("there.md"))]
        );
    }

    #[test]
    fn test_content_changes_are_debounced() {
        let fx = Fixture::new();
        for _ in 0..3 {
            assert!(fx.send(data_change(), &["a.md"]).is_empty());
        }
        fx.send(data_change(), &["a.txt"]);

        assert_eq!(fx.settle(), vec![SourceEvent::FileUpdated(fx.path("a.md"))]);
    }

    #[test]
    fn test_structural_change_cancels_pending_update() {
        let fx = Fixture::new();
        fx.send(data_change(), &["a.md"]);
        fx.send(EventKind::Remove(RemoveKind::File), &["a.md"]);

        assert!(fx.settle().is_empty());
    }
}
