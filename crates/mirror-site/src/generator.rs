//! Keeps the output tree on disk in step with the model.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use mirror_cache::ContentCache;
use mirror_model::{
    ChangeKind, EntityKind, EntryPaths, ModelChange, ModelEvent, Stage, Subscribers,
};
use mirror_renderer::Convertor;
use mirror_source::FileReader;
use mirror_source::paths::{is_within, relative_url};

use crate::event::{SiteChange, SiteEvent};

/// Applies model events to the output tree and the content cache.
///
/// Disk failures are logged and skipped; a page whose source cannot be read
/// is left as it was.
pub struct Generator {
    convertor: Arc<Convertor>,
    reader: FileReader,
    cache: Arc<dyn ContentCache>,
    output_root: PathBuf,
    subscribers: Subscribers<SiteEvent>,
}

impl Generator {
    #[must_use]
    pub fn new(
        convertor: Arc<Convertor>,
        reader: FileReader,
        cache: Arc<dyn ContentCache>,
        output_root: PathBuf,
    ) -> Self {
        Self {
            convertor,
            reader,
            cache,
            output_root,
            subscribers: Subscribers::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<SiteEvent> {
        self.subscribers.subscribe()
    }

    pub fn apply(&mut self, event: &ModelEvent) {
        match event {
            ModelEvent::Initialized(roots) => {
                tracing::info!(output = %roots.output_root.display(), "initial generation complete");
                self.subscribers.publish(&SiteEvent::Initialized);
            }
            ModelEvent::Changed(change) => self.apply_change(change),
        }
    }

    /// Run the generator on the `site-generator` thread until `events` closes.
    pub fn spawn(mut self, events: mpsc::Receiver<ModelEvent>) -> io::Result<Stage> {
        Stage::spawn("site-generator", move || {
            for event in events {
                self.apply(&event);
            }
        })
    }

    fn apply_change(&mut self, change: &ModelChange) {
        let paths = &change.paths;
        match (change.kind, change.entity) {
            (ChangeKind::Added, EntityKind::Directory) => self.create_dir_and_parents(&paths.output_path),
            (ChangeKind::Updated, EntityKind::Directory) => {
                self.report(ChangeKind::Updated, EntityKind::Directory, &paths.output_path, None);
            }
            (ChangeKind::Deleted, EntityKind::Directory) => self.delete_directory(paths),
            (ChangeKind::Moved, EntityKind::Directory) => self.move_directory(change),
            (ChangeKind::Added | ChangeKind::Updated, EntityKind::Page) => {
                if self.generate(paths) {
                    self.report(change.kind, EntityKind::Page, &paths.output_path, None);
                }
            }
            (ChangeKind::Deleted, EntityKind::Page) => self.delete_page(paths),
            (ChangeKind::Moved, EntityKind::Page) => self.move_page(change),
        }
    }

    /// Create `dir` and every missing ancestor, outermost first.
    fn create_dir_and_parents(&mut self, dir: &Path) {
        let missing: Vec<_> = dir
            .ancestors()
            .take_while(|ancestor| !ancestor.exists())
            .map(Path::to_path_buf)
            .collect();
        for level in missing.into_iter().rev() {
            match fs::create_dir(&level) {
                Ok(()) => self.report(ChangeKind::Added, EntityKind::Directory, &level, None),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    tracing::warn!(path = %level.display(), error = %e, "cannot create output directory");
                    return;
                }
            }
        }
    }

    fn delete_directory(&mut self, paths: &EntryPaths) {
        if !paths.output_path.exists() {
            return;
        }
        match fs::remove_dir_all(&paths.output_path) {
            Ok(()) => self.report(ChangeKind::Deleted, EntityKind::Directory, &paths.output_path, None),
            Err(e) => {
                tracing::warn!(path = %paths.output_path.display(), error = %e, "cannot remove output directory");
            }
        }
    }

    fn move_directory(&mut self, change: &ModelChange) {
        let to = &change.paths.output_path;
        let Some(previous) = &change.previous else {
            return;
        };
        let from = &previous.output_path;
        if from.exists() {
            if let Err(e) = ensure_parent(to).and_then(|()| fs::rename(from, to)) {
                tracing::warn!(from = %from.display(), to = %to.display(), error = %e, "cannot move output directory");
                return;
            }
        } else if let Err(e) = fs::create_dir_all(to) {
            tracing::warn!(path = %to.display(), error = %e, "cannot create output directory");
            return;
        }
        self.report(ChangeKind::Moved, EntityKind::Directory, to, Some(from));
    }

    fn delete_page(&mut self, paths: &EntryPaths) {
        self.cache.invalidate(&paths.url);
        if !paths.output_path.exists() {
            return;
        }
        match fs::remove_file(&paths.output_path) {
            Ok(()) => self.report(ChangeKind::Deleted, EntityKind::Page, &paths.output_path, None),
            Err(e) => {
                tracing::warn!(path = %paths.output_path.display(), error = %e, "cannot remove output page");
            }
        }
    }

    fn move_page(&mut self, change: &ModelChange) {
        let paths = &change.paths;
        let Some(previous) = &change.previous else {
            return;
        };
        let (from, to) = (&previous.output_path, &paths.output_path);

        let mut cached = false;
        if from.exists() {
            if let Err(e) = ensure_parent(to).and_then(|()| fs::rename(from, to)) {
                tracing::warn!(from = %from.display(), to = %to.display(), error = %e, "cannot move output page");
                return;
            }
        } else if !to.exists() {
            cached = self.generate(paths);
        }

        if !cached {
            match self.cache.try_get(&previous.url) {
                Some(content) => {
                    self.cache.invalidate(&previous.url);
                    self.cache.put(&paths.url, content);
                }
                None => {
                    self.cache.invalidate(&paths.url);
                    if let Some(source) = self.reader.try_read(&paths.source_path) {
                        self.cache.put(&paths.url, self.convertor.convert(&source));
                    }
                }
            }
        } else if !previous.url.eq_ignore_ascii_case(&paths.url) {
            self.cache.invalidate(&previous.url);
        }

        self.report(ChangeKind::Moved, EntityKind::Page, to, Some(from));
    }

    /// Convert a page's source and write it out. Returns whether it was written.
    fn generate(&self, paths: &EntryPaths) -> bool {
        let Some(source) = self.reader.try_read(&paths.source_path) else {
            tracing::debug!(path = %paths.source_path.display(), "source unreadable, page left as is");
            return false;
        };
        let html = self.convertor.convert(&source);
        let output = &paths.output_path;
        if let Err(e) = ensure_parent(output).and_then(|()| fs::write(output, &html)) {
            tracing::warn!(path = %output.display(), error = %e, "cannot write output page");
            return false;
        }
        self.cache.put(&paths.url, html);
        true
    }

    fn report(&mut self, kind: ChangeKind, entity: EntityKind, path: &Path, previous: Option<&Path>) {
        let Some(url) = self.url(path) else {
            return;
        };
        let previous_url = previous.and_then(|p| self.url(p));
        self.subscribers.publish(&SiteEvent::Changed(SiteChange {
            kind,
            entity,
            url,
            previous_url,
        }));
    }

    fn url(&self, path: &Path) -> Option<String> {
        if is_within(&self.output_root, path) {
            relative_url(&self.output_root, path)
        } else {
            None
        }
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}
