//! A running mirror of one source tree.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use glob::Pattern;
use mirror_cache::{ContentCache, FifoCache, NullCache};
use mirror_model::{
    Master, MasterHandle, ModelReader, RepositoryConfig, SiteRoots, Slave, SlaveHandle, Stage,
};
use mirror_renderer::Convertor;
use mirror_source::paths::is_within;
use mirror_source::{FileReader, ReadPolicy, SourceEventReceiver, WatchHandle};
use mirror_source_fs::{FsSource, WatchOptions};
use tokio::sync::broadcast;

use crate::error::SiteError;
use crate::event::ChangeNotification;
use crate::generator::Generator;
use crate::notifier::{self, InitSignal};

/// Everything needed to start one site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Tracked source extension, without the dot.
    pub extension: String,
    pub read_policy: ReadPolicy,
    pub retry_interval: Duration,
    /// Content cache capacity; 0 disables caching.
    pub cache_capacity: usize,
    pub debounce: Duration,
    pub excludes: Vec<Pattern>,
    /// Capacity of the live notification channel.
    pub channel_capacity: usize,
}

impl SiteConfig {
    /// Config with default tuning.
    #[must_use]
    pub fn new(name: impl Into<String>, source_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            source_dir,
            output_dir,
            extension: mirror_config::DEFAULT_EXTENSION.to_owned(),
            read_policy: ReadPolicy::default(),
            retry_interval: FileReader::DEFAULT_RETRY_INTERVAL,
            cache_capacity: FifoCache::DEFAULT_CAPACITY,
            debounce: Duration::from_millis(100),
            excludes: Vec::new(),
            channel_capacity: 256,
        }
    }

    /// Resolve one configured site against the shared sections.
    pub fn from_config(
        config: &mirror_config::Config,
        site: &mirror_config::SiteConfig,
    ) -> Result<Self, SiteError> {
        let excludes = site
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| SiteError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let read_policy = match config.reader.policy {
            mirror_config::ReadPolicyKind::Immediate => ReadPolicy::Immediate,
            mirror_config::ReadPolicyKind::Bounded => ReadPolicy::Bounded(config.reader.timeout()),
            mirror_config::ReadPolicyKind::Unbounded => ReadPolicy::Unbounded,
        };

        Ok(Self {
            name: site.name.clone(),
            source_dir: site.source_dir.clone(),
            output_dir: site.output_dir.clone(),
            extension: site.extension.clone(),
            read_policy,
            retry_interval: config.reader.retry_interval(),
            cache_capacity: config.cache.capacity,
            debounce: config.watch.debounce(),
            excludes,
            channel_capacity: config.notify.channel_capacity,
        })
    }

    fn cache(&self) -> Arc<dyn ContentCache> {
        if self.cache_capacity == 0 {
            Arc::new(NullCache)
        } else {
            Arc::new(FifoCache::new(self.cache_capacity))
        }
    }
}

/// Stage handles, joined in pipeline order.
struct Pipeline {
    master: MasterHandle,
    generator: Stage,
    replica: SlaveHandle,
    notifier: Stage,
}

impl Pipeline {
    fn join(self) {
        self.master.join();
        self.generator.join();
        self.replica.join();
        self.notifier.join();
    }
}

/// One mirrored site: watcher, master model, generator, replica and notifier.
///
/// Dropping the site stops the watcher and lets the stages drain in the
/// background; [`shutdown`](Self::shutdown) also waits for them.
pub struct Site {
    name: String,
    roots: SiteRoots,
    master: ModelReader,
    replica: ModelReader,
    cache: Arc<dyn ContentCache>,
    notifications: broadcast::Sender<ChangeNotification>,
    initialized: InitSignal,
    watch: Option<WatchHandle>,
    pipeline: Option<Pipeline>,
}

impl Site {
    /// Start a site that keeps following source changes.
    pub fn start(config: &SiteConfig, convertor: Convertor) -> Result<Self, SiteError> {
        Self::launch(config, convertor, true)
    }

    /// Generate a site once from a scan, without watching.
    ///
    /// Every stage exits once the scan is generated; call
    /// [`shutdown`](Self::shutdown) to wait for that.
    pub fn build(config: &SiteConfig, convertor: Convertor) -> Result<Self, SiteError> {
        Self::launch(config, convertor, false)
    }

    fn launch(config: &SiteConfig, convertor: Convertor, watch: bool) -> Result<Self, SiteError> {
        let roots = SiteRoots::canonical(&config.source_dir, &config.output_dir);
        fs::create_dir_all(&roots.output_root).map_err(|source| SiteError::OutputDir {
            path: roots.output_root.clone(),
            source,
        })?;

        let mut options = WatchOptions::new(roots.source_root.clone(), &config.extension);
        options.excludes.clone_from(&config.excludes);
        options.debounce = config.debounce;
        options.skip_dir = is_within(&roots.source_root, &roots.output_root)
            .then(|| roots.output_root.clone());
        let source = FsSource::new(options);

        // Watch before scanning so changes made during the scan are queued
        let (events, handle) = if watch {
            let (events, handle) = source.watch()?;
            (events, Some(handle))
        } else {
            (SourceEventReceiver::closed(), None)
        };
        let files = source.scan();
        tracing::info!(site = %config.name, files = files.len(), "scanned source tree");

        let repository_config = RepositoryConfig::new(&config.extension);
        let mut master = Master::new(repository_config.clone());
        let generator_rx = master.subscribe();
        let replica_rx = master.subscribe();

        let cache = config.cache();
        let reader = FileReader::new(config.read_policy).with_retry_interval(config.retry_interval);
        let mut generator = Generator::new(
            Arc::new(convertor),
            reader,
            Arc::clone(&cache),
            roots.output_root.clone(),
        );
        let notifier_rx = generator.subscribe();

        let (notifications, _) = broadcast::channel(config.channel_capacity.max(1));
        let initialized = InitSignal::default();

        let notifier = notifier::spawn(
            config.name.clone(),
            notifier_rx,
            notifications.clone(),
            initialized.clone(),
        )
        .map_err(SiteError::stage("site-notifier"))?;
        let replica = Slave::new(repository_config)
            .spawn(replica_rx)
            .map_err(SiteError::stage("model-replica"))?;
        let generator = generator
            .spawn(generator_rx)
            .map_err(SiteError::stage("site-generator"))?;
        let master = master
            .spawn(roots.clone(), files, events)
            .map_err(SiteError::stage("model-builder"))?;

        Ok(Self {
            name: config.name.clone(),
            roots,
            master: master.reader().clone(),
            replica: replica.reader().clone(),
            cache,
            notifications,
            initialized,
            watch: handle,
            pipeline: Some(Pipeline {
                master,
                generator,
                replica,
                notifier,
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn roots(&self) -> &SiteRoots {
        &self.roots
    }

    /// Block until the initial scan has been generated or `timeout` passes.
    #[must_use]
    pub fn wait_initialized(&self, timeout: Duration) -> bool {
        self.initialized.wait(timeout)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_set()
    }

    /// Shared handle on the initialization flag, for waiting off this thread.
    #[must_use]
    pub fn init_signal(&self) -> InitSignal {
        self.initialized.clone()
    }

    /// Receive a notification for every later change to the output tree.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.notifications.subscribe()
    }

    /// Generated content of the page at `url`, ignoring case.
    ///
    /// Only pages the replica knows are served: from the cache when the
    /// generator has filled it, otherwise from the output file. Only the
    /// generator writes to the cache.
    #[must_use]
    pub fn page(&self, url: &str) -> Option<String> {
        let page = self.replica.page_by_url(url)?;
        if let Some(content) = self.cache.try_get(&page.paths.url) {
            return Some(content);
        }
        match fs::read_to_string(&page.paths.output_path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(url, error = %e, "page not generated yet");
                None
            }
        }
    }

    /// Sorted urls of every page.
    #[must_use]
    pub fn site_map(&self) -> Vec<String> {
        self.replica.urls()
    }

    /// The master model, authoritative and first to change.
    #[must_use]
    pub fn master(&self) -> &ModelReader {
        &self.master
    }

    /// The replica model that serves [`page`](Self::page) lookups.
    #[must_use]
    pub fn replica(&self) -> &ModelReader {
        &self.replica
    }

    /// Stop watching and wait for every stage to drain.
    ///
    /// The models stay readable afterwards.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.stop();
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.join();
            tracing::info!(site = %self.name, "site stopped");
        }
    }
}

impl Drop for Site {
    fn drop(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_source::paths::canonicalize;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(10);

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(temp: &TempDir) -> SiteConfig {
        let mut config = SiteConfig::new("docs", temp.path().join("src"), temp.path().join("out"));
        config.debounce = Duration::from_millis(20);
        config
    }

    fn sample(temp: &TempDir) -> SiteConfig {
        let config = config(temp);
        write(&config.source_dir, "index.md", "# Home");
        write(&config.source_dir, "guide/setup.md", "See [home](../index.md).");
        write(&config.source_dir, "notes.txt", "ignored");
        config
    }

    fn poll(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_build_generates_output_tree() {
        let temp = tempfile::tempdir().unwrap();
        let config = sample(&temp);

        let mut site = Site::build(&config, Convertor::markdown()).unwrap();
        assert!(site.wait_initialized(WAIT));
        site.shutdown();

        let output = canonicalize(&config.output_dir);
        assert_eq!(fs::read_to_string(output.join("index.html")).unwrap(), "<h1>Home</h1>\n");
        assert!(
            fs::read_to_string(output.join("guide/setup.html"))
                .unwrap()
                .contains(r#"href="../index.html""#)
        );
        assert!(!output.join("notes.html").exists());
        assert_eq!(site.site_map(), vec!["guide/setup.html", "index.html"]);
    }

    #[test]
    fn test_master_and_replica_agree_after_build() {
        let temp = tempfile::tempdir().unwrap();
        let mut site = Site::build(&sample(&temp), Convertor::markdown()).unwrap();
        site.shutdown();

        assert_eq!(site.master().urls(), site.replica().urls());
        assert_eq!(site.master().snapshot().len(), site.replica().snapshot().len());
    }

    #[test]
    fn test_page_serves_cache_then_disk() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = sample(&temp);
        config.cache_capacity = 0;
        let mut site = Site::build(&config, Convertor::markdown()).unwrap();
        site.shutdown();

        assert_eq!(site.page("INDEX.html").as_deref(), Some("<h1>Home</h1>\n"));
        assert_eq!(site.page("missing.html"), None);
        assert_eq!(site.page("guide"), None, "directories are not pages");
    }

    #[test]
    fn test_page_cached_by_generator() {
        let temp = tempfile::tempdir().unwrap();
        let mut site = Site::build(&sample(&temp), Convertor::markdown()).unwrap();
        site.shutdown();

        fs::remove_file(canonicalize(&temp.path().join("out/index.html"))).unwrap();
        assert_eq!(site.page("index.html").as_deref(), Some("<h1>Home</h1>\n"));
    }

    #[test]
    fn test_cached_page_unknown_to_replica_is_not_served() {
        let temp = tempfile::tempdir().unwrap();
        let mut site = Site::build(&sample(&temp), Convertor::markdown()).unwrap();
        site.shutdown();

        site.cache.put("ghost.html", "<h1>stale</h1>".to_owned());

        assert!(site.replica().page_by_url("ghost.html").is_none());
        assert_eq!(site.page("ghost.html"), None);
    }

    #[test]
    fn test_disk_reads_do_not_fill_cache() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = sample(&temp);
        config.cache_capacity = 10;
        let mut site = Site::build(&config, Convertor::markdown()).unwrap();
        site.shutdown();

        site.cache.invalidate("index.html");
        assert_eq!(site.page("index.html").as_deref(), Some("<h1>Home</h1>\n"));
        assert_eq!(site.cache.try_get("index.html"), None);
    }

    #[test]
    fn test_output_inside_source_is_not_mirrored() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src");
        write(&source, "index.md", "# Home");
        write(&source, "_site/stale.md", "# Stale");
        let config = SiteConfig::new("nested", source.clone(), source.join("_site"));

        let mut site = Site::build(&config, Convertor::markdown()).unwrap();
        site.shutdown();

        assert_eq!(site.site_map(), vec!["index.html"]);
    }

    #[test]
    fn test_excludes_are_applied() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = sample(&temp);
        config.excludes = vec![Pattern::new("guide/**").unwrap()];

        let mut site = Site::build(&config, Convertor::markdown()).unwrap();
        site.shutdown();

        assert_eq!(site.site_map(), vec!["index.html"]);
    }

    #[test]
    fn test_from_config_maps_sections() {
        let mut config = mirror_config::Config::default();
        config.reader.policy = mirror_config::ReadPolicyKind::Unbounded;
        config.cache.capacity = 0;
        let site = mirror_config::SiteConfig {
            name: "docs".to_owned(),
            source_dir: PathBuf::from("/src"),
            output_dir: PathBuf::from("/out"),
            extension: "markdown".to_owned(),
            exclude: vec!["drafts/**".to_owned()],
        };

        let resolved = SiteConfig::from_config(&config, &site).unwrap();

        assert_eq!(resolved.read_policy, ReadPolicy::Unbounded);
        assert_eq!(resolved.cache_capacity, 0);
        assert_eq!(resolved.extension, "markdown");
        assert!(resolved.excludes[0].matches("drafts/a.md"));
    }

    #[test]
    fn test_from_config_rejects_bad_glob() {
        let config = mirror_config::Config::default();
        let site = mirror_config::SiteConfig {
            exclude: vec!["[".to_owned()],
            ..mirror_config::SiteConfig::for_source(PathBuf::from("/src"))
        };

        let err = SiteConfig::from_config(&config, &site).unwrap_err();
        assert!(matches!(err, SiteError::Pattern { .. }));
    }

    #[test]
    #[ignore = "timing-sensitive, can be flaky in test environments"]
    fn test_live_site_follows_changes() {
        let temp = tempfile::tempdir().unwrap();
        let config = sample(&temp);
        let mut site = Site::start(&config, Convertor::markdown()).unwrap();
        assert!(site.wait_initialized(WAIT));
        let mut notifications = site.subscribe();

        write(&config.source_dir, "guide/new.md", "# New");
        assert!(poll(|| site.page("guide/new.html").is_some()));
        assert!(poll(|| notifications.try_recv().is_ok()));

        fs::remove_file(config.source_dir.join("index.md")).unwrap();
        assert!(poll(|| site.page("index.html").is_none()));

        site.shutdown();
    }
}
