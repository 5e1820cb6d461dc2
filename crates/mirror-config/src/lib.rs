//! Configuration management for mirror.
//!
//! Parses `mirror.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! Site paths support `~`, `${VAR}` (errors if unset) and `${VAR:-default}`.
//!
//! Expanded fields:
//! - `sites.source_dir`
//! - `sites.output_dir`
//!
//! ## Example
//!
//! ```toml
//! [[sites]]
//! name = "handbook"
//! source_dir = "docs"
//! output_dir = "${OUT_DIR:-build/handbook}"
//!
//! [reader]
//! policy = "bounded"
//! timeout_ms = 2000
//! ```

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the source directory. Defines a site when none is configured.
    pub source_dir: Option<PathBuf>,
    /// Override the output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the tracked extension.
    pub extension: Option<String>,
    /// Override content cache capacity (0 disables caching).
    pub cache_capacity: Option<usize>,
    /// Override the update debounce window.
    pub debounce_ms: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mirror.toml";

/// Tracked extension when a site does not name one.
pub const DEFAULT_EXTENSION: &str = "md";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site definitions as parsed from TOML (paths are relative strings).
    #[serde(rename = "sites")]
    sites_raw: Vec<SiteConfigRaw>,
    /// Source read retry configuration.
    pub reader: ReaderConfig,
    /// Content cache configuration.
    pub cache: CacheConfig,
    /// File watching configuration.
    pub watch: WatchConfig,
    /// Change notification configuration.
    pub notify: NotifyConfig,

    /// Resolved sites (set after loading).
    #[serde(skip)]
    pub sites: Vec<SiteConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw site configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiteConfigRaw {
    name: Option<String>,
    source_dir: Option<String>,
    output_dir: Option<String>,
    extension: Option<String>,
    exclude: Vec<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Site name, unique across the config.
    pub name: String,
    /// Directory holding the source documents.
    pub source_dir: PathBuf,
    /// Directory the generated tree is written to.
    pub output_dir: PathBuf,
    /// Tracked source extension, without the leading dot.
    pub extension: String,
    /// Glob patterns (relative to `source_dir`) excluded from mirroring.
    pub exclude: Vec<String>,
}

impl SiteConfig {
    /// Site rooted at `source_dir` with default output location and extension.
    #[must_use]
    pub fn for_source(source_dir: PathBuf) -> Self {
        let name = source_dir
            .file_name()
            .map_or_else(|| "default".to_owned(), |n| n.to_string_lossy().into_owned());
        let output_dir = default_output_dir(&source_dir, &name);
        Self {
            name,
            source_dir,
            output_dir,
            extension: DEFAULT_EXTENSION.to_owned(),
            exclude: Vec::new(),
        }
    }
}

/// Retry policy name for source reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicyKind {
    /// No retries.
    Immediate,
    /// Retry until `timeout_ms` elapses.
    #[default]
    Bounded,
    /// Retry until the read succeeds.
    Unbounded,
}

/// Source read configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Retry policy.
    pub policy: ReadPolicyKind,
    /// Retry budget for the bounded policy.
    pub timeout_ms: u64,
    /// Pause between attempts.
    pub retry_interval_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            policy: ReadPolicyKind::Bounded,
            timeout_ms: 2000,
            retry_interval_ms: 50,
        }
    }
}

impl ReaderConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Content cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached pages per site. 0 disables caching.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.capacity > 0
    }
}

/// File watching configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Window for coalescing repeated update notifications.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Change notification configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Buffered notifications per listener before it starts lagging.
    pub channel_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`sites.source_dir`").
        field: String,
        /// Error message (e.g., "${`DOCS_ROOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Output location used when a site does not set one: a sibling of the
/// source directory named after the site.
fn default_output_dir(source_dir: &Path, name: &str) -> PathBuf {
    source_dir
        .parent()
        .unwrap_or(source_dir)
        .join(format!("{name}-site"))
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mirror.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, so CLI
    /// arguments take precedence over config file values. The result is
    /// validated last.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the combined configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    ///
    /// Path and extension overrides need exactly one site to apply to; a
    /// source directory with no configured site defines one.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if self.sites.is_empty()
            && let Some(source_dir) = &settings.source_dir
        {
            self.sites.push(SiteConfig::for_source(absolute(source_dir)));
        }

        let overrides_site = settings.source_dir.is_some()
            || settings.output_dir.is_some()
            || settings.extension.is_some();
        if overrides_site {
            let [site] = self.sites.as_mut_slice() else {
                return Err(ConfigError::Validation(
                    "--source-dir, --output-dir and --extension need exactly one configured site"
                        .to_owned(),
                ));
            };
            if let Some(source_dir) = &settings.source_dir {
                site.source_dir = absolute(source_dir);
            }
            if let Some(output_dir) = &settings.output_dir {
                site.output_dir = absolute(output_dir);
            }
            if let Some(extension) = &settings.extension {
                site.extension = normalize_extension(extension);
            }
        }

        if let Some(capacity) = settings.cache_capacity {
            self.cache.capacity = capacity;
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.watch.debounce_ms = debounce_ms;
        }
        Ok(())
    }

    /// Look up a resolved site by name, ignoring case.
    #[must_use]
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = absolute(path.parent().unwrap_or(Path::new(".")));
        config.resolve_sites(&config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_sites()?;
        self.validate_reader()?;
        if self.notify.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "notify.channel_capacity must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_sites(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Validation(
                "no sites configured (add a [[sites]] section or pass --source-dir)".to_owned(),
            ));
        }

        let mut names = HashSet::new();
        for site in &self.sites {
            require_non_empty(&site.name, "sites.name")?;
            if !names.insert(site.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate site name '{}'",
                    site.name
                )));
            }
            require_non_empty(&site.extension, "sites.extension")?;
            if site.extension.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "sites.extension '{}' cannot contain a path separator",
                    site.extension
                )));
            }
            if site.source_dir == site.output_dir {
                return Err(ConfigError::Validation(format!(
                    "site '{}': output_dir must differ from source_dir",
                    site.name
                )));
            }
        }
        Ok(())
    }

    fn validate_reader(&self) -> Result<(), ConfigError> {
        if self.reader.policy == ReadPolicyKind::Bounded && self.reader.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "reader.timeout_ms must be greater than 0 for the bounded policy".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in site paths.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for site in &mut self.sites_raw {
            if let Some(ref dir) = site.source_dir {
                site.source_dir = Some(expand::expand_env(dir, "sites.source_dir")?);
            }
            if let Some(ref dir) = site.output_dir {
                site.output_dir = Some(expand::expand_env(dir, "sites.output_dir")?);
            }
        }
        Ok(())
    }

    /// Resolve raw sites to absolute paths based on config directory.
    fn resolve_sites(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        self.sites = self
            .sites_raw
            .iter()
            .map(|raw| {
                let source_dir = raw.source_dir.as_deref().ok_or_else(|| {
                    ConfigError::Validation("[[sites]] entry requires source_dir".to_owned())
                })?;
                let source_dir = config_dir.join(source_dir);
                let name = raw.name.clone().unwrap_or_else(|| {
                    source_dir
                        .file_name()
                        .map_or_else(|| "default".to_owned(), |n| n.to_string_lossy().into_owned())
                });
                let output_dir = raw.output_dir.as_deref().map_or_else(
                    || default_output_dir(&source_dir, &name),
                    |dir| config_dir.join(dir),
                );
                Ok(SiteConfig {
                    name,
                    source_dir,
                    output_dir,
                    extension: raw
                        .extension
                        .as_deref()
                        .map_or_else(|| DEFAULT_EXTENSION.to_owned(), normalize_extension),
                    exclude: raw.exclude.clone(),
                })
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(())
    }
}

/// Strip a leading dot so `".md"` and `"md"` configure the same thing.
fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_owned()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}
