//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod watch;

use std::path::PathBuf;

use clap::Args;
use mirror_config::{CliSettings, Config};
use mirror_site::SiteConfig;

use crate::error::CliError;

pub(crate) use build::BuildArgs;
pub(crate) use watch::WatchArgs;

/// Site selection flags shared by every command.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover mirror.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source directory (overrides config, or defines a site without one).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Tracked source extension (overrides config).
    #[arg(short, long)]
    extension: Option<String>,

    /// Disable the content cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (stage and scan logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SiteArgs {
    /// Load the configuration and resolve every site in it.
    pub(crate) fn load(self, debounce_ms: Option<u64>) -> Result<Vec<SiteConfig>, CliError> {
        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            extension: self.extension,
            cache_capacity: self.no_cache.then_some(0),
            debounce_ms,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let sites = config
            .sites
            .iter()
            .map(|site| SiteConfig::from_config(&config, site))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(source_dir: PathBuf) -> SiteArgs {
        SiteArgs {
            config: None,
            source_dir: Some(source_dir),
            output_dir: None,
            extension: None,
            no_cache: false,
            verbose: false,
        }
    }

    #[test]
    fn test_source_dir_defines_site() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("handbook");
        std::fs::create_dir(&source).unwrap();
        let config = temp.path().join("mirror.toml");
        std::fs::write(&config, "").unwrap();

        let mut args = args(source.clone());
        args.config = Some(config);
        args.no_cache = true;
        let sites = args.load(Some(5)).unwrap();

        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "handbook");
        assert_eq!(sites[0].source_dir, source);
        assert_eq!(sites[0].cache_capacity, 0);
        assert_eq!(sites[0].debounce, std::time::Duration::from_millis(5));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut args = args(temp.path().to_path_buf());
        args.config = Some(temp.path().join("absent.toml"));

        assert!(matches!(args.load(None), Err(CliError::Config(_))));
    }
}
