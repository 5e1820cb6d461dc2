//! Named sites running side by side.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use mirror_renderer::Convertor;

use crate::error::SiteError;
use crate::site::{Site, SiteConfig};

/// Running sites keyed by name, ignoring case.
#[derive(Default)]
pub struct SiteRegistry {
    sites: HashMap<String, Site>,
}

impl SiteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a watching site for every config.
    ///
    /// Stops at the first failure; sites already started are shut down when
    /// the partial registry is dropped.
    pub fn start_all(
        configs: &[SiteConfig],
        convertor: impl Fn(&SiteConfig) -> Convertor,
    ) -> Result<Self, SiteError> {
        let mut registry = Self::new();
        for config in configs {
            registry.insert_with(config, |config| Site::start(config, convertor(config)))?;
        }
        Ok(registry)
    }

    /// Generate every config once without watching.
    pub fn build_all(
        configs: &[SiteConfig],
        convertor: impl Fn(&SiteConfig) -> Convertor,
    ) -> Result<Self, SiteError> {
        let mut registry = Self::new();
        for config in configs {
            registry.insert_with(config, |config| Site::build(config, convertor(config)))?;
        }
        Ok(registry)
    }

    fn insert_with(
        &mut self,
        config: &SiteConfig,
        launch: impl FnOnce(&SiteConfig) -> Result<Site, SiteError>,
    ) -> Result<(), SiteError> {
        match self.sites.entry(config.name.to_lowercase()) {
            Entry::Occupied(_) => Err(SiteError::DuplicateSite(config.name.clone())),
            Entry::Vacant(slot) => {
                let site = launch(config)?;
                tracing::info!(site = %config.name, "site started");
                slot.insert(site);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Site> {
        self.sites.get(&name.to_lowercase())
    }

    /// Site names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sites.values().map(Site::name).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Shut every site down and wait for its stages.
    pub fn shutdown(&mut self) {
        for site in self.sites.values_mut() {
            site.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn site_config(temp: &TempDir, name: &str) -> SiteConfig {
        let source = temp.path().join(name);
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("index.md"), format!("# {name}")).unwrap();
        SiteConfig::new(name, source, temp.path().join("out").join(name))
    }

    #[test]
    fn test_build_all_keeps_sites_apart() {
        let temp = tempfile::tempdir().unwrap();
        let configs = vec![site_config(&temp, "guide"), site_config(&temp, "api")];

        let mut registry = SiteRegistry::build_all(&configs, |_| Convertor::markdown()).unwrap();
        registry.shutdown();

        assert_eq!(registry.names(), vec!["api", "guide"]);
        let api = registry.get("API").unwrap();
        assert!(api.wait_initialized(Duration::from_secs(1)));
        assert_eq!(api.page("index.html").as_deref(), Some("<h1>api</h1>\n"));
        assert_eq!(
            registry.get("guide").unwrap().page("index.html").as_deref(),
            Some("<h1>guide</h1>\n")
        );
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let first = site_config(&temp, "docs");
        let mut second = site_config(&temp, "other");
        second.name = "DOCS".to_owned();

        let result = SiteRegistry::build_all(&[first, second], |_| Convertor::markdown());

        assert!(matches!(result, Err(SiteError::DuplicateSite(name)) if name == "DOCS"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = SiteRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("docs").is_none());
    }
}
