//! `mirror build` command implementation.

use clap::Args;
use mirror_renderer::Convertor;
use mirror_site::SiteRegistry;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

impl BuildArgs {
    /// Generate every site once.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let configs = self.site.load(None)?;

        let mut registry = SiteRegistry::build_all(&configs, |_| Convertor::markdown())?;
        registry.shutdown();

        for name in registry.names() {
            let Some(site) = registry.get(name) else {
                continue;
            };
            let roots = site.roots();
            output.site(site.name(), &roots.source_root, &roots.output_root);
            output.info(&format!("  {} pages", site.site_map().len()));
        }
        output.success(&format!("Built {} site(s)", registry.len()));
        Ok(())
    }
}
