//! `mirror watch` command implementation.

use std::time::Duration;

use clap::Args;
use mirror_renderer::Convertor;
use mirror_site::{InitSignal, SiteRegistry};
use tokio::sync::broadcast::error::RecvError;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// How long to wait for a site's initial generation before reporting it.
const INITIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Quiet period before a content change is applied (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl WatchArgs {
    /// Run every site until Ctrl-C.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let configs = self.site.load(self.debounce_ms)?;

        let mut registry = SiteRegistry::start_all(&configs, |_| Convertor::markdown())?;

        let mut listeners = Vec::with_capacity(registry.len());
        for name in registry.names() {
            let Some(site) = registry.get(name) else {
                continue;
            };
            if wait_initialized(site.init_signal(), INITIAL_TIMEOUT).await {
                let roots = site.roots();
                output.site(site.name(), &roots.source_root, &roots.output_root);
                output.info(&format!("  watching {} pages", site.site_map().len()));
            } else {
                output.warning(&format!("{}: initial generation still running", site.name()));
            }

            let mut notifications = site.subscribe();
            listeners.push(tokio::spawn(async move {
                loop {
                    match notifications.recv().await {
                        Ok(change) => {
                            tracing::info!(site = %change.site, url = %change.url, "output changed");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "change listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }));
        }

        output.info("Press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;

        output.info("Shutting down");
        // Joining the stages blocks; the registry drops with the closure.
        let stopped = tokio::task::spawn_blocking(move || registry.shutdown()).await;
        if let Err(e) = stopped {
            tracing::warn!(error = %e, "site shutdown did not complete");
        }
        for listener in listeners {
            let _ = listener.await;
        }
        Ok(())
    }
}

/// Wait for a site's initial generation on the blocking pool.
async fn wait_initialized(signal: InitSignal, timeout: Duration) -> bool {
    tokio::task::spawn_blocking(move || signal.wait(timeout))
        .await
        .unwrap_or(false)
}
