use std::io;
use std::path::PathBuf;

use mirror_source::SourceError;

/// Error starting a site.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// The output root could not be created.
    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A pipeline thread could not be spawned.
    #[error("Cannot start {stage} stage: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    /// The watch backend failed to start.
    #[error("Cannot watch source: {0}")]
    Source(#[from] SourceError),

    /// An exclude glob does not parse.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Two sites share a name.
    #[error("Duplicate site name: {0}")]
    DuplicateSite(String),
}

impl SiteError {
    pub(crate) fn stage(stage: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Stage { stage, source }
    }
}
