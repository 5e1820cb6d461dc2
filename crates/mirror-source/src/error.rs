//! Source error type.
//!
//! [`SourceError`] carries a semantic kind, retry guidance, optional path
//! context and the underlying cause. Watch backends and the file reader both
//! report through it.

use std::io;
use std::path::PathBuf;

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// File or directory does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// File is held by another writer.
    Locked,
    /// Content is not valid text.
    InvalidData,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry.
    #[default]
    Permanent,
    /// Retry, the condition is expected to clear.
    Temporary,
}

/// Source error with semantic kind and backend-specific cause.
#[derive(Debug)]
pub struct SourceError {
    /// Semantic error category.
    pub kind: SourceErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    /// Create a new error.
    #[must_use]
    pub fn new(kind: SourceErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceErrorKind::NotFound).with_path(path)
    }

    /// Classify an I/O error from reading a source file.
    ///
    /// Missing files and undecodable content are permanent. Anything else is
    /// treated as contention with another writer and marked temporary.
    #[must_use]
    pub fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let (kind, status) = match err.kind() {
            io::ErrorKind::NotFound => (SourceErrorKind::NotFound, ErrorStatus::Permanent),
            io::ErrorKind::InvalidData => (SourceErrorKind::InvalidData, ErrorStatus::Permanent),
            io::ErrorKind::PermissionDenied => {
                (SourceErrorKind::PermissionDenied, ErrorStatus::Temporary)
            }
            io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy => {
                (SourceErrorKind::Locked, ErrorStatus::Temporary)
            }
            _ => (SourceErrorKind::Other, ErrorStatus::Temporary),
        };
        Self::new(kind)
            .with_status(status)
            .with_path(path)
            .with_source(err)
    }

    /// Whether this error reports a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == SourceErrorKind::NotFound
    }

    /// Whether retrying may succeed.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.status == ErrorStatus::Temporary
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            SourceErrorKind::NotFound => "Not found",
            SourceErrorKind::PermissionDenied => "Permission denied",
            SourceErrorKind::Locked => "Locked",
            SourceErrorKind::InvalidData => "Invalid data",
            SourceErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
