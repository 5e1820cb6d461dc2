//! Colored terminal output for command results.

use std::path::Path;

use console::{Style, Term};

/// Writes command results to stderr.
pub(crate) struct Output {
    term: Term,
    heading: Style,
    dim: Style,
    ok: Style,
    warn: Style,
    err: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            heading: Style::new().cyan().bold(),
            dim: Style::new().dim(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            err: Style::new().red(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.ok.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.err.apply_to(msg).to_string());
    }

    /// Site name followed by its source and output roots.
    pub(crate) fn site(&self, name: &str, source: &Path, output: &Path) {
        self.line(&self.heading.apply_to(name).to_string());
        let roots = format!("  {} -> {}", source.display(), output.display());
        self.line(&self.dim.apply_to(roots).to_string());
    }
}
