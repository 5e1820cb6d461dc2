use crate::filter::MarkdownLinkFilter;
use crate::markdown::MarkdownTransform;

/// Converts one complete source text to output text.
pub trait Transform: Send + Sync {
    fn transform(&self, source: &str) -> String;

    /// Extension of generated files, without the dot.
    fn output_extension(&self) -> &str {
        "html"
    }
}

/// When a [`ContentFilter`] runs relative to the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Pre,
    Post,
}

/// Text rewrite applied before or after the transform.
pub trait ContentFilter: Send + Sync {
    fn mode(&self) -> FilterMode;

    fn apply(&self, content: &str) -> String;
}

/// A transform with its filter chain.
///
/// Filters of each mode run in registration order.
pub struct Convertor {
    transform: Box<dyn Transform>,
    filters: Vec<Box<dyn ContentFilter>>,
}

impl Convertor {
    #[must_use]
    pub fn new(transform: Box<dyn Transform>) -> Self {
        Self {
            transform,
            filters: Vec::new(),
        }
    }

    /// Markdown to HTML, with links between sources rewritten to pages.
    #[must_use]
    pub fn markdown() -> Self {
        Self::new(Box::new(MarkdownTransform::new())).with_filter(Box::new(MarkdownLinkFilter))
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Box<dyn ContentFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn convert(&self, source: &str) -> String {
        let pre = self.run(FilterMode::Pre, source.to_owned());
        let output = self.transform.transform(&pre);
        self.run(FilterMode::Post, output)
    }

    #[must_use]
    pub fn output_extension(&self) -> &str {
        self.transform.output_extension()
    }

    fn run(&self, mode: FilterMode, content: String) -> String {
        self.filters
            .iter()
            .filter(|filter| filter.mode() == mode)
            .fold(content, |content, filter| filter.apply(&content))
    }
}
