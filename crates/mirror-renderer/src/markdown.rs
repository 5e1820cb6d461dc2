use pulldown_cmark::{Options, Parser, html};

use crate::convertor::Transform;

/// Markdown to HTML with GitHub Flavored Markdown extensions.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownTransform {
    gfm: bool,
}

impl MarkdownTransform {
    #[must_use]
    pub fn new() -> Self {
        Self { gfm: true }
    }

    /// Enable or disable tables, strikethrough and task lists.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    fn parser_options(self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }
}

impl Default for MarkdownTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for MarkdownTransform {
    fn transform(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.parser_options());
        let mut output = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}
