use std::sync::LazyLock;

use regex::Regex;

use crate::convertor::{ContentFilter, FilterMode};

static MARKDOWN_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href\s*=\s*["'])([^"'#?]*?)\.md([#?][^"']*)?(["'])"#).unwrap()
});

/// Rewrites links between markdown sources to their generated pages.
///
/// `href="guide/setup.md#install"` becomes `href="guide/setup.html#install"`.
/// Absolute urls with a scheme are left alone.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownLinkFilter;

impl ContentFilter for MarkdownLinkFilter {
    fn mode(&self) -> FilterMode {
        FilterMode::Post
    }

    fn apply(&self, content: &str) -> String {
        MARKDOWN_HREF
            .replace_all(content, |caps: &regex::Captures<'_>| {
                let target = &caps[2];
                if target.contains("://") {
                    return caps[0].to_owned();
                }
                let suffix = caps.get(3).map_or("", |m| m.as_str());
                format!("{}{target}.html{suffix}{}", &caps[1], &caps[4])
            })
            .into_owned()
    }
}
