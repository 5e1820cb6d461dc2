//! Content conversion for generated pages.
//!
//! A [`Convertor`] runs source text through a chain of stages:
//!
//! 1. [`ContentFilter`]s in [`FilterMode::Pre`] mode, on the source text
//! 2. The [`Transform`] itself (markdown to HTML by default)
//! 3. [`ContentFilter`]s in [`FilterMode::Post`] mode, on the output
//!
//! # Example
//!
//! ```
//! use mirror_renderer::{Convertor, MarkdownLinkFilter, MarkdownTransform};
//!
//! let convertor = Convertor::new(Box::new(MarkdownTransform::new()))
//!     .with_filter(Box::new(MarkdownLinkFilter));
//! let html = convertor.convert("See [setup](setup.md).");
//! assert!(html.contains(r#"href="setup.html""#));
//! ```

mod convertor;
mod filter;
mod markdown;

pub use convertor::{ContentFilter, Convertor, FilterMode, Transform};
pub use filter::MarkdownLinkFilter;
pub use markdown::MarkdownTransform;
