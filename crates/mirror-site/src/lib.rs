//! Site coordination for the mirror engine.
//!
//! A [`Site`] wires one source tree into a running pipeline:
//!
//! ```text
//! watcher ──▶ model-builder ──┬──▶ site-generator ──▶ site-notifier ──▶ broadcast
//!                             └──▶ model-replica
//! ```
//!
//! Each stage is a named thread consuming an ordered channel. Dropping the site
//! stops the watcher; each stage then drains its input and exits, closing the
//! next one.
//!
//! The [`Generator`] keeps the output tree on disk in step with the model and
//! fills the content cache. [`Site::page`] serves pages from that cache.

mod error;
mod event;
mod generator;
mod notifier;
mod registry;
mod site;

pub use error::SiteError;
pub use event::{ChangeNotification, SiteChange, SiteEvent};
pub use generator::Generator;
pub use notifier::InitSignal;
pub use registry::SiteRegistry;
pub use site::{Site, SiteConfig};
