use mirror_model::{ChangeKind, EntityKind};
use serde::Serialize;

/// Something the generator did to the output tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteChange {
    pub kind: ChangeKind,
    pub entity: EntityKind,
    /// Url relative to the output root.
    pub url: String,
    /// Prior url, for moves.
    pub previous_url: Option<String>,
}

/// Message on the generator's event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SiteEvent {
    /// Everything from the initial scan has been generated.
    Initialized,
    Changed(SiteChange),
}

/// Live notification fanned out to external consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeNotification {
    /// Name of the site that changed.
    pub site: String,
    /// Url of the changed output entry.
    pub url: String,
}
