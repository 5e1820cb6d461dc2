//! Canonical tree model and synchronization engine.
//!
//! The [`Repository`] applies add/update/delete/rename operations to a
//! [`TreeModel`] with cascading and pruning semantics, reporting every
//! committed mutation to a [`ModelObserver`]. Two roles build on it:
//!
//! - [`Master`]: the single writer. Consumes raw [`SourceEvent`]s and fans
//!   [`ModelEvent`]s out to subscribers.
//! - [`Slave`]: a read replica that replays a master's event stream into its
//!   own tree.
//!
//! Readers never touch the mutable tree. [`ModelReader`] serves queries from an
//! immutable [`Snapshot`] that is rebuilt lazily after mutations.
//!
//! [`SourceEvent`]: mirror_source::SourceEvent

mod bus;
mod entry;
mod event;
mod master;
mod reader;
mod repository;
mod slave;
mod stage;
mod tree;

pub use bus::Subscribers;
pub use entry::{DirectoryEntry, Entry, EntryPaths, PageEntry};
pub use event::{ChangeKind, EntityKind, ModelChange, ModelEvent, SiteRoots};
pub use master::{BusObserver, Master, MasterHandle};
pub use reader::ModelReader;
pub use repository::{ModelObserver, NullObserver, OUTPUT_EXTENSION, Repository, RepositoryConfig};
pub use slave::{Slave, SlaveHandle};
pub use stage::Stage;
pub use tree::{Snapshot, TreeModel};
