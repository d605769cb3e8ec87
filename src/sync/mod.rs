mod collection;
mod state;

pub use collection::{CollectionSync, SnapshotSource, Unsubscribe};
pub use state::{reduce, CollectionAction, DocumentHandle, ViewState};
