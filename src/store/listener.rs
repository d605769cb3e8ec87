use std::sync::Arc;

use crate::error::ConsoleResult;
use crate::store::database::DocumentStore;
use crate::store::snapshot::CollectionSnapshot;

/// Callback invoked for every snapshot delivered to a collection listener.
/// Errors raised while producing a snapshot are delivered on the same
/// channel.
pub type SnapshotCallback = Arc<dyn Fn(ConsoleResult<CollectionSnapshot>) + Send + Sync + 'static>;

/// RAII-style listener registration; dropping the handle detaches the
/// underlying listener.
pub struct ListenerRegistration {
    store: DocumentStore,
    id: Option<u64>,
}

impl ListenerRegistration {
    pub(crate) fn new(store: DocumentStore, id: u64) -> Self {
        Self {
            store,
            id: Some(id),
        }
    }

    pub fn detach(mut self) {
        if let Some(id) = self.id.take() {
            self.store.remove_listener(id);
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.store.remove_listener(id);
        }
    }
}
