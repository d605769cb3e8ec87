//! Bridges a push-based collection snapshot stream to pull-based view
//! state.
//!
//! A `CollectionSync` owns at most one live subscription at a time. Changing
//! the observed collection cancels the previous subscription before the new
//! one is created, and every delivery is stamped with the generation of the
//! subscription that produced it, so an event from a cancelled subscription
//! can never reach newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{invalid_argument, ConsoleResult};
use crate::model::ResourcePath;
use crate::store::SnapshotCallback;
use crate::sync::state::{reduce, CollectionAction, DocumentHandle, ViewState};

/// Cancel handle for a collection subscription.
pub type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can deliver collection snapshots to a callback. The store
/// implements this; tests substitute scripted sources.
///
/// Implementations must stop delivering once the returned handle is invoked;
/// the generation guard in `CollectionSync` additionally drops anything a
/// misbehaving source fires after cancellation.
pub trait SnapshotSource: Send + Sync {
    fn subscribe(
        &self,
        collection: &ResourcePath,
        callback: SnapshotCallback,
    ) -> ConsoleResult<Unsubscribe>;
}

pub struct CollectionSync {
    source: Arc<dyn SnapshotSource>,
    state: Arc<Mutex<ViewState>>,
    observed: Option<ResourcePath>,
    subscription: Option<Unsubscribe>,
    generation: Arc<AtomicU64>,
}

impl CollectionSync {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(ViewState::new())),
            observed: None,
            subscription: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts (or restarts) observation of `collection`.
    ///
    /// A new collection identity cancels the previous subscription, applies
    /// `Loading`, and subscribes afresh; observing the identity already
    /// being observed keeps the existing subscription and changes nothing.
    /// Returns the state as of the end of the call.
    pub fn observe(&mut self, collection: &ResourcePath) -> ConsoleResult<ViewState> {
        if collection.is_empty() || collection.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "'{collection}' does not name a collection"
            )));
        }
        if self.subscription.is_some() && self.observed.as_ref() == Some(collection) {
            return Ok(self.state());
        }

        // Stamp a new generation first, then cancel. Anything the old
        // subscription still delivers is rejected by the stamp check.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cancel) = self.subscription.take() {
            cancel();
        }
        self.dispatch(CollectionAction::Loading);
        log::debug!("observing {collection}");

        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let callback: SnapshotCallback = Arc::new(move |delivery| {
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let action = match delivery {
                Ok(snapshot) => CollectionAction::Updated(
                    snapshot
                        .documents()
                        .iter()
                        .cloned()
                        .map(DocumentHandle::from_snapshot)
                        .collect(),
                ),
                Err(error) => CollectionAction::Failed(error),
            };
            let mut cell = state.lock().unwrap();
            let next = reduce(&cell, action);
            *cell = next;
        });

        match self.source.subscribe(collection, callback) {
            Ok(cancel) => {
                self.subscription = Some(cancel);
                self.observed = Some(collection.clone());
                Ok(self.state())
            }
            Err(error) => {
                log::warn!("subscribing to {collection} failed: {error}");
                self.observed = None;
                self.dispatch(CollectionAction::Failed(error.clone()));
                Err(error)
            }
        }
    }

    /// Applies an action to the owned state cell.
    pub fn dispatch(&self, action: CollectionAction) {
        let mut cell = self.state.lock().unwrap();
        let next = reduce(&cell, action);
        *cell = next;
    }

    /// Current view state.
    pub fn state(&self) -> ViewState {
        self.state.lock().unwrap().clone()
    }

    /// The collection currently observed, if any.
    pub fn observed(&self) -> Option<&ResourcePath> {
        self.observed.as_ref()
    }

    /// Ends observation. The subscription is cancelled at most once; late
    /// deliveries are dropped by the generation guard.
    pub fn detach(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = self.subscription.take() {
            cancel();
        }
        self.observed = None;
    }
}

impl Drop for CollectionSync {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::unavailable;
    use crate::model::DocumentKey;
    use crate::store::{CollectionSnapshot, DocumentSnapshot};
    use serde_json::json;

    /// Scripted source: captures callbacks, counts cancels, and can fire
    /// deliveries at any time, including after cancellation.
    #[derive(Default)]
    struct ScriptedSource {
        subscriptions: Mutex<Vec<Scripted>>,
        fail_next: Mutex<Option<&'static str>>,
    }

    struct Scripted {
        collection: ResourcePath,
        callback: SnapshotCallback,
        cancelled: Arc<AtomicU64>,
    }

    impl ScriptedSource {
        fn deliver(&self, index: usize, ids: &[(&str, bool)]) {
            let (collection, callback) = {
                let subs = self.subscriptions.lock().unwrap();
                let sub = &subs[index];
                (sub.collection.clone(), Arc::clone(&sub.callback))
            };
            let documents = ids
                .iter()
                .map(|(id, exists)| {
                    let key = DocumentKey::from_path(collection.child([*id])).unwrap();
                    let data = exists.then(|| json!({}));
                    DocumentSnapshot::new(key, data)
                })
                .collect();
            callback(Ok(CollectionSnapshot::new(collection, documents)));
        }

        fn deliver_error(&self, index: usize, message: &str) {
            let callback = {
                let subs = self.subscriptions.lock().unwrap();
                Arc::clone(&subs[index].callback)
            };
            callback(Err(unavailable(message)));
        }

        fn subscription_count(&self) -> usize {
            self.subscriptions.lock().unwrap().len()
        }

        fn cancel_count(&self, index: usize) -> u64 {
            self.subscriptions.lock().unwrap()[index]
                .cancelled
                .load(Ordering::SeqCst)
        }
    }

    impl SnapshotSource for ScriptedSource {
        fn subscribe(
            &self,
            collection: &ResourcePath,
            callback: SnapshotCallback,
        ) -> ConsoleResult<Unsubscribe> {
            if let Some(message) = self.fail_next.lock().unwrap().take() {
                return Err(unavailable(message));
            }
            let cancelled = Arc::new(AtomicU64::new(0));
            self.subscriptions.lock().unwrap().push(Scripted {
                collection: collection.clone(),
                callback,
                cancelled: Arc::clone(&cancelled),
            });
            Ok(Box::new(move || {
                cancelled.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    fn path(s: &str) -> ResourcePath {
        ResourcePath::from_string(s).unwrap()
    }

    #[test]
    fn observe_enters_loading_until_first_snapshot() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());

        let state = sync.observe(&path("users")).unwrap();
        assert!(state.is_loading());
        assert!(state.documents().is_empty());

        source.deliver(0, &[("a", true), ("b", true)]);
        let state = sync.state();
        assert!(!state.is_loading());
        let ids: Vec<&str> = state.documents().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn reobserving_same_identity_changes_nothing() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());

        sync.observe(&path("users")).unwrap();
        source.deliver(0, &[("a", true)]);

        let state = sync.observe(&path("users")).unwrap();
        assert!(!state.is_loading());
        assert_eq!(state.documents().len(), 1);
        assert_eq!(source.subscription_count(), 1);
        assert_eq!(source.cancel_count(0), 0);
    }

    #[test]
    fn identity_change_cancels_then_reloads() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());

        sync.observe(&path("users")).unwrap();
        source.deliver(0, &[("a", true)]);

        let state = sync.observe(&path("posts")).unwrap();
        assert!(state.is_loading());
        assert!(state.documents().is_empty());
        assert_eq!(source.cancel_count(0), 1);
        assert_eq!(source.subscription_count(), 2);

        source.deliver(1, &[("p1", true)]);
        assert_eq!(sync.state().documents()[0].id(), "p1");
    }

    #[test]
    fn last_snapshot_wins_regardless_of_history() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());
        sync.observe(&path("users")).unwrap();

        source.deliver(0, &[("a", true), ("b", true), ("c", true)]);
        source.deliver(0, &[("b", true)]);
        source.deliver(0, &[("d", true), ("e", false)]);

        let state = sync.state();
        let ids: Vec<&str> = state.documents().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["d", "e"]);
        assert!(state.documents()[1].is_missing());
    }

    #[test]
    fn detach_cancels_exactly_once_and_drops_late_events() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());
        sync.observe(&path("users")).unwrap();

        sync.detach();
        sync.detach();
        assert_eq!(source.cancel_count(0), 1);

        // A late fire from the cancelled subscription must not transition
        // the state.
        source.deliver(0, &[("zombie", true)]);
        let state = sync.state();
        assert!(state.is_loading());
        assert!(state.documents().is_empty());
    }

    #[test]
    fn stale_subscription_cannot_reach_newer_state() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());

        sync.observe(&path("users")).unwrap();
        sync.observe(&path("posts")).unwrap();

        source.deliver(0, &[("stale", true)]);
        assert!(sync.state().is_loading());

        source.deliver(1, &[("fresh", true)]);
        assert_eq!(sync.state().documents()[0].id(), "fresh");
    }

    #[test]
    fn drop_cancels_the_live_subscription() {
        let source = Arc::new(ScriptedSource::default());
        {
            let mut sync = CollectionSync::new(source.clone());
            sync.observe(&path("users")).unwrap();
        }
        assert_eq!(source.cancel_count(0), 1);
    }

    #[test]
    fn rejects_paths_that_are_not_collections() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source);
        assert!(sync.observe(&ResourcePath::root()).is_err());
        assert!(sync.observe(&path("users/alice")).is_err());
    }

    #[test]
    fn subscribe_failure_surfaces_as_failed_state() {
        let source = Arc::new(ScriptedSource::default());
        *source.fail_next.lock().unwrap() = Some("emulator offline");
        let mut sync = CollectionSync::new(source.clone());

        let err = sync.observe(&path("users")).unwrap_err();
        assert_eq!(err.code_str(), "console/unavailable");
        let state = sync.state();
        assert!(!state.is_loading());
        assert!(state.last_error().is_some());
        assert!(sync.observed().is_none());
    }

    #[test]
    fn stream_error_keeps_documents_and_records_error() {
        let source = Arc::new(ScriptedSource::default());
        let mut sync = CollectionSync::new(source.clone());
        sync.observe(&path("users")).unwrap();
        source.deliver(0, &[("a", true)]);

        source.deliver_error(0, "watch dropped");
        let state = sync.state();
        assert_eq!(state.documents().len(), 1);
        assert_eq!(state.last_error().unwrap().code_str(), "console/unavailable");
    }
}
