use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{invalid_argument, not_found, ConsoleResult};
use crate::model::{DocumentKey, ResourcePath};
use crate::requests::{RequestLog, RequestMethod};
use crate::store::listener::{ListenerRegistration, SnapshotCallback};
use crate::store::reference::{CollectionReference, DocumentReference};
use crate::store::snapshot::{CollectionSnapshot, DocumentSnapshot};
use crate::sync::{SnapshotSource, Unsubscribe};

/// In-memory document store emulating the backend the console browses.
///
/// Documents live in a flat map keyed by path; collections are implied by
/// the documents (and subcollections) beneath them. Deleting a document does
/// not delete its subcollections, which is how missing documents arise.
/// Snapshot listeners are registered per collection path and hear the
/// current snapshot at registration, then every mutation that touches the
/// collection.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    documents: Mutex<BTreeMap<DocumentKey, Value>>,
    listeners: Mutex<BTreeMap<ResourcePath, Vec<ListenerEntry>>>,
    listener_counter: AtomicU64,
    requests: RequestLog,
}

struct ListenerEntry {
    id: u64,
    callback: SnapshotCallback,
}

impl Debug for DocumentStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("project_id", &self.project_id())
            .finish()
    }
}

impl DocumentStore {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                documents: Mutex::new(BTreeMap::new()),
                listeners: Mutex::new(BTreeMap::new()),
                listener_counter: AtomicU64::new(1),
                requests: RequestLog::new(project_id),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        self.inner.requests.project_id()
    }

    /// The request log shared by every handle to this store.
    pub fn request_log(&self) -> RequestLog {
        self.inner.requests.clone()
    }

    pub fn collection(&self, path: &str) -> ConsoleResult<CollectionReference> {
        CollectionReference::new(self.clone(), ResourcePath::from_string(path)?)
    }

    pub fn doc(&self, path: &str) -> ConsoleResult<DocumentReference> {
        DocumentReference::new(self.clone(), ResourcePath::from_string(path)?)
    }

    pub(crate) fn set_document(&self, key: &DocumentKey, value: Value) -> ConsoleResult<()> {
        self.inner
            .requests
            .record(RequestMethod::Set, key.path().canonical_string());
        if !value.is_object() {
            return Err(invalid_argument("document data must be a JSON object"));
        }
        self.inner
            .documents
            .lock()
            .unwrap()
            .insert(key.clone(), value);
        log::debug!("set {}", key.path());
        self.notify_ancestors(key);
        Ok(())
    }

    pub(crate) fn update_document(&self, key: &DocumentKey, value: Value) -> ConsoleResult<()> {
        self.inner
            .requests
            .record(RequestMethod::Update, key.path().canonical_string());
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(invalid_argument("update data must be a JSON object")),
        };
        {
            let mut documents = self.inner.documents.lock().unwrap();
            let existing = documents.get_mut(key).ok_or_else(|| {
                not_found(format!("no document to update at '{}'", key.path()))
            })?;
            let target = existing
                .as_object_mut()
                .expect("stored documents are always objects");
            for (field, field_value) in fields {
                target.insert(field, field_value);
            }
        }
        log::debug!("update {}", key.path());
        self.notify_ancestors(key);
        Ok(())
    }

    pub(crate) fn delete_document(&self, key: &DocumentKey) -> ConsoleResult<()> {
        self.inner
            .requests
            .record(RequestMethod::Delete, key.path().canonical_string());
        let removed = self.inner.documents.lock().unwrap().remove(key).is_some();
        if removed {
            log::debug!("delete {}", key.path());
            self.notify_ancestors(key);
        }
        Ok(())
    }

    pub(crate) fn read_document(&self, key: &DocumentKey) -> ConsoleResult<DocumentSnapshot> {
        self.inner
            .requests
            .record(RequestMethod::Get, key.path().canonical_string());
        let data = self.inner.documents.lock().unwrap().get(key).cloned();
        Ok(DocumentSnapshot::new(key.clone(), data))
    }

    pub(crate) fn read_collection(
        &self,
        collection: &ResourcePath,
    ) -> ConsoleResult<CollectionSnapshot> {
        self.inner
            .requests
            .record(RequestMethod::Get, collection.canonical_string());
        Ok(self.build_snapshot(collection))
    }

    pub(crate) fn subscribe_collection(
        &self,
        collection: &ResourcePath,
        callback: SnapshotCallback,
    ) -> ConsoleResult<ListenerRegistration> {
        if collection.is_empty() || collection.len() % 2 == 0 {
            return Err(invalid_argument(
                "snapshot listeners attach to collections (odd number of segments)",
            ));
        }
        self.inner
            .requests
            .record(RequestMethod::Listen, collection.canonical_string());

        let id = self.inner.listener_counter.fetch_add(1, Ordering::SeqCst);
        {
            let mut listeners = self.inner.listeners.lock().unwrap();
            listeners
                .entry(collection.clone())
                .or_insert_with(Vec::new)
                .push(ListenerEntry {
                    id,
                    callback: Arc::clone(&callback),
                });
        }
        log::debug!("listener {id} attached to {collection}");

        // New listeners hear the current snapshot right away.
        callback(Ok(self.build_snapshot(collection)));

        Ok(ListenerRegistration::new(self.clone(), id))
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        let mut listeners = self.inner.listeners.lock().unwrap();
        listeners.retain(|collection, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            if entries.len() != before {
                log::debug!("listener {id} detached from {collection}");
            }
            !entries.is_empty()
        });
    }

    /// Snapshot of the direct children of `collection`. A child id with
    /// document data yields an existing snapshot; a child id kept alive only
    /// by deeper documents yields a missing one.
    fn build_snapshot(&self, collection: &ResourcePath) -> CollectionSnapshot {
        let child_depth = collection.len() + 1;
        let mut children: BTreeMap<String, Option<Value>> = BTreeMap::new();
        {
            let documents = self.inner.documents.lock().unwrap();
            for (key, value) in documents.iter() {
                let path = key.path();
                if !collection.is_prefix_of(path) {
                    continue;
                }
                let child_id = match path.segment(collection.len()) {
                    Some(id) => id.to_string(),
                    None => continue,
                };
                if path.len() == child_depth {
                    children.insert(child_id, Some(value.clone()));
                } else {
                    children.entry(child_id).or_insert(None);
                }
            }
        }

        let documents = children
            .into_iter()
            .map(|(id, data)| {
                let key = DocumentKey::from_path(collection.child([id]))
                    .expect("collection child paths always name documents");
                DocumentSnapshot::new(key, data)
            })
            .collect();
        CollectionSnapshot::new(collection.clone(), documents)
    }

    /// Pushes fresh snapshots to every listened-to collection on the path of
    /// `key`. A deep write can change ancestor collections too, by creating
    /// or removing a missing document.
    fn notify_ancestors(&self, key: &DocumentKey) {
        for depth in (1..key.path().len()).step_by(2) {
            let collection = key.path().prefix(depth);
            let callbacks: Vec<SnapshotCallback> = {
                let listeners = self.inner.listeners.lock().unwrap();
                match listeners.get(&collection) {
                    Some(entries) => entries
                        .iter()
                        .map(|entry| Arc::clone(&entry.callback))
                        .collect(),
                    None => continue,
                }
            };
            let snapshot = self.build_snapshot(&collection);
            for callback in callbacks {
                callback(Ok(snapshot.clone()));
            }
        }
    }
}

impl SnapshotSource for DocumentStore {
    fn subscribe(
        &self,
        collection: &ResourcePath,
        callback: SnapshotCallback,
    ) -> ConsoleResult<Unsubscribe> {
        let registration = self.subscribe_collection(collection, callback)?;
        Ok(Box::new(move || registration.detach()))
    }
}
