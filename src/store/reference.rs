use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde_json::Value;

use crate::error::{invalid_argument, ConsoleResult};
use crate::model::{DocumentKey, ResourcePath};
use crate::store::database::DocumentStore;
use crate::store::listener::ListenerRegistration;
use crate::store::snapshot::{CollectionSnapshot, DocumentSnapshot};

#[derive(Clone, Debug)]
pub struct CollectionReference {
    store: DocumentStore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(store: DocumentStore, path: ResourcePath) -> ConsoleResult<Self> {
        if path.is_empty() || path.len() % 2 == 0 {
            return Err(invalid_argument(
                "collection references must point to a collection (odd number of segments)",
            ));
        }
        Ok(Self { store, path })
    }

    /// The full path of the collection (e.g. `users/alice/pets`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path
            .last_segment()
            .expect("collection paths are never empty")
    }

    /// The document that logically contains this collection, if any.
    pub fn parent(&self) -> Option<DocumentReference> {
        if self.path.len() < 2 {
            return None;
        }
        DocumentReference::new(self.store.clone(), self.path.without_last()).ok()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, an auto-id is generated.
    pub fn doc(&self, document_id: Option<&str>) -> ConsoleResult<DocumentReference> {
        let id = match document_id {
            Some(id) if id.contains('/') => {
                return Err(invalid_argument("document id cannot contain '/'"))
            }
            Some(id) if id.is_empty() => {
                return Err(invalid_argument("document id cannot be empty"))
            }
            Some(id) => id.to_string(),
            None => generate_auto_id(),
        };
        DocumentReference::new(self.store.clone(), self.path.child([id]))
    }

    /// One-shot read of the collection's current snapshot.
    pub async fn get(&self) -> ConsoleResult<CollectionSnapshot> {
        self.store.read_collection(&self.path)
    }

    /// Registers a snapshot listener. The listener hears the current
    /// snapshot at registration and every later change to the collection.
    pub async fn on_snapshot<F>(&self, callback: F) -> ConsoleResult<ListenerRegistration>
    where
        F: Fn(ConsoleResult<CollectionSnapshot>) + Send + Sync + 'static,
    {
        self.store.subscribe_collection(&self.path, Arc::new(callback))
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path.canonical_string())
    }
}

#[derive(Clone, Debug)]
pub struct DocumentReference {
    store: DocumentStore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(store: DocumentStore, path: ResourcePath) -> ConsoleResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { store, key })
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference::new(self.store.clone(), self.key.collection_path())
            .expect("a document parent path is always a collection")
    }

    /// Returns a reference to a subcollection rooted at this document.
    pub fn collection(&self, path: &str) -> ConsoleResult<CollectionReference> {
        let relative = ResourcePath::from_string(path)?;
        if relative.is_empty() {
            return Err(invalid_argument("subcollection path cannot be empty"));
        }
        CollectionReference::new(self.store.clone(), self.key.path().append(&relative))
    }

    /// Replaces the document's fields. `value` must be a JSON object.
    pub async fn set(&self, value: Value) -> ConsoleResult<()> {
        self.store.set_document(&self.key, value)
    }

    /// Merges `value`'s top-level fields into the existing document.
    pub async fn update(&self, value: Value) -> ConsoleResult<()> {
        self.store.update_document(&self.key, value)
    }

    /// Deletes the document. Subcollections beneath it are untouched.
    pub async fn delete(&self) -> ConsoleResult<()> {
        self.store.delete_document(&self.key)
    }

    pub async fn get(&self) -> ConsoleResult<DocumentSnapshot> {
        self.store.read_document(&self.key)
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path().canonical_string())
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(20)
        .collect()
}
