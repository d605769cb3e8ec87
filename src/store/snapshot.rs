use serde_json::Value;

use crate::model::{DocumentKey, ResourcePath};

/// Point-in-time view of a single document.
///
/// `data` is `None` for a missing document: a path that holds no fields of
/// its own but is kept visible because documents exist beneath it.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<Value>,
}

impl DocumentSnapshot {
    pub(crate) fn new(key: DocumentKey, data: Option<Value>) -> Self {
        Self { key, data }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// Whether the document holds data of its own.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}

/// Point-in-time view of a collection, as delivered to snapshot listeners.
/// Document order is the store's key order and is stable across deliveries.
#[derive(Clone, Debug)]
pub struct CollectionSnapshot {
    collection: ResourcePath,
    documents: Vec<DocumentSnapshot>,
}

impl CollectionSnapshot {
    pub(crate) fn new(collection: ResourcePath, documents: Vec<DocumentSnapshot>) -> Self {
        Self {
            collection,
            documents,
        }
    }

    pub fn collection(&self) -> &ResourcePath {
        &self.collection
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
