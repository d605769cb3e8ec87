use crate::error::{invalid_argument, ConsoleResult};
use crate::model::ResourcePath;

/// The path of a single document. Always an even, non-zero number of
/// segments; the final segment is the document id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> ConsoleResult<Self> {
        if path.is_empty() || path.len() % 2 != 0 {
            return Err(invalid_argument(format!(
                "'{path}' does not name a document (documents have an even number of segments)"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> ConsoleResult<Self> {
        Self::from_path(ResourcePath::from_string(path)?)
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path
            .last_segment()
            .expect("document keys are never empty")
    }

    /// The collection this document belongs to.
    pub fn collection_path(&self) -> ResourcePath {
        self.path.without_last()
    }
}
