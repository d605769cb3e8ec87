use crate::error::ConsoleError;
use crate::model::DocumentKey;
use crate::store::DocumentSnapshot;

/// One entry in an observed collection.
///
/// `snapshot` is `None` for a missing document: the key is known (documents
/// exist beneath it) but the document itself holds no data.
#[derive(Clone, Debug)]
pub struct DocumentHandle {
    key: DocumentKey,
    snapshot: Option<DocumentSnapshot>,
}

impl DocumentHandle {
    pub(crate) fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        let key = snapshot.key().clone();
        let snapshot = if snapshot.exists() {
            Some(snapshot)
        } else {
            None
        };
        Self { key, snapshot }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn snapshot(&self) -> Option<&DocumentSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_missing(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Navigation target for this document under the console's current base
    /// path. The base path is passed in explicitly; there is no ambient
    /// routing state.
    pub fn nav_target(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.id())
    }
}

/// Locally held view of an observed collection.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    is_loading: bool,
    documents: Vec<DocumentHandle>,
    last_error: Option<ConsoleError>,
}

impl ViewState {
    /// Fresh state: not loading, no documents, no error.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Documents in snapshot delivery order. Empty whenever `is_loading`.
    pub fn documents(&self) -> &[DocumentHandle] {
        &self.documents
    }

    pub fn last_error(&self) -> Option<&ConsoleError> {
        self.last_error.as_ref()
    }

    /// Looks up a routed child document among the current documents.
    pub fn document_by_id(&self, id: &str) -> Option<&DocumentHandle> {
        self.documents.iter().find(|handle| handle.id() == id)
    }
}

#[derive(Clone, Debug)]
pub enum CollectionAction {
    /// A new observation started; any shown documents are stale.
    Loading,
    /// A snapshot arrived; the document list is replaced wholesale.
    Updated(Vec<DocumentHandle>),
    /// The subscription reported an error. Documents already shown stay.
    Failed(ConsoleError),
}

/// Reduces an action into the next view state. Updates always replace the
/// whole document list; nothing is merged.
pub fn reduce(state: &ViewState, action: CollectionAction) -> ViewState {
    match action {
        CollectionAction::Loading => ViewState {
            is_loading: true,
            documents: Vec::new(),
            last_error: None,
        },
        CollectionAction::Updated(documents) => ViewState {
            is_loading: false,
            documents,
            last_error: None,
        },
        CollectionAction::Failed(error) => ViewState {
            is_loading: false,
            documents: state.documents.clone(),
            last_error: Some(error),
        },
    }
}
