use std::fmt::Debug;

/// A record the dashboard caches, keyed by its backend `_id`.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Collection name, also the event namespace (`"users"`, `"projects"`).
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Whether this record lives under `parent` (e.g. a message in a chat).
    ///
    /// Stores use it to replace one parent's slice of a collection without
    /// touching the rest.
    fn belongs_to(&self, _parent: &ParentRef) -> bool {
        false
    }
}

/// Parent a nested collection hangs off: `GET /tasks/project/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub segment: &'static str,
    pub id: String,
}

impl ParentRef {
    pub fn new(segment: &'static str, id: impl Into<String>) -> Self {
        Self {
            segment,
            id: id.into(),
        }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new("project", id)
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self::new("organization", id)
    }

    pub fn chat(id: impl Into<String>) -> Self {
        Self::new("chat", id)
    }
}
