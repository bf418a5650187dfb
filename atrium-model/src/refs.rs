use serde::{Deserialize, Serialize};

use atrium_core::Entity;

/// A relationship field the backend sends either as a bare id or as the
/// populated document.
///
/// ```
/// use atrium_model::{Ref, User};
///
/// let by_id: Ref<User> = serde_json::from_str(r#""u1""#).unwrap();
/// assert_eq!(by_id.id(), "u1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Populated(Box<T>),
}

impl<T: Entity> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Populated(entity) => entity.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(entity) => Some(entity),
        }
    }

    pub fn is(&self, id: &str) -> bool {
        self.id() == id
    }
}

impl<T> From<String> for Ref<T> {
    fn from(id: String) -> Self {
        Ref::Id(id)
    }
}

impl<T> From<&str> for Ref<T> {
    fn from(id: &str) -> Self {
        Ref::Id(id.to_string())
    }
}

pub(crate) fn validate_ref<T: Entity>(r: &Ref<T>) -> Result<(), validator::ValidationError> {
    if r.id().trim().is_empty() {
        let mut err = validator::ValidationError::new("reference");
        err.message = Some("reference id must not be empty".into());
        return Err(err);
    }
    Ok(())
}
