use serde::{Deserialize, Serialize};
use validator::Validate;

use atrium_core::{Entity, ParentRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    File,
    Folder,
}

/// Flat wire form of a file or folder. The tree shape is rebuilt client
/// side from `parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Id of the containing folder, `None` at the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl File {
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

impl Entity for File {
    const KIND: &'static str = "files";

    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to(&self, parent: &ParentRef) -> bool {
        parent.segment == "folder" && self.parent.as_deref() == Some(parent.id.as_str())
    }
}
