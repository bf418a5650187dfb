//! Request bodies sent by the stores. These are what the backend expects on
//! the wire, not the entities it answers with.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use atrium_core::{ApiError, Attachment};

/// One team member entry in a project creation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeamMember {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

/// A file picked in the UI, carried as base64 until it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadFile {
    pub name: String,
    #[serde(default)]
    pub extension: String,
    /// Base64 encoded body.
    pub content: String,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, extension: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            content: BASE64.encode(bytes),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.extension)
    }
}

/// Project creation. Sent as multipart when files are attached, JSON
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default)]
    pub team_members: Vec<NewTeamMember>,
    #[serde(default, skip_serializing)]
    pub files: Vec<UploadFile>,
}

impl NewProject {
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// Plain JSON body, without files.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Text parts of the multipart form. `teamMembers` travels as a JSON
    /// string because form fields are flat.
    pub fn form_fields(&self) -> Value {
        let mut fields = json!({
            "name": self.name,
            "description": self.description,
            "teamMembers": serde_json::to_string(&self.team_members).unwrap_or_else(|_| "[]".into()),
        });
        if let (Some(org), Some(map)) = (&self.organization, fields.as_object_mut()) {
            map.insert("organization".into(), Value::String(org.clone()));
        }
        fields
    }

    /// Decoded file parts, all under the `files` field.
    pub fn attachments(&self) -> Result<Vec<Attachment>, ApiError> {
        self.files
            .iter()
            .map(|f| {
                let bytes = BASE64.decode(f.content.as_bytes()).map_err(|e| {
                    ApiError::bad_request(format!("File {} is not valid base64", f.name))
                        .with_source(e.into())
                })?;
                Ok(Attachment {
                    field: "files".to_string(),
                    file_name: f.name.clone(),
                    mime_type: f.mime_type().to_string(),
                    bytes,
                })
            })
            .collect()
    }
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserToProject {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAssignment {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUsersToProject {
    pub users: Vec<MemberAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserFromProject {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEdit {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub chat: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_file() -> NewProject {
        NewProject {
            name: "Apollo".into(),
            description: "moonshot".into(),
            organization: Some("o1".into()),
            team_members: vec![NewTeamMember {
                user: "u1".into(),
                role: Some("Developer".into()),
                added_at: None,
                added_by: Some("u0".into()),
            }],
            files: vec![UploadFile::from_bytes("brief.pdf", "pdf", b"%PDF-1.4")],
        }
    }

    #[test]
    fn form_fields_stringify_team_members() {
        let fields = project_with_file().form_fields();
        assert_eq!(fields["name"], "Apollo");
        assert_eq!(fields["organization"], "o1");

        let members: Value = serde_json::from_str(fields["teamMembers"].as_str().unwrap()).unwrap();
        assert_eq!(members[0]["user"], "u1");
        assert_eq!(members[0]["addedBy"], "u0");
    }

    #[test]
    fn attachments_decode_and_carry_mime_type() {
        let parts = project_with_file().attachments().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].field, "files");
        assert_eq!(parts[0].mime_type, "application/pdf");
        assert_eq!(parts[0].bytes, b"%PDF-1.4");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let f = UploadFile::from_bytes("blob.xyz", "xyz", b"1");
        assert_eq!(f.mime_type(), "application/octet-stream");
    }

    #[test]
    fn json_body_skips_files() {
        let body = project_with_file().to_json();
        assert!(body.get("files").is_none());
        assert_eq!(body["teamMembers"][0]["role"], "Developer");
    }

    #[test]
    fn bad_base64_is_a_bad_request() {
        let mut p = project_with_file();
        p.files[0].content = "***".into();
        let err = p.attachments().unwrap_err();
        assert_eq!(err.code(), Some(400));
    }
}
