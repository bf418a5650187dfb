use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use atrium_core::{Entity, ParentRef};

use crate::refs::Ref;
use crate::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    #[default]
    Member,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Active,
    Left,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Participant {
    #[validate(custom(function = "crate::refs::validate_ref"))]
    pub user: Ref<User>,
    #[serde(default)]
    pub role: ParticipantRole,
    #[serde(default)]
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatGroup {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `false` for a direct (one to one) conversation.
    #[serde(default = "default_true")]
    pub is_group: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    #[validate(nested)]
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Ref<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl ChatGroup {
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Active)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.user.is(user_id) && p.role == ParticipantRole::Admin)
    }
}

impl Entity for ChatGroup {
    const KIND: &'static str = "chatgroups";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[validate(custom(function = "crate::refs::validate_ref"))]
    pub sender: Ref<User>,
    #[serde(default)]
    pub content: String,
    #[validate(custom(function = "crate::refs::validate_ref"))]
    pub chat: Ref<ChatGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    pub fn chat_id(&self) -> &str {
        self.chat.id()
    }
}

impl Entity for Message {
    const KIND: &'static str = "messages";

    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to(&self, parent: &ParentRef) -> bool {
        parent.segment == "chat" && self.chat_id() == parent.id
    }
}
