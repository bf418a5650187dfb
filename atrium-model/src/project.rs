use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use atrium_core::{Entity, ParentRef};

use crate::file::File;
use crate::organization::Organization;
use crate::refs::Ref;
use crate::task::Task;
use crate::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Inactive,
    Completed,
    Archived,
}

/// A (user, role, addedAt, addedBy) association attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[validate(custom(function = "crate::refs::validate_ref"))]
    pub user: Ref<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<Ref<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Ref<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Ref<Organization>>,
    #[serde(default)]
    #[validate(nested)]
    pub team_members: Vec<TeamMember>,
    #[serde(default)]
    pub files: Vec<Ref<File>>,
    #[serde(default)]
    pub tasks: Vec<Ref<Task>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Project {
    pub fn member(&self, user_id: &str) -> Option<&TeamMember> {
        self.team_members.iter().find(|m| m.user.is(user_id))
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization.as_ref().map(Ref::id)
    }
}

impl Entity for Project {
    const KIND: &'static str = "projects";

    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to(&self, parent: &ParentRef) -> bool {
        parent.segment == "organization" && self.organization_id() == Some(parent.id.as_str())
    }
}
