use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use atrium_core::{Entity, ParentRef};

use crate::organization::Organization;
use crate::refs::Ref;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    Developer,
    #[serde(rename = "Team Member")]
    TeamMember,
    User,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::SuperAdmin,
        Role::ProjectManager,
        Role::Developer,
        Role::TeamMember,
        Role::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::SuperAdmin => "Super Admin",
            Role::ProjectManager => "Project Manager",
            Role::Developer => "Developer",
            Role::TeamMember => "Team Member",
            Role::User => "User",
        }
    }

    /// Roles that only exist inside an organization.
    pub fn is_organizational(&self) -> bool {
        matches!(
            self,
            Role::ProjectManager | Role::Developer | Role::TeamMember | Role::SuperAdmin
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email must be valid"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Ref<Organization>>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn organization_id(&self) -> Option<&str> {
        self.organization.as_ref().map(Ref::id)
    }
}

impl Entity for User {
    const KIND: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to(&self, parent: &ParentRef) -> bool {
        parent.segment == "organization" && self.organization_id() == Some(parent.id.as_str())
    }
}
