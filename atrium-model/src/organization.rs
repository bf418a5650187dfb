use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use atrium_core::Entity;

use crate::project::Project;
use crate::refs::Ref;
use crate::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_admin: Option<Ref<User>>,
    #[serde(default)]
    pub users: Vec<Ref<User>>,
    #[serde(default)]
    pub projects: Vec<Ref<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u.is(user_id))
    }
}

impl Entity for Organization {
    const KIND: &'static str = "organizations";

    fn id(&self) -> &str {
        &self.id
    }
}
