//! Which dashboard sections each role may open.

use crate::user::Role;

pub const DASHBOARD: &str = "dashboard";
pub const USERS: &str = "users";
pub const PREMIUM_USERS: &str = "premium-users";
pub const ORGANIZATIONS: &str = "organizations";
pub const SERVICES: &str = "services";
pub const PROJECTS: &str = "projects";
pub const CHAT_GROUP: &str = "chat-group";
pub const NOTIFICATIONS: &str = "notifications";
pub const MESSAGES: &str = "messages";
pub const REPORTS_BANS: &str = "reports-bans";
pub const MANAGE_ADMINS: &str = "manage-admins";

const ADMIN: &[&str] = &[
    DASHBOARD,
    USERS,
    PREMIUM_USERS,
    ORGANIZATIONS,
    SERVICES,
    PROJECTS,
    CHAT_GROUP,
    NOTIFICATIONS,
    MESSAGES,
    REPORTS_BANS,
    MANAGE_ADMINS,
];

const SUPER_ADMIN: &[&str] = &[
    DASHBOARD,
    USERS,
    SERVICES,
    PROJECTS,
    CHAT_GROUP,
    NOTIFICATIONS,
    MESSAGES,
    REPORTS_BANS,
    MANAGE_ADMINS,
];

const PROJECT_MANAGER: &[&str] = &[DASHBOARD, USERS, PROJECTS, CHAT_GROUP, NOTIFICATIONS, MESSAGES];

const MEMBER: &[&str] = &[DASHBOARD, PROJECTS, CHAT_GROUP, NOTIFICATIONS];

pub fn sections_for(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => ADMIN,
        Role::SuperAdmin => SUPER_ADMIN,
        Role::ProjectManager => PROJECT_MANAGER,
        Role::Developer | Role::TeamMember | Role::User => MEMBER,
    }
}

/// Signed-out visitors (no role) see nothing.
pub fn can_access(role: Option<Role>, section: &str) -> bool {
    role.map(|r| sections_for(r).iter().any(|s| *s == section))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_sees_everything() {
        for section in ADMIN {
            assert!(can_access(Some(Role::Admin), section));
        }
    }

    #[test]
    fn super_admin_cannot_manage_organizations() {
        assert!(!can_access(Some(Role::SuperAdmin), ORGANIZATIONS));
        assert!(!can_access(Some(Role::SuperAdmin), PREMIUM_USERS));
        assert!(can_access(Some(Role::SuperAdmin), MANAGE_ADMINS));
    }

    #[test]
    fn members_are_limited() {
        assert!(!can_access(Some(Role::Developer), USERS));
        assert!(can_access(Some(Role::TeamMember), PROJECTS));
        assert!(can_access(Some(Role::ProjectManager), MESSAGES));
        assert!(!can_access(None, DASHBOARD));
    }
}
