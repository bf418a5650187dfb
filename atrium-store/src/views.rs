//! Read-only views over the stores.
//!
//! The predicates are pure; [`LazyView`] is the only piece that issues a
//! request, and only once.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};

use atrium_core::{AtriumConfigSnapshot, Entity};
use atrium_model::{Organization, Project, Role, Service, User, UserStatus};

use crate::scope::Scope;
use crate::store::{EntityStore, Settled};

pub fn is_premium(user: &User) -> bool {
    user.is_premium
}

pub fn is_active(user: &User) -> bool {
    user.status == Some(UserStatus::Active)
}

pub fn has_role(user: &User, role: Role) -> bool {
    user.role == Some(role)
}

pub fn has_status(user: &User, status: UserStatus) -> bool {
    user.status == Some(status)
}

pub fn in_organization(user: &User, organization_id: &str) -> bool {
    user.organization_id() == Some(organization_id)
}

/// Project Manager, Developer, Team Member or Super Admin.
pub fn is_organization_user(user: &User) -> bool {
    user.role.map(|r| r.is_organizational()).unwrap_or(false)
}

pub fn is_public_user(user: &User) -> bool {
    has_role(user, Role::User)
}

pub fn is_premium_service(service: &Service) -> bool {
    service.is_premium()
}

pub fn premium_users(users: &[User]) -> Vec<User> {
    filter(users, is_premium)
}

pub fn active_users(users: &[User]) -> Vec<User> {
    filter(users, is_active)
}

pub fn users_with_role(users: &[User], role: Role) -> Vec<User> {
    filter(users, |u| has_role(u, role))
}

pub fn users_with_status(users: &[User], status: UserStatus) -> Vec<User> {
    filter(users, |u| has_status(u, status))
}

pub fn users_in_organization(users: &[User], organization_id: &str) -> Vec<User> {
    filter(users, |u| in_organization(u, organization_id))
}

pub fn new_users(users: &[User], policy: NewUserPolicy, now: DateTime<Utc>) -> Vec<User> {
    filter(users, |u| policy.is_new(u, now))
}

fn filter<T: Clone>(items: &[T], pred: impl Fn(&T) -> bool) -> Vec<T> {
    items.iter().filter(|item| pred(item)).cloned().collect()
}

/// What counts as a "new" user.
///
/// Configured with `views.new_users`: `"30d"` (or a bare `"30"`) for a
/// trailing window, `"today"` for the current UTC calendar day. The default
/// is a 30 day trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewUserPolicy {
    /// Created strictly after `now - n days`.
    TrailingDays(u32),
    /// Created on the same UTC date as `now`.
    SameCalendarDay,
}

impl Default for NewUserPolicy {
    fn default() -> Self {
        NewUserPolicy::TrailingDays(30)
    }
}

impl NewUserPolicy {
    pub const CONFIG_KEY: &'static str = "views.new_users";

    pub fn from_snapshot(snapshot: &AtriumConfigSnapshot) -> Result<Self> {
        match snapshot.get(Self::CONFIG_KEY) {
            Some(raw) => raw.parse(),
            None => Ok(Self::default()),
        }
    }

    pub fn admits(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            NewUserPolicy::TrailingDays(days) => {
                created_at > now - Duration::days(i64::from(*days))
            }
            NewUserPolicy::SameCalendarDay => created_at.date_naive() == now.date_naive(),
        }
    }

    /// Users without a creation time are never new.
    pub fn is_new(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.created_at
            .map(|created| self.admits(created, now))
            .unwrap_or(false)
    }
}

impl FromStr for NewUserPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "today" | "same-day" | "same_calendar_day" => Ok(NewUserPolicy::SameCalendarDay),
            other => other
                .trim_end_matches('d')
                .parse::<u32>()
                .map(NewUserPolicy::TrailingDays)
                .map_err(|_| anyhow!("Invalid '{}' value '{s}'. Expected '30d' or 'today'.", Self::CONFIG_KEY)),
        }
    }
}

impl fmt::Display for NewUserPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewUserPolicy::TrailingDays(days) => write!(f, "{days}d"),
            NewUserPolicy::SameCalendarDay => f.write_str("today"),
        }
    }
}

/// Fetches its store once, the first time it finds it empty and idle.
///
/// If that fetch is cancelled (its scope went away) the view may try again
/// on a later read; once a fetch has settled it never fetches again.
pub struct LazyView<T: Entity> {
    store: EntityStore<T>,
    requested: AtomicBool,
}

impl<T: Entity> LazyView<T> {
    pub fn new(store: EntityStore<T>) -> Self {
        Self {
            store,
            requested: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &EntityStore<T> {
        &self.store
    }

    pub fn has_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Returns the settle of the fetch it triggered, or `None` when no
    /// fetch was needed.
    pub async fn ensure_loaded(&self, scope: &Scope) -> Option<Settled<Vec<T>>> {
        let idle_and_empty = self.store.read(|s| s.is_empty() && !s.loading());
        if !idle_and_empty {
            return None;
        }
        if self.requested.swap(true, Ordering::SeqCst) {
            return None;
        }
        let mut claim = FetchClaim {
            flag: &self.requested,
            kept: false,
        };

        tracing::debug!(store = T::KIND, "lazy view triggering initial fetch");
        let settled = self.store.fetch_all(scope).await;
        claim.kept = !settled.is_cancelled();
        Some(settled)
    }

    pub async fn items(&self, scope: &Scope) -> Vec<T> {
        self.ensure_loaded(scope).await;
        self.store.items()
    }

    /// Loads, then filters.
    pub async fn filtered(&self, scope: &Scope, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.ensure_loaded(scope).await;
        self.store
            .read(|s| s.items().iter().filter(|i| pred(i)).cloned().collect())
    }

    /// Cached record, or a fetch by id when it is missing and the store is
    /// idle.
    pub async fn lookup_or_fetch(&self, scope: &Scope, id: &str) -> Option<T> {
        let (cached, loading) = self.store.read(|s| (s.get(id).cloned(), s.loading()));
        if cached.is_some() || loading {
            return cached;
        }
        self.store.fetch_by_id(scope, id).await.ok()
    }
}

/// Releases a [`LazyView`]'s single fetch unless it settled. Covers both a
/// cancelled fetch and an `ensure_loaded` future dropped mid-request.
struct FetchClaim<'a> {
    flag: &'a AtomicBool,
    kept: bool,
}

impl Drop for FetchClaim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

/// Headline counts on the dashboard landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub admins: usize,
    pub super_admins: usize,
    pub organizations: usize,
    pub organization_users: usize,
    pub public_users: usize,
    pub premium_users: usize,
    pub active_users: usize,
    pub new_users: usize,
    pub services: usize,
    pub premium_services: usize,
    pub projects: usize,
}

impl DashboardStats {
    pub fn compute(
        users: &[User],
        organizations: &[Organization],
        services: &[Service],
        projects: &[Project],
        policy: NewUserPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let count = |pred: fn(&User, &NewUserPolicy, DateTime<Utc>) -> bool| {
            users.iter().filter(|u| pred(u, &policy, now)).count()
        };
        Self {
            total_users: users.len(),
            admins: count(|u, _, _| has_role(u, Role::Admin)),
            super_admins: count(|u, _, _| has_role(u, Role::SuperAdmin)),
            organizations: organizations.len(),
            organization_users: count(|u, _, _| is_organization_user(u)),
            public_users: count(|u, _, _| is_public_user(u)),
            premium_users: count(|u, _, _| is_premium(u)),
            active_users: count(|u, _, _| is_active(u)),
            new_users: count(|u, policy, now| policy.is_new(u, now)),
            services: services.len(),
            premium_services: services.iter().filter(|s| is_premium_service(s)).count(),
            projects: projects.len(),
        }
    }

    /// Value for a stat card by its title.
    pub fn stat_value(&self, title: &str) -> Option<usize> {
        let value = match title {
            "Total Users" => self.total_users,
            "Admins" => self.admins,
            "Super Admins" => self.super_admins,
            "Organizations" => self.organizations,
            "Organizational Users" => self.organization_users,
            "Public Users" => self.public_users,
            "Premium Users" => self.premium_users,
            "Active Users" => self.active_users,
            "New Users" => self.new_users,
            "Services" => self.services,
            "Premium Services" => self.premium_services,
            "Projects" => self.projects,
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn user(value: serde_json::Value) -> User {
        serde_json::from_value(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn premium_view_matches_the_flag() {
        let users = vec![
            user(json!({"_id": "1", "username": "a", "isPremium": true})),
            user(json!({"_id": "2", "username": "b", "isPremium": false})),
        ];
        let premium = premium_users(&users);
        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].id, "1");

        let reversed: Vec<User> = users.iter().rev().cloned().collect();
        assert_eq!(premium_users(&reversed), premium);
    }

    #[test]
    fn trailing_window_is_strict() {
        let policy = NewUserPolicy::TrailingDays(30);
        assert!(policy.admits(now() - Duration::days(29), now()));
        assert!(!policy.admits(now() - Duration::days(30), now()));
    }

    #[test]
    fn same_day_ignores_the_clock() {
        let policy = NewUserPolicy::SameCalendarDay;
        let morning = Utc.with_ymd_and_hms(2024, 6, 15, 0, 5, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 6, 14, 23, 59, 0).unwrap();
        assert!(policy.admits(morning, now()));
        assert!(!policy.admits(yesterday, now()));
    }

    #[test]
    fn policy_parses_from_config() {
        assert_eq!("today".parse::<NewUserPolicy>().unwrap(), NewUserPolicy::SameCalendarDay);
        assert_eq!("7d".parse::<NewUserPolicy>().unwrap(), NewUserPolicy::TrailingDays(7));
        assert_eq!(" 14 ".parse::<NewUserPolicy>().unwrap(), NewUserPolicy::TrailingDays(14));
        assert!("weekly".parse::<NewUserPolicy>().is_err());
        assert_eq!(
            NewUserPolicy::from_snapshot(&AtriumConfigSnapshot::default()).unwrap(),
            NewUserPolicy::TrailingDays(30)
        );
    }

    #[test]
    fn users_without_creation_time_are_not_new() {
        let users = vec![
            user(json!({"_id": "1", "created_at": "2024-06-14T10:00:00Z"})),
            user(json!({"_id": "2"})),
        ];
        assert_eq!(new_users(&users, NewUserPolicy::default(), now()).len(), 1);
    }

    #[test]
    fn dashboard_stats_count_each_category() {
        let users = vec![
            user(json!({"_id": "1", "role": "Admin", "status": "active", "isPremium": true})),
            user(json!({"_id": "2", "role": "Super Admin", "status": "banned"})),
            user(json!({"_id": "3", "role": "Developer", "status": "active", "organization": "o1"})),
            user(json!({"_id": "4", "role": "User", "created_at": "2024-06-15T08:00:00Z"})),
        ];
        let services: Vec<Service> = serde_json::from_value(json!([
            {"_id": "s1", "type": "premium"},
            {"_id": "s2"}
        ]))
        .unwrap();

        let stats = DashboardStats::compute(&users, &[], &services, &[], NewUserPolicy::SameCalendarDay, now());

        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.super_admins, 1);
        assert_eq!(stats.organization_users, 2);
        assert_eq!(stats.public_users, 1);
        assert_eq!(stats.premium_users, 1);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.new_users, 1);
        assert_eq!(stats.premium_services, 1);
        assert_eq!(stats.stat_value("Premium Services"), Some(1));
        assert_eq!(stats.stat_value("Revenue"), None);
        assert_eq!(users_in_organization(&users, "o1").len(), 1);
    }
}
