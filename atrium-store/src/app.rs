use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use atrium_core::{AtriumConfigSnapshot, EntityService, ParentRef, SharedEventHub};
use atrium_model::{ChatGroup, File, Message, Organization, Project, Service, Task, User};
use atrium_rest::{RestClient, RestService};

use crate::files::{build_tree, FileNode};
use crate::gantt::{layout, GanttLayout, GanttOptions};
use crate::scope::Scope;
use crate::store::{EntityStore, Settled};
use crate::views::{DashboardStats, NewUserPolicy};

/// One service per entity kind.
pub struct AppServices {
    pub users: Arc<dyn EntityService<User>>,
    pub organizations: Arc<dyn EntityService<Organization>>,
    pub services: Arc<dyn EntityService<Service>>,
    pub projects: Arc<dyn EntityService<Project>>,
    pub tasks: Arc<dyn EntityService<Task>>,
    pub chat_groups: Arc<dyn EntityService<ChatGroup>>,
    pub messages: Arc<dyn EntityService<Message>>,
    pub files: Arc<dyn EntityService<File>>,
}

impl AppServices {
    /// REST services for every kind, sharing `client`.
    pub fn rest(client: &RestClient) -> Self {
        Self {
            users: Arc::new(RestService::<User>::new(client.clone())),
            organizations: Arc::new(RestService::<Organization>::new(client.clone())),
            services: Arc::new(RestService::<Service>::new(client.clone())),
            projects: Arc::new(RestService::<Project>::new(client.clone())),
            tasks: Arc::new(RestService::<Task>::new(client.clone())),
            chat_groups: Arc::new(RestService::<ChatGroup>::new(client.clone())),
            messages: Arc::new(RestService::<Message>::new(client.clone())),
            files: Arc::new(RestService::<File>::new(client.clone())),
        }
    }
}

/// Settles of the four dashboard fetches, in no particular completion order.
#[derive(Debug)]
pub struct DashboardLoad {
    pub users: Settled<Vec<User>>,
    pub projects: Settled<Vec<Project>>,
    pub organizations: Settled<Vec<Organization>>,
    pub services: Settled<Vec<Service>>,
}

impl DashboardLoad {
    pub fn all_fulfilled(&self) -> bool {
        self.users.is_fulfilled()
            && self.projects.is_fulfilled()
            && self.organizations.is_fulfilled()
            && self.services.is_fulfilled()
    }
}

/// Every entity store of the dashboard, wired to one event hub.
#[derive(Clone)]
pub struct AppStore {
    pub users: EntityStore<User>,
    pub organizations: EntityStore<Organization>,
    pub services: EntityStore<Service>,
    pub projects: EntityStore<Project>,
    pub tasks: EntityStore<Task>,
    pub chat_groups: EntityStore<ChatGroup>,
    pub messages: EntityStore<Message>,
    pub files: EntityStore<File>,
    events: SharedEventHub,
    new_users: NewUserPolicy,
    gantt: GanttOptions,
}

impl AppStore {
    pub fn with_services(services: AppServices) -> Self {
        let events = SharedEventHub::new();
        Self {
            users: EntityStore::new(services.users, events.clone()),
            organizations: EntityStore::new(services.organizations, events.clone()),
            services: EntityStore::new(services.services, events.clone()),
            projects: EntityStore::new(services.projects, events.clone()),
            tasks: EntityStore::new(services.tasks, events.clone()),
            chat_groups: EntityStore::new(services.chat_groups, events.clone()),
            messages: EntityStore::new(services.messages, events.clone()),
            files: EntityStore::new(services.files, events.clone()),
            events,
            new_users: NewUserPolicy::default(),
            gantt: GanttOptions::default(),
        }
    }

    pub fn connect(client: &RestClient) -> Self {
        Self::with_services(AppServices::rest(client))
    }

    /// Client, view policies and Gantt scale all read from `snapshot`.
    pub fn from_config(snapshot: &AtriumConfigSnapshot) -> Result<Self> {
        let client = RestClient::from_config(snapshot)?;
        let policy = NewUserPolicy::from_snapshot(snapshot)?;
        tracing::info!(new_users = %policy, "atrium store configured");
        Ok(Self::connect(&client)
            .with_new_user_policy(policy)
            .with_gantt_options(GanttOptions::from_snapshot(snapshot)))
    }

    pub fn with_new_user_policy(mut self, policy: NewUserPolicy) -> Self {
        self.new_users = policy;
        self
    }

    pub fn with_gantt_options(mut self, options: GanttOptions) -> Self {
        self.gantt = options;
        self
    }

    pub fn events(&self) -> &SharedEventHub {
        &self.events
    }

    pub fn new_user_policy(&self) -> NewUserPolicy {
        self.new_users
    }

    pub fn gantt_options(&self) -> GanttOptions {
        self.gantt
    }

    /// Users, projects, organizations and services, fetched concurrently.
    pub async fn load_dashboard(&self, scope: &Scope) -> DashboardLoad {
        let (users, projects, organizations, services) = futures::join!(
            self.users.fetch_all(scope),
            self.projects.fetch_all(scope),
            self.organizations.fetch_all(scope),
            self.services.fetch_all(scope),
        );
        let load = DashboardLoad {
            users,
            projects,
            organizations,
            services,
        };
        if !load.all_fulfilled() {
            tracing::warn!(scope = scope.name(), "dashboard loaded partially");
        }
        load
    }

    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> DashboardStats {
        DashboardStats::compute(
            &self.users.items(),
            &self.organizations.items(),
            &self.services.items(),
            &self.projects.items(),
            self.new_users,
            now,
        )
    }

    /// Gantt layout of the tasks cached under `project_id`.
    pub fn project_timeline(&self, project_id: &str, now: DateTime<Utc>) -> GanttLayout {
        let parent = ParentRef::project(project_id);
        let tasks: Vec<Task> = self.tasks.read(|s| s.under(&parent).cloned().collect());
        layout(&tasks, now, self.gantt)
    }

    /// Folder tree of the cached files.
    pub fn file_tree(&self) -> Vec<FileNode> {
        build_tree(&self.files.items())
    }
}
