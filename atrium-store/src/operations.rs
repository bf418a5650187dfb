//! Entity-specific operations on top of the generic store.

use serde_json::json;

use atrium_core::{Params, ParentRef, ServiceMethodKind};
use atrium_model::{
    AddUserToProject, AddUsersToProject, Message, MessageEdit, NewMessage, NewProject, Project,
    RemoveUserFromProject, Task, User,
};

use crate::action::Outcome;
use crate::scope::Scope;
use crate::store::{EntityStore, Settled};

pub const PREMIUM: &str = "premium";
pub const SEARCH: &str = "search";

impl EntityStore<User> {
    /// `GET /users/premium` into the `premium` side collection.
    pub async fn fetch_premium_users(&self, scope: &Scope) -> Settled<Vec<User>> {
        self.fetch_extra(scope, PREMIUM, Params::variant(PREMIUM)).await
    }

    pub async fn fetch_users_by_organization(
        &self,
        scope: &Scope,
        organization_id: &str,
    ) -> Settled<Vec<User>> {
        self.fetch_by_parent(scope, ParentRef::organization(organization_id))
            .await
    }
}

impl EntityStore<Task> {
    pub async fn fetch_tasks_by_project(&self, scope: &Scope, project_id: &str) -> Settled<Vec<Task>> {
        self.fetch_by_parent(scope, ParentRef::project(project_id)).await
    }
}

impl EntityStore<Project> {
    pub async fn fetch_projects_by_organization(
        &self,
        scope: &Scope,
        organization_id: &str,
    ) -> Settled<Vec<Project>> {
        self.fetch_by_parent(scope, ParentRef::organization(organization_id))
            .await
    }

    /// Multipart when the draft carries files, plain JSON otherwise. Files
    /// that fail to decode reject the dispatch like a backend error would.
    pub async fn create_project(&self, scope: &Scope, draft: &NewProject) -> Settled<Project> {
        if !draft.has_files() {
            return self.create(scope, draft.to_json()).await;
        }

        let service = self.service();
        let fields = draft.form_fields();
        let files = draft.attachments();
        self.dispatch(
            scope,
            ServiceMethodKind::Create,
            None,
            move |ctx| async move {
                let files = files.map_err(|e| e.into_anyhow())?;
                service.create_with_attachments(&ctx, fields, files).await
            },
            |project: &Project| Outcome::Created(project.clone()),
        )
        .await
    }

    pub async fn add_user_to_project(
        &self,
        scope: &Scope,
        project_id: &str,
        payload: &AddUserToProject,
    ) -> Settled<Project> {
        self.relate(scope, "add_user", project_id, payload).await
    }

    pub async fn add_multiple_users_to_project(
        &self,
        scope: &Scope,
        project_id: &str,
        payload: &AddUsersToProject,
    ) -> Settled<Project> {
        self.relate(scope, "add_multiple_users", project_id, payload)
            .await
    }

    pub async fn remove_user_from_project(
        &self,
        scope: &Scope,
        project_id: &str,
        payload: &RemoveUserFromProject,
    ) -> Settled<Project> {
        self.relate(scope, "remove_user", project_id, payload).await
    }
}

impl EntityStore<Message> {
    pub async fn send_message(&self, scope: &Scope, message: &NewMessage) -> Settled<Message> {
        self.create(scope, message).await
    }

    /// Refresh one chat's messages; other chats stay cached.
    pub async fn fetch_messages(&self, scope: &Scope, chat_id: &str) -> Settled<Vec<Message>> {
        self.fetch_slice(scope, ParentRef::chat(chat_id)).await
    }

    pub async fn edit_message(
        &self,
        scope: &Scope,
        message_id: &str,
        edit: &MessageEdit,
    ) -> Settled<Message> {
        self.update(scope, message_id, edit).await
    }

    pub async fn mark_message_read(&self, scope: &Scope, message_id: &str) -> Settled<Message> {
        self.relate(scope, "read", message_id, json!({})).await
    }

    /// `GET /messages/chat/:id/search?query=` into the `search` side
    /// collection.
    pub async fn search_messages(
        &self,
        scope: &Scope,
        chat_id: &str,
        query: &str,
    ) -> Settled<Vec<Message>> {
        let mut params = Params::under(ParentRef::chat(chat_id)).with_query("query", query);
        params.variant = Some(SEARCH);
        self.fetch_extra(scope, SEARCH, params).await
    }

    pub fn clear_search(&self) {
        self.clear_extra(SEARCH);
    }

    /// Show a message in its chat before the backend has confirmed it.
    pub fn add_local_message(&self, message: Message) {
        self.insert_local(message);
    }

    /// Messages of one chat, oldest first.
    pub fn messages_in(&self, chat_id: &str) -> Vec<Message> {
        let parent = ParentRef::chat(chat_id);
        let mut out: Vec<Message> = self.read(|s| s.under(&parent).cloned().collect());
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }
}
