//! Resource paths.
//!
//! | call | path |
//! |---|---|
//! | find | `GET /x` |
//! | find under a parent | `GET /x/<segment>/:parentId` |
//! | find a variant | `GET /x/<variant>` (`/users/premium`) |
//! | find a variant under a parent | `GET /x/<segment>/:parentId/<variant>` (`/messages/chat/:id/search`) |
//! | get | `GET /x/:id` |
//! | create | `POST /x` |
//! | update | `PUT /x/:id` |
//! | remove | `DELETE /x/:id` |
//! | custom | `POST /x/:id/<method>` (`/projects/:id/add_user`) |
//!
//! Each resource's base defaults to `/<kind>` and can be moved with the
//! `api.paths.<kind>` config key. Ids are percent-encoded as single path
//! segments.

use std::collections::HashMap;

use atrium_core::{AtriumConfigSnapshot, Params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    base: String,
}

impl Resource {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let trimmed = base.trim_end_matches('/');
        let base = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self { base }
    }

    pub fn collection(&self) -> String {
        self.base.clone()
    }

    pub fn item(&self, id: &str) -> String {
        format!("{}/{}", self.base, urlencoding::encode(id))
    }

    pub fn custom(&self, id: &str, method: &str) -> String {
        format!("{}/{}/{}", self.base, urlencoding::encode(id), method)
    }

    /// Path for a `find` with the given params. Query pairs are sent
    /// separately.
    pub fn find_path(&self, params: &Params) -> String {
        let mut path = self.base.clone();
        if let Some(parent) = &params.parent {
            path.push('/');
            path.push_str(parent.segment);
            path.push('/');
            path.push_str(&urlencoding::encode(&parent.id));
        }
        if let Some(variant) = params.variant {
            path.push('/');
            path.push_str(variant);
        }
        path
    }
}

/// `POST /x/:id/<method>` endpoints the backend exposes per kind.
pub fn custom_methods(kind: &str) -> &'static [&'static str] {
    match kind {
        "projects" => &["add_user", "add_multiple_users", "remove_user"],
        "messages" => &["read"],
        _ => &[],
    }
}

/// Base paths for every entity kind the client talks to.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    overrides: HashMap<String, String>,
}

impl Endpoints {
    pub const KINDS: [&'static str; 8] = [
        "users",
        "organizations",
        "services",
        "projects",
        "tasks",
        "chatgroups",
        "messages",
        "files",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &AtriumConfigSnapshot) -> Self {
        let mut endpoints = Self::new();
        for kind in Self::KINDS {
            if let Some(base) = snapshot.get_string(&format!("api.paths.{kind}")) {
                endpoints = endpoints.with_base(kind, base);
            }
        }
        endpoints
    }

    pub fn with_base(mut self, kind: &str, base: impl Into<String>) -> Self {
        self.overrides.insert(kind.to_string(), base.into());
        self
    }

    pub fn resource(&self, kind: &str) -> Resource {
        match self.overrides.get(kind) {
            Some(base) => Resource::new(base.as_str()),
            None => Resource::new(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use atrium_core::ParentRef;

    use super::*;

    #[test]
    fn find_paths_cover_nested_and_variants() {
        let messages = Resource::new("messages");
        assert_eq!(messages.find_path(&Params::new()), "/messages");
        assert_eq!(
            messages.find_path(&Params::under(ParentRef::chat("c1"))),
            "/messages/chat/c1"
        );

        let mut search = Params::under(ParentRef::chat("c1"));
        search.variant = Some("search");
        assert_eq!(messages.find_path(&search), "/messages/chat/c1/search");

        let users = Resource::new("/users/");
        assert_eq!(users.find_path(&Params::variant("premium")), "/users/premium");
    }

    #[test]
    fn item_and_custom_paths() {
        let projects = Resource::new("projects");
        assert_eq!(projects.item("p1"), "/projects/p1");
        assert_eq!(projects.custom("p1", "add_user"), "/projects/p1/add_user");
    }

    #[test]
    fn ids_stay_one_segment() {
        let files = Resource::new("files");
        assert_eq!(files.item("a/b?c#d"), "/files/a%2Fb%3Fc%23d");
        assert_eq!(files.custom("x y", "read"), "/files/x%20y/read");
        assert_eq!(
            files.find_path(&Params::under(ParentRef::project("../p1"))),
            "/files/project/..%2Fp1"
        );
    }

    #[test]
    fn config_moves_a_base() {
        let snapshot = AtriumConfigSnapshot::from(HashMap::from([(
            "api.paths.projects".to_string(),
            "/v2/projects".to_string(),
        )]));
        let endpoints = Endpoints::from_snapshot(&snapshot);
        assert_eq!(endpoints.resource("projects").collection(), "/v2/projects");
        assert_eq!(endpoints.resource("tasks").collection(), "/tasks");
    }
}
