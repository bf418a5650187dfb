//! atrium-model: the typed shapes the dashboard client works with.
//!
//! Entities mirror what the backend returns (`_id` keys, camelCase fields,
//! relationships as bare ids or populated documents). Payloads mirror what
//! the client sends. [`schema`] is the gate between raw JSON and both.

pub mod catalog;
pub mod chat;
pub mod file;
pub mod organization;
pub mod payload;
pub mod permissions;
pub mod project;
pub mod refs;
pub mod schema;
pub mod task;
pub mod user;

pub use catalog::{Service, ServiceStatus, ServiceTier};
pub use chat::{ChatGroup, Message, Participant, ParticipantRole, ParticipantStatus};
pub use file::{File, FileKind};
pub use organization::Organization;
pub use payload::{
    AddUserToProject, AddUsersToProject, MemberAssignment, MessageEdit, NewMessage, NewProject,
    NewTeamMember, RemoveUserFromProject, UploadFile,
};
pub use permissions::{can_access, sections_for};
pub use project::{Project, ProjectStatus, TeamMember};
pub use refs::Ref;
pub use schema::{parse, parse_many, SchemaErrors};
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::{Role, User, UserStatus};
