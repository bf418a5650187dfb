//! atrium-core: transport-agnostic core of the Atrium dashboard client.
//!
//! Everything the entity stores and the REST layer agree on lives here:
//! the error taxonomy, configuration, request context, the `Entity` and
//! `EntityService` traits, and the store event hub.

pub mod config;
pub mod context;
pub mod entity;
pub mod errors;
pub mod events;
pub mod service;

pub use config::{AtriumConfig, AtriumConfigSnapshot};
pub use context::RequestContext;
pub use entity::{Entity, ParentRef};
pub use errors::{ApiError, ApiResult, ErrorKind};
pub use events::{
    parse_event_pattern, EventListener, ListenerId, SharedEventHub, StoreEvent, StoreEventHub,
    StoreEventKind, StoreEventPattern,
};
pub use service::{Attachment, EntityService, Params, ServiceCapabilities, ServiceMethodKind};

pub use tokio_util::sync::CancellationToken;
