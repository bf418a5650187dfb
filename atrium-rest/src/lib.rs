//! atrium-rest: REST transport for the Atrium dashboard client.
//!
//! [`RestClient`] wraps `reqwest` with the bearer token from the persisted
//! [`Session`], and [`RestService`] exposes one backend collection as an
//! `EntityService` whose answers are schema-checked before they reach a
//! store.

pub mod client;
pub mod endpoints;
pub mod multipart;
pub mod service;
pub mod session;

pub use client::{RestClient, RestClientOptions, REQUEST_ID_HEADER};
pub use endpoints::{Endpoints, Resource};
pub use service::RestService;
pub use session::{
    FileTokenStore, MemoryTokenStore, Navigator, Session, SessionData, TokenStore,
    DEFAULT_LOGIN_ROUTE,
};

pub use reqwest::Method;
