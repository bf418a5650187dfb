use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::entity::ParentRef;

/// Service methods a store can dispatch.
///
/// Relationship mutations and other one-off endpoints are declared via
/// `Custom("add_user")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Remove,
    Custom(&'static str),
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Update => "update",
            ServiceMethodKind::Remove => "remove",
            ServiceMethodKind::Custom(name) => name,
        }
    }
}

/// Which methods a backend collection supports.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// find, get, create, update, remove
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Remove],
        }
    }

    pub fn read_only() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    /// Custom methods are allowed only when listed explicitly.
    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }

    pub fn with(mut self, method: ServiceMethodKind) -> Self {
        if !self.allowed_methods.contains(&method) {
            self.allowed_methods.push(method);
        }
        self
    }
}

/// Options for `find`.
///
/// - `parent`: nested collection (`/tasks/project/:id`)
/// - `variant`: named sub-collection (`/users/premium`)
/// - `query`: query string pairs (`?query=hello`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub parent: Option<ParentRef>,
    pub variant: Option<&'static str>,
    pub query: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn under(parent: ParentRef) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn variant(name: &'static str) -> Self {
        Self {
            variant: Some(name),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

/// A file attached to a multipart create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Backend collection for one entity type.
///
/// - `find`   → list (optionally nested or filtered)
/// - `get`    → fetch one by id
/// - `create` → create one from a JSON payload
/// - `update` → apply a (partial) JSON payload to one record
/// - `remove` → delete one record
/// - `custom` → `POST /:id/<method>` style relationship endpoints
///
/// Every method defaults to "Method not implemented", so a service only
/// overrides what its backend supports. Payloads are plain JSON; the store
/// performs no validation of outgoing data.
#[async_trait]
pub trait EntityService<R>: Send + Sync
where
    R: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _ctx: &RequestContext, _params: Params) -> Result<Vec<R>> {
        Err(anyhow!("Method not implemented: find"))
    }

    async fn get(&self, _ctx: &RequestContext, _id: &str) -> Result<R> {
        Err(anyhow!("Method not implemented: get"))
    }

    async fn create(&self, _ctx: &RequestContext, _data: Value) -> Result<R> {
        Err(anyhow!("Method not implemented: create"))
    }

    /// Create with file attachments (multipart upload).
    async fn create_with_attachments(
        &self,
        _ctx: &RequestContext,
        _data: Value,
        _attachments: Vec<Attachment>,
    ) -> Result<R> {
        Err(anyhow!("Method not implemented: create_with_attachments"))
    }

    async fn update(&self, _ctx: &RequestContext, _id: &str, _data: Value) -> Result<R> {
        Err(anyhow!("Method not implemented: update"))
    }

    async fn remove(&self, _ctx: &RequestContext, _id: &str) -> Result<()> {
        Err(anyhow!("Method not implemented: remove"))
    }

    async fn custom(
        &self,
        _ctx: &RequestContext,
        method: &'static str,
        _id: &str,
        _data: Value,
    ) -> Result<R> {
        Err(anyhow!("Method not implemented: {method}"))
    }
}
