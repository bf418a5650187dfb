use std::marker::PhantomData;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use atrium_core::{
    Attachment, Entity, EntityService, Params, RequestContext, ServiceCapabilities,
    ServiceMethodKind,
};
use atrium_model::schema;

use crate::client::RestClient;
use crate::endpoints::{custom_methods, Resource};
use crate::multipart::build_form;

/// `EntityService` over the backend's REST collection for `R`.
///
/// Every answer is parsed through the schema boundary before it is handed
/// back, so a store never sees an unvalidated entity.
pub struct RestService<R> {
    client: RestClient,
    resource: Resource,
    capabilities: ServiceCapabilities,
    _entity: PhantomData<fn() -> R>,
}

impl<R> RestService<R>
where
    R: Entity + DeserializeOwned + Validate,
{
    pub fn new(client: RestClient) -> Self {
        let resource = client.endpoints().resource(R::KIND);
        Self::with_resource(client, resource)
    }

    pub fn with_resource(client: RestClient, resource: Resource) -> Self {
        let capabilities = custom_methods(R::KIND)
            .iter()
            .copied()
            .fold(ServiceCapabilities::standard_crud(), |caps, m| {
                caps.with(ServiceMethodKind::Custom(m))
            });
        Self {
            client,
            resource,
            capabilities,
            _entity: PhantomData,
        }
    }

    pub fn with_custom(mut self, method: &'static str) -> Self {
        self.capabilities = self.capabilities.with(ServiceMethodKind::Custom(method));
        self
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

fn one<R: DeserializeOwned + Validate>(body: Value) -> Result<R> {
    schema::parse(body).map_err(|e| e.into_anyhow())
}

#[async_trait]
impl<R> EntityService<R> for RestService<R>
where
    R: Entity + DeserializeOwned + Validate,
{
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, ctx: &RequestContext, params: Params) -> Result<Vec<R>> {
        let path = self.resource.find_path(&params);
        let body = self
            .client
            .request(ctx, Method::GET, &path, &params.query, None)
            .await?;
        schema::parse_many(body).map_err(|e| e.into_anyhow())
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<R> {
        let body = self.client.get(ctx, &self.resource.item(id)).await?;
        one(body)
    }

    async fn create(&self, ctx: &RequestContext, data: Value) -> Result<R> {
        let body = self
            .client
            .post(ctx, &self.resource.collection(), &data)
            .await?;
        one(body)
    }

    async fn create_with_attachments(
        &self,
        ctx: &RequestContext,
        data: Value,
        attachments: Vec<Attachment>,
    ) -> Result<R> {
        let form = build_form(&data, attachments)?;
        let body = self
            .client
            .send_multipart(ctx, &self.resource.collection(), form)
            .await?;
        one(body)
    }

    async fn update(&self, ctx: &RequestContext, id: &str, data: Value) -> Result<R> {
        let body = self.client.put(ctx, &self.resource.item(id), &data).await?;
        one(body)
    }

    async fn remove(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        self.client.delete(ctx, &self.resource.item(id)).await?;
        Ok(())
    }

    async fn custom(
        &self,
        ctx: &RequestContext,
        method: &'static str,
        id: &str,
        data: Value,
    ) -> Result<R> {
        let body = self
            .client
            .post(ctx, &self.resource.custom(id, method), &data)
            .await?;
        one(body)
    }
}
