//! Bearer-token HTTP client.
//!
//! Every call goes through [`RestClient::send`]:
//! - attaches `Authorization: Bearer <token>` when the session has one and
//!   `x-request-id` from the context
//! - races the request against the context's cancellation token
//! - maps non-success answers to [`ApiError`] using the body's `message`
//! - on 401 expires the session (token wiped, navigator sent to login)
//!
//! Nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use atrium_core::{ApiError, AtriumConfigSnapshot, RequestContext};

use crate::endpoints::Endpoints;
use crate::session::{FileTokenStore, MemoryTokenStore, Session, TokenStore, DEFAULT_LOGIN_ROUTE};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RestClientOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub login_route: String,
    pub endpoints: Endpoints,
}

impl RestClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            endpoints: Endpoints::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn from_snapshot(snapshot: &AtriumConfigSnapshot) -> Result<Self> {
        let base_url = snapshot
            .get_string("api.base_url")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Missing 'api.base_url' config"))?;

        let mut options = Self::new(base_url);
        options.timeout = Duration::from_secs(
            snapshot
                .get_u64("api.timeout_secs")
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );
        if let Some(route) = snapshot.get_string("api.login_route") {
            options.login_route = route;
        }
        options.endpoints = Endpoints::from_snapshot(snapshot);
        Ok(options)
    }
}

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    options: Arc<RestClientOptions>,
    session: Arc<Session>,
}

impl RestClient {
    pub fn new(options: RestClientOptions, session: Arc<Session>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            http,
            options: Arc::new(options),
            session,
        })
    }

    /// Build options and session from config. `session.path` selects a
    /// file-backed token store, otherwise the token lives in memory.
    pub fn from_config(snapshot: &AtriumConfigSnapshot) -> Result<Self> {
        let options = RestClientOptions::from_snapshot(snapshot)?;
        let store: Arc<dyn TokenStore> = match snapshot.get_string("session.path") {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        let session = Session::new(store).with_login_route(options.login_route.clone());
        Self::new(options, Arc::new(session))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.options.endpoints
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.options.base_url, path)
        } else {
            format!("{}/{}", self.options.base_url, path)
        }
    }

    pub async fn request(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        query: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut builder = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(ctx, &method, path, builder).await
    }

    pub async fn get(&self, ctx: &RequestContext, path: &str) -> Result<Value> {
        self.request(ctx, Method::GET, path, &BTreeMap::new(), None).await
    }

    pub async fn post(&self, ctx: &RequestContext, path: &str, body: &Value) -> Result<Value> {
        self.request(ctx, Method::POST, path, &BTreeMap::new(), Some(body))
            .await
    }

    pub async fn put(&self, ctx: &RequestContext, path: &str, body: &Value) -> Result<Value> {
        self.request(ctx, Method::PUT, path, &BTreeMap::new(), Some(body))
            .await
    }

    pub async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<Value> {
        self.request(ctx, Method::DELETE, path, &BTreeMap::new(), None)
            .await
    }

    /// POST a multipart form. reqwest sets the boundary header.
    pub async fn send_multipart(&self, ctx: &RequestContext, path: &str, form: Form) -> Result<Value> {
        let builder = self.http.post(self.url(path)).multipart(form);
        self.send(ctx, &Method::POST, path, builder).await
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        method: &Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<Value> {
        let mut builder = builder.header(REQUEST_ID_HEADER, ctx.request_id.as_str());
        if let Some(token) = self.session.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!(request_id = %ctx.request_id, %method, path, "request issued");

        let exchange = async {
            let response = builder.send().await.map_err(|e| transport_error(e, path))?;
            self.read(ctx, method, path, response).await
        };

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!(request_id = %ctx.request_id, %method, path, "request cancelled");
                Err(ApiError::cancelled(format!("{method} {path} cancelled")).into_anyhow())
            }
            res = exchange => res,
        }
    }

    async fn read(
        &self,
        ctx: &RequestContext,
        method: &Method,
        path: &str,
        response: Response,
    ) -> Result<Value> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, path))?;

        if status.is_success() {
            tracing::debug!(request_id = %ctx.request_id, %method, path, status = status.as_u16(), "request settled");
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::decode(format!("{method} {path} returned invalid JSON"))
                    .with_source(e.into())
                    .into_anyhow()
            });
        }

        let body = parse_error_body(&bytes);
        let fallback = status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
        let err = ApiError::from_response(status.as_u16(), body, &fallback);

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(request_id = %ctx.request_id, %method, path, "backend rejected the session");
            self.session.expire();
        } else {
            tracing::warn!(
                request_id = %ctx.request_id,
                %method,
                path,
                status = status.as_u16(),
                message = %err.message,
                "request rejected"
            );
        }

        Err(err.into_anyhow())
    }
}

fn parse_error_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(v) => Some(v),
        Err(_) => {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            (!text.is_empty()).then(|| Value::String(text))
        }
    }
}

fn transport_error(err: reqwest::Error, path: &str) -> anyhow::Error {
    let message = if err.is_timeout() {
        format!("Request to {path} timed out")
    } else {
        format!("Request to {path} failed: {err}")
    };
    ApiError::transport(message).with_source(err.into()).into_anyhow()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn options_require_a_base_url() {
        let empty = AtriumConfigSnapshot::default();
        assert!(RestClientOptions::from_snapshot(&empty).is_err());

        let snapshot = AtriumConfigSnapshot::from(HashMap::from([
            ("api.base_url".to_string(), "http://localhost:4000/api/".to_string()),
            ("api.timeout_secs".to_string(), "5".to_string()),
            ("api.login_route".to_string(), "/login".to_string()),
        ]));
        let options = RestClientOptions::from_snapshot(&snapshot).unwrap();
        assert_eq!(options.base_url, "http://localhost:4000/api");
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.login_route, "/login");
    }

    #[test]
    fn error_body_is_json_or_text() {
        assert_eq!(parse_error_body(b""), None);
        assert_eq!(
            parse_error_body(br#"{"message":"nope"}"#),
            Some(json!({"message": "nope"}))
        );
        assert_eq!(parse_error_body(b"  gateway down "), Some(json!("gateway down")));
    }

    #[test]
    fn url_joins_paths() {
        let client = RestClient::new(
            RestClientOptions::new("http://h/api"),
            Arc::new(Session::in_memory()),
        )
        .unwrap();
        assert_eq!(client.url("/users"), "http://h/api/users");
        assert_eq!(client.url("users/1"), "http://h/api/users/1");
    }
}
