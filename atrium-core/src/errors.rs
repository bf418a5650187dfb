//! # Errors
//!
//! Atrium carries one structured error type, [`ApiError`], through
//! `anyhow::Error` from the HTTP layer up to the entity stores.
//!
//! - backend failures keep the HTTP status and the `message` the backend sent
//! - client-side failures (no response, bad payload, cancelled scope) get
//!   their own kinds without a status code
//! - stores only ever keep `message` in their `error` slot
//!
//! Kinds map to the failure taxonomy the dashboard deals with:
//! transport failure, backend validation/business failure, authentication
//! failure (401) and "not found".

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// A convenience result type for Atrium APIs.
pub type ApiResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    MethodNotAllowed, // 405
    Timeout,          // 408
    Conflict,         // 409
    Gone,             // 410
    Unprocessable,    // 422
    TooManyRequests,  // 429
    GeneralError,     // 500
    NotImplemented,   // 501
    BadGateway,       // 502
    Unavailable,      // 503

    /// No response at all (DNS, connect, TLS, reset).
    Transport,
    /// The response did not match the entity schema.
    Decode,
    /// The owning scope was cancelled before the request settled.
    Cancelled,
}

impl ErrorKind {
    /// HTTP status for backend kinds, `None` for client-side kinds.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ErrorKind::BadRequest => Some(400),
            ErrorKind::NotAuthenticated => Some(401),
            ErrorKind::Forbidden => Some(403),
            ErrorKind::NotFound => Some(404),
            ErrorKind::MethodNotAllowed => Some(405),
            ErrorKind::Timeout => Some(408),
            ErrorKind::Conflict => Some(409),
            ErrorKind::Gone => Some(410),
            ErrorKind::Unprocessable => Some(422),
            ErrorKind::TooManyRequests => Some(429),
            ErrorKind::GeneralError => Some(500),
            ErrorKind::NotImplemented => Some(501),
            ErrorKind::BadGateway => Some(502),
            ErrorKind::Unavailable => Some(503),
            ErrorKind::Transport | ErrorKind::Decode | ErrorKind::Cancelled => None,
        }
    }

    /// Pick a kind for an HTTP status the backend returned.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::NotAuthenticated,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            405 => ErrorKind::MethodNotAllowed,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            410 => ErrorKind::Gone,
            422 => ErrorKind::Unprocessable,
            429 => ErrorKind::TooManyRequests,
            501 => ErrorKind::NotImplemented,
            502 => ErrorKind::BadGateway,
            503 => ErrorKind::Unavailable,
            400..=499 => ErrorKind::BadRequest,
            _ => ErrorKind::GeneralError,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::MethodNotAllowed => "MethodNotAllowed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Gone => "Gone",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::TooManyRequests => "TooManyRequests",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::Transport => "Transport",
            ErrorKind::Decode => "Decode",
            ErrorKind::Cancelled => "Cancelled",
        }
    }

    /// Kebab-cased class name, handy for CSS hooks and logs.
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::MethodNotAllowed => "method-not-allowed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Gone => "gone",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::TooManyRequests => "too-many-requests",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::NotImplemented => "not-implemented",
            ErrorKind::BadGateway => "bad-gateway",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// A structured Atrium error that can live inside `anyhow::Error`.
///
/// `status` is the status the backend actually answered with (it can differ
/// from `kind.status_code()` for unusual codes such as 418).
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.status_code(),
            data: None,
            errors: None,
            source: None,
        }
    }

    /// Build an error from a backend response status and body.
    ///
    /// The message is the body's `message` field when present, a bare string
    /// body otherwise, and finally `fallback`.
    pub fn from_response(status: u16, body: Option<Value>, fallback: &str) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| match b {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Object(map) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .unwrap_or_else(|| fallback.to_string());

        let errors = body
            .as_ref()
            .and_then(|b| b.get("errors"))
            .cloned();

        let mut err = Self::new(ErrorKind::from_status(status), message);
        err.status = Some(status);
        err.data = body;
        err.errors = errors;
        err
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> Option<u16> {
        self.status
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind == ErrorKind::NotAuthenticated
    }

    /// Convert into `anyhow::Error` so it flows through `?`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find an `ApiError` anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&ApiError> {
        err.chain().find_map(|e| e.downcast_ref::<ApiError>())
    }

    /// Turn any error into an `ApiError`:
    /// - if it's already an `ApiError`, keep it
    /// - otherwise wrap it as `GeneralError`
    pub fn normalize(err: AnyError) -> ApiError {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => match ApiError::from_anyhow(&other) {
                Some(inner) => inner.sanitize(),
                None => ApiError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
            },
        }
    }

    /// Copy without the inner `source`.
    pub fn sanitize(&self) -> ApiError {
        ApiError {
            kind: self.kind,
            message: self.message.clone(),
            status: self.status,
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn to_json(&self) -> Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, msg)
    }
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, msg)
    }
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, msg)
    }
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, msg)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} ({}): {}", self.name(), code, self.message),
            None => write!(f, "{}: {}", self.name(), self.message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with ApiError".
#[macro_export]
macro_rules! bail_api {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::ApiError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::ApiError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::json;

    #[test]
    fn backend_message_wins_over_fallback() {
        let err = ApiError::from_response(404, Some(json!({"message": "not found"})), "Not Found");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "not found");
        assert_eq!(err.code(), Some(404));
    }

    #[test]
    fn plain_string_body_becomes_message() {
        let err = ApiError::from_response(409, Some(json!("email already taken")), "Conflict");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "email already taken");
    }

    #[test]
    fn unusual_status_keeps_raw_code() {
        let err = ApiError::from_response(418, None, "I'm a teapot");
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.code(), Some(418));
        assert_eq!(err.message, "I'm a teapot");
    }

    #[test]
    fn normalize_finds_error_behind_context() {
        let wrapped = Err::<(), _>(ApiError::forbidden("nope").into_anyhow())
            .context("loading projects")
            .unwrap_err();
        let api = ApiError::normalize(wrapped);
        assert_eq!(api.kind, ErrorKind::Forbidden);
        assert_eq!(api.message, "nope");
    }

    #[test]
    fn normalize_wraps_foreign_errors() {
        let api = ApiError::normalize(anyhow::anyhow!("boom"));
        assert_eq!(api.kind, ErrorKind::GeneralError);
        assert_eq!(api.message, "boom");
    }

    #[test]
    fn client_side_kinds_have_no_status() {
        let err = ApiError::transport("connection refused");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Transport: connection refused");
        assert_eq!(err.to_json()["className"], "transport");
    }
}
