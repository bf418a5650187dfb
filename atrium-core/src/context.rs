//! Per-request context.

use tokio_util::sync::CancellationToken;

/// Context carried with every Atrium service call.
///
/// Stores build one per dispatch: the request id ends up in logs and in the
/// `x-request-id` header, the token ties the call to the scope (page) that
/// issued it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub scope: Option<String>,
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// A detached context that is never cancelled.
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            scope: None,
            cancel,
        }
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
