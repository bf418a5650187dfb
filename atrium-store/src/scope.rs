use atrium_core::{CancellationToken, RequestContext};

/// The lifetime of a page or view.
///
/// Every request a store dispatches runs under a scope. Cancelling the
/// scope (or dropping it) aborts its outstanding requests, and anything
/// that still settles afterwards is discarded instead of written into the
/// store.
#[derive(Debug)]
pub struct Scope {
    name: String,
    token: CancellationToken,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: CancellationToken::new(),
        }
    }

    /// A scope that is cancelled with its parent, or on its own.
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            name: format!("{}/{}", self.name, name.into()),
            token: self.token.child_token(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(scope = %self.name, "scope cancelled");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fresh context (new request id) tied to this scope.
    pub fn context(&self) -> RequestContext {
        RequestContext::with_token(self.token.clone()).scoped(self.name.clone())
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_cancels_outstanding_contexts() {
        let scope = Scope::new("users-page");
        let ctx = scope.context();
        assert_eq!(ctx.scope.as_deref(), Some("users-page"));
        assert!(!ctx.is_cancelled());

        drop(scope);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn child_follows_parent_but_not_the_reverse() {
        let parent = Scope::new("dashboard");
        let first = parent.child("chart");
        let second = parent.child("table");
        assert_eq!(first.name(), "dashboard/chart");

        first.cancel();
        assert!(!parent.is_cancelled());
        assert!(!second.is_cancelled());

        parent.cancel();
        assert!(second.is_cancelled());
    }

    #[test]
    fn contexts_get_distinct_request_ids() {
        let scope = Scope::new("p");
        assert_ne!(scope.context().request_id, scope.context().request_id);
    }
}
