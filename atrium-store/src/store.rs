//! Per-entity store: cached state plus the request lifecycle around one
//! `EntityService`.
//!
//! Each operation runs `pending -> fulfilled | rejected` through the
//! reducer and publishes the matching events. Nothing escapes a dispatch:
//! the caller gets a [`Settled`] and the store records the failure message
//! in `error`. No retries, no de-duplication; concurrent writes to the same
//! id settle last-write-wins.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use atrium_core::{
    ApiError, Attachment, Entity, EntityService, ErrorKind, Params, ParentRef, RequestContext,
    ServiceMethodKind, SharedEventHub, StoreEvent, StoreEventKind,
};

use crate::action::{reduce, Action, Outcome};
use crate::scope::Scope;
use crate::state::EntityState;

/// Terminal result of one dispatch.
#[derive(Debug)]
pub enum Settled<R> {
    Fulfilled(R),
    Rejected(ApiError),
    /// The scope went away first; the store was left untouched.
    Cancelled,
}

impl<R> Settled<R> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Settled::Cancelled)
    }

    pub fn ok(self) -> Option<R> {
        match self {
            Settled::Fulfilled(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Settled::Rejected(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> Settled<U> {
        match self {
            Settled::Fulfilled(r) => Settled::Fulfilled(f(r)),
            Settled::Rejected(e) => Settled::Rejected(e),
            Settled::Cancelled => Settled::Cancelled,
        }
    }
}

pub struct EntityStore<T: Entity> {
    state: Arc<RwLock<EntityState<T>>>,
    service: Arc<dyn EntityService<T>>,
    events: SharedEventHub,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            service: Arc::clone(&self.service),
            events: self.events.clone(),
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new(service: Arc<dyn EntityService<T>>, events: SharedEventHub) -> Self {
        Self {
            state: Arc::new(RwLock::new(EntityState::new())),
            service,
            events,
        }
    }

    pub fn events(&self) -> &SharedEventHub {
        &self.events
    }

    // ---- Reads ----

    pub fn snapshot(&self) -> EntityState<T> {
        self.state.read().clone()
    }

    /// Borrow the state for the duration of `f`.
    pub fn read<O>(&self, f: impl FnOnce(&EntityState<T>) -> O) -> O {
        f(&self.state.read())
    }

    pub fn items(&self) -> Vec<T> {
        self.state.read().items().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.state.read().get(id).cloned()
    }

    pub fn current(&self) -> Option<T> {
        self.state.read().current().cloned()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error().map(str::to_string)
    }

    pub fn extra(&self, name: &str) -> Vec<T> {
        self.state.read().extra(name).to_vec()
    }

    // ---- Local changes ----

    pub fn select(&self, id: Option<&str>) {
        self.apply(Action::Local(Outcome::Selected(id.map(str::to_string))));
    }

    pub fn clear_extra(&self, name: &'static str) {
        self.apply(Action::Local(Outcome::Cleared(name)));
    }

    /// Cache `item` without a request. A later fetch or create with the
    /// same id replaces it.
    pub fn insert_local(&self, item: T) {
        self.apply(Action::Local(Outcome::Inserted(item)));
    }

    /// Drop everything cached. Requests still in flight settle normally.
    pub fn reset(&self) {
        self.apply(Action::Local(Outcome::Reset));
    }

    // ---- Requests ----

    /// Replace `items` with the full collection.
    pub async fn fetch_all(&self, scope: &Scope) -> Settled<Vec<T>> {
        let service = Arc::clone(&self.service);
        self.dispatch(
            scope,
            ServiceMethodKind::Find,
            None,
            move |ctx| async move { service.find(&ctx, Params::new()).await },
            |items: &Vec<T>| Outcome::Listed(items.clone()),
        )
        .await
    }

    /// Replace `items` with the collection nested under `parent`
    /// (`GET /tasks/project/:id`).
    pub async fn fetch_by_parent(&self, scope: &Scope, parent: ParentRef) -> Settled<Vec<T>> {
        let service = Arc::clone(&self.service);
        self.dispatch(
            scope,
            ServiceMethodKind::Find,
            Some(parent.id.clone()),
            move |ctx| async move { service.find(&ctx, Params::under(parent)).await },
            |items: &Vec<T>| Outcome::Listed(items.clone()),
        )
        .await
    }

    /// Replace only `parent`'s slice of `items`, leaving other parents'
    /// records cached.
    pub async fn fetch_slice(&self, scope: &Scope, parent: ParentRef) -> Settled<Vec<T>> {
        let service = Arc::clone(&self.service);
        let under = parent.clone();
        self.dispatch(
            scope,
            ServiceMethodKind::Find,
            Some(parent.id.clone()),
            move |ctx| async move { service.find(&ctx, Params::under(under)).await },
            move |items: &Vec<T>| Outcome::ListedUnder {
                parent,
                items: items.clone(),
            },
        )
        .await
    }

    /// Fill the side collection `name` from a `find` with `params`.
    pub async fn fetch_extra(
        &self,
        scope: &Scope,
        name: &'static str,
        params: Params,
    ) -> Settled<Vec<T>> {
        let service = Arc::clone(&self.service);
        self.dispatch(
            scope,
            ServiceMethodKind::Find,
            None,
            move |ctx| async move { service.find(&ctx, params).await },
            move |items: &Vec<T>| Outcome::Collected {
                name,
                items: items.clone(),
            },
        )
        .await
    }

    /// Upsert the record and select it. On failure `current` keeps its
    /// previous value.
    pub async fn fetch_by_id(&self, scope: &Scope, id: &str) -> Settled<T> {
        let service = Arc::clone(&self.service);
        let owned = id.to_string();
        self.dispatch(
            scope,
            ServiceMethodKind::Get,
            Some(id.to_string()),
            move |ctx| async move { service.get(&ctx, &owned).await },
            |item: &T| Outcome::Loaded(item.clone()),
        )
        .await
    }

    /// The payload is not validated here; that is the caller's job.
    pub async fn create<P: Serialize>(&self, scope: &Scope, data: P) -> Settled<T> {
        let service = Arc::clone(&self.service);
        self.dispatch(
            scope,
            ServiceMethodKind::Create,
            None,
            move |ctx| async move { service.create(&ctx, to_payload(&data)?).await },
            |item: &T| Outcome::Created(item.clone()),
        )
        .await
    }

    pub async fn create_with_attachments(
        &self,
        scope: &Scope,
        data: Value,
        attachments: Vec<Attachment>,
    ) -> Settled<T> {
        let service = Arc::clone(&self.service);
        self.dispatch(
            scope,
            ServiceMethodKind::Create,
            None,
            move |ctx| async move {
                service
                    .create_with_attachments(&ctx, data, attachments)
                    .await
            },
            |item: &T| Outcome::Created(item.clone()),
        )
        .await
    }

    pub async fn update<P: Serialize>(&self, scope: &Scope, id: &str, data: P) -> Settled<T> {
        let service = Arc::clone(&self.service);
        let owned = id.to_string();
        self.dispatch(
            scope,
            ServiceMethodKind::Update,
            Some(id.to_string()),
            move |ctx| async move { service.update(&ctx, &owned, to_payload(&data)?).await },
            |item: &T| Outcome::Updated(item.clone()),
        )
        .await
    }

    pub async fn delete(&self, scope: &Scope, id: &str) -> Settled<String> {
        let service = Arc::clone(&self.service);
        let owned = id.to_string();
        self.dispatch(
            scope,
            ServiceMethodKind::Remove,
            Some(id.to_string()),
            move |ctx| async move {
                service.remove(&ctx, &owned).await?;
                Ok::<_, anyhow::Error>(owned)
            },
            |id: &String| Outcome::Removed(id.clone()),
        )
        .await
    }

    /// `POST /x/:id/<method>`; the returned record replaces its cached copy.
    pub async fn relate<P: Serialize>(
        &self,
        scope: &Scope,
        method: &'static str,
        id: &str,
        data: P,
    ) -> Settled<T> {
        let service = Arc::clone(&self.service);
        let owned = id.to_string();
        self.dispatch(
            scope,
            ServiceMethodKind::Custom(method),
            Some(id.to_string()),
            move |ctx| async move {
                service
                    .custom(&ctx, method, &owned, to_payload(&data)?)
                    .await
            },
            |item: &T| Outcome::Related(item.clone()),
        )
        .await
    }

    // ---- Lifecycle ----

    pub(crate) fn service(&self) -> Arc<dyn EntityService<T>> {
        Arc::clone(&self.service)
    }

    fn apply(&self, action: Action<T>) {
        let mut state = self.state.write();
        reduce(&mut state, action);
    }

    fn emit(
        &self,
        ctx: &RequestContext,
        kind: StoreEventKind,
        method: &ServiceMethodKind,
        id: Option<String>,
        message: Option<String>,
    ) {
        self.events.emit(&StoreEvent {
            store: T::KIND,
            kind,
            method: method.clone(),
            request_id: ctx.request_id.clone(),
            id,
            message,
        });
    }

    pub(crate) async fn dispatch<R, F, Fut, O>(
        &self,
        scope: &Scope,
        method: ServiceMethodKind,
        target: Option<String>,
        call: F,
        outcome: O,
    ) -> Settled<R>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<R>>,
        O: FnOnce(&R) -> Outcome<T>,
    {
        let ctx = scope.context();
        if ctx.is_cancelled() {
            tracing::debug!(
                store = T::KIND,
                method = method.as_str(),
                scope = scope.name(),
                "scope already cancelled, not dispatching"
            );
            return Settled::Cancelled;
        }

        self.apply(Action::Pending);
        let pending = PendingRequest::new(&self.state, &method);
        self.emit(&ctx, StoreEventKind::Pending, &method, target.clone(), None);
        tracing::debug!(
            store = T::KIND,
            method = method.as_str(),
            request_id = %ctx.request_id,
            "dispatch"
        );

        let result = if self.service.capabilities().allows(&method) {
            call(ctx.clone()).await
        } else {
            Err(ApiError::new(
                ErrorKind::MethodNotAllowed,
                format!("Method '{}' not allowed on {}", method.as_str(), T::KIND),
            )
            .into_anyhow())
        };

        if ctx.is_cancelled() {
            pending.finish(Action::Settled);
            tracing::debug!(
                store = T::KIND,
                method = method.as_str(),
                request_id = %ctx.request_id,
                "scope cancelled, discarding response"
            );
            return Settled::Cancelled;
        }

        match result {
            Ok(value) => {
                let outcome = outcome(&value);
                let change = change_event(&outcome);
                let changed_id = changed_id(&outcome).or(target);
                pending.finish(Action::Fulfilled(outcome));

                tracing::debug!(
                    store = T::KIND,
                    method = method.as_str(),
                    request_id = %ctx.request_id,
                    "fulfilled"
                );
                self.emit(&ctx, StoreEventKind::Fulfilled, &method, changed_id.clone(), None);
                if let Some(kind) = change {
                    self.emit(&ctx, kind, &method, changed_id, None);
                }
                Settled::Fulfilled(value)
            }
            Err(err) => {
                let err = ApiError::normalize(err);
                if err.kind == ErrorKind::Cancelled {
                    pending.finish(Action::Settled);
                    return Settled::Cancelled;
                }

                if err.is_auth_failure() {
                    // The session already redirected; nothing to show here.
                    pending.finish(Action::Settled);
                } else {
                    pending.finish(Action::Rejected(err.message.clone()));
                }

                tracing::warn!(
                    store = T::KIND,
                    method = method.as_str(),
                    request_id = %ctx.request_id,
                    error = %err,
                    "rejected"
                );
                self.emit(
                    &ctx,
                    StoreEventKind::Rejected,
                    &method,
                    target,
                    Some(err.message.clone()),
                );
                Settled::Rejected(err)
            }
        }
    }
}

/// One `Pending` awaiting its terminal action.
///
/// A dispatch future dropped mid-request (a timeout, a lost `select!` arm,
/// an aborted task) never reaches its terminal action, so the drop settles
/// it instead and `loading` cannot stick.
struct PendingRequest<'a, T: Entity> {
    state: &'a RwLock<EntityState<T>>,
    method: &'static str,
    open: bool,
}

impl<'a, T: Entity> PendingRequest<'a, T> {
    fn new(state: &'a RwLock<EntityState<T>>, method: &ServiceMethodKind) -> Self {
        Self {
            state,
            method: method.as_str(),
            open: true,
        }
    }

    fn finish(mut self, action: Action<T>) {
        self.open = false;
        reduce(&mut self.state.write(), action);
    }
}

impl<T: Entity> Drop for PendingRequest<'_, T> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        tracing::debug!(
            store = T::KIND,
            method = self.method,
            "dispatch dropped before settling"
        );
        reduce(&mut self.state.write(), Action::Settled);
    }
}

fn to_payload<P: Serialize>(data: &P) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| {
        ApiError::bad_request("Payload could not be serialized")
            .with_source(e.into())
            .into_anyhow()
    })
}

fn change_event<T>(outcome: &Outcome<T>) -> Option<StoreEventKind> {
    match outcome {
        Outcome::Created(_) => Some(StoreEventKind::Created),
        Outcome::Updated(_) | Outcome::Related(_) => Some(StoreEventKind::Updated),
        Outcome::Removed(_) => Some(StoreEventKind::Removed),
        _ => None,
    }
}

fn changed_id<T: Entity>(outcome: &Outcome<T>) -> Option<String> {
    match outcome {
        Outcome::Created(item)
        | Outcome::Updated(item)
        | Outcome::Related(item)
        | Outcome::Loaded(item) => Some(item.id().to_string()),
        Outcome::Removed(id) => Some(id.clone()),
        _ => None,
    }
}
