//! Actions and the reducer.
//!
//! Every request a store dispatches produces exactly one `Pending` followed
//! by exactly one terminal action (`Fulfilled`, `Rejected` or `Settled`).
//! `Local` changes state without a request. [`reduce`] is pure and total:
//! it touches nothing but the state it is given.

use atrium_core::{Entity, ParentRef};

use crate::state::EntityState;

#[derive(Debug, Clone)]
pub enum Action<T> {
    Pending,
    Fulfilled(Outcome<T>),
    Rejected(String),
    /// Terminal without a recorded error: a 401 (handled by the session) or
    /// a response that arrived after its scope was cancelled.
    Settled,
    Local(Outcome<T>),
}

/// How a successful answer patches the state.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Replace the whole collection.
    Listed(Vec<T>),
    /// Replace only what belongs to `parent`.
    ListedUnder { parent: ParentRef, items: Vec<T> },
    /// Upsert and select.
    Loaded(T),
    /// Upsert (append when new).
    Created(T),
    /// Replace by id when present.
    Updated(T),
    Removed(String),
    /// An updated parent returned by a relationship endpoint.
    Related(T),
    /// Replace a named side collection.
    Collected { name: &'static str, items: Vec<T> },
    Cleared(&'static str),
    Selected(Option<String>),
    /// Upsert without a request, e.g. an optimistic chat message.
    Inserted(T),
    /// Back to the initial state. Requests still in flight keep counting.
    Reset,
}

pub fn reduce<T: Entity>(state: &mut EntityState<T>, action: Action<T>) {
    match action {
        Action::Pending => {
            state.in_flight += 1;
            state.error = None;
        }
        Action::Fulfilled(outcome) => {
            state.in_flight = state.in_flight.saturating_sub(1);
            apply(state, outcome);
        }
        Action::Rejected(message) => {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.error = Some(message);
        }
        Action::Settled => {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        Action::Local(outcome) => apply(state, outcome),
    }
}

fn apply<T: Entity>(state: &mut EntityState<T>, outcome: Outcome<T>) {
    match outcome {
        Outcome::Listed(items) => {
            state.items = EntityState::dedup(items);
        }
        Outcome::ListedUnder { parent, items } => {
            let items = EntityState::dedup(items);
            state.items.retain(|existing| {
                !existing.belongs_to(&parent) && !items.iter().any(|i| i.id() == existing.id())
            });
            state.items.extend(items);
        }
        Outcome::Loaded(item) => {
            state.current = Some(item.id().to_string());
            state.upsert(item);
        }
        Outcome::Created(item) | Outcome::Inserted(item) => state.upsert(item),
        Outcome::Updated(item) | Outcome::Related(item) => {
            state.replace(item);
        }
        Outcome::Removed(id) => state.remove(&id),
        Outcome::Collected { name, items } => {
            state.extras.insert(name, EntityState::dedup(items));
        }
        Outcome::Cleared(name) => {
            state.extras.remove(name);
        }
        Outcome::Selected(id) => state.current = id,
        Outcome::Reset => {
            *state = EntityState {
                in_flight: state.in_flight,
                ..EntityState::default()
            };
        }
    }
}
