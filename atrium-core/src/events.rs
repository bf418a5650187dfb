use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::RwLock;

use crate::ServiceMethodKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
    ListenerId(LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

/// What happened to a store.
///
/// Lifecycle events fire for every dispatch; the change events fire after
/// the items collection was actually patched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreEventKind {
    Pending,
    Fulfilled,
    Rejected,
    Created,
    Updated,
    Removed,
    Custom(String),
}

impl StoreEventKind {
    pub fn custom(name: impl Into<String>) -> Self {
        StoreEventKind::Custom(name.into())
    }
}

/// Data delivered to listeners.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Entity kind of the emitting store (`"users"`).
    pub store: &'static str,
    pub kind: StoreEventKind,
    pub method: ServiceMethodKind,
    pub request_id: String,
    /// Affected record, when the event concerns one.
    pub id: Option<String>,
    /// Rejection message.
    pub message: Option<String>,
}

pub type EventListener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreNamePat {
    Any,
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPat {
    Any,
    Exact(StoreEventKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreEventPattern {
    pub store: StoreNamePat,
    pub event: EventPat,
}

impl StoreEventPattern {
    pub fn exact(store: impl Into<String>, event: StoreEventKind) -> Self {
        Self {
            store: StoreNamePat::Exact(store.into()),
            event: EventPat::Exact(event),
        }
    }

    pub fn any() -> Self {
        Self {
            store: StoreNamePat::Any,
            event: EventPat::Any,
        }
    }

    pub fn matches(&self, store: &str, event: &StoreEventKind) -> bool {
        let store_ok = match &self.store {
            StoreNamePat::Any => true,
            StoreNamePat::Exact(s) => s == store,
        };
        let event_ok = match &self.event {
            EventPat::Any => true,
            EventPat::Exact(e) => e == event,
        };
        store_ok && event_ok
    }
}

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    pattern: StoreEventPattern,
    listener: EventListener,
    once: bool,
}

/// Listener registry shared by every store of an `AppStore`.
///
/// Emission never runs listeners under the lock:
/// 1) snapshot matching listeners (read lock)
/// 2) call them (no lock held, so they may read stores or subscribe)
/// 3) drop fired `once` listeners (write lock)
#[derive(Default)]
pub struct StoreEventHub {
    listeners: Vec<ListenerEntry>,
}

impl StoreEventHub {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn on_pattern(&mut self, pattern: StoreEventPattern, listener: EventListener) -> ListenerId {
        self.push(pattern, listener, false)
    }

    pub fn once_pattern(&mut self, pattern: StoreEventPattern, listener: EventListener) -> ListenerId {
        self.push(pattern, listener, true)
    }

    fn push(&mut self, pattern: StoreEventPattern, listener: EventListener, once: bool) -> ListenerId {
        let id = next_listener_id();
        self.listeners.push(ListenerEntry {
            id,
            pattern,
            listener,
            once,
        });
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|e| e.id != id);
        before != self.listeners.len()
    }

    /// Remove every listener, or only those registered with `pattern`.
    pub fn remove_all(&mut self, pattern: Option<&StoreEventPattern>) -> usize {
        let before = self.listeners.len();
        if let Some(p) = pattern {
            self.listeners.retain(|e| &e.pattern != p);
        } else {
            self.listeners.clear();
        }
        before - self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn snapshot_emit(&self, event: &StoreEvent) -> (Vec<EventListener>, Vec<ListenerId>) {
        let mut to_call = Vec::new();
        let mut once_ids = Vec::new();

        for entry in &self.listeners {
            if entry.pattern.matches(event.store, &event.kind) {
                to_call.push(entry.listener.clone());
                if entry.once {
                    once_ids.push(entry.id);
                }
            }
        }

        (to_call, once_ids)
    }

    pub fn finalize_once_removals(&mut self, once_ids: &[ListenerId]) {
        if once_ids.is_empty() {
            return;
        }
        self.listeners.retain(|e| !once_ids.contains(&e.id));
    }
}

/// Thread-safe handle around [`StoreEventHub`].
#[derive(Clone, Default)]
pub struct SharedEventHub {
    inner: Arc<RwLock<StoreEventHub>>,
}

impl SharedEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// hub.on("users.created", Arc::new(|event| { /* ... */ }))
    pub fn on(&self, pattern: &str, listener: EventListener) -> anyhow::Result<ListenerId> {
        let pat = parse_event_pattern(pattern)?;
        Ok(self.inner.write().on_pattern(pat, listener))
    }

    pub fn on_pattern(&self, pattern: StoreEventPattern, listener: EventListener) -> ListenerId {
        self.inner.write().on_pattern(pattern, listener)
    }

    pub fn once(&self, pattern: &str, listener: EventListener) -> anyhow::Result<ListenerId> {
        let pat = parse_event_pattern(pattern)?;
        Ok(self.inner.write().once_pattern(pat, listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.write().off(id)
    }

    pub fn remove_all(&self, pattern: Option<&StoreEventPattern>) -> usize {
        self.inner.write().remove_all(pattern)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn emit(&self, event: &StoreEvent) {
        let (listeners, once_ids) = self.inner.read().snapshot_emit(event);

        for f in &listeners {
            f(event);
        }

        if !once_ids.is_empty() {
            self.inner.write().finalize_once_removals(&once_ids);
        }
    }
}

/// Parse strings like "users.created", "users.*", "*.*" or "users created".
pub fn parse_event_pattern(input: &str) -> anyhow::Result<StoreEventPattern> {
    let s = input.trim();

    let (store, ev) = if let Some((a, b)) = s.split_once(' ') {
        (a.trim(), b.trim())
    } else if let Some((a, b)) = s.split_once('.') {
        (a.trim(), b.trim())
    } else {
        return Err(anyhow::anyhow!(
            "Invalid event pattern '{s}'. Expected 'store event' or 'store.event'."
        ));
    };

    let store = if store == "*" {
        StoreNamePat::Any
    } else {
        StoreNamePat::Exact(store.to_string())
    };

    let event = if ev == "*" {
        EventPat::Any
    } else {
        EventPat::Exact(parse_event_kind(ev))
    };

    Ok(StoreEventPattern { store, event })
}

pub fn parse_event_kind(s: &str) -> StoreEventKind {
    let norm = s.trim().to_lowercase();
    match norm.as_str() {
        "pending" => StoreEventKind::Pending,
        "fulfilled" => StoreEventKind::Fulfilled,
        "rejected" => StoreEventKind::Rejected,
        "created" => StoreEventKind::Created,
        "updated" => StoreEventKind::Updated,
        "removed" => StoreEventKind::Removed,
        other => StoreEventKind::Custom(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn event(store: &'static str, kind: StoreEventKind) -> StoreEvent {
        StoreEvent {
            store,
            kind,
            method: ServiceMethodKind::Create,
            request_id: "req-1".to_string(),
            id: Some("1".to_string()),
            message: None,
        }
    }

    #[test]
    fn patterns_parse_wildcards() {
        let p = parse_event_pattern("users.*").unwrap();
        assert!(p.matches("users", &StoreEventKind::Removed));
        assert!(!p.matches("projects", &StoreEventKind::Removed));

        let p = parse_event_pattern("* created").unwrap();
        assert!(p.matches("tasks", &StoreEventKind::Created));
        assert!(!p.matches("tasks", &StoreEventKind::Updated));

        assert!(parse_event_pattern("users").is_err());
    }

    #[test]
    fn once_listeners_fire_a_single_time() {
        let hub = SharedEventHub::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        hub.once("users.created", Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        hub.emit(&event("users", StoreEventKind::Created));
        hub.emit(&event("users", StoreEventKind::Created));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listeners_may_subscribe_while_emitting() {
        let hub = SharedEventHub::new();
        let inner = hub.clone();
        hub.on("*.*", Arc::new(move |_| {
            inner.on_pattern(StoreEventPattern::any(), Arc::new(|_| {}));
        }))
        .unwrap();

        hub.emit(&event("projects", StoreEventKind::Updated));
        assert_eq!(hub.listener_count(), 2);
    }

    #[test]
    fn off_removes_by_id() {
        let hub = SharedEventHub::new();
        let id = hub.on("tasks.removed", Arc::new(|_| {})).unwrap();
        assert!(hub.off(id));
        assert!(!hub.off(id));
    }
}
