use std::collections::BTreeMap;

use atrium_core::{Entity, ParentRef};

/// Cached slice of one entity type.
///
/// - `items` is unique by id
/// - `current` is a selected id; [`EntityState::current`] always resolves
///   it against `items`, so an update to the item is visible through it
/// - `loading` is derived from the number of unsettled requests
/// - `extras` holds named side collections such as premium users or
///   message search results
#[derive(Debug, Clone)]
pub struct EntityState<T> {
    pub(crate) items: Vec<T>,
    pub(crate) current: Option<String>,
    pub(crate) in_flight: usize,
    pub(crate) error: Option<String>,
    pub(crate) extras: BTreeMap<&'static str, Vec<T>>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            in_flight: 0,
            error: None,
            extras: BTreeMap::new(),
        }
    }
}

impl<T: Entity> EntityState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id())
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Side collection by name, empty when never fetched.
    pub fn extra(&self, name: &str) -> &[T] {
        self.extras.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn under<'a>(&'a self, parent: &'a ParentRef) -> impl Iterator<Item = &'a T> + 'a {
        self.items.iter().filter(move |item| item.belongs_to(parent))
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub(crate) fn upsert(&mut self, item: T) {
        match self.position(item.id()) {
            Some(idx) => self.items[idx] = item,
            None => self.items.push(item),
        }
    }

    /// Replace by id in `items` and every side collection. Returns whether
    /// `items` held it.
    pub(crate) fn replace(&mut self, item: T) -> bool {
        for extra in self.extras.values_mut() {
            if let Some(slot) = extra.iter_mut().find(|e| e.id() == item.id()) {
                *slot = item.clone();
            }
        }
        match self.position(item.id()) {
            Some(idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: &str) {
        self.items.retain(|item| item.id() != id);
        for extra in self.extras.values_mut() {
            extra.retain(|item| item.id() != id);
        }
    }

    /// Keep the last occurrence of each id so the collection stays unique
    /// even when the backend repeats a record.
    pub(crate) fn dedup(items: Vec<T>) -> Vec<T> {
        let mut out: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            match out.iter().position(|e| e.id() == item.id()) {
                Some(idx) => out[idx] = item,
                None => out.push(item),
            }
        }
        out
    }
}
