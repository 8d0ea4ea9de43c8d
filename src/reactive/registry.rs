//! Dependency Registry - the observers interested in one property.
//!
//! Every reactive cell owns exactly one registry. Observers are appended while
//! they evaluate their path for the first time and are notified, in the order
//! they registered, whenever the cell's value changes.
//!
//! Entries are `Weak`: the registry never keeps an observer alive. Dead entries
//! are pruned lazily whenever the subscriber list is snapshotted.

use std::rc::{Rc, Weak};

use tracing::trace;

use super::observer::Observer;
use super::store::ObservableStore;
use crate::error::Result;
use crate::types::ObserverId;

/// Ordered, deduplicated set of observers bound to one property.
#[derive(Default)]
pub struct DependencyRegistry {
    subscribers: Vec<(ObserverId, Weak<Observer>)>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`. Returns false if it was already registered.
    pub fn depend(&mut self, observer: &Rc<Observer>) -> bool {
        let id = observer.id();
        if self
            .subscribers
            .iter()
            .any(|(existing, weak)| *existing == id && weak.strong_count() > 0)
        {
            return false;
        }
        self.subscribers.push((id, Rc::downgrade(observer)));
        true
    }

    /// Live observers in registration order. Prunes dropped entries.
    pub fn subscribers(&mut self) -> Vec<Rc<Observer>> {
        self.subscribers.retain(|(_, weak)| weak.strong_count() > 0);
        self.subscribers
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    /// Ids of the live observers in registration order.
    pub fn ids(&self) -> Vec<ObserverId> {
        self.subscribers
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `update()` on each observer in order. The first failure aborts the pass.
///
/// Callers snapshot the subscriber list and drop every store borrow first:
/// updates read the store and effects may write to it again.
pub(crate) fn notify(observers: &[Rc<Observer>], store: &ObservableStore) -> Result<()> {
    for observer in observers {
        trace!(observer = ?observer.id(), path = observer.path(), "notify");
        observer.update(store)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observer(store: &ObservableStore, path: &str) -> Rc<Observer> {
        Observer::new(store, path, |_, _| Ok(())).unwrap()
    }

    #[test]
    fn test_depend_is_idempotent() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let obs = observer(&store, "a");

        let mut registry = DependencyRegistry::new();
        assert!(registry.depend(&obs));
        assert!(!registry.depend(&obs));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ids(), vec![obs.id()]);
    }

    #[test]
    fn test_registration_order() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let first = observer(&store, "a");
        let second = observer(&store, "a");

        let mut registry = DependencyRegistry::new();
        registry.depend(&second);
        registry.depend(&first);

        let ids: Vec<_> = registry.subscribers().iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }

    #[test]
    fn test_dropped_observers_are_pruned() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let kept = observer(&store, "a");
        let dropped = observer(&store, "a");

        let mut registry = DependencyRegistry::new();
        registry.depend(&kept);
        registry.depend(&dropped);
        drop(dropped);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.subscribers().len(), 1);
        assert!(!registry.is_empty());
    }
}
