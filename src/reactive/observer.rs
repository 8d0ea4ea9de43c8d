//! Observer - one live binding between a data path and a side effect.
//!
//! Construction evaluates the path once while passing the observer itself as
//! the tracker, so every property read on the way registers it. Later updates
//! re-read the path untracked, and run the effect only when the value moved.
//!
//! The registry never hands the new value over: the observer pulls it. That is
//! what lets a nested path like `user.address.city` react to a write of `user`
//! or of `city` without registries knowing anything about paths.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::store::ObservableStore;
use crate::error::{BindError, Result};
use crate::resolver;
use crate::types::{strict_eq, ObserverId};

/// Side effect run with `(new, old)` whenever the observed value changes.
pub type Effect = Box<dyn Fn(&Value, &Value) -> Result<()>>;

/// A live binding. Owned by its instance and referenced weakly by registries.
pub struct Observer {
    id: ObserverId,
    path: String,
    old_value: RefCell<Value>,
    effect: Effect,
}

impl Observer {
    /// Create an observer on `path` and capture its dependencies.
    ///
    /// Fails when the path is empty or does not resolve. Registrations made
    /// before the failure point die with the returned observer.
    pub fn new(
        store: &ObservableStore,
        path: &str,
        effect: impl Fn(&Value, &Value) -> Result<()> + 'static,
    ) -> Result<Rc<Self>> {
        if path.trim().is_empty() {
            return Err(BindError::EmptyPath);
        }

        let observer = Rc::new(Self {
            id: ObserverId::next(),
            path: path.to_string(),
            old_value: RefCell::new(Value::Null),
            effect: Box::new(effect),
        });

        let initial = resolver::resolve(store, &observer.path, Some(&observer))?;
        *observer.old_value.borrow_mut() = initial;

        Ok(observer)
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last value this observer saw.
    pub fn value(&self) -> Value {
        self.old_value.borrow().clone()
    }

    /// Re-read the path and run the effect if the value changed.
    ///
    /// The new value is stored before the effect runs so a write made from
    /// inside the effect sees this observer as already up to date.
    pub fn update(&self, store: &ObservableStore) -> Result<()> {
        let new_value = resolver::resolve(store, &self.path, None)?;
        if strict_eq(&self.old_value.borrow(), &new_value) {
            return Ok(());
        }
        let old_value = self.old_value.replace(new_value.clone());
        (self.effect)(&new_value, &old_value)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("old_value", &self.old_value.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn recorder() -> (Rc<RefCell<Vec<(Value, Value)>>>, impl Fn(&Value, &Value) -> Result<()>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let effect = move |new: &Value, old: &Value| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        };
        (calls, effect)
    }

    #[test]
    fn test_initial_value() {
        let store = ObservableStore::instrument(json!({ "user": { "name": "ada" } }));
        let (calls, effect) = recorder();
        let observer = Observer::new(&store, "user.name", effect).unwrap();

        assert_eq!(observer.value(), json!("ada"));
        assert_eq!(observer.path(), "user.name");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_update_runs_effect_with_new_and_old() {
        let store = ObservableStore::instrument(json!({ "count": 0 }));
        let (calls, effect) = recorder();
        let observer = Observer::new(&store, "count", effect).unwrap();

        resolver::assign(&store, "count", json!(1)).unwrap();
        resolver::assign(&store, "count", json!(2)).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![(json!(1), json!(0)), (json!(2), json!(1))]
        );
        assert_eq!(observer.value(), json!(2));
    }

    #[test]
    fn test_update_without_change_is_noop() {
        let store = ObservableStore::instrument(json!({ "count": 3 }));
        let (calls, effect) = recorder();
        let observer = Observer::new(&store, "count", effect).unwrap();

        observer.update(&store).unwrap();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_empty_path_rejected() {
        let store = ObservableStore::instrument(json!({}));
        let err = Observer::new(&store, "  ", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, BindError::EmptyPath));
    }

    #[test]
    fn test_unresolvable_path_fails() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let err = Observer::new(&store, "a.b.c", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, BindError::UnresolvedPath { ref segment, .. } if segment == "b"));
    }

    #[test]
    fn test_failed_construction_leaves_no_live_registration() {
        let store = ObservableStore::instrument(json!({ "a": { "b": 1 } }));
        let _ = Observer::new(&store, "a.missing.deep", |_, _| Ok(()));
        assert!(store.dependents("a").unwrap().is_empty());
    }
}
