//! Computed properties merged into the data object.
//!
//! A computed property has no registry of its own. Its getter reads other
//! properties through a [`Scope`] that carries the caller's tracker, so an
//! observer bound to a computed key ends up registered on everything the
//! getter touched.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use super::store::{ObservableStore, Tracker};
use crate::error::Result;
use crate::resolver;

/// Getter of a computed property.
pub type Getter = Rc<dyn Fn(&Scope<'_>) -> Result<Value>>;

/// Optional setter of a computed property.
pub type Setter = Rc<dyn Fn(&Scope<'_>, Value) -> Result<()>>;

/// Data access handed to computed getters and setters.
pub struct Scope<'a> {
    store: &'a ObservableStore,
    tracker: Tracker<'a>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(store: &'a ObservableStore, tracker: Tracker<'a>) -> Self {
        Self { store, tracker }
    }

    /// Read a dotted path, registering the evaluating observer if any.
    pub fn get(&self, path: &str) -> Result<Value> {
        resolver::resolve(self.store, path, self.tracker)
    }

    /// Write a dotted path.
    pub fn set(&self, path: &str, value: Value) -> Result<()> {
        resolver::assign(self.store, path, value)
    }
}

/// A derived property: a getter and an optional setter.
#[derive(Clone)]
pub struct Computed {
    getter: Getter,
    setter: Option<Setter>,
}

impl Computed {
    pub fn new(getter: impl Fn(&Scope<'_>) -> Result<Value> + 'static) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: None,
        }
    }

    /// Make the property writable.
    pub fn with_setter(mut self, setter: impl Fn(&Scope<'_>, Value) -> Result<()> + 'static) -> Self {
        self.setter = Some(Rc::new(setter));
        self
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub(crate) fn get(&self, scope: &Scope<'_>) -> Result<Value> {
        (self.getter)(scope)
    }

    pub(crate) fn set(&self, scope: &Scope<'_>, name: &str, value: Value) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(scope, value),
            None => {
                debug!(name, "computed property has no setter; write ignored");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("writable", &self.is_writable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observer;
    use serde_json::json;
    use std::cell::RefCell;

    fn full_name() -> Computed {
        Computed::new(|scope| {
            let first = scope.get("first")?;
            let last = scope.get("last")?;
            Ok(json!(format!(
                "{} {}",
                first.as_str().unwrap_or_default(),
                last.as_str().unwrap_or_default()
            )))
        })
    }

    #[test]
    fn test_computed_read() {
        let store = ObservableStore::instrument(json!({ "first": "Ada", "last": "Lovelace" }));
        store.define_computed("full", full_name());

        assert_eq!(resolver::resolve(&store, "full", None).unwrap(), json!("Ada Lovelace"));
        // Computed keys are not part of the data snapshot.
        assert_eq!(store.snapshot(), json!({ "first": "Ada", "last": "Lovelace" }));
    }

    #[test]
    fn test_observer_on_computed_tracks_its_sources() {
        let store = ObservableStore::instrument(json!({ "first": "Ada", "last": "Lovelace" }));
        store.define_computed("full", full_name());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let observer = Observer::new(&store, "full", move |new, _| {
            sink.borrow_mut().push(new.clone());
            Ok(())
        })
        .unwrap();

        assert_eq!(store.dependents("first"), Some(vec![observer.id()]));
        assert_eq!(store.dependents("last"), Some(vec![observer.id()]));

        resolver::assign(&store, "last", json!("Byron")).unwrap();
        assert_eq!(*seen.borrow(), vec![json!("Ada Byron")]);
    }

    #[test]
    fn test_computed_setter() {
        let store = ObservableStore::instrument(json!({ "celsius": 0 }));
        store.define_computed(
            "fahrenheit",
            Computed::new(|scope| {
                let c = scope.get("celsius")?.as_f64().unwrap_or_default();
                Ok(json!(c * 9.0 / 5.0 + 32.0))
            })
            .with_setter(|scope, value| {
                let f = value.as_f64().unwrap_or_default();
                scope.set("celsius", json!((f - 32.0) * 5.0 / 9.0))
            }),
        );

        resolver::assign(&store, "fahrenheit", json!(212.0)).unwrap();
        assert_eq!(resolver::resolve(&store, "celsius", None).unwrap(), json!(100.0));
    }

    #[test]
    fn test_read_only_computed_ignores_writes() {
        let store = ObservableStore::instrument(json!({ "first": "Ada", "last": "Lovelace" }));
        store.define_computed("full", full_name());

        resolver::assign(&store, "full", json!("x")).unwrap();
        assert_eq!(resolver::resolve(&store, "full", None).unwrap(), json!("Ada Lovelace"));
    }

    #[test]
    fn test_computed_shadows_data() {
        let store = ObservableStore::instrument(json!({ "label": "raw" }));
        store.define_computed("label", Computed::new(|_| Ok(json!("derived"))));
        assert_eq!(resolver::resolve(&store, "label", None).unwrap(), json!("derived"));
    }
}
