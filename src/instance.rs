//! Instance - the façade tying data, methods, computed properties and a
//! mount target together.
//!
//! Construction runs: instrument data -> merge computed properties ->
//! resolve the mount target -> compile it. Without a mount target the
//! instance is still a working reactive data holder.
//!
//! # Example
//!
//! ```ignore
//! use spark_bind::{Document, El, Instance, Options};
//! use serde_json::json;
//!
//! let doc = Document::parse(r#"<div id="app"><p v-text="count"></p></div>"#);
//! let vm = Instance::new(Options {
//!     el: Some(El::selector(&doc, "#app")),
//!     data: json!({ "count": 0 }),
//!     ..Default::default()
//! })?;
//!
//! vm.set("count", 5)?;
//! assert_eq!(doc.query_selector("p").unwrap().text_content(), "5");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::compiler;
use crate::dom::{Document, Event, NodeRef};
use crate::error::{BindError, Result};
use crate::reactive::{Computed, ObservableStore, Observer};
use crate::resolver;
use crate::types::ObserverId;

/// A method callable from `v-on` directives. Runs with the instance and the event.
pub type Method = Rc<dyn Fn(&Instance, &Event) -> Result<()>>;

// =============================================================================
// Options
// =============================================================================

/// Where to mount.
#[derive(Clone, Debug)]
pub enum El {
    /// A node handle, used as is.
    Node(NodeRef),
    /// A selector resolved against a document at construction.
    Selector(Document, String),
}

impl El {
    pub fn selector(doc: &Document, selector: impl Into<String>) -> Self {
        Self::Selector(doc.clone(), selector.into())
    }

    fn resolve(self) -> Option<NodeRef> {
        match self {
            Self::Node(node) => Some(node),
            Self::Selector(doc, selector) => {
                let found = doc.query_selector(&selector);
                if found.is_none() {
                    warn!(selector = selector.as_str(), "mount target not found; compile skipped");
                }
                found
            }
        }
    }
}

impl From<NodeRef> for El {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

/// Construction options.
#[derive(Clone, Default)]
pub struct Options {
    pub el: Option<El>,
    /// Must be a JSON object to be reactive; anything else yields no properties.
    pub data: Value,
    pub methods: HashMap<String, Method>,
    /// Merged into the data object in insertion order.
    pub computed: IndexMap<String, Computed>,
}

impl Options {
    pub fn el(mut self, el: impl Into<El>) -> Self {
        self.el = Some(el.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Build `data` from any serialisable value.
    pub fn with_serialized_data<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.data = serde_json::to_value(data)?;
        Ok(self)
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Instance, &Event) -> Result<()> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn computed(mut self, name: impl Into<String>, computed: Computed) -> Self {
        self.computed.insert(name.into(), computed);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("el", &self.el)
            .field("data", &self.data)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Instance
// =============================================================================

struct InstanceInner {
    store: ObservableStore,
    methods: HashMap<String, Method>,
    observers: RefCell<Vec<Rc<Observer>>>,
    el: Option<NodeRef>,
}

/// Shared handle to a bound instance. Cloning creates a new handle.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

/// Non-owning handle held by listeners and effects.
#[derive(Clone)]
pub struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(|inner| Instance { inner })
    }
}

impl Instance {
    /// Build an instance and compile its mount target, if one resolves.
    ///
    /// Fails when a template binding names a path the data does not have.
    pub fn new(options: Options) -> Result<Self> {
        let Options {
            el,
            data,
            methods,
            computed,
        } = options;

        let store = ObservableStore::instrument(data);
        for (name, computed) in computed {
            store.define_computed(&name, computed);
        }

        let instance = Self {
            inner: Rc::new(InstanceInner {
                store,
                methods,
                observers: RefCell::new(Vec::new()),
                el: el.and_then(El::resolve),
            }),
        };

        if instance.el().is_some() {
            compiler::compile(&instance)?;
        } else {
            debug!("no mount target; instance holds data only");
        }
        Ok(instance)
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.inner))
    }

    /// The resolved mount target.
    pub fn el(&self) -> Option<&NodeRef> {
        self.inner.el.as_ref()
    }

    pub fn store(&self) -> &ObservableStore {
        &self.inner.store
    }

    // =========================================================================
    // Data Access
    // =========================================================================

    /// Read a dotted path without tracking.
    pub fn get(&self, path: &str) -> Result<Value> {
        resolver::resolve(&self.inner.store, path, None)
    }

    /// Write a dotted path. Bound nodes are updated before this returns.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        resolver::assign(&self.inner.store, path, value.into())
    }

    /// Untracked snapshot of the data, computed properties excluded.
    pub fn data(&self) -> Value {
        self.inner.store.snapshot()
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Run `effect` with `(new, old)` whenever the value at `path` changes.
    ///
    /// The watcher lives as long as the instance.
    pub fn watch(
        &self,
        path: &str,
        effect: impl Fn(&Value, &Value) -> Result<()> + 'static,
    ) -> Result<ObserverId> {
        Ok(self.observe(path, effect)?.id())
    }

    /// Create an observer owned by this instance.
    pub(crate) fn observe(
        &self,
        path: &str,
        effect: impl Fn(&Value, &Value) -> Result<()> + 'static,
    ) -> Result<Rc<Observer>> {
        let observer = Observer::new(&self.inner.store, path, effect)?;
        self.inner.observers.borrow_mut().push(Rc::clone(&observer));
        Ok(observer)
    }

    /// The owned observer with `id`, if any.
    pub fn observer(&self, id: ObserverId) -> Option<Rc<Observer>> {
        self.inner
            .observers
            .borrow()
            .iter()
            .find(|observer| observer.id() == id)
            .cloned()
    }

    /// Number of live observers: directive bindings, interpolation segments
    /// and watchers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Invoke a method by name, as a `v-on` listener would.
    pub fn call(&self, name: &str, event: &Event) -> Result<()> {
        let method = self
            .inner
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| BindError::UnknownMethod {
                name: name.to_string(),
            })?;
        method(self, event)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("el", &self.inner.el.as_ref().map(NodeRef::id))
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_data_only_instance() {
        let vm = Instance::new(Options::default().data(json!({ "count": 0 }))).unwrap();
        assert!(vm.el().is_none());

        vm.set("count", 3).unwrap();
        assert_eq!(vm.get("count").unwrap(), json!(3));
        assert_eq!(vm.data(), json!({ "count": 3 }));
    }

    #[test]
    fn test_missing_selector_skips_compile() {
        let doc = Document::parse(r#"<div id="app">{{ nope }}</div>"#);
        let vm = Instance::new(
            Options::default()
                .el(El::selector(&doc, "#other"))
                .data(json!({})),
        )
        .unwrap();
        assert!(vm.el().is_none());
        assert_eq!(vm.observer_count(), 0);
        assert_eq!(doc.root().inner_html(), r#"<div id="app">{{ nope }}</div>"#);
    }

    #[test]
    fn test_el_from_node() {
        let doc = Document::parse(r#"<p>{{ n }}</p>"#);
        let p = doc.query_selector("p").unwrap();
        let vm = Instance::new(Options::default().el(p.clone()).data(json!({ "n": 1 }))).unwrap();
        assert_eq!(vm.el(), Some(&p));
        assert_eq!(p.text_content(), "1");
    }

    #[test]
    fn test_watch() {
        let vm = Instance::new(Options::default().data(json!({ "user": { "name": "ada" } }))).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        vm.watch("user.name", move |new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        })
        .unwrap();

        vm.set("user.name", "grace").unwrap();
        assert_eq!(*seen.borrow(), vec![(json!("grace"), json!("ada"))]);
        assert_eq!(vm.observer_count(), 1);
    }

    #[test]
    fn test_call_method() {
        let doc = Document::new();
        let node = doc.create_element("button");
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let vm = Instance::new(
            Options::default()
                .data(json!({ "count": 0 }))
                .method("inc", move |vm, _event| {
                    counter.set(counter.get() + 1);
                    let count = vm.get("count")?.as_i64().unwrap_or_default();
                    vm.set("count", count + 1)
                }),
        )
        .unwrap();

        let event = Event::new("click", &node);
        vm.call("inc", &event).unwrap();
        vm.call("inc", &event).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(vm.get("count").unwrap(), json!(2));

        let err = vm.call("dec", &event).unwrap_err();
        assert!(matches!(err, BindError::UnknownMethod { ref name } if name == "dec"));
    }

    #[test]
    fn test_computed_option() {
        let vm = Instance::new(
            Options::default()
                .data(json!({ "price": 4, "qty": 3 }))
                .computed(
                    "total",
                    Computed::new(|scope| {
                        let price = scope.get("price")?.as_i64().unwrap_or_default();
                        let qty = scope.get("qty")?.as_i64().unwrap_or_default();
                        Ok(json!(price * qty))
                    }),
                ),
        )
        .unwrap();
        assert_eq!(vm.get("total").unwrap(), json!(12));
        vm.set("qty", 5).unwrap();
        assert_eq!(vm.get("total").unwrap(), json!(20));
    }

    #[test]
    fn test_serialized_data() {
        #[derive(Serialize)]
        struct Profile {
            name: String,
            age: u32,
        }

        let options = Options::default()
            .with_serialized_data(&Profile {
                name: "ada".into(),
                age: 36,
            })
            .unwrap();
        let vm = Instance::new(options).unwrap();
        assert_eq!(vm.get("age").unwrap(), json!(36));
    }

    #[test]
    fn test_dropped_instance_listeners_are_inert() {
        let doc = Document::parse(r#"<div id="app"><input v-model="name"></div>"#);
        let vm = Instance::new(
            Options::default()
                .el(El::selector(&doc, "#app"))
                .data(json!({ "name": "x" })),
        )
        .unwrap();
        let input = doc.query_selector("input").unwrap();
        drop(vm);

        input.input("y").unwrap();
        assert_eq!(input.value(), "y");
    }
}
