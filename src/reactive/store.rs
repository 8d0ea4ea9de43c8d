//! Observable Store - a data object turned into an arena of reactive cells.
//!
//! [`ObservableStore::instrument`] walks a JSON object once. Every own key of
//! every plain object becomes a cell holding either a nested object (an
//! ordered `key -> CellId` map) or a leaf value, and every cell owns one
//! [`DependencyRegistry`].
//!
//! ```text
//! { "user": { "name": "ada" }, "tags": ["x"] }
//!
//! cell 0  name    Leaf("ada")
//! cell 1  user    Object { name: 0 }
//! cell 2  tags    Leaf(["x"])        arrays are leaves
//! cell 3  <root>  Object { user: 1, tags: 2 }
//! ```
//!
//! Nested objects are instrumented before their parent cell is defined
//! (depth-first, pre-order on the value), hence `name` gets a lower index than
//! `user` and the root comes last.
//!
//! # Accessors
//!
//! [`get`](ObservableStore::get) and [`set`](ObservableStore::set) are the
//! per-property accessors. A tracked `get` registers the tracker on the cell
//! it reads. A `set` that changes the value notifies the cell's registry after
//! every borrow is released. Writing a value equal to the current scalar is a
//! no-op.
//!
//! Assigning a new object or array stores it as a plain leaf: it is readable
//! through paths but never instrumented. Writing a property that does not
//! exist adds it; observers that read the missing key earlier are not told.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::computed::{Computed, Scope};
use super::observer::Observer;
use super::registry::{self, DependencyRegistry};
use crate::error::Result;
use crate::types::{strict_eq, CellId, ObserverId};

/// The observer to register on every property read, if any.
pub type Tracker<'a> = Option<&'a Rc<Observer>>;

// =============================================================================
// Cells
// =============================================================================

enum CellValue {
    Object(IndexMap<String, CellId>),
    Leaf(Value),
    Computed(Rc<Computed>),
}

struct CellSlot {
    key: String,
    value: CellValue,
    deps: DependencyRegistry,
}

struct StoreInner {
    cells: Vec<CellSlot>,
    root: CellId,
}

impl StoreInner {
    fn alloc(&mut self, key: &str, value: CellValue) -> CellId {
        let id = CellId(self.cells.len());
        self.cells.push(CellSlot {
            key: key.to_string(),
            value,
            deps: DependencyRegistry::new(),
        });
        id
    }

    fn instrument_object(&mut self, object: Map<String, Value>) -> IndexMap<String, CellId> {
        let mut keys = IndexMap::with_capacity(object.len());
        for (key, value) in object {
            let value = match value {
                Value::Object(nested) => CellValue::Object(self.instrument_object(nested)),
                other => CellValue::Leaf(other),
            };
            let id = self.alloc(&key, value);
            keys.insert(key, id);
        }
        keys
    }

    fn child(&self, parent: CellId, key: &str) -> Option<CellId> {
        match &self.cells[parent.0].value {
            CellValue::Object(keys) => keys.get(key).copied(),
            _ => None,
        }
    }

    fn handle_for(&self, id: CellId) -> Handle {
        match &self.cells[id.0].value {
            CellValue::Object(_) => Handle::Object(id),
            _ => Handle::Leaf {
                cell: id,
                pointer: String::new(),
            },
        }
    }

    fn snapshot(&self, id: CellId) -> Value {
        match &self.cells[id.0].value {
            CellValue::Object(keys) => {
                let mut object = Map::new();
                for (key, child) in keys {
                    if matches!(self.cells[child.0].value, CellValue::Computed(_)) {
                        continue;
                    }
                    object.insert(key.clone(), self.snapshot(*child));
                }
                Value::Object(object)
            }
            CellValue::Leaf(value) => value.clone(),
            CellValue::Computed(_) => Value::Null,
        }
    }
}

// =============================================================================
// Handles and Write Outcomes
// =============================================================================

/// A position reached while walking a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub enum Handle {
    /// An instrumented object cell.
    Object(CellId),
    /// A location inside a leaf cell's value, as a JSON pointer.
    Leaf { cell: CellId, pointer: String },
    /// A value produced by a computed getter; not backed by any cell.
    Detached(Value),
}

/// Result of a write through [`ObservableStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assigned {
    /// The value changed and the property's observers were notified.
    Changed,
    /// The property did not exist and was added. Nobody could be observing it.
    Created,
    /// The new value equals the current one; nothing happened.
    Unchanged,
    /// The value changed inside a non-reactive leaf; nobody was notified.
    Silent,
    /// The property does not exist and cannot be added (array index out of range).
    Missing,
    /// The parent is a computed result and cannot be written through.
    Rejected,
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn child_of<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(object) => object.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

// =============================================================================
// Observable Store
// =============================================================================

/// Shared handle to an instrumented data object.
///
/// Cloning creates a new handle to the same cells.
#[derive(Clone)]
pub struct ObservableStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl ObservableStore {
    /// Instrument `data`. Anything but a JSON object yields an empty store.
    pub fn instrument(data: Value) -> Self {
        let mut inner = StoreInner {
            cells: Vec::new(),
            root: CellId(0),
        };
        let keys = match data {
            Value::Object(object) => inner.instrument_object(object),
            Value::Null => IndexMap::new(),
            other => {
                warn!(kind = ?other, "data is not an object; store starts empty");
                IndexMap::new()
            }
        };
        inner.root = inner.alloc("<root>", CellValue::Object(keys));
        debug!(cells = inner.cells.len(), "instrumented data");

        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Handle to the top-level object.
    pub fn root(&self) -> Handle {
        Handle::Object(self.inner.borrow().root)
    }

    /// Number of cells, root included.
    pub fn cell_count(&self) -> usize {
        self.inner.borrow().cells.len()
    }

    /// Merge a computed property into the top-level object.
    ///
    /// A data property of the same name is replaced.
    pub fn define_computed(&self, name: &str, computed: Computed) {
        let mut inner = self.inner.borrow_mut();
        let root = inner.root;
        if let Some(existing) = inner.child(root, name) {
            debug!(name, "computed property shadows data property");
            inner.cells[existing.0].value = CellValue::Computed(Rc::new(computed));
            return;
        }
        let id = inner.alloc(name, CellValue::Computed(Rc::new(computed)));
        if let CellValue::Object(keys) = &mut inner.cells[root.0].value {
            keys.insert(name.to_string(), id);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Read property `key` of `parent`. `None` when the property is missing.
    ///
    /// Reading a cell registers `tracker` with that cell's registry. Computed
    /// getters run with the same tracker, so they register the caller on
    /// whatever they read.
    pub fn get(&self, parent: &Handle, key: &str, tracker: Tracker<'_>) -> Result<Option<Handle>> {
        match parent {
            Handle::Object(id) => {
                let computed = {
                    let mut inner = self.inner.borrow_mut();
                    if !matches!(inner.cells[id.0].value, CellValue::Object(_)) {
                        drop(inner);
                        let leaf = Handle::Leaf {
                            cell: *id,
                            pointer: String::new(),
                        };
                        return self.get(&leaf, key, tracker);
                    }
                    let Some(child) = inner.child(*id, key) else {
                        return Ok(None);
                    };
                    let slot = &mut inner.cells[child.0];
                    if let Some(observer) = tracker {
                        if slot.deps.depend(observer) {
                            trace!(key = slot.key.as_str(), observer = ?observer.id(), "depend");
                        }
                    }
                    match &slot.value {
                        CellValue::Computed(computed) => Rc::clone(computed),
                        _ => return Ok(Some(inner.handle_for(child))),
                    }
                };
                let value = computed.get(&Scope::new(self, tracker))?;
                Ok(Some(Handle::Detached(value)))
            }
            Handle::Leaf { cell, pointer } => {
                let inner = self.inner.borrow();
                let CellValue::Leaf(value) = &inner.cells[cell.0].value else {
                    return Ok(None);
                };
                let nested = format!("{pointer}/{}", escape_pointer(key));
                Ok(value.pointer(&nested).map(|_| Handle::Leaf {
                    cell: *cell,
                    pointer: nested,
                }))
            }
            Handle::Detached(value) => Ok(child_of(value, key).cloned().map(Handle::Detached)),
        }
    }

    /// Write property `key` of `parent`.
    ///
    /// Notification runs synchronously: every observer registered on the
    /// property has been updated by the time this returns. The first observer
    /// failure aborts the pass and is returned.
    pub fn set(&self, parent: &Handle, key: &str, value: Value) -> Result<Assigned> {
        enum Step {
            Computed(Rc<Computed>, Value),
            Notify(Vec<Rc<Observer>>),
            Unchanged,
        }

        match parent {
            Handle::Object(id) => {
                let step = {
                    let mut inner = self.inner.borrow_mut();
                    if !matches!(inner.cells[id.0].value, CellValue::Object(_)) {
                        drop(inner);
                        let leaf = Handle::Leaf {
                            cell: *id,
                            pointer: String::new(),
                        };
                        return self.set(&leaf, key, value);
                    }
                    let Some(child) = inner.child(*id, key) else {
                        trace!(key, "create");
                        let child = inner.alloc(key, CellValue::Leaf(value));
                        if let CellValue::Object(keys) = &mut inner.cells[id.0].value {
                            keys.insert(key.to_string(), child);
                        }
                        return Ok(Assigned::Created);
                    };
                    let slot = &mut inner.cells[child.0];
                    match &slot.value {
                        CellValue::Computed(computed) => Step::Computed(Rc::clone(computed), value),
                        CellValue::Leaf(current) if is_scalar(&value) && strict_eq(current, &value) => {
                            Step::Unchanged
                        }
                        _ => {
                            trace!(key, "set");
                            slot.value = CellValue::Leaf(value);
                            Step::Notify(slot.deps.subscribers())
                        }
                    }
                };

                match step {
                    Step::Unchanged => Ok(Assigned::Unchanged),
                    Step::Computed(computed, value) => {
                        computed.set(&Scope::new(self, None), key, value)?;
                        Ok(Assigned::Changed)
                    }
                    Step::Notify(observers) => {
                        registry::notify(&observers, self)?;
                        Ok(Assigned::Changed)
                    }
                }
            }
            Handle::Leaf { cell, pointer } => {
                let mut inner = self.inner.borrow_mut();
                let CellValue::Leaf(root) = &mut inner.cells[cell.0].value else {
                    return Ok(Assigned::Missing);
                };
                let Some(target) = root.pointer_mut(pointer) else {
                    return Ok(Assigned::Missing);
                };
                let slot = match target {
                    Value::Object(object) => {
                        if !object.contains_key(key) {
                            object.insert(key.to_string(), value);
                            return Ok(Assigned::Silent);
                        }
                        object.get_mut(key)
                    }
                    Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
                    _ => None,
                };
                let Some(slot) = slot else {
                    return Ok(Assigned::Missing);
                };
                if is_scalar(&value) && strict_eq(slot, &value) {
                    return Ok(Assigned::Unchanged);
                }
                *slot = value;
                Ok(Assigned::Silent)
            }
            Handle::Detached(_) => Ok(Assigned::Rejected),
        }
    }

    /// The value at `handle`, read without tracking.
    pub fn value_of(&self, handle: &Handle) -> Value {
        let inner = self.inner.borrow();
        match handle {
            Handle::Object(id) => inner.snapshot(*id),
            Handle::Leaf { cell, pointer } => match &inner.cells[cell.0].value {
                CellValue::Leaf(value) => value.pointer(pointer).cloned().unwrap_or(Value::Null),
                _ => inner.snapshot(*cell),
            },
            Handle::Detached(value) => value.clone(),
        }
    }

    /// Untracked copy of the whole data object. Computed properties are left out.
    pub fn snapshot(&self) -> Value {
        let inner = self.inner.borrow();
        inner.snapshot(inner.root)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The cell backing the property at `path`, if every segment is a cell.
    pub fn cell_at(&self, path: &str) -> Option<CellId> {
        let inner = self.inner.borrow();
        path.split('.')
            .map(str::trim)
            .try_fold(inner.root, |cell, key| inner.child(cell, key))
    }

    /// Observers registered on the property at `path`, in notification order.
    ///
    /// Returns `None` when the path does not name an instrumented property.
    pub fn dependents(&self, path: &str) -> Option<Vec<ObserverId>> {
        let cell = self.cell_at(path)?;
        Some(self.inner.borrow().cells[cell.0].deps.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counting_observer(store: &ObservableStore, path: &str) -> (Rc<Observer>, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let observer = Observer::new(store, path, move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
        (observer, count)
    }

    #[test]
    fn test_instrument_layout() {
        let store = ObservableStore::instrument(json!({
            "user": { "name": "ada" },
            "tags": ["x"],
        }));

        // name, user, tags, root
        assert_eq!(store.cell_count(), 4);
        assert!(store.cell_at("user.name").is_some());
        assert!(store.cell_at("tags").is_some());
        // Arrays are leaves, their elements are not cells.
        assert!(store.cell_at("tags.0").is_none());
    }

    #[test]
    fn test_nested_cells_precede_parent() {
        let store = ObservableStore::instrument(json!({ "user": { "name": "ada" } }));
        let name = store.cell_at("user.name").unwrap();
        let user = store.cell_at("user").unwrap();
        assert!(name < user);
    }

    #[test]
    fn test_non_object_data_gives_empty_store() {
        let store = ObservableStore::instrument(json!([1, 2]));
        assert_eq!(store.snapshot(), json!({}));
        assert_eq!(store.cell_count(), 1);
    }

    #[test]
    fn test_get_registers_tracker_on_each_cell_read() {
        let store = ObservableStore::instrument(json!({
            "a": { "b": { "c": 1 } },
            "other": 2,
        }));
        let (observer, _) = counting_observer(&store, "a.b.c");
        let id = observer.id();

        assert_eq!(store.dependents("a"), Some(vec![id]));
        assert_eq!(store.dependents("a.b"), Some(vec![id]));
        assert_eq!(store.dependents("a.b.c"), Some(vec![id]));
        assert_eq!(store.dependents("other"), Some(vec![]));
    }

    #[test]
    fn test_untracked_get_does_not_register() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let handle = store.get(&store.root(), "a", None).unwrap();
        assert!(handle.is_some());
        assert_eq!(store.dependents("a"), Some(vec![]));
    }

    #[test]
    fn test_set_same_scalar_is_noop() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let (_observer, count) = counting_observer(&store, "a");

        let outcome = store.set(&store.root(), "a", json!(1)).unwrap();
        assert_eq!(outcome, Assigned::Unchanged);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_set_numerically_equal_is_noop() {
        let store = ObservableStore::instrument(json!({ "n": 5, "f": 2.5 }));
        let (_n, n_count) = counting_observer(&store, "n");
        let (_f, f_count) = counting_observer(&store, "f");

        assert_eq!(store.set(&store.root(), "n", json!(5.0)).unwrap(), Assigned::Unchanged);
        assert_eq!(store.set(&store.root(), "f", json!(2.5)).unwrap(), Assigned::Unchanged);
        assert_eq!(n_count.get(), 0);
        assert_eq!(f_count.get(), 0);

        assert_eq!(store.set(&store.root(), "n", json!(5.5)).unwrap(), Assigned::Changed);
        assert_eq!(n_count.get(), 1);
    }

    #[test]
    fn test_set_notifies_in_registration_order() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut observers = Vec::new();
        for label in ["first", "second"] {
            let order = order.clone();
            observers.push(
                Observer::new(&store, "a", move |_, _| {
                    order.borrow_mut().push(label);
                    Ok(())
                })
                .unwrap(),
            );
        }

        assert_eq!(store.set(&store.root(), "a", json!(2)).unwrap(), Assigned::Changed);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_set_object_is_always_a_change() {
        let store = ObservableStore::instrument(json!({ "a": { "x": 1 } }));
        let (_observer, count) = counting_observer(&store, "a.x");

        let outcome = store.set(&store.root(), "a", json!({ "x": 2 })).unwrap();
        assert_eq!(outcome, Assigned::Changed);
        // The a.x observer is registered on `a`, so it re-reads and fires.
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_assigned_object_is_not_instrumented() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        store.set(&store.root(), "a", json!({ "x": 1 })).unwrap();

        assert!(store.cell_at("a.x").is_none());

        let (_observer, count) = counting_observer(&store, "a.x");
        let a = store.get(&store.root(), "a", None).unwrap().unwrap();
        assert_eq!(store.set(&a, "x", json!(5)).unwrap(), Assigned::Silent);
        assert_eq!(count.get(), 0);

        let x = store.get(&a, "x", None).unwrap().unwrap();
        assert_eq!(store.value_of(&x), json!(5));
    }

    #[test]
    fn test_missing_property_created_on_write() {
        let store = ObservableStore::instrument(json!({ "a": 1 }));
        assert!(store.get(&store.root(), "nope", None).unwrap().is_none());
        assert_eq!(
            store.set(&store.root(), "nope", json!(1)).unwrap(),
            Assigned::Created
        );
        assert_eq!(store.snapshot(), json!({ "a": 1, "nope": 1 }));

        // The new property is a cell like any other from now on.
        let (_observer, count) = counting_observer(&store, "nope");
        store.set(&store.root(), "nope", json!(2)).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_leaf_index_out_of_range_is_missing() {
        let store = ObservableStore::instrument(json!({ "items": [1] }));
        let items = store.get(&store.root(), "items", None).unwrap().unwrap();
        assert_eq!(store.set(&items, "3", json!(0)).unwrap(), Assigned::Missing);
    }

    #[test]
    fn test_leaf_array_index_read() {
        let store = ObservableStore::instrument(json!({ "items": ["a", "b"] }));
        let items = store.get(&store.root(), "items", None).unwrap().unwrap();
        let second = store.get(&items, "1", None).unwrap().unwrap();
        assert_eq!(store.value_of(&second), json!("b"));
        assert!(store.get(&items, "7", None).unwrap().is_none());
    }

    #[test]
    fn test_pointer_escaping() {
        let store = ObservableStore::instrument(json!({ "raw": { "a/b": { "~": 1 } } }));
        store.set(&store.root(), "raw", json!({ "a/b": { "~": 2 } })).unwrap();

        let raw = store.get(&store.root(), "raw", None).unwrap().unwrap();
        let ab = store.get(&raw, "a/b", None).unwrap().unwrap();
        let tilde = store.get(&ab, "~", None).unwrap().unwrap();
        assert_eq!(store.value_of(&tilde), json!(2));
    }

    #[test]
    fn test_snapshot_round_trips_data() {
        let data = json!({ "a": { "b": [1, 2] }, "c": "x" });
        let store = ObservableStore::instrument(data.clone());
        assert_eq!(store.snapshot(), data);
    }
}
