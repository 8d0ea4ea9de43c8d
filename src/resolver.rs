//! Expression Resolver - dotted paths over the observable store.
//!
//! `resolve` folds the path left to right, reading one property per segment
//! through the store's accessors. `assign` folds all but the last segment the
//! same way and writes the last one. Registration and notification are side
//! effects of those accessors, never of the resolver itself.
//!
//! Only traversal *through* something missing is a fault: a missing final
//! property reads as `null`, and writing it creates the property. Reading a
//! property of `null` is a fault as well.
//!
//! Segments are trimmed, so `{{ user . name }}` and `user.name` are the same
//! path. Numeric segments index into (non-reactive) arrays: `items.0`.

use serde_json::Value;

use crate::error::{BindError, Result};
use crate::reactive::{Assigned, Handle, ObservableStore, Tracker};

/// Split a path into trimmed segments. Fails on an empty path.
pub fn segments(path: &str) -> Result<Vec<&str>> {
    if path.trim().is_empty() {
        return Err(BindError::EmptyPath);
    }
    Ok(path.split('.').map(str::trim).collect())
}

fn walk(store: &ObservableStore, path: &str, keys: &[&str], tracker: Tracker<'_>) -> Result<Handle> {
    keys.iter().try_fold(store.root(), |handle, key| {
        store
            .get(&handle, key, tracker)?
            .ok_or_else(|| BindError::unresolved(path, key))
    })
}

fn is_null(store: &ObservableStore, handle: &Handle) -> bool {
    match handle {
        Handle::Object(_) => false,
        other => store.value_of(other).is_null(),
    }
}

/// Read the value at `path`, registering `tracker` on every property read.
///
/// A missing last property resolves to `null`.
pub fn resolve(store: &ObservableStore, path: &str, tracker: Tracker<'_>) -> Result<Value> {
    let keys = segments(path)?;
    let Some((last, parents)) = keys.split_last() else {
        return Err(BindError::EmptyPath);
    };
    let parent = walk(store, path, parents, tracker)?;
    match store.get(&parent, last, tracker)? {
        Some(handle) => Ok(store.value_of(&handle)),
        None if is_null(store, &parent) => Err(BindError::unresolved(path, last)),
        None => Ok(Value::Null),
    }
}

/// Write `value` at `path`. Intermediate reads are untracked.
///
/// A missing last property is created; see [`ObservableStore::set`].
pub fn assign(store: &ObservableStore, path: &str, value: Value) -> Result<()> {
    let keys = segments(path)?;
    let Some((last, parents)) = keys.split_last() else {
        return Err(BindError::EmptyPath);
    };
    let parent = walk(store, path, parents, None)?;
    match store.set(&parent, last, value)? {
        Assigned::Missing => Err(BindError::unresolved(path, last)),
        Assigned::Rejected => Err(BindError::NotAssignable {
            path: path.to_string(),
        }),
        Assigned::Changed | Assigned::Created | Assigned::Unchanged | Assigned::Silent => Ok(()),
    }
}
