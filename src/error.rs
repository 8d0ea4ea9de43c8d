//! Error types for binding, resolution and event dispatch.
//!
//! Failures abort the current synchronous call chain and surface to whoever
//! started it: the `Instance::new` caller for compile-time resolution, the
//! writer for notification passes, the dispatcher for event listeners.

use thiserror::Error;

/// Everything that can go wrong while binding data to a tree.
#[derive(Error, Debug)]
pub enum BindError {
    /// A dotted path walked into a missing property or a non-object value.
    #[error("cannot resolve '{segment}' in path '{path}'")]
    UnresolvedPath { path: String, segment: String },

    /// A binding expression with no segments.
    #[error("empty binding path")]
    EmptyPath,

    /// `v-on` referenced a method the instance does not define.
    #[error("unknown method '{name}'")]
    UnknownMethod { name: String },

    /// The target of a write was produced by a computed getter.
    #[error("path '{path}' is not assignable")]
    NotAssignable { path: String },

    /// A user method reported its own failure.
    #[error("method '{method}' failed: {message}")]
    Handler { method: String, message: String },

    #[error("data serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BindError {
    pub(crate) fn unresolved(path: &str, segment: &str) -> Self {
        Self::UnresolvedPath {
            path: path.to_string(),
            segment: segment.to_string(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BindError>;
