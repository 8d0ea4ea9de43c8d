//! # spark-bind
//!
//! Minimal reactive view binding for Rust.
//!
//! Give it a plain data object and a template tree. Every property of the data
//! becomes observable, `v-*` directives and `{{ }}` interpolations become live
//! bindings, and a write to the data updates exactly the nodes that read it,
//! synchronously, without a render pass.
//!
//! ## Architecture
//!
//! ```text
//! Options ─> Instance ─> ObservableStore (cell arena, one registry per cell)
//!               │               ▲  reads register, writes notify
//!               │               │
//!               └─> compile ─> Observer ─> effect on a dom node
//! ```
//!
//! Dependency capture is explicit: the observer evaluating a path is passed
//! down through every read as a [`Tracker`]. Nothing global is involved.
//!
//! ## Modules
//!
//! - [`types`] - Arena ids and value display
//! - [`reactive`] - Store, registries, observers, computed properties
//! - [`resolver`] - Dotted-path reads and writes
//! - [`dom`] - In-memory host tree the bindings write into
//! - [`compiler`] - Template walk, directives, interpolation, handlers
//! - [`instance`] - The façade and its options

pub mod compiler;
pub mod dom;
pub mod error;
pub mod instance;
pub mod reactive;
pub mod resolver;
pub mod types;

pub use types::*;

pub use error::{BindError, Result};

pub use reactive::{
    Assigned, Computed, DependencyRegistry, Effect, Handle, ObservableStore, Observer, Scope,
    Tracker,
};

pub use resolver::{assign, resolve};

pub use dom::{Document, Event, Listener, Mutation, NodeKind, NodeRef};

pub use compiler::{compile, Directive};

pub use instance::{El, Instance, Method, Options, WeakInstance};
