//! Reactivity engine - observable data, dependency registries, observers.
//!
//! - [`ObservableStore`]: the data object instrumented into reactive cells
//! - [`DependencyRegistry`]: per-property list of interested observers
//! - [`Observer`]: a path plus an effect, re-evaluated on notification
//! - [`Computed`]: derived properties merged into the store
//!
//! # Flow
//!
//! ```text
//! Observer::new ──resolve(path, tracker = self)──▶ store.get ──▶ registry.depend
//! store.set ──changed?──▶ registry snapshot ──▶ observer.update ──▶ effect(new, old)
//! ```
//!
//! # Tracking
//!
//! There is no ambient "current observer". Every read takes an explicit
//! [`Tracker`]; only an observer's first evaluation passes one. Updates,
//! initial renders and write-backs read untracked, so dependencies are never
//! attributed to the wrong observer.
//!
//! # Invariants
//!
//! 1. An observer sits in a registry at most once.
//! 2. Observers are notified in registration order.
//! 3. Writing a scalar equal to the current value notifies nobody.
//! 4. Notification finishes before the write that caused it returns.

mod computed;
mod observer;
mod registry;
mod store;

pub use computed::{Computed, Getter, Scope, Setter};
pub use observer::{Effect, Observer};
pub use registry::DependencyRegistry;
pub use store::{Assigned, Handle, ObservableStore, Tracker};
