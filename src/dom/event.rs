//! Events dispatched to nodes and the listeners that receive them.

use std::fmt;
use std::rc::Rc;

use super::NodeRef;
use crate::error::Result;

/// Event listener. An error aborts the dispatch and reaches the dispatcher.
pub type Listener = Rc<dyn Fn(&Event) -> Result<()>>;

/// An event delivered to the listeners of one node.
///
/// Events do not bubble: only listeners on the target run.
#[derive(Clone)]
pub struct Event {
    event_type: String,
    target: NodeRef,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: &NodeRef) -> Self {
        Self {
            event_type: event_type.into(),
            target: target.clone(),
        }
    }

    /// e.g. `"input"`, `"click"`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> &NodeRef {
        &self.target
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("target", &self.target.id())
            .finish()
    }
}
