//! Compiler - turns a mounted template into live bindings in one pass.
//!
//! # Pass
//!
//! ```text
//! mount target            fragment (off-tree)          mount target
//! ┌───────────┐  detach   ┌───────────┐  walk + bind  ┌───────────┐
//! │ children  │ ────────> │ children  │ ────────────> │ bound     │
//! └───────────┘           └───────────┘   reattach    └───────────┘
//! ```
//!
//! 1. **Detach**: move every child of the mount target, in order, into a
//!    document fragment.
//! 2. **Walk**: pre-order, depth-first. Elements get their directive
//!    attributes bound and are then descended into. Text nodes containing
//!    `{{ }}` get the interpolation handler. Each level's children are
//!    snapshotted before the level is walked, so a handler that rewrites
//!    a node's content never makes the walk skip a sibling.
//! 3. **Reattach**: append the fragment back onto the mount target.
//!
//! The fragment goes back even when binding fails part-way; the error is
//! returned afterwards.

mod directive;
mod handlers;
mod interpolation;

pub use directive::Directive;
pub use interpolation::{has_interpolation, paths, render};

use tracing::{debug, trace};

use crate::dom::{NodeKind, NodeRef};
use crate::error::Result;
use crate::instance::Instance;

/// Compile the instance's mount target. Without one this does nothing.
pub fn compile(instance: &Instance) -> Result<()> {
    let Some(el) = instance.el() else {
        debug!("no mount target; nothing to compile");
        return Ok(());
    };

    let fragment = detach(el);
    debug!(el = ?el.id(), nodes = fragment.children().len(), "compiling");
    let result = walk(instance, &fragment);
    el.append_child(&fragment);

    match &result {
        Ok(()) => debug!(el = ?el.id(), "compiled"),
        Err(err) => debug!(el = ?el.id(), %err, "compile aborted"),
    }
    result
}

fn detach(el: &NodeRef) -> NodeRef {
    let fragment = el.document().create_document_fragment();
    while let Some(child) = el.first_child() {
        fragment.append_child(&child);
    }
    fragment
}

fn walk(instance: &Instance, parent: &NodeRef) -> Result<()> {
    for node in parent.children() {
        match node.kind() {
            NodeKind::Element => {
                bind_element(instance, &node)?;
                walk(instance, &node)?;
            }
            NodeKind::Text => {
                let text = node.text_content();
                if interpolation::has_interpolation(&text) {
                    handlers::interpolate(instance, &node, &text)?;
                }
            }
            NodeKind::Comment | NodeKind::Fragment => {}
        }
    }
    Ok(())
}

fn bind_element(instance: &Instance, node: &NodeRef) -> Result<()> {
    for (name, value) in node.attributes() {
        if let Some(directive) = Directive::parse(&name, &value) {
            handlers::bind(instance, node, &directive)?;
        } else {
            trace!(attribute = name.as_str(), "not a directive");
        }
    }
    Ok(())
}
