//! Binding Handlers - one per directive kind, plus text interpolation.
//!
//! Every handler wires observers owned by the instance to side effects on a
//! node. Effects and listeners hold the instance weakly; the instance owns
//! the observers and the document owns the listeners, so nothing here forms
//! an `Rc` cycle.

use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use super::directive::Directive;
use super::interpolation;
use crate::dom::NodeRef;
use crate::error::Result;
use crate::instance::Instance;
use crate::types::display_value;

/// Wire `directive` on `node`.
pub(crate) fn bind(instance: &Instance, node: &NodeRef, directive: &Directive) -> Result<()> {
    trace!(node = ?node.id(), ?directive, "bind");
    match directive {
        Directive::Model(path) => model(instance, node, path),
        Directive::Html(path) => html(instance, node, path),
        Directive::Text(path) => text(instance, node, path),
        Directive::On { event, method } => {
            on(instance, node, event, method);
            Ok(())
        }
    }
}

// =============================================================================
// Directives
// =============================================================================

/// `v-model`: data -> form value, and `input` events -> data.
fn model(instance: &Instance, node: &NodeRef, path: &str) -> Result<()> {
    let target = node.clone();
    let observer = instance.observe(path, move |new, _| {
        target.set_value(&property_text(new));
        Ok(())
    })?;
    node.set_value(&property_text(&observer.value()));

    let weak = instance.downgrade();
    let path = path.to_string();
    node.add_event_listener("input", move |event| {
        let Some(instance) = weak.upgrade() else {
            return Ok(());
        };
        instance.set(&path, Value::String(event.target().value()))
    });
    Ok(())
}

/// `v-html`: children re-parsed from the value as markup.
fn html(instance: &Instance, node: &NodeRef, path: &str) -> Result<()> {
    let target = node.clone();
    let observer = instance.observe(path, move |new, _| {
        target.set_inner_html(&property_text(new));
        Ok(())
    })?;
    node.set_inner_html(&property_text(&observer.value()));
    Ok(())
}

/// `v-text`: children replaced by the value as plain text.
fn text(instance: &Instance, node: &NodeRef, path: &str) -> Result<()> {
    let target = node.clone();
    let observer = instance.observe(path, move |new, _| {
        target.set_text_content(&property_text(new));
        Ok(())
    })?;
    node.set_text_content(&property_text(&observer.value()));
    Ok(())
}

/// Text written into a node property. Null and undefined clear it.
fn property_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => display_value(other),
    }
}

/// `v-on:<event>`: look the method up when the event fires, not before.
fn on(instance: &Instance, node: &NodeRef, event: &str, method: &str) {
    let weak = instance.downgrade();
    let method = method.to_string();
    node.add_event_listener(event, move |event| {
        let Some(instance) = weak.upgrade() else {
            return Ok(());
        };
        instance.call(&method, event)
    });
}

// =============================================================================
// Interpolation
// =============================================================================

/// Bind a text node holding one or more `{{ path }}` segments.
///
/// Each segment gets its own observer. Whichever fires re-renders the whole
/// template from the current values of every segment.
pub(crate) fn interpolate(instance: &Instance, node: &NodeRef, template: &str) -> Result<()> {
    let template: Rc<str> = Rc::from(template);

    for path in interpolation::paths(&template) {
        let target = node.clone();
        let weak = instance.downgrade();
        let template = Rc::clone(&template);
        instance.observe(path, move |_, _| {
            let Some(instance) = weak.upgrade() else {
                return Ok(());
            };
            let rendered = interpolation::render(&template, |path| instance.get(path))?;
            target.set_text_content(&rendered);
            Ok(())
        })?;
    }

    let rendered = interpolation::render(&template, |path| instance.get(path))?;
    node.set_text_content(&rendered);
    Ok(())
}
