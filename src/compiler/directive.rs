//! Directive grammar.
//!
//! `v-<kind>="path"` for value, markup and text bindings and
//! `v-on:<event>="method"` for listeners. Attributes without the `v-` prefix
//! are not directives; `v-` attributes of an unknown kind are skipped.

use tracing::debug;

const PREFIX: &str = "v-";

/// A recognised template directive with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `v-model`: two-way binding of the element's form value.
    Model(String),
    /// `v-html`: element children re-parsed from markup.
    Html(String),
    /// `v-text`: element text content.
    Text(String),
    /// `v-on:<event>`: call `method` when `event` fires.
    On { event: String, method: String },
}

impl Directive {
    /// Parse one attribute. `None` for plain attributes and unknown kinds.
    pub fn parse(name: &str, value: &str) -> Option<Self> {
        let rest = name.strip_prefix(PREFIX)?;
        let (kind, argument) = match rest.split_once(':') {
            Some((kind, argument)) => (kind, Some(argument.trim())),
            None => (rest, None),
        };
        let value = value.trim().to_string();

        let directive = match (kind, argument) {
            ("model", _) => Self::Model(value),
            ("html", _) => Self::Html(value),
            ("text", _) => Self::Text(value),
            ("on", Some(event)) if !event.is_empty() => Self::On {
                event: event.to_string(),
                method: value,
            },
            ("on", _) => {
                debug!(attribute = name, "v-on without an event type; skipped");
                return None;
            }
            _ => {
                debug!(attribute = name, "unknown directive; skipped");
                return None;
            }
        };
        Some(directive)
    }
}
