//! `{{ path }}` interpolation in text nodes.
//!
//! One pattern serves detection, extraction and rendering, so a text node is
//! bound exactly when rendering would substitute something. Unterminated or
//! empty braces never match and stay in the output as written.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::types::display_value;

/// `{{ path }}`, non-greedy, path trimmed, no braces inside.
static INTERPOLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([^{}\s][^{}]*?)\s*\}\}").expect("interpolation pattern is valid")
});

pub fn has_interpolation(text: &str) -> bool {
    INTERPOLATION.is_match(text)
}

/// Paths of every `{{ }}` segment, in order of appearance. Repeats are kept.
pub fn paths(text: &str) -> Vec<&str> {
    INTERPOLATION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Substitute every segment with `lookup(path)` rendered for display.
///
/// The first failed lookup aborts the render.
pub fn render(template: &str, mut lookup: impl FnMut(&str) -> Result<Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in INTERPOLATION.captures_iter(template) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&display_value(&lookup(path.as_str())?));
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}
