//! Markup parsing and serialisation for the in-memory tree.
//!
//! Tolerant by construction: unknown closing tags are dropped, unclosed
//! elements close at the end of input, and a `<` that does not start a tag is
//! text. Supports elements, double/single/un-quoted and bare attributes, void
//! and self-closing elements, comments and the five common entities.

use super::{NodeId, NodeKind, Tree};

const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

pub(super) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_tag_start(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 2
        && bytes[0] == b'<'
        && (bytes[1].is_ascii_alphabetic() || bytes[1] == b'/' || bytes[1] == b'!')
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Consume through the next `pattern` (or to the end). Returns what preceded it.
    fn take_through(&mut self, pattern: &str) -> &'a str {
        let rest = self.rest();
        match rest.find(pattern) {
            Some(i) => {
                self.pos += i + pattern.len();
                &rest[..i]
            }
            None => {
                self.pos = self.src.len();
                rest
            }
        }
    }

    fn attribute_value(&mut self) -> &'a str {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut buf = [0u8; 4];
                self.take_through(quote.encode_utf8(&mut buf))
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        }
    }

    /// Parse `<tag attr=...>` starting at `<`. Returns tag, attributes, self-closing.
    fn open_tag(&mut self) -> (String, Vec<(String, String)>, bool) {
        self.pos += 1;
        let tag = self
            .take_while(|c| !c.is_whitespace() && c != '>' && c != '/')
            .to_ascii_lowercase();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return (tag, attributes, false);
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return (tag, attributes, true);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return (tag, attributes, false);
            }

            let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
            if name.is_empty() {
                // Stray '=' or '/'.
                self.pos += 1;
                continue;
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                decode_entities(self.attribute_value())
            } else {
                String::new()
            };
            attributes.push((name.to_string(), value));
        }
    }
}

/// Parse `markup` and append the resulting nodes to `parent`.
pub(super) fn parse_into(tree: &mut Tree, parent: NodeId, markup: &str) {
    let mut parser = Parser { src: markup, pos: 0 };
    let mut stack = vec![parent];

    while parser.pos < markup.len() {
        let top = stack.last().copied().unwrap_or(parent);
        let rest = parser.rest();

        if rest.starts_with("<!--") {
            parser.pos += 4;
            let body = parser.take_through("-->");
            let id = tree.alloc(NodeKind::Comment, "", body);
            tree.append(top, id);
        } else if rest.starts_with("<!") {
            // Doctype and friends carry nothing we render.
            parser.take_through(">");
        } else if rest.starts_with("</") {
            parser.pos += 2;
            let name = parser.take_through(">").trim().to_ascii_lowercase();
            if let Some(depth) = stack
                .iter()
                .skip(1)
                .rposition(|id| tree.nodes[id.0].tag == name)
            {
                stack.truncate(depth + 1);
            }
        } else if is_tag_start(rest) {
            let (tag, attributes, self_closing) = parser.open_tag();
            let id = tree.alloc(NodeKind::Element, &tag, "");
            for (name, value) in attributes {
                tree.set_attribute(id, &name, &value);
            }
            tree.append(top, id);
            if !self_closing && !is_void(&tag) {
                stack.push(id);
            }
        } else {
            let end = rest
                .match_indices('<')
                .map(|(i, _)| i)
                .find(|&i| i > 0 && is_tag_start(&rest[i..]))
                .unwrap_or(rest.len());
            parser.pos += end;
            let id = tree.alloc(NodeKind::Text, "", &decode_entities(&rest[..end]));
            tree.append(top, id);
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

pub(super) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub(super) fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(super) fn escape_attribute(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, NodeKind};

    #[test]
    fn test_parse_nested_elements() {
        let doc = Document::parse(r#"<div id="app"><p class="a b">hi <b>there</b></p></div>"#);
        let app = doc.query_selector("#app").unwrap();
        assert_eq!(app.tag_name(), "div");
        let p = app.first_child().unwrap();
        assert_eq!(p.attribute("class").as_deref(), Some("a b"));
        assert_eq!(p.children().len(), 2);
        assert_eq!(p.text_content(), "hi there");
    }

    #[test]
    fn test_attribute_forms() {
        let doc = Document::parse(r#"<input v-model="name" type=text disabled data-x='y'>"#);
        let input = doc.query_selector("input").unwrap();
        assert_eq!(
            input.attributes(),
            vec![
                ("v-model".to_string(), "name".to_string()),
                ("type".to_string(), "text".to_string()),
                ("disabled".to_string(), String::new()),
                ("data-x".to_string(), "y".to_string()),
            ]
        );
        // Void element: no children, closes immediately.
        assert!(input.children().is_empty());
    }

    #[test]
    fn test_event_directive_attribute_name() {
        let doc = Document::parse(r#"<button v-on:click="save">Save</button>"#);
        let button = doc.query_selector("button").unwrap();
        assert_eq!(button.attribute("v-on:click").as_deref(), Some("save"));
    }

    #[test]
    fn test_self_closing_and_comments() {
        let doc = Document::parse("<div><span/><!-- note -->tail</div>");
        let div = doc.query_selector("div").unwrap();
        let kinds: Vec<_> = div.children().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::Element, NodeKind::Comment, NodeKind::Text]);
    }

    #[test]
    fn test_tolerates_stray_markup() {
        let doc = Document::parse("<p>1 < 2 </i> ok<p>unclosed");
        assert_eq!(doc.root().text_content(), "1 < 2  okunclosed");
    }

    #[test]
    fn test_entities_round_trip() {
        let doc = Document::parse(r#"<p title="a &quot;q&quot;">&lt;b&gt; &amp; co</p>"#);
        let p = doc.query_selector("p").unwrap();
        assert_eq!(p.text_content(), "<b> & co");
        assert_eq!(p.attribute("title").as_deref(), Some("a \"q\""));
        assert_eq!(
            p.outer_html(),
            r#"<p title="a &quot;q&quot;">&lt;b&gt; &amp; co</p>"#
        );
    }

    #[test]
    fn test_serialise_round_trip() {
        let markup = r#"<div id="app"><input v-model="msg"><p v-text="msg"></p>{{ msg }}</div>"#;
        let doc = Document::parse(markup);
        assert_eq!(doc.root().inner_html(), markup);
    }
}
