//! Host Tree - an in-memory document the compiler binds into.
//!
//! Nodes are not objects. They are indices into one arena owned by the
//! [`Document`], and [`NodeRef`] is a cheap `(document, index)` handle:
//!
//! ```text
//! Index 0: Fragment  #document           children=[1]
//! Index 1: Element   <div id="app">      children=[2, 3]
//! Index 2: Element   <input v-model=..>  value="ada"
//! Index 3: Text      "Hello {{ name }}"
//! ```
//!
//! The tree offers what the binding layer needs and nothing more: traversal,
//! moving children, attributes, form values, text and markup content,
//! listeners with synchronous dispatch, simple selectors, and per-node
//! [`Mutation`] flags recording which rendered state a write changed.
//!
//! Subtrees dropped by `set_text_content` or `set_inner_html` go on a free
//! list. Their slots are handed out again by later allocations once no
//! [`NodeRef`] points into them, so re-rendering keeps the arena bounded.

mod event;
mod mutation;
mod parse;

pub use event::{Event, Listener};
pub use mutation::Mutation;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::types::NodeId;

// =============================================================================
// Arena
// =============================================================================

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    /// Off-tree container; appending it moves its children instead.
    Fragment,
}

struct NodeData {
    kind: NodeKind,
    /// Lowercase tag name for elements, empty otherwise.
    tag: String,
    attributes: Vec<(String, String)>,
    /// Character data of text and comment nodes.
    data: String,
    /// Current form value of an element.
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, Listener)>,
    mutations: Mutation,
    /// Set while the node is a dropped subtree root waiting on the free list.
    released: bool,
    /// Cloned into every [`NodeRef`]; a count of one means nobody holds the node.
    anchor: Rc<()>,
}

impl NodeData {
    fn new(kind: NodeKind, tag: &str, data: &str, anchor: Rc<()>) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            data: data.to_string(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
            mutations: Mutation::NONE,
            released: false,
            anchor,
        }
    }
}

struct Tree {
    nodes: Vec<NodeData>,
    free: Vec<NodeId>,
}

impl Tree {
    fn alloc(&mut self, kind: NodeKind, tag: &str, data: &str) -> NodeId {
        if let Some(id) = self.reclaim() {
            let node = self.node_mut(id);
            let anchor = Rc::clone(&node.anchor);
            *node = NodeData::new(kind, tag, data, anchor);
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind, tag, data, Rc::new(())));
        id
    }

    /// Take a released slot nobody references. Its children become
    /// released roots in turn.
    fn reclaim(&mut self) -> Option<NodeId> {
        let nodes = &self.nodes;
        self.free.retain(|&id| nodes[id.0].released);
        let position = self.free.iter().position(|&id| {
            let node = &self.nodes[id.0];
            node.parent.is_none() && Rc::strong_count(&node.anchor) == 1
        })?;
        let id = self.free.swap_remove(position);
        for child in std::mem::take(&mut self.node_mut(id).children) {
            self.release(child);
        }
        trace!(?id, "reusing node slot");
        Some(id)
    }

    fn release(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.parent = None;
        if !node.released {
            node.released = true;
            self.free.push(id);
        }
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.node(node).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).parent;
        }
        false
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            let node = self.node_mut(parent);
            node.children.retain(|&c| c != child);
            node.mutations |= Mutation::CHILDREN;
        }
    }

    /// Append `child` to `parent`, moving it out of its current parent.
    /// Appending a fragment moves the fragment's children instead.
    fn append(&mut self, parent: NodeId, child: NodeId) {
        if child == parent || self.is_ancestor(child, parent) {
            debug!(?parent, ?child, "refusing to append a node into its own subtree");
            return;
        }
        if self.node(child).kind == NodeKind::Fragment {
            let moved = std::mem::take(&mut self.node_mut(child).children);
            if !moved.is_empty() {
                self.node_mut(child).mutations |= Mutation::CHILDREN;
            }
            for grandchild in moved {
                self.node_mut(grandchild).parent = None;
                self.append(parent, grandchild);
            }
            return;
        }
        self.detach(child);
        let node = self.node_mut(child);
        node.parent = Some(parent);
        node.released = false;
        let node = self.node_mut(parent);
        node.children.push(child);
        node.mutations |= Mutation::CHILDREN;
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        if children.is_empty() {
            return;
        }
        for child in children {
            self.release(child);
        }
        self.node_mut(id).mutations |= Mutation::CHILDREN;
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let node = self.node_mut(id);
        match node.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) if existing == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => node.attributes.push((name.to_string(), value.to_string())),
        }
        if name == "value" {
            node.value = value.to_string();
        }
        node.mutations |= Mutation::ATTRIBUTES;
    }

    fn text_content(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text | NodeKind::Comment => node.data.clone(),
            NodeKind::Element | NodeKind::Fragment => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in &self.node(id).children {
            let node = self.node(child);
            match node.kind {
                NodeKind::Text => out.push_str(&node.data),
                NodeKind::Comment => {}
                NodeKind::Element | NodeKind::Fragment => self.collect_text(child, out),
            }
        }
    }

    // =========================================================================
    // Serialisation
    // =========================================================================

    fn serialize(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text => out.push_str(&parse::escape_text(&node.data)),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&node.data);
                out.push_str("-->");
            }
            NodeKind::Fragment => self.serialize_children(id, out),
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.tag);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&parse::escape_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if parse::is_void(&node.tag) {
                    return;
                }
                self.serialize_children(id, out);
                out.push_str("</");
                out.push_str(&node.tag);
                out.push('>');
            }
        }
    }

    fn serialize_children(&self, id: NodeId, out: &mut String) {
        for &child in &self.node(id).children {
            self.serialize(child, out);
        }
    }

    fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_children(id, &mut out);
        out
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        let node = self.node(id);
        if node.kind != NodeKind::Element {
            return false;
        }
        let attribute = |name: &str| {
            node.attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        match selector {
            Selector::Id(id) => attribute("id") == Some(id.as_str()),
            Selector::Class(class) => attribute("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            Selector::Tag(tag) => node.tag == *tag,
        }
    }

    /// First matching descendant of `from`, in document order.
    fn query(&self, from: NodeId, selector: &Selector) -> Option<NodeId> {
        for &child in &self.node(from).children {
            if self.matches(child, selector) {
                return Some(child);
            }
            if let Some(found) = self.query(child, selector) {
                return Some(found);
            }
        }
        None
    }
}

enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        let valid = |name: &str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if let Some(id) = selector.strip_prefix('#') {
            return valid(id).then(|| Self::Id(id.to_string()));
        }
        if let Some(class) = selector.strip_prefix('.') {
            return valid(class).then(|| Self::Class(class.to_string()));
        }
        valid(selector).then(|| Self::Tag(selector.to_ascii_lowercase()))
    }
}

// =============================================================================
// Document
// =============================================================================

/// Shared handle to a node arena. Cloning creates a new handle to the same tree.
#[derive(Clone)]
pub struct Document {
    tree: Rc<RefCell<Tree>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document. Index 0 is the root fragment.
    pub fn new() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            free: Vec::new(),
        };
        tree.alloc(NodeKind::Fragment, "", "");
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    /// A document whose root holds the parsed `markup`.
    pub fn parse(markup: &str) -> Self {
        let doc = Self::new();
        parse::parse_into(&mut doc.tree.borrow_mut(), NodeId(0), markup);
        doc.clear_mutations();
        doc
    }

    pub fn root(&self) -> NodeRef {
        self.node(NodeId(0))
    }

    /// Handle for an existing node id.
    pub fn node(&self, id: NodeId) -> NodeRef {
        let anchor = Rc::clone(&self.tree.borrow().node(id).anchor);
        NodeRef {
            doc: self.clone(),
            id,
            _anchor: anchor,
        }
    }

    /// Allocated slots, live or awaiting reuse.
    pub fn len(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_element(&self, tag: &str) -> NodeRef {
        let id = self.tree.borrow_mut().alloc(NodeKind::Element, tag, "");
        self.node(id)
    }

    pub fn create_text_node(&self, text: &str) -> NodeRef {
        let id = self.tree.borrow_mut().alloc(NodeKind::Text, "", text);
        self.node(id)
    }

    pub fn create_document_fragment(&self) -> NodeRef {
        let id = self.tree.borrow_mut().alloc(NodeKind::Fragment, "", "");
        self.node(id)
    }

    /// First element under the root matching `#id`, `.class` or `tag`.
    pub fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        let selector = Selector::parse(selector)?;
        let found = self.tree.borrow().query(NodeId(0), &selector)?;
        Some(self.node(found))
    }

    /// Reset the mutation flags of every node.
    pub fn clear_mutations(&self) {
        for node in &mut self.tree.borrow_mut().nodes {
            node.mutations = Mutation::NONE;
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document").field("nodes", &self.len()).finish()
    }
}

// =============================================================================
// Node Handle
// =============================================================================

/// Handle to one node of a [`Document`].
#[derive(Clone)]
pub struct NodeRef {
    doc: Document,
    id: NodeId,
    _anchor: Rc<()>,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.doc.tree, &other.doc.tree)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.doc.tree.borrow();
        let node = tree.node(self.id);
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &node.kind)
            .field("tag", &node.tag)
            .finish()
    }
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn with<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        f(self.doc.tree.borrow().node(self.id))
    }

    fn wrap(&self, id: NodeId) -> NodeRef {
        self.doc.node(id)
    }

    pub fn kind(&self) -> NodeKind {
        self.with(|n| n.kind)
    }

    pub fn tag_name(&self) -> String {
        self.with(|n| n.tag.clone())
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn parent(&self) -> Option<NodeRef> {
        self.with(|n| n.parent).map(|id| self.wrap(id))
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<NodeRef> {
        self.with(|n| n.children.clone())
            .into_iter()
            .map(|id| self.wrap(id))
            .collect()
    }

    pub fn first_child(&self) -> Option<NodeRef> {
        self.with(|n| n.children.first().copied())
            .map(|id| self.wrap(id))
    }

    /// Move `child` to the end of this node's children.
    pub fn append_child(&self, child: &NodeRef) {
        self.doc.tree.borrow_mut().append(self.id, child.id);
    }

    /// First matching descendant, in document order.
    pub fn query_selector(&self, selector: &str) -> Option<NodeRef> {
        let selector = Selector::parse(selector)?;
        let found = self.doc.tree.borrow().query(self.id, &selector)?;
        Some(self.wrap(found))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Snapshot of `(name, value)` pairs in source order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with(|n| n.attributes.clone())
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with(|n| {
            n.attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        })
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.doc.tree.borrow_mut().set_attribute(self.id, name, value);
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Current form value.
    pub fn value(&self) -> String {
        self.with(|n| n.value.clone())
    }

    pub fn set_value(&self, value: &str) {
        let mut tree = self.doc.tree.borrow_mut();
        let node = tree.node_mut(self.id);
        if node.value != value {
            node.value = value.to_string();
            node.mutations |= Mutation::VALUE;
        }
    }

    /// Concatenated text of this node and its descendants (comments excluded).
    pub fn text_content(&self) -> String {
        self.doc.tree.borrow().text_content(self.id)
    }

    /// Replace the text. On elements this leaves exactly one text node child,
    /// rewriting the existing one in place when there is one.
    pub fn set_text_content(&self, text: &str) {
        let mut tree = self.doc.tree.borrow_mut();
        let kind = tree.node(self.id).kind;
        match kind {
            NodeKind::Text | NodeKind::Comment => {
                let node = tree.node_mut(self.id);
                if node.data != text {
                    node.data = text.to_string();
                    node.mutations |= Mutation::TEXT;
                }
            }
            NodeKind::Element | NodeKind::Fragment => {
                let only_text = match tree.node(self.id).children.as_slice() {
                    &[only] if tree.node(only).kind == NodeKind::Text => Some(only),
                    _ => None,
                };
                if let (Some(child), false) = (only_text, text.is_empty()) {
                    let node = tree.node_mut(child);
                    if node.data == text {
                        return;
                    }
                    node.data = text.to_string();
                    node.mutations |= Mutation::TEXT;
                    tree.node_mut(self.id).mutations |= Mutation::TEXT;
                    return;
                }
                if text.is_empty() && tree.node(self.id).children.is_empty() {
                    return;
                }
                tree.clear_children(self.id);
                if !text.is_empty() {
                    let child = tree.alloc(NodeKind::Text, "", text);
                    tree.append(self.id, child);
                }
                tree.node_mut(self.id).mutations |= Mutation::TEXT;
            }
        }
    }

    /// Serialised children.
    pub fn inner_html(&self) -> String {
        self.doc.tree.borrow().inner_html(self.id)
    }

    /// Replace the children with the parsed `markup`.
    pub fn set_inner_html(&self, markup: &str) {
        let mut tree = self.doc.tree.borrow_mut();
        if matches!(tree.node(self.id).kind, NodeKind::Text | NodeKind::Comment) {
            debug!(node = ?self.id, "inner html ignored on character data");
            return;
        }
        if tree.inner_html(self.id) == markup {
            return;
        }
        tree.clear_children(self.id);
        parse::parse_into(&mut tree, self.id, markup);
        tree.node_mut(self.id).mutations |= Mutation::INNER_HTML;
    }

    /// This node serialised, children included.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.doc.tree.borrow().serialize(self.id, &mut out);
        out
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) -> Result<()> + 'static,
    ) {
        self.doc
            .tree
            .borrow_mut()
            .node_mut(self.id)
            .listeners
            .push((event_type.to_string(), Rc::new(listener)));
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.with(|n| n.listeners.iter().filter(|(t, _)| t == event_type).count())
    }

    /// Run this node's `event_type` listeners in registration order.
    ///
    /// The tree is not borrowed while listeners run, so they may mutate it.
    pub fn dispatch(&self, event_type: &str) -> Result<()> {
        let listeners: Vec<Listener> = self.with(|n| {
            n.listeners
                .iter()
                .filter(|(t, _)| t == event_type)
                .map(|(_, l)| Rc::clone(l))
                .collect()
        });
        let event = Event::new(event_type, self);
        for listener in listeners {
            listener(&event)?;
        }
        Ok(())
    }

    /// Simulate typing: set the form value, then dispatch `input`.
    pub fn input(&self, value: &str) -> Result<()> {
        self.set_value(value);
        self.dispatch("input")
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn mutations(&self) -> Mutation {
        self.with(|n| n.mutations)
    }

    /// Return and clear this node's mutation flags.
    pub fn take_mutations(&self) -> Mutation {
        let mut tree = self.doc.tree.borrow_mut();
        std::mem::take(&mut tree.node_mut(self.id).mutations)
    }
}
