//! Document Nodes
//!
//! [`Node`] is a reference-counted handle into an in-memory document tree.
//! Cloning a handle is cheap and yields the *same* node; equality is
//! identity. Use [`Node::deep_clone`] for a structural copy.
//!
//! The tree follows DOM semantics where the engine depends on them:
//!
//! - a node has at most one parent; inserting it elsewhere moves it,
//! - inserting a fragment moves the fragment's children and leaves it empty,
//! - attributes (markup) and properties (object fields) are separate stores.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::event::{Event, Listener, ListenerId};
use super::{parse, serialize};
use crate::value::Primitive;

/// Unique identifier for a node, stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with its tag name.
    Element(String),
    Text,
    Comment,
    /// A detached container whose children move on insertion.
    Fragment,
}

struct NodeData {
    id: NodeId,
    kind: NodeKind,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
    /// Character data for text and comment nodes.
    data: RefCell<String>,
    attributes: RefCell<IndexMap<String, String>>,
    properties: RefCell<IndexMap<String, Primitive>>,
    listeners: RefCell<Vec<Listener>>,
}

/// A handle to a node in a document tree.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    fn with_kind(kind: NodeKind, data: String) -> Self {
        Node(Rc::new(NodeData {
            id: NodeId::new(),
            kind,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            data: RefCell::new(data),
            attributes: RefCell::new(IndexMap::new()),
            properties: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// Create an element.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Element(tag.into()), String::new())
    }

    /// Create a text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text, data.into())
    }

    /// Create a comment node.
    pub fn comment(data: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Comment, data.into())
    }

    /// Create an empty fragment.
    pub fn fragment() -> Self {
        Self::with_kind(NodeKind::Fragment, String::new())
    }

    /// Parse markup into a new fragment.
    pub fn parse_fragment(markup: &str) -> Self {
        parse::parse_fragment(markup)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// The element's tag name, or `None` for other node kinds.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    pub fn is_comment(&self) -> bool {
        self.0.kind == NodeKind::Comment
    }

    pub fn is_fragment(&self) -> bool {
        self.0.kind == NodeKind::Fragment
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------
    // Tree navigation
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// Snapshot of the child list.
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.children.borrow().get(index).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.child(0)
    }

    /// Position of this node in its parent's child list.
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let position = parent.0.children.borrow().iter().position(|c| c.ptr_eq(self));
        position
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        parent.child(index + 1)
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        index.checked_sub(1).and_then(|i| parent.child(i))
    }

    /// First element among this node and its descendants, depth first.
    pub fn first_element(&self) -> Option<Node> {
        if self.is_element() {
            return Some(self.clone());
        }
        self.children().iter().find_map(Node::first_element)
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Detach this node from its parent. No-op when already detached.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|c| !c.ptr_eq(self));
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Nodes to actually insert for `node`: its children if it is a fragment.
    fn expand(node: &Node) -> Vec<Node> {
        if node.is_fragment() {
            let moved = node.children();
            for child in &moved {
                child.remove();
            }
            moved
        } else {
            node.remove();
            vec![node.clone()]
        }
    }

    fn adopt_at(&self, index: usize, nodes: Vec<Node>) {
        for node in &nodes {
            *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        }
        let mut children = self.0.children.borrow_mut();
        let index = index.min(children.len());
        children.splice(index..index, nodes);
    }

    /// Append `child` (or a fragment's children) at the end.
    pub fn append_child(&self, child: &Node) {
        let nodes = Self::expand(child);
        let end = self.child_count();
        self.adopt_at(end, nodes);
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    /// or is not a child of this node.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        // Expand first: moving `child` may shift the reference's index.
        let nodes = Self::expand(child);
        let index = reference
            .and_then(|r| {
                self.0
                    .children
                    .borrow()
                    .iter()
                    .position(|c| c.ptr_eq(r))
            })
            .unwrap_or_else(|| self.child_count());
        self.adopt_at(index, nodes);
    }

    /// Insert `node` as this node's next sibling.
    ///
    /// Returns `false` when this node has no parent.
    pub fn insert_after(&self, node: &Node) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        if node.ptr_eq(self) {
            return true;
        }
        let nodes = Self::expand(node);
        let index = self.index_in_parent().map_or(parent.child_count(), |i| i + 1);
        parent.adopt_at(index, nodes);
        true
    }

    /// Replace this node with `nodes`, in order.
    ///
    /// Returns `false` when this node has no parent.
    pub fn replace_with(&self, nodes: &[Node]) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        for node in nodes {
            parent.insert_before(node, Some(self));
        }
        self.remove();
        true
    }

    /// Remove all children.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.remove();
        }
    }

    // ------------------------------------------------------------------
    // Character data and text
    // ------------------------------------------------------------------

    /// Character data of a text or comment node.
    pub fn data(&self) -> String {
        self.0.data.borrow().clone()
    }

    pub fn set_data(&self, data: impl Into<String>) {
        *self.0.data.borrow_mut() = data.into();
    }

    /// Concatenated text of this node and its descendants (comments excluded).
    pub fn text_content(&self) -> String {
        match &self.0.kind {
            NodeKind::Text => self.data(),
            NodeKind::Comment => String::new(),
            _ => self.children().iter().map(Node::text_content).collect(),
        }
    }

    /// Replace content with a single text node (or set character data).
    ///
    /// The text is never parsed as markup.
    pub fn set_text_content(&self, text: impl Into<String>) {
        match &self.0.kind {
            NodeKind::Text | NodeKind::Comment => self.set_data(text),
            _ => {
                self.clear_children();
                let text = text.into();
                if !text.is_empty() {
                    self.append_child(&Node::text(text));
                }
            }
        }
    }

    /// Replace children with the parse of `markup`.
    pub fn set_inner_html(&self, markup: &str) {
        self.clear_children();
        let parsed = parse::parse_fragment(markup);
        self.append_child(&parsed);
    }

    pub fn inner_html(&self) -> String {
        serialize::inner_html(self)
    }

    pub fn outer_html(&self) -> String {
        serialize::outer_html(self)
    }

    // ------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.attributes.borrow().contains_key(name)
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow_mut().shift_remove(name)
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn property(&self, name: &str) -> Option<Primitive> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: impl Into<String>, value: Primitive) {
        self.0.properties.borrow_mut().insert(name.into(), value);
    }

    pub fn remove_property(&self, name: &str) -> Option<Primitive> {
        self.0.properties.borrow_mut().shift_remove(name)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a listener for events named `kind`.
    pub fn add_event_listener<F>(&self, kind: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        let listener = Listener::new(kind.into(), Rc::new(callback));
        let id = listener.id;
        self.0.listeners.borrow_mut().push(listener);
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Number of registered listeners on this node.
    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    /// Number of registered listeners on this node and its descendants.
    pub fn total_listener_count(&self) -> usize {
        self.listener_count()
            + self
                .children()
                .iter()
                .map(Node::total_listener_count)
                .sum::<usize>()
    }

    /// Fire an event of `kind` at this node. Returns the number of listeners run.
    pub fn dispatch(&self, kind: &str) -> usize {
        self.dispatch_event(&Event::new(kind, self.clone()))
    }

    /// Fire `event` at this node's listeners for its kind. No bubbling.
    pub fn dispatch_event(&self, event: &Event) -> usize {
        // Snapshot, so listeners may remove themselves.
        let matching: Vec<(ListenerId, Rc<dyn Fn(&Event)>)> = self
            .0
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == event.kind())
            .map(|l| (l.id, Rc::clone(&l.callback)))
            .collect();

        let mut ran = 0;
        for (id, callback) in matching {
            let still_registered = self.0.listeners.borrow().iter().any(|l| l.id == id);
            if still_registered {
                callback(event);
                ran += 1;
            }
        }
        ran
    }

    /// Convenience for `dispatch("click")`.
    pub fn click(&self) -> usize {
        self.dispatch("click")
    }

    // ------------------------------------------------------------------
    // Cloning and queries
    // ------------------------------------------------------------------

    /// Structural copy: kind, data, attributes, properties and children.
    /// Listeners are not copied.
    pub fn deep_clone(&self) -> Node {
        let copy = Self::with_kind(self.0.kind.clone(), self.data());
        *copy.0.attributes.borrow_mut() = self.0.attributes.borrow().clone();
        *copy.0.properties.borrow_mut() = self.0.properties.borrow().clone();
        let children: Vec<Node> = self.0.children.borrow().iter().map(Node::deep_clone).collect();
        copy.adopt_at(0, children);
        copy
    }

    /// All descendant elements with tag `tag`, in document order.
    pub fn query_all(&self, tag: &str) -> Vec<Node> {
        let mut found = Vec::new();
        self.collect_tag(tag, &mut found);
        found
    }

    /// First descendant element with tag `tag`.
    pub fn query(&self, tag: &str) -> Option<Node> {
        self.query_all(tag).into_iter().next()
    }

    fn collect_tag(&self, tag: &str, found: &mut Vec<Node>) {
        for child in self.children() {
            if child.tag_name() == Some(tag) {
                found.push(child.clone());
            }
            child.collect_tag(tag, found);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element(tag) => write!(f, "<{tag}>#{}", self.0.id.raw()),
            NodeKind::Text => write!(f, "#text({:?})", self.0.data.borrow()),
            NodeKind::Comment => write!(f, "#comment({:?})", self.0.data.borrow()),
            NodeKind::Fragment => write!(f, "#fragment({} children)", self.child_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_moves_node_between_parents() {
        let a = Node::element("div");
        let b = Node::element("div");
        let child = Node::text("x");

        a.append_child(&child);
        b.append_child(&child);

        assert_eq!(a.child_count(), 0);
        assert_eq!(b.child_count(), 1);
        assert!(child.parent().unwrap().ptr_eq(&b));
    }

    #[test]
    fn fragment_insertion_moves_children() {
        let fragment = Node::fragment();
        fragment.append_child(&Node::text("a"));
        fragment.append_child(&Node::text("b"));

        let host = Node::element("p");
        host.append_child(&fragment);

        assert_eq!(fragment.child_count(), 0);
        assert_eq!(host.text_content(), "ab");
    }

    #[test]
    fn insert_after_and_siblings() {
        let host = Node::element("ul");
        let first = Node::element("li");
        let third = Node::element("li");
        host.append_child(&first);
        host.append_child(&third);

        let second = Node::element("li");
        assert!(first.insert_after(&second));

        assert_eq!(host.child(1), Some(second.clone()));
        assert_eq!(second.next_sibling(), Some(third));
        assert_eq!(second.previous_sibling(), Some(first));
        assert!(!Node::text("orphan").insert_after(&Node::text("y")));
    }

    #[test]
    fn replace_with_keeps_position() {
        let host = Node::element("p");
        let marker = Node::comment("m");
        host.append_child(&Node::text("a"));
        host.append_child(&marker);
        host.append_child(&Node::text("c"));

        marker.replace_with(&[Node::text("b1"), Node::text("b2")]);

        assert_eq!(host.text_content(), "ab1b2c");
        assert!(marker.parent().is_none());
    }

    #[test]
    fn set_text_content_never_parses_markup() {
        let host = Node::element("p");
        host.set_text_content("<b>bold</b>");

        assert_eq!(host.child_count(), 1);
        assert!(host.first_child().unwrap().is_text());
        assert_eq!(host.inner_html(), "&lt;b&gt;bold&lt;/b&gt;");
    }

    #[test]
    fn listeners_register_dispatch_and_remove() {
        let button = Node::element("button");
        let hits = Rc::new(std::cell::Cell::new(0));
        let hits_clone = hits.clone();
        let id = button.add_event_listener("click", move |_| hits_clone.set(hits_clone.get() + 1));

        assert_eq!(button.click(), 1);
        assert_eq!(button.dispatch("input"), 0);
        assert!(button.remove_event_listener(id));
        assert_eq!(button.click(), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(button.listener_count(), 0);
    }

    #[test]
    fn deep_clone_is_structural_without_listeners() {
        let div = Node::element("div");
        div.set_attribute("class", "card");
        div.append_child(&Node::text("hi"));
        div.add_event_listener("click", |_| {});

        let copy = div.deep_clone();

        assert!(!copy.ptr_eq(&div));
        assert_eq!(copy.outer_html(), div.outer_html());
        assert_eq!(copy.listener_count(), 0);
        assert!(!copy.first_child().unwrap().ptr_eq(&div.first_child().unwrap()));
    }

    #[test]
    fn properties_are_separate_from_attributes() {
        let input = Node::element("input");
        input.set_property("value", Primitive::from("typed"));

        assert_eq!(input.property("value"), Some(Primitive::from("typed")));
        assert!(!input.has_attribute("value"));
    }
}
