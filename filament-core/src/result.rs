//! Render Results and Teardown
//!
//! A [`RenderResult`] is what one render call produces: the content (live
//! nodes, or markup in string mode) plus a single [`Teardown`] handle that
//! releases every subscription and listener the render created, including
//! those of nested results.
//!
//! # How Content Is Tracked
//!
//! Bindings that own a placeholder anchor (reactive text, conditionals,
//! lists) insert and remove nodes after it over time. When such an anchor is
//! a top-level node of a template, the result's node list changes with it.
//! Content is therefore a [`Region`]: a shared, mutable list of roots where a
//! root is either a node or another region. The owning binding rewrites its
//! region whenever it mutates the document, and [`RenderResult::nodes`]
//! flattens the tree on demand. A parent that moves a result (the list
//! reconciler reordering rows) always sees its current nodes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::dom::Node;
use crate::error::{self, EngineError};
use crate::reactive::Subscription;
use crate::template::CallSite;
use crate::value::Value;

type Cleanup = Box<dyn FnOnce()>;

struct TeardownInner {
    cleanups: RefCell<Vec<Cleanup>>,
    done: Cell<bool>,
}

/// Aggregate, idempotent cleanup handle.
///
/// Cleanups run in registration order, each independently: a panicking
/// cleanup is reported to the error channel and the rest still run.
/// Registering on an already-run handle runs the cleanup immediately.
#[derive(Clone)]
pub struct Teardown {
    inner: Rc<TeardownInner>,
}

impl Teardown {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TeardownInner {
                cleanups: RefCell::new(Vec::new()),
                done: Cell::new(false),
            }),
        }
    }

    /// Register a cleanup.
    pub fn add<F>(&self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        if self.inner.done.get() {
            run_cleanup(Box::new(cleanup));
            return;
        }
        self.inner.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    /// Unsubscribe `subscription` on teardown.
    pub fn add_subscription(&self, subscription: Subscription) {
        self.add(move || subscription.unsubscribe());
    }

    /// Run `child` as part of this handle.
    pub fn adopt(&self, child: &Teardown) {
        if Rc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        let child = child.clone();
        self.add(move || child.run());
    }

    /// Run every cleanup once. Later calls do nothing.
    pub fn run(&self) {
        if self.inner.done.replace(true) {
            return;
        }
        // Cleanups may register more cleanups; those run immediately via `add`.
        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        for cleanup in cleanups {
            run_cleanup(cleanup);
        }
    }

    pub fn is_done(&self) -> bool {
        self.inner.done.get()
    }

    /// Pending cleanups.
    pub fn len(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Teardown) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("pending", &self.len())
            .field("done", &self.is_done())
            .finish()
    }
}

fn run_cleanup(cleanup: Cleanup) {
    error::guard(cleanup, |message| EngineError::CleanupPanicked { message });
}

/// A node, or a nested region whose nodes change over time.
#[derive(Clone, Debug)]
pub(crate) enum Root {
    Node(Node),
    Region(Region),
}

/// Shared, ordered list of roots owned by one binding.
#[derive(Clone, Debug, Default)]
pub(crate) struct Region(Rc<RefCell<Vec<Root>>>);

impl Region {
    pub(crate) fn new(roots: Vec<Root>) -> Self {
        Self(Rc::new(RefCell::new(roots)))
    }

    pub(crate) fn replace(&self, roots: Vec<Root>) {
        *self.0.borrow_mut() = roots;
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Flattened nodes, in order.
    pub(crate) fn nodes(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<Node>) {
        for root in self.0.borrow().iter() {
            match root {
                Root::Node(node) => out.push(node.clone()),
                Root::Region(region) => region.collect(out),
            }
        }
    }
}

/// Insert `nodes` right after `anchor`, in order.
pub(crate) fn insert_after(anchor: &Node, nodes: &[Node]) {
    let mut previous = anchor.clone();
    for node in nodes {
        if !previous.insert_after(node) {
            tracing::debug!("anchor is detached; content not inserted");
            return;
        }
        previous = node.clone();
    }
}

pub(crate) fn detach(nodes: &[Node]) {
    for node in nodes {
        node.remove();
    }
}

#[derive(Debug)]
enum Content {
    Live {
        region: Region,
        /// Keeps unmounted content parented so anchors can insert siblings.
        /// Held, never read.
        #[allow(dead_code)]
        home: Node,
    },
    Markup(String),
}

struct ResultInner {
    content: Content,
    teardown: Teardown,
    site: Option<CallSite>,
    statics: &'static [&'static str],
    values: Vec<Value>,
    mount_hooks: RefCell<Vec<Cleanup>>,
}

/// Output of one render call.
///
/// Cloning shares the same content and teardown.
#[derive(Clone)]
pub struct RenderResult {
    inner: Rc<ResultInner>,
}

impl RenderResult {
    pub(crate) fn live(
        home: Node,
        region: Region,
        teardown: Teardown,
        site: Option<CallSite>,
        statics: &'static [&'static str],
        values: Vec<Value>,
    ) -> Self {
        Self::with_content(Content::Live { region, home }, teardown, site, statics, values)
    }

    pub(crate) fn markup_only(
        markup: String,
        site: Option<CallSite>,
        statics: &'static [&'static str],
        values: Vec<Value>,
    ) -> Self {
        Self::with_content(Content::Markup(markup), Teardown::new(), site, statics, values)
    }

    fn with_content(
        content: Content,
        teardown: Teardown,
        site: Option<CallSite>,
        statics: &'static [&'static str],
        values: Vec<Value>,
    ) -> Self {
        Self {
            inner: Rc::new(ResultInner {
                content,
                teardown,
                site,
                statics,
                values,
                mount_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Wrap hand-built nodes as a result with an empty teardown.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let home = Node::fragment();
        for node in &nodes {
            home.append_child(node);
        }
        let region = Region::new(nodes.into_iter().map(Root::Node).collect());
        Self::live(home, region, Teardown::new(), None, &[], Vec::new())
    }

    /// A result with no content.
    pub fn empty() -> Self {
        Self::from_nodes(Vec::new())
    }

    /// Current top-level nodes. Empty in string mode.
    pub fn nodes(&self) -> Vec<Node> {
        match &self.inner.content {
            Content::Live { region, .. } => region.nodes(),
            Content::Markup(_) => Vec::new(),
        }
    }

    /// String-mode markup.
    pub fn markup(&self) -> Option<&str> {
        match &self.inner.content {
            Content::Markup(markup) => Some(markup),
            Content::Live { .. } => None,
        }
    }

    /// Serialized content in either mode.
    pub fn to_html(&self) -> String {
        match &self.inner.content {
            Content::Markup(markup) => markup.clone(),
            Content::Live { region, .. } => region.nodes().iter().map(Node::outer_html).collect(),
        }
    }

    pub fn teardown(&self) -> &Teardown {
        &self.inner.teardown
    }

    /// The template's static fragments, kept for hydration.
    pub fn statics(&self) -> &'static [&'static str] {
        self.inner.statics
    }

    /// The interpolated values, kept for hydration.
    pub fn values(&self) -> &[Value] {
        &self.inner.values
    }

    pub fn call_site(&self) -> Option<CallSite> {
        self.inner.site
    }

    /// Append the content to `parent` and run queued mount hooks.
    pub fn mount(&self, parent: &Node) {
        for node in self.nodes() {
            parent.append_child(&node);
        }
        self.flush_mount_hooks();
    }

    /// Run the teardown, then detach the content.
    pub fn unmount(&self) {
        self.inner.teardown.run();
        detach(&self.nodes());
    }

    pub fn ptr_eq(&self, other: &RenderResult) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn region(&self) -> Option<&Region> {
        match &self.inner.content {
            Content::Live { region, .. } => Some(region),
            Content::Markup(_) => None,
        }
    }

    /// This result as one root of a parent region.
    pub(crate) fn as_root(&self) -> Option<Root> {
        self.region().map(|region| Root::Region(region.clone()))
    }

    pub(crate) fn queue_mount_hook(&self, hook: Cleanup) {
        self.inner.mount_hooks.borrow_mut().push(hook);
    }

    /// Move `child`'s pending mount hooks onto this result.
    pub(crate) fn adopt_mount_hooks(&self, child: &RenderResult) {
        if self.ptr_eq(child) {
            return;
        }
        let hooks = std::mem::take(&mut *child.inner.mount_hooks.borrow_mut());
        self.inner.mount_hooks.borrow_mut().extend(hooks);
    }

    pub(crate) fn flush_mount_hooks(&self) {
        let hooks = std::mem::take(&mut *self.inner.mount_hooks.borrow_mut());
        for hook in hooks {
            error::guard(hook, |message| EngineError::HookPanicked {
                hook: "mount",
                message,
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_mount_hooks(&self) -> usize {
        self.inner.mount_hooks.borrow().len()
    }
}

impl fmt::Debug for RenderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResult")
            .field("site", &self.inner.site)
            .field("content", &self.inner.content)
            .field("teardown", &self.inner.teardown)
            .finish()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{reset_error_handler, set_error_handler};

    #[test]
    fn teardown_runs_once_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let teardown = Teardown::new();
        for i in 0..3 {
            let log = log.clone();
            teardown.add(move || log.borrow_mut().push(i));
        }

        teardown.run();
        teardown.run();

        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(teardown.is_done());
        assert!(teardown.is_empty());
    }

    #[test]
    fn panicking_cleanup_does_not_stop_siblings() {
        let reports = Rc::new(Cell::new(0));
        let seen = reports.clone();
        set_error_handler(move |_| seen.set(seen.get() + 1));

        let ran = Rc::new(Cell::new(false));
        let teardown = Teardown::new();
        teardown.add(|| panic!("cleanup failed"));
        let flag = ran.clone();
        teardown.add(move || flag.set(true));
        teardown.run();

        assert!(ran.get());
        assert_eq!(reports.get(), 1);
        reset_error_handler();
    }

    #[test]
    fn adopted_child_runs_with_parent_and_late_adds_run_immediately() {
        let parent = Teardown::new();
        let child = Teardown::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        child.add(move || c.set(c.get() + 1));
        parent.adopt(&child);

        parent.run();
        assert_eq!(count.get(), 1);
        assert!(child.is_done());

        let c = count.clone();
        parent.add(move || c.set(c.get() + 10));
        assert_eq!(count.get(), 11);
    }

    #[test]
    fn region_flattens_nested_regions() {
        let a = Node::text("a");
        let b = Node::text("b");
        let c = Node::text("c");
        let inner = Region::new(vec![Root::Node(b.clone())]);
        let outer = Region::new(vec![Root::Node(a.clone()), Root::Region(inner.clone())]);

        inner.replace(vec![Root::Node(b.clone()), Root::Node(c.clone())]);

        assert_eq!(outer.nodes(), vec![a, b, c]);
    }

    #[test]
    fn mount_appends_nodes_and_flushes_hooks() {
        let result = RenderResult::from_nodes(vec![Node::element("p"), Node::text("t")]);
        let mounted = Rc::new(Cell::new(false));
        let flag = mounted.clone();
        result.queue_mount_hook(Box::new(move || flag.set(true)));

        let root = Node::element("div");
        result.mount(&root);

        assert_eq!(root.inner_html(), "<p></p>t");
        assert!(mounted.get());
        assert_eq!(result.pending_mount_hooks(), 0);

        result.unmount();
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn insert_after_keeps_order() {
        let parent = Node::element("div");
        let anchor = Node::comment("a");
        parent.append_child(&anchor);
        parent.append_child(&Node::text("end"));

        insert_after(&anchor, &[Node::text("1"), Node::text("2")]);

        assert_eq!(parent.inner_html(), "<!--a-->12end");
    }
}
