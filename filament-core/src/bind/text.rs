//! Text-Slot Dispatch
//!
//! A text slot starts life as a placeholder comment. What happens to it
//! depends on the value, checked in this order:
//!
//! 1. [`Value::When`]: the placeholder anchors a conditional controller.
//! 2. [`Value::Each`]: the placeholder anchors a keyed list.
//! 3. [`Value::Result`]: the nested content replaces the placeholder and its
//!    teardown joins this render's.
//! 4. [`Value::Html`]: a wrapper element replaces the placeholder and gets the
//!    markup as its inner HTML. Nothing else in the engine parses values.
//! 5. [`Value::Reactive`]: the placeholder anchors a run of content that is
//!    swapped on every emission: a nested result's nodes, or one text node.
//! 6. [`Value::Primitive`]: a text node replaces the placeholder.
//!
//! Every path that inserts text does so with a text node, so interpolated
//! strings can never become markup.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::Node;
use crate::render::Renderer;
use crate::result::{detach, insert_after, Region, RenderResult, Root, Teardown};
use crate::value::{RawHtml, RawMarkup, Value, ValueSource};

use super::{conditional, Binder};

/// What a text slot did to its placeholder.
pub(crate) enum TextOutcome {
    /// The placeholder left the tree; these roots took its place.
    Replaced(Vec<Root>),
    /// The placeholder stays as an anchor; the region tracks content after it.
    Anchored(Region),
}

pub(crate) fn bind_text(placeholder: &Node, value: &Value, binder: &mut Binder<'_>) -> TextOutcome {
    let teardown = binder.teardown;
    match value {
        Value::When(conditional) => {
            TextOutcome::Anchored(conditional::mount(placeholder, conditional, teardown))
        }
        Value::Each(list) => TextOutcome::Anchored(list.mount(placeholder, teardown)),
        Value::Result(nested) => splice(placeholder, nested, binder),
        Value::Html(raw) => raw_html(placeholder, raw, teardown),
        Value::Reactive(source) => TextOutcome::Anchored(reactive_text(placeholder, source, teardown)),
        Value::Primitive(primitive) => {
            let text = Node::text(primitive.to_text());
            placeholder.replace_with(std::slice::from_ref(&text));
            TextOutcome::Replaced(vec![Root::Node(text)])
        }
        Value::Handler(_) => {
            tracing::warn!("event handler interpolated as text; slot skipped");
            placeholder.remove();
            TextOutcome::Replaced(Vec::new())
        }
    }
}

fn splice(placeholder: &Node, nested: &RenderResult, binder: &mut Binder<'_>) -> TextOutcome {
    let Some(root) = nested.as_root() else {
        // A string-mode result: its markup is engine output, already escaped.
        tracing::debug!("splicing string-mode result as parsed markup");
        let parsed = Node::parse_fragment(nested.markup().unwrap_or_default());
        let nodes = parsed.children();
        placeholder.replace_with(&nodes);
        return TextOutcome::Replaced(nodes.into_iter().map(Root::Node).collect());
    };

    placeholder.replace_with(&nested.nodes());
    binder.teardown.adopt(nested.teardown());
    binder.adopted.push(nested.clone());
    TextOutcome::Replaced(vec![root])
}

fn raw_html(placeholder: &Node, raw: &RawHtml, teardown: &Teardown) -> TextOutcome {
    let tag = raw
        .wrapper
        .clone()
        .unwrap_or_else(|| Renderer::current().config().raw_html_wrapper.clone());
    let wrapper = Node::element(tag);

    match &raw.markup {
        RawMarkup::Static(markup) => wrapper.set_inner_html(markup),
        RawMarkup::Reactive(source) => {
            let target = wrapper.clone();
            let subscription = source.subscribe(Rc::new(move |markup: &String| {
                target.set_inner_html(markup);
            }));
            teardown.add_subscription(subscription);
        }
    }

    placeholder.replace_with(std::slice::from_ref(&wrapper));
    TextOutcome::Replaced(vec![Root::Node(wrapper)])
}

/// Content currently inserted after a reactive anchor.
#[derive(Default)]
struct Inserted {
    nodes: Vec<Node>,
    nested: Option<Teardown>,
}

impl Inserted {
    fn clear(self) {
        if let Some(nested) = self.nested {
            nested.run();
        }
        detach(&self.nodes);
    }
}

fn reactive_text(anchor: &Node, source: &ValueSource, teardown: &Teardown) -> Region {
    let region = Region::default();
    let inserted = Rc::new(RefCell::new(Inserted::default()));
    let alive = Rc::new(Cell::new(true));

    let observer = {
        let anchor = anchor.clone();
        let region = region.clone();
        let inserted = inserted.clone();
        let alive = alive.clone();
        move |value: &Value| {
            if !alive.get() {
                return;
            }
            let previous = inserted.take();
            previous.clear();

            match value {
                Value::Result(nested) => {
                    let nodes = nested.nodes();
                    insert_after(&anchor, &nodes);
                    region.replace(nested.as_root().into_iter().collect());
                    *inserted.borrow_mut() = Inserted {
                        nodes,
                        nested: Some(nested.teardown().clone()),
                    };
                    nested.flush_mount_hooks();
                }
                Value::Primitive(primitive) => {
                    let text = Node::text(primitive.to_text());
                    insert_after(&anchor, std::slice::from_ref(&text));
                    region.replace(vec![Root::Node(text.clone())]);
                    *inserted.borrow_mut() = Inserted {
                        nodes: vec![text],
                        nested: None,
                    };
                }
                other => {
                    tracing::warn!(kind = other.kind_name(), "reactive text emission ignored");
                    region.clear();
                }
            }
        }
    };

    let subscription = source.subscribe(Rc::new(observer));
    teardown.add(move || {
        alive.set(false);
        subscription.unsubscribe();
        if let Some(nested) = inserted.take().nested {
            nested.run();
        }
    });
    region
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use crate::value::{raw_html, raw_html_reactive, Primitive};

    fn host(markup: &str) -> (Node, Node) {
        let parent = Node::element("div");
        parent.set_inner_html(markup);
        let placeholder = parent
            .children()
            .into_iter()
            .find(Node::is_comment)
            .expect("placeholder");
        (parent, placeholder)
    }

    fn dispatch(placeholder: &Node, value: &Value, teardown: &Teardown) -> TextOutcome {
        let mut binder = Binder::new(std::slice::from_ref(value), teardown);
        bind_text(placeholder, value, &mut binder)
    }

    #[test]
    fn primitive_text_is_never_parsed() {
        let (parent, placeholder) = host("a<!--fl:0-->b");
        let teardown = Teardown::new();

        dispatch(&placeholder, &Value::from("<b>bold</b>"), &teardown);

        assert_eq!(parent.child_count(), 3);
        assert_eq!(parent.text_content(), "a<b>bold</b>b");
        assert_eq!(parent.inner_html(), "a&lt;b&gt;bold&lt;/b&gt;b");
    }

    #[test]
    fn null_renders_empty_text() {
        let (parent, placeholder) = host("<!--fl:0-->");

        dispatch(&placeholder, &Value::null(), &Teardown::new());

        assert_eq!(parent.child_count(), 1);
        assert_eq!(parent.text_content(), "");
    }

    #[test]
    fn reactive_text_keeps_anchor_and_swaps_content() {
        let (parent, placeholder) = host("<!--fl:0-->");
        let teardown = Teardown::new();
        let signal = Signal::new(Primitive::from("a"));

        let outcome = dispatch(&placeholder, &Value::from(signal.clone()), &teardown);
        assert_eq!(parent.inner_html(), "<!--fl:0-->a");

        signal.set(Primitive::from("b"));
        assert_eq!(parent.inner_html(), "<!--fl:0-->b");
        let TextOutcome::Anchored(region) = outcome else {
            panic!("expected an anchored slot");
        };
        assert_eq!(region.nodes().len(), 1);

        teardown.run();
        signal.set(Primitive::from("c"));
        assert_eq!(parent.inner_html(), "<!--fl:0-->b");
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn reactive_results_are_torn_down_when_replaced() {
        let (parent, placeholder) = host("<!--fl:0-->");
        let teardown = Teardown::new();
        let first = RenderResult::from_nodes(vec![Node::element("i")]);
        let signal = Signal::new(Value::from(first.clone()));

        dispatch(&placeholder, &Value::from(signal.clone()), &teardown);
        assert_eq!(parent.inner_html(), "<!--fl:0--><i></i>");

        signal.set(Value::from(7));
        assert!(first.teardown().is_done());
        assert_eq!(parent.inner_html(), "<!--fl:0-->7");
    }

    #[test]
    fn raw_html_is_the_only_markup_path() {
        let (parent, placeholder) = host("<!--fl:0-->");
        dispatch(&placeholder, &raw_html("<b>x</b>").into(), &Teardown::new());
        assert_eq!(parent.inner_html(), "<span><b>x</b></span>");

        let (parent, placeholder) = host("<!--fl:0-->");
        let markup = Signal::new("<i>1</i>".to_string());
        let value: Value = raw_html_reactive(markup.clone()).wrapper("div").into();
        dispatch(&placeholder, &value, &Teardown::new());
        markup.set("<i>2</i>".to_string());
        assert_eq!(parent.inner_html(), "<div><i>2</i></div>");
    }

    #[test]
    fn nested_result_is_spliced_and_adopted() {
        let (parent, placeholder) = host("<!--fl:0-->");
        let teardown = Teardown::new();
        let nested = RenderResult::from_nodes(vec![Node::element("em"), Node::text("!")]);

        dispatch(&placeholder, &Value::from(nested.clone()), &teardown);
        teardown.run();

        assert_eq!(parent.inner_html(), "<em></em>!");
        assert!(nested.teardown().is_done());
    }
}
