//! Hydration
//!
//! Attaches bindings to markup that string mode produced, instead of building
//! nodes again.
//!
//! # How Hydration Works
//!
//! The server output for a text slot looks like
//!
//! ```text
//! <!--fl:N--> ...server content... <!--/fl-->
//! ```
//!
//! Compiled paths were recorded against the client template, where a text
//! slot is one comment. So paths are walked over *logical* children: a
//! `fl:N` marker counts as one child and everything up to its matching end
//! marker is skipped. End markers nest, because a nested template's own
//! markers sit between its parent's.
//!
//! Hydration runs in two passes. The first resolves every slot path of the
//! template and of every nested string-mode result inside it, touching
//! nothing. A path that does not resolve means the server markup and client
//! template disagree, and hydration fails with [`HydrationError::Mismatch`]
//! with the container exactly as it was and no subscriptions made.
//!
//! The second pass removes each text slot's server content and end marker
//! and runs the ordinary binder, so a hydrated result behaves exactly like a
//! freshly rendered one. Nested string-mode results are bound in place over
//! their own server content instead of being rebuilt.

use std::rc::Rc;

use crate::bind::Binder;
use crate::config::RenderMode;
use crate::dom::Node;
use crate::error::HydrationError;
use crate::render::Renderer;
use crate::result::{Region, RenderResult, Teardown};
use crate::template::scan::{parse_text_marker, END_MARKER};
use crate::template::{CompiledTemplate, SlotKind};
use crate::value::Value;

/// Hydrate `container`'s children, which hold `prior`'s server markup.
///
/// `prior` is the string-mode result of the same template; its call site,
/// fragments and values drive the client-side bind.
pub fn hydrate(container: &Node, prior: &RenderResult) -> Result<RenderResult, HydrationError> {
    let top = logical_children(&container.children());
    let plan = resolve(top, prior)?;
    let result = bind(container, plan);
    tracing::debug!(site = ?prior.call_site(), "hydrated");
    Ok(result)
}

/// Every node one template needs, found before anything is mutated.
struct Plan<'a> {
    prior: &'a RenderResult,
    compiled: Rc<CompiledTemplate>,
    top: Vec<Node>,
    targets: Vec<Node>,
    /// Per slot: the resolved nested template for a hydratable text value.
    nested: Vec<Option<Plan<'a>>>,
}

fn resolve(top: Vec<Node>, prior: &RenderResult) -> Result<Plan<'_>, HydrationError> {
    let site = prior.call_site().ok_or(HydrationError::MissingCallSite)?;
    let compiled = Renderer::current()
        .cache()
        .get_or_compile(site, prior.statics(), RenderMode::Dom);

    let targets = compiled
        .slots()
        .iter()
        .map(|slot| {
            resolve_logical(&top, &slot.path).ok_or_else(|| HydrationError::Mismatch {
                index: slot.index,
                path: slot.path.to_vec(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut nested = Vec::with_capacity(targets.len());
    for (slot, target) in compiled.slots().iter().zip(&targets) {
        let inner = match prior.values().get(slot.index) {
            Some(Value::Result(inner)) if slot.kind == SlotKind::Text && is_hydratable(inner) => {
                let (server, _) = server_content(target);
                Some(resolve(logical_children(&server), inner)?)
            }
            _ => None,
        };
        nested.push(inner);
    }

    Ok(Plan {
        prior,
        compiled,
        top,
        targets,
        nested,
    })
}

fn is_hydratable(result: &RenderResult) -> bool {
    result.markup().is_some() && result.call_site().is_some()
}

/// Strip server content and bind `plan` over the nodes that remain.
fn bind(home: &Node, plan: Plan<'_>) -> RenderResult {
    let Plan {
        prior,
        compiled,
        top,
        targets,
        nested,
    } = plan;

    let mut values = prior.values().to_vec();
    for ((slot, target), inner) in compiled.slots().iter().zip(&targets).zip(nested) {
        if slot.kind != SlotKind::Text {
            continue;
        }
        let (server, end) = server_content(target);
        if let Some(end) = end {
            end.remove();
        }
        match inner {
            Some(inner) => {
                let inner_home = target.parent().unwrap_or_else(Node::fragment);
                if let Some(value) = values.get_mut(slot.index) {
                    *value = Value::Result(bind(&inner_home, inner));
                }
            }
            None => discard(&server),
        }
    }

    let teardown = Teardown::new();
    let mut binder = Binder::new(&values, &teardown);
    let roots = binder.bind(
        compiled.slots(),
        targets.into_iter().map(Some).collect(),
        top,
    );
    let adopted = std::mem::take(&mut binder.adopted);

    let result = RenderResult::live(
        home.clone(),
        Region::new(roots),
        teardown,
        prior.call_site(),
        prior.statics(),
        prior.values().to_vec(),
    );
    for child in &adopted {
        result.adopt_mount_hooks(child);
    }
    result
}

fn discard(nodes: &[Node]) {
    for node in nodes {
        node.remove();
    }
}

fn is_text_marker(node: &Node) -> bool {
    node.is_comment() && parse_text_marker(&node.data()).is_some()
}

fn is_end_marker(node: &Node) -> bool {
    node.is_comment() && node.data() == END_MARKER
}

/// Siblings with each marker's server content folded away.
fn logical_children(children: &[Node]) -> Vec<Node> {
    let mut logical = Vec::with_capacity(children.len());
    let mut rest = children.iter();
    while let Some(node) = rest.next() {
        logical.push(node.clone());
        if !is_text_marker(node) {
            continue;
        }
        let mut depth = 1usize;
        for skipped in rest.by_ref() {
            if is_text_marker(skipped) {
                depth += 1;
            } else if is_end_marker(skipped) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
        }
    }
    logical
}

fn resolve_logical(top: &[Node], path: &[usize]) -> Option<Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = top.get(first)?.clone();
    for &index in rest {
        node = logical_children(&node.children()).get(index)?.clone();
    }
    Some(node)
}

/// The server nodes between `marker` and its matching end marker, and the
/// end marker itself. Nothing is moved.
fn server_content(marker: &Node) -> (Vec<Node>, Option<Node>) {
    let mut content = Vec::new();
    let mut depth = 1usize;
    let mut next = marker.next_sibling();
    while let Some(node) = next {
        next = node.next_sibling();
        if is_text_marker(&node) {
            depth += 1;
        } else if is_end_marker(&node) {
            depth -= 1;
            if depth == 0 {
                return (content, Some(node));
            }
        }
        content.push(node);
    }
    (content, None)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::when;
    use crate::reactive::Signal;
    use crate::ssr::render_string;
    use crate::value::on;
    use std::cell::Cell;
    use std::rc::Rc;

    fn serve(build: impl Fn() -> RenderResult) -> (Node, RenderResult) {
        let prior = render_string(&build);
        let container = Node::element("div");
        container.set_inner_html(&prior.to_html());
        (container, prior)
    }

    #[test]
    fn reuses_server_nodes_and_binds_events() {
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let view = move || {
            let counter = counter.clone();
            crate::html!(
                "<button @click=",
                on(move |_| counter.set(counter.get() + 1)),
                ">go</button>"
            )
        };
        let (container, prior) = serve(view);
        let server_button = container.child(0).unwrap();

        let live = hydrate(&container, &prior).unwrap();

        assert!(live.nodes()[0].ptr_eq(&server_button));
        server_button.click();
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn reactive_text_takes_over_after_markers_are_stripped() {
        let count = Signal::new(1);
        let (container, prior) = serve(|| crate::html!("<p>n=", count.clone(), "</p>"));
        assert_eq!(container.inner_html(), "<p>n=<!--fl:0-->1<!--/fl--></p>");

        let _live = hydrate(&container, &prior).unwrap();
        assert_eq!(container.inner_html(), "<p>n=<!--fl:0-->1</p>");

        count.set(2);
        assert_eq!(container.inner_html(), "<p>n=<!--fl:0-->2</p>");
    }

    #[test]
    fn nested_results_hydrate_in_place() {
        let name = Signal::new("a".to_string());
        let (container, prior) = serve(|| {
            let inner = crate::html!("<b>", name.clone(), "</b>");
            crate::html!("<div>", inner, "<i>after</i></div>")
        });
        let server_b = container.child(0).unwrap().child(1).unwrap();

        hydrate(&container, &prior).unwrap();
        name.set("b".to_string());

        let div = container.child(0).unwrap();
        assert!(div.child(0).unwrap().ptr_eq(&server_b));
        assert_eq!(div.inner_html(), "<b><!--fl:0-->b</b><i>after</i>");
    }

    #[test]
    fn conditional_mounts_fresh_branch() {
        let show = Signal::new(true);
        let (container, prior) = serve(|| {
            crate::html!("<div>", when(show.clone(), || crate::html!("<p>on</p>")), "</div>")
        });

        // The handle is dropped; the binding lives until an explicit teardown.
        hydrate(&container, &prior).unwrap();
        assert_eq!(container.inner_html(), "<div><!--fl:0--><p>on</p></div>");

        show.set(false);
        assert_eq!(container.inner_html(), "<div><!--fl:0--></div>");
    }

    #[test]
    fn mismatched_markup_fails_without_binding() {
        let count = Signal::new(1);
        let (container, prior) = serve(|| crate::html!("<p><b>", count.clone(), "</b></p>"));
        container.set_inner_html("<p>changed</p>");

        let error = hydrate(&container, &prior).unwrap_err();

        assert!(matches!(error, HydrationError::Mismatch { index: 0, .. }));
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn nested_mismatch_leaves_container_and_sources_untouched() {
        let first = Signal::new("a".to_string());
        let second = Signal::new("c".to_string());
        let (container, prior) = serve(|| {
            let a = crate::html!("<b>", first.clone(), "</b>");
            let c = crate::html!("<i>", second.clone(), "</i>");
            crate::html!("<div>", a, "", c, "</div>")
        });
        container.query("i").unwrap().set_inner_html("");
        let before = container.inner_html();

        let error = hydrate(&container, &prior).unwrap_err();

        assert_eq!(
            error,
            HydrationError::Mismatch {
                index: 0,
                path: vec![0, 0]
            }
        );
        assert_eq!(container.inner_html(), before);
        assert_eq!(first.subscriber_count(), 0);
        assert_eq!(second.subscriber_count(), 0);
    }

    #[test]
    fn results_without_call_site_are_rejected() {
        let container = Node::element("div");
        let error = hydrate(&container, &RenderResult::empty()).unwrap_err();
        assert_eq!(error, HydrationError::MissingCallSite);
    }

    #[test]
    fn logical_children_skip_nested_server_content() {
        let parent = Node::element("div");
        parent.set_inner_html("<!--fl:0-->x<!--fl:0-->y<!--/fl-->z<!--/fl--><p></p>");

        let logical = logical_children(&parent.children());

        assert_eq!(logical.len(), 2);
        assert!(logical[0].is_comment());
        assert_eq!(logical[1].tag_name(), Some("p"));
    }
}
