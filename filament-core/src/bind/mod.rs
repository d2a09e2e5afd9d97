//! Slot Binding
//!
//! The binder takes one fresh instance of a compiled template and attaches
//! every slot to its value. It works in two passes:
//!
//! 1. **Resolve.** Walk every slot's recorded path in the instance before
//!    touching anything. Text slots replace nodes, so resolving lazily would
//!    let one slot's mutation shift another's path.
//! 2. **Bind.** Dispatch on [`SlotKind`]. Text slots go through the text
//!    dispatcher, which may hand the placeholder to a conditional controller
//!    or list reconciler.
//!
//! A path that does not resolve means the compiler and binder disagree. The
//! slot is skipped with a warning and the rest of the render proceeds.
//!
//! Every subscription, listener and nested teardown lands on the render's one
//! [`Teardown`].

mod attr;
pub(crate) mod conditional;
pub(crate) mod list;
pub(crate) mod text;

pub use conditional::{when, Conditional};
pub use list::{each, KeyedList};

use crate::dom::Node;
use crate::error::EngineError;
use crate::result::{RenderResult, Root, Teardown};
use crate::template::{SlotKind, SlotRecord};
use crate::value::Value;

use self::text::TextOutcome;

/// Per-render binding context.
pub(crate) struct Binder<'a> {
    values: &'a [Value],
    pub(crate) teardown: &'a Teardown,
    /// Statically spliced nested results, whose mount hooks move to the parent.
    pub(crate) adopted: Vec<RenderResult>,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(values: &'a [Value], teardown: &'a Teardown) -> Self {
        Self {
            values,
            teardown,
            adopted: Vec::new(),
        }
    }

    /// Bind `slots` against already-resolved `targets`, returning the
    /// template's top-level roots with dynamic slots substituted.
    pub(crate) fn bind(
        &mut self,
        slots: &[SlotRecord],
        targets: Vec<Option<Node>>,
        top_level: Vec<Node>,
    ) -> Vec<Root> {
        let values = self.values;
        let mut roots: Vec<Root> = top_level.into_iter().map(Root::Node).collect();

        for (slot, target) in slots.iter().zip(targets) {
            let Some(target) = target else {
                let error = EngineError::UnresolvedSlot {
                    index: slot.index,
                    path: slot.path.to_vec(),
                };
                tracing::warn!(%error, "skipping slot");
                continue;
            };
            let Some(value) = values.get(slot.index) else {
                tracing::warn!(slot = slot.index, "no value supplied for slot; skipping");
                continue;
            };
            let name = slot.name.as_deref().unwrap_or_default();

            match slot.kind {
                SlotKind::Attribute => attr::bind_attribute(&target, name, value, self.teardown),
                SlotKind::Property => attr::bind_property(&target, name, value, self.teardown),
                SlotKind::BooleanAttribute => attr::bind_boolean(&target, name, value, self.teardown),
                SlotKind::Event => attr::bind_event(&target, name, value, self.teardown),
                SlotKind::Text => {
                    let outcome = text::bind_text(&target, value, self);
                    if slot.path.len() == 1 {
                        substitute(&mut roots, &target, outcome);
                    }
                }
            }
        }
        roots
    }
}

/// Replace a top-level placeholder's root entry with what the slot produced.
fn substitute(roots: &mut Vec<Root>, placeholder: &Node, outcome: TextOutcome) {
    let Some(position) = roots
        .iter()
        .position(|root| matches!(root, Root::Node(node) if node.ptr_eq(placeholder)))
    else {
        return;
    };
    match outcome {
        TextOutcome::Replaced(replacement) => {
            roots.splice(position..=position, replacement);
        }
        TextOutcome::Anchored(region) => {
            roots.insert(position + 1, Root::Region(region));
        }
    }
}

/// Walk `path` from a fragment root.
pub(crate) fn resolve(root: &Node, path: &[usize]) -> Option<Node> {
    path.iter()
        .try_fold(root.clone(), |node, &index| node.child(index))
}

/// Resolve every slot before any of them mutates the instance.
pub(crate) fn resolve_all(root: &Node, slots: &[SlotRecord]) -> Vec<Option<Node>> {
    slots.iter().map(|slot| resolve(root, &slot.path)).collect()
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderMode;
    use crate::template::{CallSite, CompiledTemplate};
    use smallvec::smallvec;

    fn instance(statics: &[&str]) -> (CompiledTemplate, Node) {
        let compiled = CompiledTemplate::compile(CallSite::new("bind.rs", 1, 1), statics, RenderMode::Dom);
        let fragment = compiled.instantiate().unwrap();
        (compiled, fragment)
    }

    #[test]
    fn resolves_paths_before_mutating() {
        let (compiled, fragment) = instance(&["", "<p>", "</p>"]);
        let values = [Value::from("a"), Value::from("b")];
        let teardown = Teardown::new();

        let targets = resolve_all(&fragment, compiled.slots());
        let roots = Binder::new(&values, &teardown).bind(compiled.slots(), targets, fragment.children());

        assert_eq!(fragment.inner_html(), "a<p>b</p>");
        assert_eq!(roots.len(), 2);
        assert!(teardown.is_empty());
    }

    #[test]
    fn unresolved_slot_is_skipped_and_others_bind() {
        let (compiled, fragment) = instance(&["<p>", "</p><b>", "</b>"]);
        let mut slots = compiled.slots().to_vec();
        slots[0].path = smallvec![9, 9];
        let values = [Value::from("lost"), Value::from("kept")];
        let teardown = Teardown::new();

        let targets = resolve_all(&fragment, &slots);
        Binder::new(&values, &teardown).bind(&slots, targets, fragment.children());

        assert_eq!(fragment.inner_html(), "<p><!--fl:0--></p><b>kept</b>");
    }

    #[test]
    fn missing_values_are_skipped() {
        let (compiled, fragment) = instance(&["<p title=", ">", "</p>"]);
        let teardown = Teardown::new();

        let targets = resolve_all(&fragment, compiled.slots());
        Binder::new(&[], &teardown).bind(compiled.slots(), targets, fragment.children());

        assert_eq!(fragment.inner_html(), "<p><!--fl:1--></p>");
    }
}
