//! Compiled templates and slot records.

use smallvec::SmallVec;

use super::scan::{self, ScannedSlot, BOOLEAN_PREFIX, EVENT_PREFIX, PROPERTY_PREFIX};
use super::CallSite;
use crate::config::RenderMode;
use crate::dom::Node;

/// Child indices from the template root down to a slot's target node.
pub type NodePath = SmallVec<[usize; 8]>;

/// How a slot binds to its target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Placeholder comment in text content.
    Text,
    /// Plain attribute value.
    Attribute,
    /// `@name`: event listener.
    Event,
    /// `.name`: element property.
    Property,
    /// `?name`: attribute presence.
    BooleanAttribute,
}

/// One bindable position in a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub kind: SlotKind,
    /// Index into the render call's value list.
    pub index: usize,
    /// Attribute, event or property name, with the sigil prefix removed.
    pub name: Option<String>,
    pub path: NodePath,
}

/// The compiled form of one call site.
///
/// In DOM mode it owns a parsed fragment that every render deep-clones. In
/// string mode there is no fragment and no slot records, only the annotated
/// markup and the scanner's byte ranges used for string rendering.
#[derive(Debug)]
pub struct CompiledTemplate {
    site: CallSite,
    mode: RenderMode,
    markup: String,
    fragment: Option<Node>,
    slots: Vec<SlotRecord>,
    scanned: Vec<ScannedSlot>,
}

impl CompiledTemplate {
    /// Compile `statics` for `mode`.
    pub fn compile(site: CallSite, statics: &[&str], mode: RenderMode) -> Self {
        let scan::Scan { markup, slots: scanned } = scan::scan(statics);

        let (fragment, slots) = match mode {
            RenderMode::String => (None, Vec::new()),
            RenderMode::Dom => {
                let fragment = Node::parse_fragment(&markup);
                let mut slots = Vec::new();
                let mut path = NodePath::new();
                collect(&fragment, &mut path, &mut slots);
                (Some(fragment), slots)
            }
        };

        tracing::debug!(
            %site,
            ?mode,
            slots = slots.len(),
            interpolations = statics.len().saturating_sub(1),
            "compiled template"
        );

        Self {
            site,
            mode,
            markup,
            fragment,
            slots,
            scanned,
        }
    }

    pub fn site(&self) -> CallSite {
        self.site
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Marker-annotated markup, before parsing.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Slot records in document order. Empty in string mode.
    pub fn slots(&self) -> &[SlotRecord] {
        &self.slots
    }

    pub(crate) fn scanned(&self) -> &[ScannedSlot] {
        &self.scanned
    }

    /// Fresh copy of the compiled structure for one render.
    pub fn instantiate(&self) -> Option<Node> {
        self.fragment.as_ref().map(Node::deep_clone)
    }
}

fn collect(parent: &Node, path: &mut NodePath, slots: &mut Vec<SlotRecord>) {
    for (position, child) in parent.children().iter().enumerate() {
        path.push(position);
        if child.is_comment() {
            if let Some(index) = scan::parse_text_marker(&child.data()) {
                slots.push(SlotRecord {
                    kind: SlotKind::Text,
                    index,
                    name: None,
                    path: path.clone(),
                });
            }
        } else if child.is_element() {
            record_attributes(child, path, slots);
            collect(child, path, slots);
        }
        path.pop();
    }
}

/// Record and strip every bind or tokenized attribute on `element`.
fn record_attributes(element: &Node, path: &NodePath, slots: &mut Vec<SlotRecord>) {
    for (name, value) in element.attributes() {
        let tokens = scan::find_tokens(&value);
        let bound = [
            (EVENT_PREFIX, SlotKind::Event),
            (PROPERTY_PREFIX, SlotKind::Property),
            (BOOLEAN_PREFIX, SlotKind::BooleanAttribute),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| name.strip_prefix(prefix).map(|bare| (kind, bare)))
        .map(|(kind, bare)| match kind {
            SlotKind::Event | SlotKind::Property => (kind, scan::restore_case(bare)),
            _ => (kind, bare.to_string()),
        });

        let (kind, bare) = match (bound, tokens.first()) {
            (Some(bound), Some(_)) => bound,
            (None, Some(_)) => {
                if value != scan::attribute_token(tokens[0]) {
                    tracing::debug!(
                        attribute = %name,
                        "static text around an attribute binding is discarded"
                    );
                }
                (SlotKind::Attribute, name.clone())
            }
            (Some(_), None) => {
                tracing::warn!(attribute = %name, "bind attribute without an interpolated value");
                element.remove_attribute(&name);
                continue;
            }
            (None, None) => continue,
        };

        if tokens.len() > 1 {
            tracing::warn!(
                attribute = %name,
                ignored = ?&tokens[1..],
                "only the first interpolation in an attribute is bound"
            );
        }
        element.remove_attribute(&name);
        slots.push(SlotRecord {
            kind,
            index: tokens[0],
            name: Some(bare),
            path: path.clone(),
        });
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn site() -> CallSite {
        CallSite::new("compile.rs", 1, 1)
    }

    #[test]
    fn records_text_and_attribute_slots_with_paths() {
        let compiled = CompiledTemplate::compile(
            site(),
            &["<div class=\"", "\"><p>", "</p><b>", "</b></div>"],
            RenderMode::Dom,
        );

        assert_eq!(
            compiled.slots(),
            &[
                SlotRecord {
                    kind: SlotKind::Attribute,
                    index: 0,
                    name: Some("class".into()),
                    path: smallvec![0],
                },
                SlotRecord {
                    kind: SlotKind::Text,
                    index: 1,
                    name: None,
                    path: smallvec![0, 0, 0],
                },
                SlotRecord {
                    kind: SlotKind::Text,
                    index: 2,
                    name: None,
                    path: smallvec![0, 1, 0],
                },
            ]
        );
    }

    #[test]
    fn bind_attributes_are_recorded_and_stripped() {
        let compiled = CompiledTemplate::compile(
            site(),
            &["<button @click=", " .value=", " ?hidden=", " title=\"t\">go</button>"],
            RenderMode::Dom,
        );
        let kinds: Vec<_> = compiled
            .slots()
            .iter()
            .map(|s| (s.kind, s.name.clone().unwrap_or_default()))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (SlotKind::Event, "click".to_string()),
                (SlotKind::Property, "value".to_string()),
                (SlotKind::BooleanAttribute, "hidden".to_string()),
            ]
        );
        let button = compiled.instantiate().unwrap().first_child().unwrap();
        assert_eq!(button.attributes(), vec![("title".to_string(), "t".to_string())]);
    }

    #[test]
    fn bound_names_keep_their_case() {
        let compiled = CompiledTemplate::compile(
            site(),
            &["<div .textContent=", " @myEvent=", " ?Hidden=", "></div>"],
            RenderMode::Dom,
        );
        let names: Vec<_> = compiled.slots().iter().filter_map(|s| s.name.clone()).collect();

        assert_eq!(names, vec!["textContent", "myEvent", "hidden"]);
    }

    #[test]
    fn character_references_decode_in_text_and_attributes() {
        let compiled = CompiledTemplate::compile(
            site(),
            &["<p title=\"a &amp; b\">&copy; 2024 &mdash; x</p>"],
            RenderMode::Dom,
        );
        let p = compiled.instantiate().unwrap().first_child().unwrap();

        assert_eq!(p.text_content(), "\u{a9} 2024 \u{2014} x");
        assert_eq!(p.get_attribute("title"), Some("a & b".into()));
    }

    #[test]
    fn zero_interpolations_have_no_slots() {
        let compiled = CompiledTemplate::compile(site(), &["<p>static</p>"], RenderMode::Dom);

        assert!(compiled.slots().is_empty());
        assert_eq!(compiled.instantiate().unwrap().inner_html(), "<p>static</p>");
    }

    #[test]
    fn string_mode_skips_parsing() {
        let compiled = CompiledTemplate::compile(site(), &["<p>", "</p>"], RenderMode::String);

        assert!(compiled.instantiate().is_none());
        assert!(compiled.slots().is_empty());
        assert_eq!(compiled.markup(), "<p><!--fl:0--></p>");
        assert_eq!(compiled.scanned().len(), 1);
    }

    #[test]
    fn instances_are_independent_copies() {
        let compiled = CompiledTemplate::compile(site(), &["<p>", "</p>"], RenderMode::Dom);
        let a = compiled.instantiate().unwrap();
        let b = compiled.instantiate().unwrap();

        a.first_child().unwrap().set_attribute("id", "a");
        assert!(!b.first_child().unwrap().has_attribute("id"));
    }
}
