//! String Rendering
//!
//! In string mode a template is never parsed. The scanner's marker-annotated
//! markup is copied through, and each slot's byte range is replaced with the
//! value's current content:
//!
//! - text slots keep their `<!--fl:N-->` marker and gain a closing
//!   `<!--/fl-->` after the content, so hydration can find where server
//!   content for the slot ends
//! - attribute slots are rewritten in place; `null` drops the attribute
//! - event and property bindings are dropped entirely
//! - boolean attributes render as a bare name when truthy
//!
//! Reactive values contribute whatever they hold right now. Conditionals and
//! lists render the branch or items for the current snapshot.

use crate::config::RenderMode;
use crate::dom::{escape_attribute, escape_text};
use crate::render::Renderer;
use crate::result::RenderResult;
use crate::template::scan::{
    SlotContext, BOOLEAN_PREFIX, END_MARKER, EVENT_PREFIX, PROPERTY_PREFIX,
};
use crate::template::{CallSite, CompiledTemplate};
use crate::value::{Primitive, RawHtml, RawMarkup, Value};

/// Render `build` with this thread's renderer switched to string mode.
pub fn render_string<F>(build: F) -> RenderResult
where
    F: FnOnce() -> RenderResult,
{
    Renderer::current().with_mode(RenderMode::String, build)
}

/// Shorthand for `render_string(build).to_html()`.
pub fn render_to_string<F>(build: F) -> String
where
    F: FnOnce() -> RenderResult,
{
    render_string(build).to_html()
}

pub(crate) fn render_markup(
    compiled: &CompiledTemplate,
    site: CallSite,
    statics: &'static [&'static str],
    values: Vec<Value>,
) -> RenderResult {
    let markup = compiled.markup();
    let mut out = String::with_capacity(markup.len() * 2);
    let mut cursor = 0;
    let mut last_attribute = None;

    for slot in compiled.scanned() {
        let value = values.get(slot.index);
        match &slot.context {
            SlotContext::Text { marker } => {
                out.push_str(&markup[cursor..marker.end]);
                if let Some(value) = value {
                    out.push_str(&text_content(value));
                }
                out.push_str("<!--");
                out.push_str(END_MARKER);
                out.push_str("-->");
                cursor = marker.end;
            }
            SlotContext::Attribute { name, attribute } => {
                // Later tokens in the same attribute were folded into the first.
                if last_attribute == Some(attribute.start) {
                    continue;
                }
                last_attribute = Some(attribute.start);
                out.push_str(&markup[cursor..attribute.start]);
                if let Some(value) = value {
                    out.push_str(&attribute_text(name, value));
                }
                cursor = attribute.end;
            }
            SlotContext::Unsupported(_) => {}
        }
    }
    out.push_str(&markup[cursor..]);

    tracing::trace!(%site, bytes = out.len(), "rendered template to string");
    RenderResult::markup_only(out, Some(site), statics, values)
}

/// The primitive a value holds right now, if it holds one.
fn current_primitive(value: &Value) -> Option<Primitive> {
    match value {
        Value::Primitive(primitive) => Some(primitive.clone()),
        Value::Reactive(source) => match source.current()? {
            Value::Primitive(primitive) => Some(primitive),
            _ => None,
        },
        _ => None,
    }
}

fn attribute_text(name: &str, value: &Value) -> String {
    if name.starts_with(EVENT_PREFIX) || name.starts_with(PROPERTY_PREFIX) {
        return String::new();
    }
    if let Some(bare) = name.strip_prefix(BOOLEAN_PREFIX) {
        let truthy = current_primitive(value).is_some_and(|p| p.is_truthy());
        return if truthy { bare.to_string() } else { String::new() };
    }
    match current_primitive(value).and_then(|p| p.to_attribute()) {
        Some(text) => format!("{name}=\"{}\"", escape_attribute(&text)),
        None => String::new(),
    }
}

fn text_content(value: &Value) -> String {
    match value {
        Value::Primitive(primitive) => escape_text(&primitive.to_text()),
        Value::Reactive(source) => source
            .current()
            .map(|current| text_content(&current))
            .unwrap_or_default(),
        Value::Result(nested) => nested.to_html(),
        Value::Html(raw) => raw_markup(raw),
        Value::When(conditional) => conditional
            .render_current()
            .map(|branch| branch.to_html())
            .unwrap_or_default(),
        Value::Each(list) => list
            .render_current()
            .unwrap_or_default()
            .iter()
            .map(RenderResult::to_html)
            .collect(),
        Value::Handler(_) => {
            tracing::warn!("event handler interpolated as text; slot skipped");
            String::new()
        }
    }
}

fn raw_markup(raw: &RawHtml) -> String {
    let tag = raw
        .wrapper
        .clone()
        .unwrap_or_else(|| Renderer::current().config().raw_html_wrapper.clone());
    let inner = match &raw.markup {
        RawMarkup::Static(markup) => markup.clone(),
        RawMarkup::Reactive(source) => source.current().unwrap_or_default(),
    };
    format!("<{tag}>{inner}</{tag}>")
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{each, when};
    use crate::reactive::Signal;
    use crate::value::{on, raw_html};

    #[test]
    fn text_slots_are_escaped_and_bracketed() {
        let html = render_to_string(|| crate::html!("<p>", "<b>&</b>", "</p>"));
        assert_eq!(html, "<p><!--fl:0-->&lt;b&gt;&amp;&lt;/b&gt;<!--/fl--></p>");
    }

    #[test]
    fn attributes_follow_binding_kind() {
        let html = render_to_string(|| {
            crate::html!(
                "<button title=",
                "say \"hi\"",
                " @click=",
                on(|_| {}),
                " .value=",
                3,
                " ?disabled=",
                true,
                " ?hidden=",
                false,
                " data-x=",
                (),
                ">go</button>"
            )
        });
        assert_eq!(html, "<button title=\"say &quot;hi&quot;\"   disabled  >go</button>");
    }

    #[test]
    fn reactive_values_use_current_snapshot() {
        let count = Signal::new(4);
        let html = render_to_string(|| crate::html!("<i>", count.clone(), "</i>"));
        assert_eq!(html, "<i><!--fl:0-->4<!--/fl--></i>");
    }

    #[test]
    fn nested_results_render_as_markup() {
        let html = render_to_string(|| {
            let inner = crate::html!("<b>", "x", "</b>");
            crate::html!("<div>", inner, "</div>")
        });
        assert_eq!(html, "<div><!--fl:0--><b><!--fl:0-->x<!--/fl--></b><!--/fl--></div>");
    }

    #[test]
    fn conditionals_and_lists_render_current_state() {
        let show = Signal::new(true);
        let items = Signal::new(vec![1, 2]);
        let html = render_to_string(|| {
            crate::html!(
                "<div>",
                when(show.clone(), || crate::html!("<p>on</p>")),
                "<ul>",
                each(items.clone(), |n: &i32| *n, |n: crate::LiveValue<i32>| crate::html!("<li>", n.get(), "</li>")),
                "</ul></div>"
            )
        });
        assert_eq!(
            html,
            "<div><!--fl:0--><p>on</p><!--/fl--><ul><!--fl:1-->\
             <li><!--fl:0-->1<!--/fl--></li><li><!--fl:0-->2<!--/fl--></li><!--/fl--></ul></div>"
        );
    }

    #[test]
    fn raw_html_is_wrapped_without_escaping() {
        let html = render_to_string(|| crate::html!("", raw_html("<hr>"), ""));
        assert_eq!(html, "<!--fl:0--><span><hr></span><!--/fl-->");
    }

    #[test]
    fn string_mode_results_have_no_nodes() {
        let result = render_string(|| crate::html!("<p>x</p>"));
        assert!(result.nodes().is_empty());
        assert_eq!(result.markup(), Some("<p>x</p>"));
    }
}
