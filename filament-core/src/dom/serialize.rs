//! Markup serialization with escaping.

use super::node::{Node, NodeKind};
use super::parse::{is_raw_text_element, is_void_element};

/// Escape text content: `&`, `<`, `>`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a double-quoted attribute value: `&`, `"`, `<`, `>`.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn outer_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, false, &mut out);
    out
}

pub(crate) fn inner_html(node: &Node) -> String {
    let raw = node.tag_name().is_some_and(is_raw_text_element);
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, raw, &mut out);
    }
    out
}

fn write_node(node: &Node, raw_parent: bool, out: &mut String) {
    match node.kind() {
        NodeKind::Text if raw_parent => out.push_str(&node.data()),
        NodeKind::Text => out.push_str(&escape_text(&node.data())),
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&node.data());
            out.push_str("-->");
        }
        NodeKind::Fragment => out.push_str(&inner_html(node)),
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in node.attributes() {
                out.push(' ');
                out.push_str(&name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(tag) {
                return;
            }
            out.push_str(&inner_html(node));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
