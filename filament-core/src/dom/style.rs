//! Inline `style` attribute helpers.

use super::node::Node;

/// Parse `a: b; c: d` into ordered pairs.
fn declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn write(node: &Node, decls: &[(String, String)]) {
    if decls.is_empty() {
        node.remove_attribute("style");
        return;
    }
    let style = decls
        .iter()
        .map(|(n, v)| format!("{n}: {v}"))
        .collect::<Vec<_>>()
        .join("; ");
    node.set_attribute("style", style);
}

/// Read one inline style property.
pub fn style_property(node: &Node, name: &str) -> Option<String> {
    let style = node.get_attribute("style")?;
    declarations(&style)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// Set one inline style property, keeping the others.
pub fn set_style_property(node: &Node, name: &str, value: &str) {
    let mut decls = declarations(&node.get_attribute("style").unwrap_or_default());
    match decls.iter_mut().find(|(n, _)| n == name) {
        Some(decl) => decl.1 = value.to_string(),
        None => decls.push((name.to_string(), value.to_string())),
    }
    write(node, &decls);
}

/// Remove one inline style property.
pub fn remove_style_property(node: &Node, name: &str) {
    let mut decls = declarations(&node.get_attribute("style").unwrap_or_default());
    decls.retain(|(n, _)| n != name);
    write(node, &decls);
}
