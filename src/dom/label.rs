//! Human-readable label resolution
//!
//! Labels come from structured attributes and text nodes of the shadow tree,
//! following a fixed priority chain. Every step skips blank values.

use crate::config::DEFAULT_MAX_LABEL_CHARS;
use crate::dom::node::TreeNode;
use crate::dom::tree::VirtualDom;
use crate::schema::NodeId;

/// Tags whose label may come from an associated `<label>`
const FORM_CONTROLS: &[&str] = &["input", "textarea", "select", "button"];

/// Resolve a label with the default length limit
pub fn resolve_label(dom: &VirtualDom, id: NodeId) -> String {
    resolve_label_with_limit(dom, id, DEFAULT_MAX_LABEL_CHARS)
}

/// Resolve the best available label for a node.
///
/// Priority: `aria-label`, `aria-labelledby` targets, `title`, `alt`,
/// `placeholder`, own text, associated or enclosing `<label>` (form controls),
/// sibling text, `<figcaption>` (images), semantic role, CSS selector, `#<id>`.
pub fn resolve_label_with_limit(dom: &VirtualDom, id: NodeId, max_chars: usize) -> String {
    let Some(node) = dom.get_node(id) else {
        return format!("#{}", id);
    };

    if let Some(label) = descriptive_label(dom, node) {
        return truncate(&label, max_chars);
    }

    node.semantic_role
        .clone()
        .or_else(|| dom.resolve_css_selector(id))
        .unwrap_or_else(|| format!("#{}", id))
}

/// Label for an input target: `placeholder`, `aria-label`, `name`, then the
/// semantic role, then the general chain.
pub fn resolve_input_label(dom: &VirtualDom, id: NodeId, max_chars: usize) -> String {
    let preferred = dom.get_node(id).and_then(|node| {
        ["placeholder", "aria-label", "name"]
            .iter()
            .find_map(|attr| node.non_empty_attr(attr))
            .map(|label| truncate(label, max_chars))
            .or_else(|| node.semantic_role.clone())
    });

    preferred.unwrap_or_else(|| resolve_label_with_limit(dom, id, max_chars))
}

/// Steps 1 through 9 of the chain: everything that yields real text
fn descriptive_label(dom: &VirtualDom, node: &TreeNode) -> Option<String> {
    node.non_empty_attr("aria-label")
        .map(str::to_string)
        .or_else(|| labelled_by(dom, node))
        .or_else(|| node.non_empty_attr("title").map(str::to_string))
        .or_else(|| node.non_empty_attr("alt").map(str::to_string))
        .or_else(|| node.non_empty_attr("placeholder").map(str::to_string))
        .or_else(|| non_empty(dom.text_content(node.id)))
        .or_else(|| form_control_label(dom, node))
        .or_else(|| sibling_text(dom, node))
        .or_else(|| figure_caption(dom, node))
}

fn labelled_by(dom: &VirtualDom, node: &TreeNode) -> Option<String> {
    let references = node.non_empty_attr("aria-labelledby")?;
    let text = references
        .split_whitespace()
        .filter_map(|element_id| dom.node_by_element_id(element_id))
        .map(|target| dom.text_content(target.id))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    non_empty(text)
}

fn form_control_label(dom: &VirtualDom, node: &TreeNode) -> Option<String> {
    if !FORM_CONTROLS.iter().any(|tag| node.has_tag(tag)) {
        return None;
    }

    if let Some(label) = node
        .element_id()
        .and_then(|element_id| dom.find_label_for(element_id))
        .and_then(|label| non_empty(dom.text_content(label.id)))
    {
        return Some(label);
    }

    dom.ancestors(node.id).find_map(|ancestor| {
        if ancestor.has_tag("label") {
            if let Some(text) = non_empty(dom.text_content(ancestor.id)) {
                return Some(text);
            }
        }
        ancestor.non_empty_attr("aria-label").map(str::to_string)
    })
}

fn sibling_text(dom: &VirtualDom, node: &TreeNode) -> Option<String> {
    let parent = dom.get_node(node.parent_id?)?;
    parent
        .children
        .iter()
        .filter(|sibling| **sibling != node.id)
        .find_map(|sibling| non_empty(dom.text_content(*sibling)))
}

fn figure_caption(dom: &VirtualDom, node: &TreeNode) -> Option<String> {
    if !node.has_tag("img") {
        return None;
    }

    let figure = dom.ancestors(node.id).find(|a| a.has_tag("figure"))?;
    let caption = dom.find_descendant(figure.id, |n| n.has_tag("figcaption"))?;
    non_empty(dom.text_content(caption.id))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

/// Collapse whitespace and cap the length at `max_chars` characters
fn truncate(label: &str, max_chars: usize) -> String {
    let collapsed = label.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
