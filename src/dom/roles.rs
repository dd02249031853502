//! Semantic role classification
//!
//! Roles depend only on a node's tag and attributes, never on its position in
//! the tree, so the tree can recompute them for every node after each batch.

use crate::dom::node::{NodeKind, TreeNode};

/// ARIA state attributes and the role they imply, checked in order
const ARIA_STATE_ROLES: &[(&str, &str)] = &[
    ("aria-checked", "checkbox"),
    ("aria-selected", "option"),
    ("aria-expanded", "button"),
    ("aria-pressed", "button"),
    ("aria-haspopup", "button"),
    ("aria-controls", "button"),
];

/// Attributes that make a generic container behave like a button
const INTERACTION_SIGNALS: &[&str] = &[
    "onclick",
    "onmouseover",
    "tabindex",
    "data-interactive",
    "data-clickable",
];

/// Attributes that make a generic container behave like a text field
const FORM_DATA_SIGNALS: &[&str] = &["contenteditable", "data-field", "data-input"];

/// Classify a node into a normalized, ARIA-flavored role.
///
/// Returns `None` for text-like nodes and elements with no meaningful role.
pub fn classify_role(node: &TreeNode) -> Option<String> {
    match node.kind {
        NodeKind::Document => return Some("document".to_string()),
        NodeKind::Element => {}
        _ => return None,
    }

    if let Some(role) = node.non_empty_attr("role") {
        return Some(role.to_ascii_lowercase());
    }

    if let Some((_, role)) = ARIA_STATE_ROLES
        .iter()
        .find(|(attr, _)| node.has_attr(attr))
    {
        return Some((*role).to_string());
    }

    let tag = node.tag()?;
    let role = match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "a" => {
            if node.has_attr("href") {
                "link"
            } else {
                "button"
            }
        }
        "button" => "button",
        "input" => input_role(node),
        "select" => {
            if node.has_attr("multiple") {
                "listbox"
            } else {
                "dropdown"
            }
        }
        "textarea" => "textbox",
        "option" => "option",
        "label" => "label",
        "form" => "form",
        "nav" => "navigation",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "img" | "svg" | "picture" => "image",
        "figure" => "figure",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "header" => "banner",
        "footer" => "contentinfo",
        "main" => "main",
        "aside" => "complementary",
        "section" => "region",
        "article" => "article",
        "dialog" => "dialog",
        "p" => "paragraph",
        "video" | "audio" => "media",
        "body" | "html" => "document",
        "div" | "span" => container_role(node),
        _ => return None,
    };

    Some(role.to_string())
}

fn input_role(node: &TreeNode) -> &'static str {
    let input_type = match node.non_empty_attr("type") {
        Some(t) => t.to_ascii_lowercase(),
        None => return "form_input",
    };

    match input_type.as_str() {
        "text" | "email" | "password" | "search" | "tel" | "url" | "number" => "form_input",
        "checkbox" => "checkbox",
        "radio" => "radio",
        "button" | "submit" | "reset" | "image" => "button",
        "file" => "file_input",
        "range" => "slider",
        "color" => "color_input",
        "date" | "datetime-local" | "month" | "week" | "time" => "date_input",
        _ => "input",
    }
}

fn container_role(node: &TreeNode) -> &'static str {
    if INTERACTION_SIGNALS.iter().any(|attr| node.has_attr(attr)) {
        return "button";
    }

    let has_form_data = FORM_DATA_SIGNALS.iter().any(|attr| node.has_attr(attr))
        || node.attributes.keys().any(|k| k.starts_with("data-form"));
    if has_form_data {
        return "textbox";
    }

    "generic_container"
}
