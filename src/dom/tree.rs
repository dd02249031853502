//! Virtual DOM maintained from snapshots and mutation batches
//!
//! The tree never sees the real page. It is rebuilt from every full snapshot
//! and patched by incremental mutations; every lookup the label resolver needs
//! (parents, siblings, the element-id index) is answered from here.

use crate::dom::node::{AttributeValue, NodeKind, TreeNode};
use crate::dom::roles::classify_role;
use crate::schema::{MutationData, NodeId, SerializedNode};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text never contributes to labels
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Shadow model of the recorded page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualDom {
    nodes: BTreeMap<NodeId, TreeNode>,
    /// Parentless nodes in insertion order (the document, plus any orphans)
    roots: Vec<NodeId>,
    /// `id` attribute -> node carrying it
    id_index: BTreeMap<String, NodeId>,
}

impl VirtualDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current tree and rebuild it from a full snapshot
    pub fn reset_and_build(&mut self, snapshot_root: &SerializedNode) {
        self.nodes.clear();
        self.roots.clear();
        self.id_index.clear();

        self.insert_subtree(snapshot_root, None, None);
        self.refresh_roles();

        debug!(
            nodes = self.nodes.len(),
            indexed_ids = self.id_index.len(),
            "rebuilt shadow DOM from snapshot"
        );
    }

    /// Apply one mutation batch: removes, adds, attribute changes, then text changes
    pub fn apply_mutation(&mut self, batch: &MutationData) {
        for removed in &batch.removes {
            let count = self.remove_subtree(removed.id);
            if count == 0 {
                trace!(node_id = removed.id, "remove ignored, node not in tree");
            }
        }

        for added in &batch.adds {
            if !self.nodes.contains_key(&added.parent_id) {
                debug!(
                    node_id = added.node.id,
                    parent_id = added.parent_id,
                    "parent missing, inserting node as orphan root"
                );
            }
            self.insert_subtree(&added.node, Some(added.parent_id), added.next_id);
        }

        for change in &batch.attributes {
            self.apply_attributes(change.id, &change.attributes);
        }

        for change in &batch.texts {
            match self.nodes.get_mut(&change.id) {
                Some(node) if node.kind.is_text_like() => {
                    node.text_content = change.value.clone();
                }
                Some(_) => trace!(node_id = change.id, "text change on non-text node ignored"),
                None => trace!(node_id = change.id, "text change ignored, node not in tree"),
            }
        }

        self.refresh_roles();

        trace!(
            adds = batch.adds.len(),
            removes = batch.removes.len(),
            attributes = batch.attributes.len(),
            texts = batch.texts.len(),
            nodes = self.nodes.len(),
            "applied mutation batch"
        );
    }

    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// All nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    pub fn id_index(&self) -> &BTreeMap<String, NodeId> {
        &self.id_index
    }

    /// Look a node up by its `id` attribute
    pub fn node_by_element_id(&self, element_id: &str) -> Option<&TreeNode> {
        self.id_index
            .get(element_id)
            .and_then(|id| self.nodes.get(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes
            .get(&id)
            .and_then(|node| node.parent_id)
            .and_then(|parent_id| self.nodes.get(&parent_id))
    }

    /// Ancestors from the direct parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &TreeNode> + '_ {
        std::iter::successors(self.parent(id), move |node| {
            node.parent_id.and_then(|parent_id| self.nodes.get(&parent_id))
        })
    }

    /// Depth-first search below `id` (excluding `id` itself)
    pub fn find_descendant<F>(&self, id: NodeId, predicate: F) -> Option<&TreeNode>
    where
        F: Fn(&TreeNode) -> bool,
    {
        let mut stack: Vec<NodeId> = match self.nodes.get(&id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return None,
        };

        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                if predicate(node) {
                    return Some(node);
                }
                stack.extend(node.children.iter().rev().copied());
            }
        }
        None
    }

    /// `<label for="...">` pointing at the given element id
    pub fn find_label_for(&self, element_id: &str) -> Option<&TreeNode> {
        self.nodes
            .values()
            .find(|node| node.has_tag("label") && node.non_empty_attr("for") == Some(element_id))
    }

    /// Whitespace-collapsed text of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        self.collect_text(id, &mut parts);
        parts
            .iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn collect_text<'a>(&'a self, id: NodeId, parts: &mut Vec<&'a str>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };

        match node.kind {
            NodeKind::Text | NodeKind::CData => {
                if let Some(text) = node.text_content.as_deref() {
                    parts.push(text);
                }
            }
            NodeKind::Element if NON_TEXT_ELEMENTS.contains(&node.tag().unwrap_or_default()) => {}
            NodeKind::Element | NodeKind::Document => {
                for child in &node.children {
                    self.collect_text(*child, parts);
                }
            }
            NodeKind::DocumentType | NodeKind::Comment => {}
        }
    }

    /// CSS selector for a node: `tag#id`, or `tag.class` plus an
    /// `:nth-child(k)` disambiguator when same-tag siblings exist
    pub fn resolve_css_selector(&self, id: NodeId) -> Option<String> {
        let node = self.nodes.get(&id)?;

        match node.kind {
            NodeKind::Element => {}
            NodeKind::Document => return Some("document".to_string()),
            _ => return Some("#text".to_string()),
        }

        let tag = node.tag().unwrap_or("*");
        if let Some(element_id) = node.element_id() {
            return Some(format!("{}#{}", tag, element_id));
        }

        let mut selector = tag.to_string();
        if let Some(classes) = node.non_empty_attr("class") {
            for class in classes.split_whitespace() {
                selector.push('.');
                selector.push_str(class);
            }
        }

        if let Some(position) = self.same_tag_position(node) {
            selector.push_str(&format!(":nth-child({})", position));
        }

        Some(selector)
    }

    /// 1-based position among same-tag siblings, only when there is more than one
    fn same_tag_position(&self, node: &TreeNode) -> Option<usize> {
        let parent = self.nodes.get(&node.parent_id?)?;
        let same_tag: Vec<NodeId> = parent
            .children
            .iter()
            .copied()
            .filter(|child| {
                self.nodes
                    .get(child)
                    .map_or(false, |n| n.is_element() && n.tag_name == node.tag_name)
            })
            .collect();

        if same_tag.len() < 2 {
            return None;
        }
        same_tag.iter().position(|child| *child == node.id).map(|p| p + 1)
    }

    /// Reconstruct HTML for a node and its descendants
    pub fn serialize_html(&self, id: NodeId) -> Option<String> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let mut out = String::new();
        self.write_html(id, &mut out);
        Some(out)
    }

    /// HTML of every root in order
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            self.write_html(*root, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };

        match node.kind {
            NodeKind::Document => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::DocumentType => out.push_str("<!DOCTYPE html>"),
            NodeKind::Text => out.push_str(&escape_text(node.text_content.as_deref().unwrap_or(""))),
            NodeKind::CData => {
                out.push_str("<![CDATA[");
                out.push_str(node.text_content.as_deref().unwrap_or(""));
                out.push_str("]]>");
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(node.text_content.as_deref().unwrap_or(""));
                out.push_str("-->");
            }
            NodeKind::Element => {
                let tag = node.tag().unwrap_or("div");
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value.render()));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }

                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Insert a serialized subtree under `parent` (or as a root when the parent
    /// is missing), placed before `next_id` when that is a current child.
    fn insert_subtree(
        &mut self,
        serialized: &SerializedNode,
        parent: Option<NodeId>,
        next_id: Option<NodeId>,
    ) {
        if self.nodes.contains_key(&serialized.id) {
            self.remove_subtree(serialized.id);
        }

        let kind = NodeKind::from_code(serialized.node_type);
        let attributes = if kind == NodeKind::Element {
            serialized
                .attributes
                .iter()
                .filter_map(|(k, v)| AttributeValue::from_json(v).map(|v| (k.clone(), v)))
                .collect()
        } else {
            Default::default()
        };

        let parent_id = parent.filter(|p| self.nodes.contains_key(p));
        match parent_id {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    let position = next_id
                        .and_then(|next| parent_node.children.iter().position(|c| *c == next));
                    match position {
                        Some(index) => parent_node.children.insert(index, serialized.id),
                        None => parent_node.children.push(serialized.id),
                    }
                }
            }
            None => self.roots.push(serialized.id),
        }

        let node = TreeNode {
            id: serialized.id,
            kind,
            tag_name: serialized
                .tag_name
                .as_ref()
                .filter(|_| kind == NodeKind::Element)
                .map(|t| t.to_ascii_lowercase()),
            attributes,
            text_content: serialized.text_content.clone(),
            parent_id,
            children: Vec::with_capacity(serialized.child_nodes.len()),
            semantic_role: None,
        };

        if let Some(element_id) = node.element_id() {
            self.id_index
                .entry(element_id.to_string())
                .or_insert(node.id);
        }
        self.nodes.insert(node.id, node);

        for child in &serialized.child_nodes {
            self.insert_subtree(child, Some(serialized.id), None);
        }
    }

    /// Remove a node and all its descendants; returns how many nodes were removed
    fn remove_subtree(&mut self, id: NodeId) -> usize {
        let Some(parent_id) = self.nodes.get(&id).map(|node| node.parent_id) else {
            return 0;
        };

        match parent_id.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent) => parent.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if let Some(element_id) = node.element_id() {
                    self.release_element_id(element_id, node.id);
                }
                stack.extend(node.children.iter().copied());
                removed += 1;
            }
        }
        removed
    }

    fn apply_attributes(
        &mut self,
        id: NodeId,
        changes: &indexmap::IndexMap<String, serde_json::Value>,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            trace!(node_id = id, "attribute change ignored, node not in tree");
            return;
        };

        let old_element_id = node.element_id().map(str::to_string);

        for (name, raw) in changes {
            // Style-like maps are diffs: merge key-wise instead of replacing
            if let (Some(AttributeValue::Map(existing)), serde_json::Value::Object(diff)) =
                (node.attributes.get_mut(name), raw)
            {
                for (key, value) in diff {
                    match AttributeValue::from_json(value) {
                        Some(v) => {
                            existing.insert(key.clone(), v);
                        }
                        None => {
                            existing.shift_remove(key);
                        }
                    }
                }
                continue;
            }

            match AttributeValue::from_json(raw) {
                Some(value) => {
                    node.attributes.insert(name.clone(), value);
                }
                None => {
                    node.attributes.shift_remove(name);
                }
            }
        }

        let new_element_id = node.element_id().map(str::to_string);
        if old_element_id != new_element_id {
            if let Some(old) = old_element_id {
                self.release_element_id(&old, id);
            }
            if let Some(new) = new_element_id {
                self.id_index.entry(new).or_insert(id);
            }
        }
    }

    /// Unindex `holder` for `element_id`. Duplicate ids keep the earliest
    /// holder, so another node still carrying the id takes over.
    fn release_element_id(&mut self, element_id: &str, holder: NodeId) {
        if self.id_index.get(element_id) != Some(&holder) {
            return;
        }
        self.id_index.remove(element_id);

        let successor = self
            .nodes
            .values()
            .find(|node| node.id != holder && node.element_id() == Some(element_id))
            .map(|node| node.id);
        if let Some(successor) = successor {
            self.id_index.insert(element_id.to_string(), successor);
        }
    }

    fn refresh_roles(&mut self) {
        for node in self.nodes.values_mut() {
            node.semantic_role = classify_role(node);
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
