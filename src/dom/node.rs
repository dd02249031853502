//! Shadow DOM node types

use crate::schema::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Node kind, from the recorder's node type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    DocumentType,
    Element,
    Text,
    CData,
    Comment,
}

impl NodeKind {
    /// Unknown codes are read as text so their content is still searchable
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => NodeKind::Document,
            1 => NodeKind::DocumentType,
            2 => NodeKind::Element,
            4 => NodeKind::CData,
            5 => NodeKind::Comment,
            _ => NodeKind::Text,
        }
    }

    /// Kinds whose `text_content` carries character data
    pub fn is_text_like(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::CData | NodeKind::Comment)
    }
}

/// Attribute value; absent values are represented by a missing key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    /// Structured values such as recorded style declarations
    Map(IndexMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Convert a wire value. `null` and `false` mean "absent" and yield `None`;
    /// `true` is an HTML boolean attribute and becomes an empty string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null | serde_json::Value::Bool(false) => None,
            serde_json::Value::Bool(true) => Some(AttributeValue::Text(String::new())),
            serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
            serde_json::Value::Number(n) => Some(AttributeValue::Text(n.to_string())),
            serde_json::Value::Array(items) => Some(AttributeValue::Text(
                items
                    .iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            )),
            serde_json::Value::Object(map) => Some(AttributeValue::Map(
                map.iter()
                    .filter_map(|(k, v)| AttributeValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Map(_) => None,
        }
    }

    /// Render as a single attribute string (`k: v; k2: v2` for maps)
    pub fn render(&self) -> String {
        match self {
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::Map(map) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.render()))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// One node of the shadow DOM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Lower-cased tag name, elements only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttributeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Cached result of role classification, refreshed after every mutation batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_role: Option<String>,
}

impl TreeNode {
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_name.as_deref() == Some(tag)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// String attribute value, if present and textual
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_str)
    }

    /// Attribute value trimmed, `None` when missing or blank
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|s| !s.is_empty())
    }

    /// The element's `id` attribute
    pub fn element_id(&self) -> Option<&str> {
        self.non_empty_attr("id")
    }
}
