//! Semantic interaction types
//!
//! These are the engine's output: normalized interactions enriched with labels
//! and roles resolved from the shadow DOM at the moment they happened.

use crate::schema::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic interaction categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Click,
    RageClick,
    Hover,
    Input,
    Scroll,
    Navigation,
    LeavePage,
}

impl InteractionType {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionType::Click => "click",
            InteractionType::RageClick => "rage_click",
            InteractionType::Hover => "hover",
            InteractionType::Input => "input",
            InteractionType::Scroll => "scroll",
            InteractionType::Navigation => "navigation",
            InteractionType::LeavePage => "leave_page",
        }
    }

    /// Interactions that show the page responded to a click
    pub fn is_follow_on(self) -> bool {
        matches!(
            self,
            InteractionType::Navigation
                | InteractionType::Input
                | InteractionType::Scroll
                | InteractionType::Hover
        )
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticInteraction {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub label: Option<String>,
    pub semantic_role: Option<String>,
    pub node_id: Option<NodeId>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Type-specific payload (coordinates, scroll direction, click counts, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SemanticInteraction {
    pub fn new(kind: InteractionType, timestamp: i64) -> Self {
        Self {
            kind,
            label: None,
            semantic_role: None,
            node_id: None,
            timestamp,
            extra: BTreeMap::new(),
        }
    }

    /// Attach the target node, its label and role
    pub fn with_target(mut self, node_id: NodeId, label: String, role: Option<String>) -> Self {
        self.node_id = Some(node_id);
        self.label = Some(label);
        self.semantic_role = role;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Insert an extra field; `None` values are skipped
    pub fn with_extra<V: Into<serde_json::Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.extra.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    pub fn extra_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(|v| v.as_i64())
    }

    /// Label, or a placeholder when the target could not be named
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("unknown element")
    }
}

/// Click history for one node, kept until the parser finishes a pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickTracker {
    pub timestamps: Vec<i64>,
    pub label: Option<String>,
    pub role: Option<String>,
}

impl ClickTracker {
    pub fn record(&mut self, timestamp: i64, label: &str, role: Option<&str>) {
        self.timestamps.push(timestamp);
        self.label = Some(label.to_string());
        self.role = role.map(str::to_string);
    }

    /// Timestamps in ascending order
    pub fn sorted_timestamps(&self) -> Vec<i64> {
        let mut sorted = self.timestamps.clone();
        sorted.sort_unstable();
        sorted
    }
}

/// Per-node click trackers
pub type ClickTrackers = BTreeMap<NodeId, ClickTracker>;
