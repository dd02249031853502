//! rrweb event schema definition
//!
//! The recorder emits `{ "type": <code>, "data": {...}, "timestamp": <ms> }`
//! records. Numeric codes cannot drive serde's tagged enums directly, so every
//! record is first read into a lenient [`RawEvent`] and then classified into a
//! typed [`RecordedEvent`] per `(type, source)` pair. Records that do not fit
//! any known shape become [`RecordedEvent::Unrecognized`] instead of failing
//! the whole log.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Input schema identifier reported by the CLI and FFI
pub const SCHEMA_VERSION: &str = "rrweb.event.v2";

/// Node identity assigned by the recorder
pub type NodeId = i64;

// Top-level event type codes
pub const EVENT_DOM_CONTENT_LOADED: u64 = 0;
pub const EVENT_LOAD: u64 = 1;
pub const EVENT_FULL_SNAPSHOT: u64 = 2;
pub const EVENT_INCREMENTAL_SNAPSHOT: u64 = 3;
pub const EVENT_META: u64 = 4;
pub const EVENT_CUSTOM: u64 = 5;
pub const EVENT_PLUGIN: u64 = 6;

// Incremental snapshot source codes
pub const SOURCE_MUTATION: u64 = 0;
pub const SOURCE_MOUSE_MOVE: u64 = 1;
pub const SOURCE_MOUSE_INTERACTION: u64 = 2;
pub const SOURCE_SCROLL: u64 = 3;
pub const SOURCE_VIEWPORT_RESIZE: u64 = 4;
pub const SOURCE_INPUT: u64 = 5;
/// Highest source code the recorder currently defines
pub const SOURCE_MAX_KNOWN: u64 = 16;

// Mouse interaction sub-type codes we react to
pub const MOUSE_CLICK: u8 = 2;
pub const MOUSE_DBL_CLICK: u8 = 4;

/// A DOM node as serialized in full snapshots and add mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    /// Node type code (0 document, 1 doctype, 2 element, 3 text, 4 cdata, 5 comment)
    #[serde(rename = "type")]
    pub node_type: u8,
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Raw attribute values; strings, numbers, booleans or nested style maps
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_nodes: Vec<SerializedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

/// Initial scroll offset of a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
}

/// Payload of a full snapshot event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshotData {
    pub node: SerializedNode,
    #[serde(default)]
    pub initial_offset: ScrollOffset,
}

/// A node subtree inserted by a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedNode {
    pub parent_id: NodeId,
    /// Sibling the node is inserted before, when known
    #[serde(default)]
    pub next_id: Option<NodeId>,
    pub node: SerializedNode,
}

/// A node removed by a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNode {
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub id: NodeId,
}

/// Attribute changes on one node; `null` values delete the attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMutation {
    pub id: NodeId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

/// Text replacement on one text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMutation {
    pub id: NodeId,
    #[serde(default)]
    pub value: Option<String>,
}

/// One batch of incremental DOM changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationData {
    #[serde(default)]
    pub adds: Vec<AddedNode>,
    #[serde(default)]
    pub removes: Vec<RemovedNode>,
    #[serde(default)]
    pub attributes: Vec<AttributeMutation>,
    #[serde(default)]
    pub texts: Vec<TextMutation>,
}

/// Mouse interaction sub-type, either the recorder's numeric code or a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MouseInteractionKind {
    Code(u8),
    Name(String),
}

impl MouseInteractionKind {
    /// Single and double clicks both count toward click trackers
    pub fn is_click(&self) -> bool {
        match self {
            MouseInteractionKind::Code(code) => *code == MOUSE_CLICK || *code == MOUSE_DBL_CLICK,
            MouseInteractionKind::Name(name) => {
                matches!(name.to_ascii_lowercase().as_str(), "click" | "dblclick")
            }
        }
    }

    pub fn is_hover(&self) -> bool {
        match self {
            MouseInteractionKind::Code(_) => false,
            MouseInteractionKind::Name(name) => {
                matches!(
                    name.to_ascii_lowercase().as_str(),
                    "mouseover" | "mouseenter" | "hover"
                )
            }
        }
    }
}

/// Payload of a mouse interaction event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseInteractionData {
    #[serde(rename = "type")]
    pub kind: MouseInteractionKind,
    pub id: NodeId,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

/// Payload of a scroll event; offsets are absolute positions of the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollData {
    pub id: NodeId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Payload of an input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    pub id: NodeId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_checked: Option<bool>,
}

/// Payload of a meta (page load / navigation) event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
}

/// Payload of an application-defined custom event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub tag: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CustomData {
    /// Custom tags the recorder SDK uses when the page is being unloaded
    pub fn is_page_leave(&self) -> bool {
        matches!(
            self.tag.to_ascii_lowercase().as_str(),
            "leave-page" | "beforeunload" | "pagehide"
        )
    }
}

/// Why a record could not be classified
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Missing or non-numeric event type")]
    MissingEventType,

    #[error("Unknown event type: {0}")]
    UnknownEventType(u64),

    #[error("Incremental snapshot without a numeric source")]
    MissingSource,

    #[error("Unknown incremental source: {0}")]
    UnknownSource(u64),

    #[error("Malformed {kind} payload: {reason}")]
    MalformedPayload { kind: String, reason: String },
}

/// Lenient wire representation of one recorded event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub event_type: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: i64,
}

/// Accept integer or fractional millisecond timestamps; anything else reads as 0
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|ms| ms as i64))
        .unwrap_or(0))
}

/// Viewport sizes may arrive fractional; negative or non-numeric sizes read as unknown
fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|size| size.is_finite() && *size >= 0.0)
        .map(|size| size.round().min(f64::from(u32::MAX)) as u32))
}

/// A recorded event classified by `(type, source)`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawEvent")]
pub enum RecordedEvent {
    FullSnapshot { timestamp: i64, data: FullSnapshotData },
    Mutation { timestamp: i64, data: MutationData },
    MouseInteraction { timestamp: i64, data: MouseInteractionData },
    Scroll { timestamp: i64, data: ScrollData },
    Input { timestamp: i64, data: InputData },
    Meta { timestamp: i64, data: MetaData },
    Custom { timestamp: i64, data: CustomData },
    /// A well-formed record the engine has no use for (load markers, mouse moves, ...)
    Ignored {
        timestamp: i64,
        event_type: u64,
        source: Option<u64>,
    },
    /// A record that does not match any known shape
    Unrecognized { timestamp: i64, issue: ValidationIssue },
}

impl RecordedEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            RecordedEvent::FullSnapshot { timestamp, .. }
            | RecordedEvent::Mutation { timestamp, .. }
            | RecordedEvent::MouseInteraction { timestamp, .. }
            | RecordedEvent::Scroll { timestamp, .. }
            | RecordedEvent::Input { timestamp, .. }
            | RecordedEvent::Meta { timestamp, .. }
            | RecordedEvent::Custom { timestamp, .. }
            | RecordedEvent::Ignored { timestamp, .. }
            | RecordedEvent::Unrecognized { timestamp, .. } => *timestamp,
        }
    }

    /// The classification problem, if the record could not be understood
    pub fn issue(&self) -> Option<&ValidationIssue> {
        match self {
            RecordedEvent::Unrecognized { issue, .. } => Some(issue),
            _ => None,
        }
    }

    /// Short name used in logs and validation reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            RecordedEvent::FullSnapshot { .. } => "full_snapshot",
            RecordedEvent::Mutation { .. } => "mutation",
            RecordedEvent::MouseInteraction { .. } => "mouse_interaction",
            RecordedEvent::Scroll { .. } => "scroll",
            RecordedEvent::Input { .. } => "input",
            RecordedEvent::Meta { .. } => "meta",
            RecordedEvent::Custom { .. } => "custom",
            RecordedEvent::Ignored { .. } => "ignored",
            RecordedEvent::Unrecognized { .. } => "unrecognized",
        }
    }
}

fn decode<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, ValidationIssue> {
    serde_json::from_value(data).map_err(|e| ValidationIssue::MalformedPayload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn classify(raw: RawEvent) -> Result<RecordedEvent, ValidationIssue> {
    let timestamp = raw.timestamp;
    let event_type = raw
        .event_type
        .as_u64()
        .ok_or(ValidationIssue::MissingEventType)?;

    match event_type {
        EVENT_FULL_SNAPSHOT => Ok(RecordedEvent::FullSnapshot {
            timestamp,
            data: decode("full snapshot", raw.data)?,
        }),
        EVENT_INCREMENTAL_SNAPSHOT => {
            let source = raw
                .data
                .get("source")
                .and_then(|s| s.as_u64())
                .ok_or(ValidationIssue::MissingSource)?;

            match source {
                SOURCE_MUTATION => Ok(RecordedEvent::Mutation {
                    timestamp,
                    data: decode("mutation", raw.data)?,
                }),
                SOURCE_MOUSE_INTERACTION => Ok(RecordedEvent::MouseInteraction {
                    timestamp,
                    data: decode("mouse interaction", raw.data)?,
                }),
                SOURCE_SCROLL => Ok(RecordedEvent::Scroll {
                    timestamp,
                    data: decode("scroll", raw.data)?,
                }),
                SOURCE_INPUT => Ok(RecordedEvent::Input {
                    timestamp,
                    data: decode("input", raw.data)?,
                }),
                s if s <= SOURCE_MAX_KNOWN => Ok(RecordedEvent::Ignored {
                    timestamp,
                    event_type,
                    source: Some(s),
                }),
                s => Err(ValidationIssue::UnknownSource(s)),
            }
        }
        EVENT_META => Ok(RecordedEvent::Meta {
            timestamp,
            data: decode("meta", raw.data)?,
        }),
        EVENT_CUSTOM => Ok(RecordedEvent::Custom {
            timestamp,
            data: decode("custom", raw.data)?,
        }),
        EVENT_DOM_CONTENT_LOADED | EVENT_LOAD | EVENT_PLUGIN => Ok(RecordedEvent::Ignored {
            timestamp,
            event_type,
            source: None,
        }),
        other => Err(ValidationIssue::UnknownEventType(other)),
    }
}

impl From<RawEvent> for RecordedEvent {
    fn from(raw: RawEvent) -> Self {
        let timestamp = raw.timestamp;
        classify(raw).unwrap_or_else(|issue| RecordedEvent::Unrecognized { timestamp, issue })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RecordedEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_snapshot_classification() {
        let event = parse(json!({
            "type": 2,
            "timestamp": 1000,
            "data": {
                "node": {
                    "type": 0,
                    "id": 1,
                    "childNodes": [
                        { "type": 2, "id": 2, "tagName": "button",
                          "attributes": { "id": "submit" },
                          "childNodes": [{ "type": 3, "id": 3, "textContent": "Buy" }] }
                    ]
                },
                "initialOffset": { "left": 0, "top": 120 }
            }
        }));

        match event {
            RecordedEvent::FullSnapshot { timestamp, data } => {
                assert_eq!(timestamp, 1000);
                assert_eq!(data.node.child_nodes.len(), 1);
                assert_eq!(data.node.child_nodes[0].tag_name.as_deref(), Some("button"));
                assert_eq!(data.initial_offset.top, 120.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_meta_tolerates_odd_viewport_sizes() {
        let event = parse(json!({
            "type": 4,
            "timestamp": 0,
            "data": { "href": "https://shop.test/", "width": 1279.6, "height": -1 }
        }));

        match event {
            RecordedEvent::Meta { data, .. } => {
                assert_eq!(data.href.as_deref(), Some("https://shop.test/"));
                assert_eq!(data.width, Some(1280));
                assert_eq!(data.height, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        match parse(json!({ "type": 4, "timestamp": 0, "data": { "href": "/a", "width": "wide" } })) {
            RecordedEvent::Meta { data, .. } => assert_eq!(data.width, None),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_timestamps_saturate() {
        assert_eq!(parse(json!({ "type": 4, "timestamp": 9.3e18, "data": {} })).timestamp(), i64::MAX);
        assert_eq!(parse(json!({ "type": 4, "timestamp": -9.3e18, "data": {} })).timestamp(), i64::MIN);
    }

    #[test]
    fn test_incremental_sources() {
        let click = parse(json!({
            "type": 3, "timestamp": 5,
            "data": { "source": 2, "type": 2, "id": 7, "x": 10, "y": 20 }
        }));
        match click {
            RecordedEvent::MouseInteraction { data, .. } => {
                assert!(data.kind.is_click());
                assert_eq!(data.id, 7);
                assert_eq!(data.x, Some(10.0));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let input = parse(json!({
            "type": 3, "timestamp": 6,
            "data": { "source": 5, "id": 9, "text": "hello", "isChecked": false }
        }));
        assert!(matches!(
            input,
            RecordedEvent::Input { data: InputData { id: 9, .. }, .. }
        ));

        let mouse_move = parse(json!({
            "type": 3, "timestamp": 7,
            "data": { "source": 1, "positions": [] }
        }));
        assert!(matches!(
            mouse_move,
            RecordedEvent::Ignored { source: Some(SOURCE_MOUSE_MOVE), .. }
        ));
    }

    #[test]
    fn test_hover_names() {
        assert!(MouseInteractionKind::Name("mouseover".to_string()).is_hover());
        assert!(MouseInteractionKind::Name("CLICK".to_string()).is_click());
        assert!(!MouseInteractionKind::Code(MOUSE_CLICK).is_hover());
        assert!(!MouseInteractionKind::Code(0).is_click());
    }

    #[test]
    fn test_malformed_payload_degrades() {
        let event = parse(json!({
            "type": 3, "timestamp": 42,
            "data": { "source": 2, "type": 2 }
        }));

        assert_eq!(event.timestamp(), 42);
        assert!(matches!(
            event.issue(),
            Some(ValidationIssue::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_codes() {
        let unknown_type = parse(json!({ "type": 42, "timestamp": 1, "data": {} }));
        assert_eq!(unknown_type.issue(), Some(&ValidationIssue::UnknownEventType(42)));

        let unknown_source = parse(json!({ "type": 3, "timestamp": 1, "data": { "source": 99 } }));
        assert_eq!(unknown_source.issue(), Some(&ValidationIssue::UnknownSource(99)));

        let no_type = parse(json!({ "timestamp": 1 }));
        assert_eq!(no_type.issue(), Some(&ValidationIssue::MissingEventType));
    }

    #[test]
    fn test_fractional_timestamp() {
        let event = parse(json!({ "type": 4, "timestamp": 1500.7, "data": { "href": "https://a.test" } }));
        assert_eq!(event.timestamp(), 1500);
        assert_eq!(event.kind_name(), "meta");
    }

    #[test]
    fn test_page_leave_custom_tags() {
        let data = CustomData {
            tag: "beforeunload".to_string(),
            payload: serde_json::Value::Null,
        };
        assert!(data.is_page_leave());
    }
}
