//! Session parser
//!
//! Single forward pass over chronologically ordered events. Snapshots and
//! mutations update the shadow DOM; user-facing events are classified into
//! semantic interactions labelled from the tree as it stood at that moment.

use crate::config::AnalyzerConfig;
use crate::dom::{resolve_input_label, resolve_label_with_limit, VirtualDom};
use crate::schema::{
    CustomData, InputData, MetaData, MouseInteractionData, NodeId, RecordedEvent, ScrollData,
};
use crate::session::patterns::{detect_session_end, finalize, resolve_rage_clicks};
use crate::session::types::{ClickTrackers, InteractionType, SemanticInteraction};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Stateful parser for one recorded session.
///
/// The tree, scroll offsets and last-seen timestamp survive `finish`, so a
/// parser can be fed a long session chunk by chunk.
#[derive(Debug, Clone, Default)]
pub struct SessionParser {
    config: AnalyzerConfig,
    dom: VirtualDom,
    click_trackers: ClickTrackers,
    scroll_positions: BTreeMap<NodeId, f64>,
    last_timestamp: Option<i64>,
    interactions: Vec<SemanticInteraction>,
}

impl SessionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The live shadow DOM
    pub fn dom(&self) -> &VirtualDom {
        &self.dom
    }

    /// Timestamp of the latest event processed so far
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Interactions emitted since the last `finish`, before post-processing
    pub fn pending(&self) -> &[SemanticInteraction] {
        &self.interactions
    }

    pub fn process_events(&mut self, events: &[RecordedEvent]) {
        for event in events {
            self.process_event(event);
        }
    }

    /// Apply one event to the tree and emit any interaction it implies
    pub fn process_event(&mut self, event: &RecordedEvent) {
        let timestamp = event.timestamp();

        match event {
            RecordedEvent::FullSnapshot { data, .. } => self.dom.reset_and_build(&data.node),
            RecordedEvent::Mutation { data, .. } => self.dom.apply_mutation(data),
            RecordedEvent::MouseInteraction { data, .. } => {
                self.on_mouse_interaction(timestamp, data)
            }
            RecordedEvent::Scroll { data, .. } => self.on_scroll(timestamp, data),
            RecordedEvent::Input { data, .. } => self.on_input(timestamp, data),
            RecordedEvent::Meta { data, .. } => self.on_meta(timestamp, data),
            RecordedEvent::Custom { data, .. } => self.on_custom(timestamp, data),
            RecordedEvent::Ignored { .. } => {}
            RecordedEvent::Unrecognized { issue, .. } => {
                debug!(timestamp, %issue, "skipping unrecognized event");
            }
        }

        self.last_timestamp = Some(self.last_timestamp.map_or(timestamp, |t| t.max(timestamp)));
    }

    /// Run the post-pass and hand over the finalized interactions.
    ///
    /// Drains the output buffer and click trackers; rage-click windows do not
    /// span two `finish` calls.
    pub fn finish(&mut self) -> Vec<SemanticInteraction> {
        let mut interactions = std::mem::take(&mut self.interactions);
        let trackers = std::mem::take(&mut self.click_trackers);

        detect_session_end(&mut interactions, self.last_timestamp, &self.config);
        resolve_rage_clicks(&mut interactions, &trackers, &self.config);
        finalize(&mut interactions, &self.config);

        debug!(
            interactions = interactions.len(),
            tracked_nodes = trackers.len(),
            "finalized session interactions"
        );
        interactions
    }

    fn label(&self, id: NodeId) -> String {
        resolve_label_with_limit(&self.dom, id, self.config.max_label_chars)
    }

    fn role(&self, id: NodeId) -> Option<String> {
        self.dom.get_node(id).and_then(|n| n.semantic_role.clone())
    }

    fn emit(&mut self, interaction: SemanticInteraction) {
        trace!(
            kind = %interaction.kind,
            timestamp = interaction.timestamp,
            node_id = ?interaction.node_id,
            "interaction"
        );
        self.interactions.push(interaction);
    }

    fn on_mouse_interaction(&mut self, timestamp: i64, data: &MouseInteractionData) {
        let kind = if data.kind.is_click() {
            InteractionType::Click
        } else if data.kind.is_hover() {
            InteractionType::Hover
        } else {
            return;
        };

        let label = self.label(data.id);
        let role = self.role(data.id);

        let mut interaction = SemanticInteraction::new(kind, timestamp)
            .with_target(data.id, label.clone(), role.clone())
            .with_extra("x", data.x)
            .with_extra("y", data.y);

        if kind == InteractionType::Click {
            interaction = interaction.with_extra("selector", self.dom.resolve_css_selector(data.id));
            self.click_trackers
                .entry(data.id)
                .or_default()
                .record(timestamp, &label, role.as_deref());
        }

        self.emit(interaction);
    }

    fn on_scroll(&mut self, timestamp: i64, data: &ScrollData) {
        let previous = self.scroll_positions.insert(data.id, data.y).unwrap_or(0.0);
        let delta = data.y - previous;
        let direction = if delta > 0.0 { "down" } else { "up" };

        let interaction = SemanticInteraction::new(InteractionType::Scroll, timestamp)
            .with_target(data.id, self.label(data.id), self.role(data.id))
            .with_extra("direction", Some(direction))
            .with_extra("distance", Some(delta.abs()));
        self.emit(interaction);
    }

    fn on_input(&mut self, timestamp: i64, data: &InputData) {
        let label = resolve_input_label(&self.dom, data.id, self.config.max_label_chars);
        let role = self.role(data.id);
        // rrweb sends isChecked on every input, text fields included
        let is_toggle = matches!(role.as_deref(), Some("checkbox") | Some("radio"));
        let checked = data.is_checked.filter(|_| is_toggle || data.text.is_none());

        let interaction = SemanticInteraction::new(InteractionType::Input, timestamp)
            .with_target(data.id, label, role)
            .with_extra("value", data.text.clone())
            .with_extra("checked", checked);
        self.emit(interaction);
    }

    fn on_meta(&mut self, timestamp: i64, data: &MetaData) {
        let Some(href) = data.href.as_deref().filter(|h| !h.is_empty()) else {
            return;
        };

        let interaction = SemanticInteraction::new(InteractionType::Navigation, timestamp)
            .with_label(href)
            .with_extra("href", Some(href))
            .with_extra("width", data.width)
            .with_extra("height", data.height);
        self.emit(interaction);
    }

    fn on_custom(&mut self, timestamp: i64, data: &CustomData) {
        if !data.is_page_leave() {
            trace!(tag = %data.tag, "ignoring custom event");
            return;
        }

        let interaction = SemanticInteraction::new(InteractionType::LeavePage, timestamp)
            .with_extra("reason", Some("unload"));
        self.emit(interaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::narrate;
    use crate::schema::EventLogAdapter;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn snapshot(timestamp: i64) -> Value {
        json!({
            "type": 2,
            "timestamp": timestamp,
            "data": { "node": {
                "type": 0, "id": 1, "childNodes": [
                    { "type": 2, "id": 2, "tagName": "html", "childNodes": [
                        { "type": 2, "id": 3, "tagName": "body", "childNodes": [
                            { "type": 2, "id": 1001, "tagName": "button",
                              "attributes": { "id": "submit" },
                              "childNodes": [{ "type": 3, "id": 1002, "textContent": "Buy" }] },
                            { "type": 2, "id": 1003, "tagName": "input",
                              "attributes": { "name": "email", "placeholder": "Your email" } },
                            { "type": 2, "id": 1004, "tagName": "div",
                              "attributes": { "class": "feed" } }
                        ]}
                    ]}
                ]
            }}
        })
    }

    fn click(id: i64, timestamp: i64) -> Value {
        json!({ "type": 3, "timestamp": timestamp,
            "data": { "source": 2, "type": 2, "id": id, "x": 10, "y": 20 } })
    }

    fn parse(events: Vec<Value>) -> Vec<SemanticInteraction> {
        let json = serde_json::to_string(&events).unwrap();
        let events = EventLogAdapter::parse_array(&json).unwrap();
        let mut parser = SessionParser::new();
        parser.process_events(&events);
        parser.finish()
    }

    #[test]
    fn test_click_burst_becomes_single_rage_click() {
        let interactions = parse(vec![snapshot(0), click(1001, 0), click(1001, 1), click(1001, 2)]);

        assert_eq!(interactions.len(), 1);
        let rage = &interactions[0];
        assert_eq!(rage.kind, InteractionType::RageClick);
        assert_eq!(rage.label.as_deref(), Some("Buy"));
        assert_eq!(rage.semantic_role.as_deref(), Some("button"));
        assert_eq!(rage.node_id, Some(1001));
        assert_eq!(rage.extra_i64("click_count"), Some(3));
    }

    #[test]
    fn test_click_carries_coordinates_and_selector() {
        let interactions = parse(vec![snapshot(0), click(1001, 50)]);

        assert_eq!(interactions.len(), 1);
        let click = &interactions[0];
        assert_eq!(click.kind, InteractionType::Click);
        assert_eq!(click.extra.get("x"), Some(&json!(10.0)));
        assert_eq!(click.extra_str("selector"), Some("button#submit"));
    }

    #[test]
    fn test_named_mouse_events() {
        let interactions = parse(vec![
            snapshot(0),
            json!({ "type": 3, "timestamp": 10, "data": { "source": 2, "type": "mouseover", "id": 1001 } }),
            json!({ "type": 3, "timestamp": 20, "data": { "source": 2, "type": "dblclick", "id": 1001 } }),
            json!({ "type": 3, "timestamp": 30, "data": { "source": 2, "type": 0, "id": 1001 } }),
            json!({ "type": 3, "timestamp": 40, "data": { "source": 2, "type": "focus", "id": 1001 } }),
        ]);

        let kinds: Vec<_> = interactions.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![InteractionType::Hover, InteractionType::Click]);
    }

    #[test]
    fn test_input_label_and_value() {
        let interactions = parse(vec![
            snapshot(0),
            json!({ "type": 3, "timestamp": 10,
                "data": { "source": 5, "id": 1003, "text": "a@b.c", "isChecked": false } }),
        ]);

        let input = &interactions[0];
        assert_eq!(input.kind, InteractionType::Input);
        assert_eq!(input.label.as_deref(), Some("Your email"));
        assert_eq!(input.semantic_role.as_deref(), Some("form_input"));
        assert_eq!(input.extra_str("value"), Some("a@b.c"));
        assert_eq!(input.extra.get("checked"), None);
        assert_eq!(
            narrate(&interactions),
            "t=0ms: Entered \"a@b.c\" into form_input \"Your email\""
        );
    }

    #[test]
    fn test_checkbox_input_keeps_checked_state() {
        let interactions = parse(vec![
            snapshot(0),
            json!({ "type": 3, "timestamp": 5, "data": { "source": 0, "adds": [{ "parentId": 3,
                "node": { "type": 2, "id": 1005, "tagName": "input",
                          "attributes": { "type": "checkbox", "aria-label": "Remember me" } } }] } }),
            json!({ "type": 3, "timestamp": 10,
                "data": { "source": 5, "id": 1005, "text": "on", "isChecked": true } }),
        ]);

        assert_eq!(interactions.len(), 1);
        assert_eq!(interactions[0].extra.get("checked"), Some(&json!(true)));
        assert_eq!(narrate(&interactions), "t=0ms: Checked checkbox \"Remember me\"");
    }

    #[test]
    fn test_scroll_direction_and_distance() {
        let scroll = |timestamp: i64, y: f64| {
            json!({ "type": 3, "timestamp": timestamp, "data": { "source": 3, "id": 1004, "x": 0, "y": y } })
        };
        let interactions = parse(vec![snapshot(0), scroll(10, 400.0), scroll(20, 150.0)]);

        assert_eq!(interactions[0].extra_str("direction"), Some("down"));
        assert_eq!(interactions[0].extra.get("distance"), Some(&json!(400.0)));
        assert_eq!(interactions[1].extra_str("direction"), Some("up"));
        assert_eq!(interactions[1].extra.get("distance"), Some(&json!(250.0)));
    }

    #[test]
    fn test_navigation_and_unload() {
        let interactions = parse(vec![
            json!({ "type": 4, "timestamp": 0,
                "data": { "href": "https://shop.test/cart", "width": 1280, "height": 800 } }),
            json!({ "type": 5, "timestamp": 900, "data": { "tag": "beforeunload", "payload": {} } }),
        ]);

        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0].kind, InteractionType::Navigation);
        assert_eq!(interactions[0].label.as_deref(), Some("https://shop.test/cart"));
        assert_eq!(interactions[0].extra_i64("width"), Some(1280));
        assert_eq!(interactions[1].kind, InteractionType::LeavePage);
        assert_eq!(interactions[1].extra_str("reason"), Some("unload"));
    }

    #[test]
    fn test_unrecognized_events_advance_last_seen() {
        let interactions = parse(vec![
            snapshot(0),
            click(1001, 1000),
            json!({ "type": 99, "timestamp": 301_001, "data": {} }),
        ]);

        assert_eq!(interactions.len(), 2);
        let leave = &interactions[1];
        assert_eq!(leave.kind, InteractionType::LeavePage);
        assert_eq!(leave.extra_i64("idle_time"), Some(300_001));
    }

    #[test]
    fn test_labels_follow_tree_mutations() {
        let interactions = parse(vec![
            snapshot(0),
            json!({ "type": 3, "timestamp": 5, "data": { "source": 0,
                "texts": [{ "id": 1002, "value": "Pay now" }] } }),
            click(1001, 10),
            json!({ "type": 3, "timestamp": 20, "data": { "source": 0,
                "removes": [{ "parentId": 3, "id": 1001 }] } }),
            click(1001, 2000),
        ]);

        assert_eq!(interactions[0].label.as_deref(), Some("Pay now"));
        assert_eq!(interactions[1].label.as_deref(), Some("#1001"));
        assert_eq!(interactions[1].semantic_role, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(vec![]).is_empty());
    }

    #[test]
    fn test_finish_keeps_tree_between_chunks() {
        let json = serde_json::to_string(&vec![snapshot(0), click(1001, 10)]).unwrap();
        let first = EventLogAdapter::parse_array(&json).unwrap();
        let json = serde_json::to_string(&vec![click(1001, 20)]).unwrap();
        let second = EventLogAdapter::parse_array(&json).unwrap();

        let mut parser = SessionParser::new();
        parser.process_events(&first);
        assert_eq!(parser.finish().len(), 1);
        assert!(parser.pending().is_empty());

        parser.process_events(&second);
        let interactions = parser.finish();
        assert_eq!(interactions[0].label.as_deref(), Some("Buy"));
        assert_eq!(parser.last_timestamp(), Some(20));
        assert!(parser.dom().contains(1001));
    }
}
