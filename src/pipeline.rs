//! Pipeline orchestration
//!
//! This module provides the public API for Session Lens. It runs recorded
//! events through replay, pattern detection and analysis, and optionally
//! wraps the result in a report envelope.

use crate::analysis::{narrate, summarize, UxSessionSummary};
use crate::config::AnalyzerConfig;
use crate::dom::VirtualDom;
use crate::encoder::ReportEncoder;
use crate::error::LensError;
use crate::schema::{EventLogAdapter, RecordedEvent};
use crate::session::{SemanticInteraction, SessionParser};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Interactions, summary and narrative of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub interactions: Vec<SemanticInteraction>,
    pub summary: UxSessionSummary,
    pub narrative: String,
}

impl SessionAnalysis {
    fn from_interactions(interactions: Vec<SemanticInteraction>, config: &AnalyzerConfig) -> Self {
        let summary = summarize(&interactions, config);
        let narrative = narrate(&interactions);
        Self {
            interactions,
            summary,
            narrative,
        }
    }
}

/// Analyze a chronologically ordered event log with default thresholds
pub fn analyze_events(events: &[RecordedEvent]) -> SessionAnalysis {
    analyze_events_with_config(events, &AnalyzerConfig::default())
}

pub fn analyze_events_with_config(
    events: &[RecordedEvent],
    config: &AnalyzerConfig,
) -> SessionAnalysis {
    let mut parser = SessionParser::with_config(config.clone());
    parser.process_events(events);
    SessionAnalysis::from_interactions(parser.finish(), config)
}

/// Convert a raw event log (JSON array or NDJSON) into a report JSON string.
///
/// Pipeline stages:
/// 1. EventLogAdapter - Parse and classify recorded events
/// 2. Sort - Stable chronological order
/// 3. SessionParser - Replay the DOM and emit semantic interactions
/// 4. Analysis - Summary, friction points and narrative
/// 5. ReportEncoder - Encode the report envelope
pub fn events_to_report(json: &str) -> Result<String, LensError> {
    events_to_report_with_config(json, &AnalyzerConfig::default())
}

pub fn events_to_report_with_config(
    json: &str,
    config: &AnalyzerConfig,
) -> Result<String, LensError> {
    // Stage 1: Parse
    let mut events = EventLogAdapter::parse_any(json)?;

    // Stage 2: Order
    EventLogAdapter::sort_chronologically(&mut events);

    // Stages 3-4: Replay and analyze
    let analysis = analyze_events_with_config(&events, config);

    // Stage 5: Encode
    ReportEncoder::new().encode_to_json(&analysis)
}

/// Rebuild the DOM as it stood at `timestamp`, replaying every event at or
/// before it
pub fn replay_until(events: &[RecordedEvent], timestamp: i64) -> VirtualDom {
    let mut parser = SessionParser::new();
    for event in events.iter().filter(|e| e.timestamp() <= timestamp) {
        parser.process_event(event);
    }
    parser.dom().clone()
}

/// Stateful processor for sessions delivered in chunks.
///
/// The DOM and last-seen timestamp persist across `push_*` calls; each
/// `finish` closes one analysis window.
pub struct ReplayProcessor {
    parser: SessionParser,
    encoder: ReportEncoder,
    sessions_finished: usize,
}

impl Default for ReplayProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            parser: SessionParser::with_config(config),
            encoder: ReportEncoder::new(),
            sessions_finished: 0,
        }
    }

    /// Feed a chunk of raw events (JSON array or NDJSON)
    pub fn push_json(&mut self, json: &str) -> Result<usize, LensError> {
        let mut events = EventLogAdapter::parse_any(json)?;
        EventLogAdapter::sort_chronologically(&mut events);
        self.push_events(&events);
        Ok(events.len())
    }

    pub fn push_events(&mut self, events: &[RecordedEvent]) {
        self.parser.process_events(events);
        debug!(
            events = events.len(),
            pending = self.parser.pending().len(),
            "pushed event chunk"
        );
    }

    /// Finalize everything pushed since the last call
    pub fn finish(&mut self) -> SessionAnalysis {
        let interactions = self.parser.finish();
        self.sessions_finished += 1;
        SessionAnalysis::from_interactions(interactions, self.parser.config())
    }

    /// Finalize and encode as report JSON
    pub fn finish_report(&mut self) -> Result<String, LensError> {
        let analysis = self.finish();
        self.encoder.encode_to_json(&analysis)
    }

    /// HTML of the DOM as currently reconstructed
    pub fn dom_html(&self) -> String {
        self.parser.dom().to_html()
    }

    pub fn dom(&self) -> &VirtualDom {
        self.parser.dom()
    }

    /// Number of completed `finish` calls
    pub fn session_count(&self) -> usize {
        self.sessions_finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InteractionType;
    use pretty_assertions::assert_eq;

    fn checkout_session() -> &'static str {
        r#"[
            {"type": 4, "timestamp": 0, "data": {"href": "https://shop.test/cart", "width": 1280, "height": 800}},
            {"type": 2, "timestamp": 0, "data": {"node": {"type": 0, "id": 1, "childNodes": [
                {"type": 2, "id": 2, "tagName": "html", "childNodes": [
                    {"type": 2, "id": 3, "tagName": "body", "childNodes": [
                        {"type": 2, "id": 1001, "tagName": "button", "attributes": {"id": "submit"},
                         "childNodes": [{"type": 3, "id": 1002, "textContent": "Buy"}]}
                    ]}
                ]}
            ]}}},
            {"type": 3, "timestamp": 10, "data": {"source": 2, "type": 2, "id": 1001}},
            {"type": 3, "timestamp": 11, "data": {"source": 2, "type": 2, "id": 1001}},
            {"type": 3, "timestamp": 12, "data": {"source": 2, "type": 2, "id": 1001}}
        ]"#
    }

    fn parse(json: &str) -> Vec<RecordedEvent> {
        EventLogAdapter::parse_array(json).unwrap()
    }

    #[test]
    fn test_analyze_rage_session() {
        let analysis = analyze_events(&parse(checkout_session()));

        assert_eq!(analysis.interactions.len(), 2);
        let rage = &analysis.interactions[1];
        assert_eq!(rage.kind, InteractionType::RageClick);
        assert_eq!(rage.label.as_deref(), Some("Buy"));
        assert_eq!(rage.extra_i64("click_count"), Some(3));

        assert_eq!(
            analysis.summary.key_actions,
            vec!["Navigated to https://shop.test/cart"]
        );
        assert_eq!(
            analysis.summary.friction_points,
            vec!["Rage click on Buy (3 clicks)"]
        );
        assert_eq!(analysis.summary.session_duration_ms, 12);

        let rage_lines: Vec<_> = analysis
            .narrative
            .lines()
            .filter(|line| line.contains("Rage-clicked"))
            .collect();
        assert_eq!(rage_lines, vec!["t=12ms: Rage-clicked button \"Buy\" 3 times within 2ms"]);
    }

    #[test]
    fn test_sustained_clicking_reports_each_burst() {
        let mut events = vec![
            r#"{"type": 2, "timestamp": 0, "data": {"node": {"type": 0, "id": 1, "childNodes": [
                {"type": 2, "id": 1001, "tagName": "button",
                 "childNodes": [{"type": 3, "id": 1002, "textContent": "Buy"}]}
            ]}}}"#
                .to_string(),
        ];
        events.extend((0..11).map(|n| {
            format!(
                r#"{{"type": 3, "timestamp": {}, "data": {{"source": 2, "type": 2, "id": 1001}}}}"#,
                n * 400
            )
        }));
        let analysis = analyze_events(&parse(&format!("[{}]", events.join(","))));

        let rage_times: Vec<_> = analysis
            .interactions
            .iter()
            .filter(|i| i.kind == InteractionType::RageClick)
            .map(|i| i.timestamp)
            .collect();
        assert_eq!(rage_times, (2..11).map(|n| n * 400).collect::<Vec<i64>>());
        assert_eq!(analysis.summary.total_interactions, 9);
        assert_eq!(
            analysis.summary.friction_points,
            vec!["Rage click on Buy (3 clicks)"; 9]
        );
    }

    #[test]
    fn test_extreme_timestamps_degrade() {
        let json = r#"[
            {"type": 4, "timestamp": -9.3e18, "data": {"href": "/a"}},
            {"type": 4, "timestamp": 9.3e18, "data": {"href": "/b"}}
        ]"#;
        let analysis = analyze_events(&parse(json));
        assert_eq!(analysis.summary.session_duration_ms, i64::MAX);
        assert_eq!(analysis.interactions.len(), 2);

        let report = events_to_report(json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["started_at_utc"], serde_json::Value::Null);
    }

    #[test]
    fn test_empty_log() {
        let analysis = analyze_events(&[]);
        assert!(analysis.interactions.is_empty());
        assert_eq!(analysis.summary, UxSessionSummary::default());
        assert_eq!(analysis.narrative, "No interactions recorded.");
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let events = parse(checkout_session());
        assert_eq!(analyze_events(&events), analyze_events(&events));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AnalyzerConfig {
            rage_click_threshold: 4,
            ..AnalyzerConfig::default()
        };
        let analysis = analyze_events_with_config(&parse(checkout_session()), &config);
        let clicks = analysis
            .interactions
            .iter()
            .filter(|i| i.kind == InteractionType::Click)
            .count();
        assert_eq!(clicks, 3);
    }

    #[test]
    fn test_events_to_report_sorts_input() {
        let ndjson = concat!(
            r#"{"type": 4, "timestamp": 5000, "data": {"href": "/b"}}"#,
            "\n",
            r#"{"type": 4, "timestamp": 1000, "data": {"href": "/a"}}"#,
            "\n"
        );
        let report = events_to_report(ndjson).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(value["interactions"][0]["label"], "/a");
        assert_eq!(value["interactions"][1]["label"], "/b");
        assert_eq!(value["summary"]["session_duration_ms"], 4000);
    }

    #[test]
    fn test_events_to_report_rejects_garbage() {
        assert!(events_to_report("not json").is_err());
    }

    #[test]
    fn test_replay_until() {
        let events = parse(
            r#"[
            {"type": 2, "timestamp": 0, "data": {"node": {"type": 0, "id": 1, "childNodes": [
                {"type": 2, "id": 2, "tagName": "body"}
            ]}}},
            {"type": 3, "timestamp": 100, "data": {"source": 0,
                "adds": [{"parentId": 2, "node": {"type": 2, "id": 3, "tagName": "p"}}]}},
            {"type": 3, "timestamp": 200, "data": {"source": 0,
                "removes": [{"parentId": 2, "id": 3}]}}
        ]"#,
        );

        assert!(!replay_until(&events, 50).contains(3));
        assert!(replay_until(&events, 150).contains(3));
        assert!(!replay_until(&events, 250).contains(3));
        assert!(replay_until(&events, -1).is_empty());
    }

    #[test]
    fn test_replay_processor_chunks() {
        let mut processor = ReplayProcessor::new();
        let pushed = processor.push_json(checkout_session()).unwrap();
        assert_eq!(pushed, 5);
        assert!(processor.dom_html().contains("<button id=\"submit\">Buy</button>"));

        let first = processor.finish();
        assert_eq!(first.interactions.len(), 2);

        processor
            .push_json(r#"[{"type": 3, "timestamp": 4000, "data": {"source": 2, "type": 2, "id": 1001}}]"#)
            .unwrap();
        let report = processor.finish_report().unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(value["interactions"][0]["type"], "click");
        assert_eq!(value["interactions"][0]["label"], "Buy");
        assert_eq!(processor.session_count(), 2);
    }
}
