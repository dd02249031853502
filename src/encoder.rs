//! Session report encoding
//!
//! Wraps an analyzed session into a self-describing JSON envelope with
//! producer metadata and UTC timestamps.

use crate::analysis::UxSessionSummary;
use crate::error::LensError;
use crate::pipeline::SessionAnalysis;
use crate::schema::SCHEMA_VERSION;
use crate::session::SemanticInteraction;
use crate::{LENS_VERSION, PRODUCER_NAME};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report envelope version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Report envelope for one analyzed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    /// Event schema the input was read as
    pub source_schema: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    /// First interaction, absent for empty sessions or unrepresentable times
    pub started_at_utc: Option<String>,
    pub ended_at_utc: Option<String>,
    pub summary: UxSessionSummary,
    pub interactions: Vec<SemanticInteraction>,
    pub narrative: String,
}

/// Encoder producing `SessionReport` envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, analysis: &SessionAnalysis) -> Result<SessionReport, LensError> {
        let interactions = &analysis.interactions;

        Ok(SessionReport {
            report_version: REPORT_VERSION.to_string(),
            source_schema: SCHEMA_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: LENS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            started_at_utc: interactions
                .first()
                .and_then(|i| epoch_ms_to_rfc3339(i.timestamp)),
            ended_at_utc: interactions
                .last()
                .and_then(|i| epoch_ms_to_rfc3339(i.timestamp)),
            summary: analysis.summary.clone(),
            interactions: interactions.clone(),
            narrative: analysis.narrative.clone(),
        })
    }

    /// Encode to pretty JSON
    pub fn encode_to_json(&self, analysis: &SessionAnalysis) -> Result<String, LensError> {
        let report = self.encode(analysis)?;
        serde_json::to_string_pretty(&report).map_err(LensError::JsonError)
    }
}

/// `None` for timestamps chrono cannot represent
fn epoch_ms_to_rfc3339(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms).single().map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze_events;
    use crate::schema::EventLogAdapter;

    fn sample_analysis() -> SessionAnalysis {
        let events = EventLogAdapter::parse_array(
            r#"[
                {"type": 4, "timestamp": 1700000000000, "data": {"href": "https://shop.test/"}},
                {"type": 4, "timestamp": 1700000004000, "data": {"href": "https://shop.test/cart"}}
            ]"#,
        )
        .unwrap();
        analyze_events(&events)
    }

    #[test]
    fn test_encode_report() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&sample_analysis()).unwrap();

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, "session-lens");
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(
            report.started_at_utc.as_deref(),
            Some("2023-11-14T22:13:20+00:00")
        );
        assert_eq!(
            report.ended_at_utc.as_deref(),
            Some("2023-11-14T22:13:24+00:00")
        );
        assert_eq!(report.summary.total_interactions, 2);
    }

    #[test]
    fn test_encode_to_json() {
        let json = ReportEncoder::new().encode_to_json(&sample_analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source_schema"], SCHEMA_VERSION);
        assert_eq!(value["interactions"][1]["type"], "navigation");
        assert_eq!(value["summary"]["session_duration_ms"], 4000);
        assert!(value["producer"]["instance_id"].as_str().unwrap().len() == 36);
    }

    #[test]
    fn test_unrepresentable_bounds_are_omitted() {
        let events = EventLogAdapter::parse_array(
            r#"[
                {"type": 4, "timestamp": -9.3e18, "data": {"href": "/a"}},
                {"type": 4, "timestamp": 1700000000000, "data": {"href": "/b"}}
            ]"#,
        )
        .unwrap();
        let report = ReportEncoder::new().encode(&analyze_events(&events)).unwrap();

        assert!(report.started_at_utc.is_none());
        assert_eq!(
            report.ended_at_utc.as_deref(),
            Some("2023-11-14T22:13:20+00:00")
        );
    }

    #[test]
    fn test_empty_session_has_no_bounds() {
        let report = ReportEncoder::new().encode(&analyze_events(&[])).unwrap();
        assert!(report.started_at_utc.is_none());
        assert_eq!(report.narrative, "No interactions recorded.");
    }
}
