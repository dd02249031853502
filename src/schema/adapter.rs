//! Event log adapter
//!
//! Reads recorded event logs from JSON arrays or NDJSON streams and reports
//! records the replay engine will not be able to use.

use crate::error::LensError;
use crate::schema::recorded_event::*;

/// Adapter for loading and checking recorded event logs
pub struct EventLogAdapter;

impl EventLogAdapter {
    /// Parse a JSON string containing an array of events
    pub fn parse_array(json: &str) -> Result<Vec<RecordedEvent>, LensError> {
        let events: Vec<RecordedEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing one event per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RecordedEvent>, LensError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordedEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(LensError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either container format, sniffing the first non-blank character
    pub fn parse_any(input: &str) -> Result<Vec<RecordedEvent>, LensError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Stable sort by timestamp; same-timestamp events keep their log order
    pub fn sort_chronologically(events: &mut [RecordedEvent]) {
        events.sort_by_key(|e| e.timestamp());
    }

    /// Collect every event that could not be classified
    pub fn validate_events(events: &[RecordedEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(idx, event)| {
                event.issue().map(|issue| ValidationResult {
                    index: idx,
                    timestamp: event.timestamp(),
                    issue: issue.clone(),
                })
            })
            .collect()
    }
}

/// An event the engine will skip, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub timestamp: i64,
    pub issue: ValidationIssue,
}
