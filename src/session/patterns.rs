//! Post-pass pattern detection over emitted interactions
//!
//! Runs once per `SessionParser::finish`, in this order: session-end
//! detection, rage-click resolution, then finalize (sort + dedup).

use crate::config::AnalyzerConfig;
use crate::session::types::{ClickTrackers, InteractionType, SemanticInteraction};
use serde_json::json;
use std::collections::VecDeque;
use tracing::trace;

/// Append an inactivity `LeavePage` when the recording ran on long after the
/// last interaction and no explicit leave was seen.
pub fn detect_session_end(
    interactions: &mut Vec<SemanticInteraction>,
    last_seen: Option<i64>,
    config: &AnalyzerConfig,
) {
    if interactions
        .iter()
        .any(|i| i.kind == InteractionType::LeavePage)
    {
        return;
    }

    let (Some(last_seen), Some(latest)) = (
        last_seen,
        interactions.iter().map(|i| i.timestamp).max(),
    ) else {
        return;
    };

    let idle_time = last_seen.saturating_sub(latest);
    if idle_time > config.idle_threshold_ms {
        trace!(idle_time, "session ended by inactivity");
        interactions.push(
            SemanticInteraction::new(InteractionType::LeavePage, last_seen)
                .with_extra("reason", Some("inactivity"))
                .with_extra("idle_time", Some(idle_time)),
        );
    }
}

/// Escalate click bursts into `RageClick`s.
///
/// Per node, a window slides over the sorted click timestamps, dropping those
/// more than `rage_click_window_ms` older than the current click. Whenever the
/// window holds at least `rage_click_threshold` clicks, the `Click` at the
/// current timestamp is upgraded in place to a `RageClick` and the plain clicks
/// still in the window are absorbed. Earlier `RageClick`s are never absorbed, so
/// a sustained burst keeps one `RageClick` per window step.
pub fn resolve_rage_clicks(
    interactions: &mut Vec<SemanticInteraction>,
    trackers: &ClickTrackers,
    config: &AnalyzerConfig,
) {
    let mut absorbed = vec![false; interactions.len()];
    let is_plain_click = |interaction: &SemanticInteraction, node_id: i64| {
        interaction.node_id == Some(node_id) && interaction.kind == InteractionType::Click
    };

    for (&node_id, tracker) in trackers {
        let mut window: VecDeque<i64> = VecDeque::new();

        for t in tracker.sorted_timestamps() {
            window.push_back(t);
            while window
                .front()
                .map_or(false, |front| t.saturating_sub(*front) > config.rage_click_window_ms)
            {
                window.pop_front();
            }
            if window.len() < config.rage_click_threshold {
                continue;
            }
            let front = window.front().copied().unwrap_or(t);

            let Some(target) = (0..interactions.len()).find(|&i| {
                !absorbed[i]
                    && interactions[i].timestamp == t
                    && is_plain_click(&interactions[i], node_id)
            }) else {
                continue;
            };

            for i in 0..interactions.len() {
                let interaction = &interactions[i];
                if i != target
                    && !absorbed[i]
                    && is_plain_click(interaction, node_id)
                    && (front..=t).contains(&interaction.timestamp)
                {
                    absorbed[i] = true;
                }
            }

            let rage = &mut interactions[target];
            rage.kind = InteractionType::RageClick;
            rage.extra.insert("click_count".to_string(), json!(window.len()));
            rage.extra.insert("time_window_ms".to_string(), json!(t.saturating_sub(front)));
            if rage.label.is_none() {
                rage.label = tracker.label.clone();
            }
            if rage.semantic_role.is_none() {
                rage.semantic_role = tracker.role.clone();
            }
            trace!(node_id, clicks = window.len(), at = t, "rage click");
        }
    }

    let mut flags = absorbed.into_iter();
    interactions.retain(|_| !flags.next().unwrap_or(false));
}

/// Stable sort by timestamp, then drop any `RageClick` on the same node as the
/// immediately preceding `RageClick` within `rage_click_dedup_ms`.
pub fn finalize(interactions: &mut Vec<SemanticInteraction>, config: &AnalyzerConfig) {
    interactions.sort_by_key(|i| i.timestamp);

    let mut previous_rage: Option<(Option<i64>, i64)> = None;
    interactions.retain(|interaction| {
        if interaction.kind != InteractionType::RageClick {
            return true;
        }
        if let Some((node_id, timestamp)) = previous_rage {
            if node_id == interaction.node_id
                && interaction.timestamp.saturating_sub(timestamp) <= config.rage_click_dedup_ms
            {
                return false;
            }
        }
        previous_rage = Some((interaction.node_id, interaction.timestamp));
        true
    });
}
