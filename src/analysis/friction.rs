//! UX summary and friction detection
//!
//! Friction comes in three shapes: rage clicks, hesitation gaps between
//! consecutive interactions, and dead clicks that the page never answered.

use crate::config::AnalyzerConfig;
use crate::session::{InteractionType, SemanticInteraction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregated view of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UxSessionSummary {
    /// Navigations and inputs, in order
    pub key_actions: Vec<String>,
    pub friction_points: Vec<String>,
    /// Last minus first interaction timestamp
    pub session_duration_ms: i64,
    pub total_interactions: usize,
}

/// Summarize finalized (timestamp-ordered) interactions
pub fn summarize(interactions: &[SemanticInteraction], config: &AnalyzerConfig) -> UxSessionSummary {
    let session_duration_ms = match (interactions.first(), interactions.last()) {
        (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
        _ => 0,
    };

    UxSessionSummary {
        key_actions: key_actions(interactions),
        friction_points: friction_points(interactions, config),
        session_duration_ms,
        total_interactions: interactions.len(),
    }
}

pub fn key_actions(interactions: &[SemanticInteraction]) -> Vec<String> {
    interactions
        .iter()
        .filter_map(|interaction| match interaction.kind {
            InteractionType::Navigation => {
                Some(format!("Navigated to {}", interaction.display_label()))
            }
            InteractionType::Input => {
                Some(format!("Entered input on {}", interaction.display_label()))
            }
            _ => None,
        })
        .collect()
}

/// Rage clicks, then hesitations, then dead clicks
pub fn friction_points(interactions: &[SemanticInteraction], config: &AnalyzerConfig) -> Vec<String> {
    let mut points: Vec<String> = interactions
        .iter()
        .filter(|i| i.kind == InteractionType::RageClick)
        .map(|rage| {
            format!(
                "Rage click on {} ({} clicks)",
                rage.display_label(),
                rage.extra_i64("click_count").unwrap_or(0)
            )
        })
        .collect();

    points.extend(hesitations(interactions, config.hesitation_threshold_ms));
    points.extend(dead_clicks(interactions, config.dead_click_window_ms));
    points
}

fn hesitations(interactions: &[SemanticInteraction], threshold_ms: i64) -> Vec<String> {
    interactions
        .windows(2)
        .filter_map(|pair| {
            let gap = pair[1].timestamp.saturating_sub(pair[0].timestamp);
            (gap > threshold_ms).then(|| {
                format!(
                    "Hesitated {:.1}s before {}",
                    gap as f64 / 1000.0,
                    describe_target(&pair[1])
                )
            })
        })
        .collect()
}

/// Clicks with no follow-on interaction and no escalation inside the window,
/// one entry per distinct description
fn dead_clicks(interactions: &[SemanticInteraction], window_ms: i64) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dead = Vec::new();

    for (index, click) in interactions.iter().enumerate() {
        if click.kind != InteractionType::Click {
            continue;
        }

        let answered = interactions[index + 1..]
            .iter()
            .take_while(|later| later.timestamp.saturating_sub(click.timestamp) <= window_ms)
            .any(|later| {
                later.kind.is_follow_on()
                    || (later.kind == InteractionType::RageClick && later.node_id == click.node_id)
            });

        if !answered {
            let description = format!("Dead click on {}", click.display_label());
            if seen.insert(description.clone()) {
                dead.push(description);
            }
        }
    }

    dead
}

fn describe_target(interaction: &SemanticInteraction) -> String {
    let kind = interaction.kind.as_str().replace('_', " ");
    match interaction.label.as_deref() {
        Some(label) => format!("{} on {}", kind, label),
        None => kind,
    }
}
