//! Timestamped, human-readable narrative of a session
//!
//! One line per interaction, `t=<ms>ms: <phrase>`, where `<ms>` is relative to
//! the first interaction. The output is plain text meant for people and for
//! downstream prompt builders.

use crate::session::{InteractionType, SemanticInteraction};

/// Narrative for an empty session
pub const EMPTY_NARRATIVE: &str = "No interactions recorded.";

/// Render the full narrative, newline-joined
pub fn narrate(interactions: &[SemanticInteraction]) -> String {
    if interactions.is_empty() {
        return EMPTY_NARRATIVE.to_string();
    }
    narrative_lines(interactions).join("\n")
}

/// One `t=<ms>ms: <phrase>` line per interaction
pub fn narrative_lines(interactions: &[SemanticInteraction]) -> Vec<String> {
    let Some(start) = interactions.first().map(|i| i.timestamp) else {
        return Vec::new();
    };

    interactions
        .iter()
        .map(|interaction| {
            format!(
                "t={}ms: {}",
                interaction.timestamp.saturating_sub(start),
                phrase(interaction)
            )
        })
        .collect()
}

/// Verb phrase describing a single interaction
pub fn phrase(interaction: &SemanticInteraction) -> String {
    let label = interaction.display_label();
    let target = match interaction.semantic_role.as_deref() {
        Some(role) => format!("{} \"{}\"", role, label),
        None => format!("\"{}\"", label),
    };

    match interaction.kind {
        InteractionType::Navigation => format!("Navigated to {}", label),
        InteractionType::Input => {
            let value = interaction.extra_str("value").filter(|v| !v.is_empty());
            let checked = interaction
                .extra
                .get("checked")
                .and_then(|v| v.as_bool())
                .filter(|_| is_toggle(interaction) || value.is_none());
            match (value, checked) {
                (_, Some(true)) => format!("Checked {}", target),
                (_, Some(false)) => format!("Unchecked {}", target),
                (Some(value), None) => format!("Entered \"{}\" into {}", value, target),
                (None, None) => format!("Entered input into {}", target),
            }
        }
        InteractionType::Click => format!("Clicked {}", target),
        InteractionType::RageClick => format!(
            "Rage-clicked {} {} times within {}ms",
            target,
            interaction.extra_i64("click_count").unwrap_or(0),
            interaction.extra_i64("time_window_ms").unwrap_or(0)
        ),
        InteractionType::Scroll => format!(
            "Scrolled {} {}px on {}",
            interaction.extra_str("direction").unwrap_or("down"),
            interaction
                .extra
                .get("distance")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
                .round(),
            target
        ),
        InteractionType::Hover => format!("Hovered over {}", target),
        InteractionType::LeavePage => match interaction.extra_i64("idle_time") {
            Some(idle) if interaction.extra_str("reason") == Some("inactivity") => {
                format!("Left the page after {}s of inactivity", idle / 1000)
            }
            _ => "Left the page".to_string(),
        },
    }
}

/// Checkbox and radio inputs, where `checked` carries the state
fn is_toggle(interaction: &SemanticInteraction) -> bool {
    matches!(
        interaction.semantic_role.as_deref(),
        Some("checkbox") | Some("radio")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn on_button(kind: InteractionType, timestamp: i64) -> SemanticInteraction {
        SemanticInteraction::new(kind, timestamp).with_target(
            1001,
            "Buy".to_string(),
            Some("button".to_string()),
        )
    }

    #[test]
    fn test_empty_session() {
        assert_eq!(narrate(&[]), "No interactions recorded.");
        assert!(narrative_lines(&[]).is_empty());
    }

    #[test]
    fn test_times_are_relative_to_first_interaction() {
        let interactions = vec![
            SemanticInteraction::new(InteractionType::Navigation, 1_000)
                .with_label("https://shop.test/"),
            on_button(InteractionType::Click, 3_500),
        ];

        assert_eq!(
            narrate(&interactions),
            "t=0ms: Navigated to https://shop.test/\nt=2500ms: Clicked button \"Buy\""
        );
    }

    #[test]
    fn test_rage_click_phrase() {
        let rage = on_button(InteractionType::RageClick, 2)
            .with_extra("click_count", Some(3))
            .with_extra("time_window_ms", Some(2));
        assert_eq!(phrase(&rage), "Rage-clicked button \"Buy\" 3 times within 2ms");
    }

    #[test]
    fn test_input_phrases() {
        let typed = SemanticInteraction::new(InteractionType::Input, 0)
            .with_target(7, "Email".to_string(), Some("form_input".to_string()))
            .with_extra("value", Some("a@b.c"));
        assert_eq!(phrase(&typed), "Entered \"a@b.c\" into form_input \"Email\"");

        let toggled = SemanticInteraction::new(InteractionType::Input, 0)
            .with_target(8, "Remember me".to_string(), Some("checkbox".to_string()))
            .with_extra("checked", Some(true));
        assert_eq!(phrase(&toggled), "Checked checkbox \"Remember me\"");

        let unticked = SemanticInteraction::new(InteractionType::Input, 0)
            .with_target(9, "Newsletter".to_string(), Some("checkbox".to_string()))
            .with_extra("value", Some("on"))
            .with_extra("checked", Some(false));
        assert_eq!(phrase(&unticked), "Unchecked checkbox \"Newsletter\"");
    }

    #[test]
    fn test_text_input_ignores_unchecked_flag() {
        let typed = SemanticInteraction::new(InteractionType::Input, 0)
            .with_target(7, "Email".to_string(), Some("form_input".to_string()))
            .with_extra("value", Some("a@b.c"))
            .with_extra("checked", Some(false));
        assert_eq!(phrase(&typed), "Entered \"a@b.c\" into form_input \"Email\"");

        let cleared = SemanticInteraction::new(InteractionType::Input, 0)
            .with_target(7, "Email".to_string(), Some("form_input".to_string()))
            .with_extra("value", Some(""));
        assert_eq!(phrase(&cleared), "Entered input into form_input \"Email\"");
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let interactions = vec![
            SemanticInteraction::new(InteractionType::Navigation, i64::MIN).with_label("/a"),
            SemanticInteraction::new(InteractionType::Navigation, i64::MAX).with_label("/b"),
        ];
        let lines = narrative_lines(&interactions);
        assert_eq!(lines[1], format!("t={}ms: Navigated to /b", i64::MAX));
    }

    #[test]
    fn test_scroll_hover_and_leave_phrases() {
        let scroll = SemanticInteraction::new(InteractionType::Scroll, 0)
            .with_target(4, "document".to_string(), Some("document".to_string()))
            .with_extra("direction", Some("up"))
            .with_extra("distance", Some(249.6));
        assert_eq!(phrase(&scroll), "Scrolled up 250px on document \"document\"");

        let hover = SemanticInteraction::new(InteractionType::Hover, 0).with_label("Menu");
        assert_eq!(phrase(&hover), "Hovered over \"Menu\"");

        let idle = SemanticInteraction::new(InteractionType::LeavePage, 0)
            .with_extra("reason", Some("inactivity"))
            .with_extra("idle_time", Some(300_001));
        assert_eq!(phrase(&idle), "Left the page after 300s of inactivity");

        let unload = SemanticInteraction::new(InteractionType::LeavePage, 0)
            .with_extra("reason", Some("unload"));
        assert_eq!(phrase(&unload), "Left the page");
    }
}
