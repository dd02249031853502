//! Semantic interaction extraction
//!
//! `SessionParser` replays recorded events against the shadow DOM and emits
//! labelled interactions; `patterns` holds the post-pass detectors that turn
//! click bursts into rage clicks and synthesize session-end markers.

pub mod parser;
pub mod patterns;
pub mod types;

pub use parser::SessionParser;
pub use types::{ClickTracker, ClickTrackers, InteractionType, SemanticInteraction};
