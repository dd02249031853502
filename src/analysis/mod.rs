//! Session-level analysis over finalized interactions
//!
//! Pure functions: the same interaction list always yields the same summary
//! and narrative.

pub mod friction;
pub mod narrative;

pub use friction::{friction_points, key_actions, summarize, UxSessionSummary};
pub use narrative::{narrate, narrative_lines, EMPTY_NARRATIVE};
