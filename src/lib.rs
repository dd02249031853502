//! Session Lens - Deterministic replay and interaction analysis for recorded browser sessions
//!
//! Lens turns rrweb-style event logs into labelled semantic interactions through
//! a deterministic pipeline: event classification → shadow DOM replay →
//! interaction extraction → pattern detection → summary and narrative.
//!
//! ## Modules
//!
//! - **DOM**: Shadow model of the recorded page, roles and label resolution
//! - **Session**: Event replay and rage-click / session-end detection
//! - **Analysis**: UX summary, friction points and the timestamped narrative

pub mod analysis;
pub mod config;
pub mod dom;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod telemetry;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analysis::UxSessionSummary;
pub use config::AnalyzerConfig;
pub use dom::VirtualDom;
pub use error::LensError;
pub use pipeline::{
    analyze_events, analyze_events_with_config, events_to_report, replay_until, ReplayProcessor,
    SessionAnalysis,
};
pub use session::{InteractionType, SemanticInteraction, SessionParser};

// Schema exports
pub use schema::{EventLogAdapter, RecordedEvent, SCHEMA_VERSION};

/// Lens version embedded in all reports
pub const LENS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "session-lens";
