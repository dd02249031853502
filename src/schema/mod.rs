//! Recorded browser event schema
//!
//! This module defines the typed view over rrweb-style event logs and the
//! adapter that loads them from JSON arrays or NDJSON streams.

mod recorded_event;
mod adapter;

pub use recorded_event::*;
pub use adapter::*;
